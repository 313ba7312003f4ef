//! Helper workload name generation

use std::sync::atomic::{AtomicUsize, Ordering};

use podenter_core::defaults::{HELPER_NAME_PREFIX, HELPER_NAME_SUFFIX_LEN};
use rand::Rng;

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Source of unique helper workload names
pub trait NameGenerator: Send + Sync {
    /// Produce the next name
    fn generate(&self) -> String;
}

/// `podenter-` followed by a random `[a-z0-9]` suffix
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSuffix;

impl NameGenerator for RandomSuffix {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..HELPER_NAME_SUFFIX_LEN)
            .map(|_| char::from(SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())]))
            .collect();

        format!("{HELPER_NAME_PREFIX}{suffix}")
    }
}

/// Hands out a fixed list of names in order, wrapping around
#[derive(Debug)]
pub struct FixedNames {
    names: Vec<String>,
    next: AtomicUsize,
}

impl FixedNames {
    /// Create from a non-empty list of names
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            next: AtomicUsize::new(0),
        }
    }
}

impl NameGenerator for FixedNames {
    fn generate(&self) -> String {
        if self.names.is_empty() {
            return HELPER_NAME_PREFIX.trim_end_matches('-').to_string();
        }

        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.names.len();
        self.names[index].clone()
    }
}
