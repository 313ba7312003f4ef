//! Relay of helper workload logs

use bytes::BytesMut;
use podenter_core::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const CHUNK: usize = 8 * 1024;

/// Copy a log stream to `out` until end of stream
///
/// A read returning zero bytes ends the relay. Returns the number of bytes
/// relayed.
///
/// # Errors
/// Returns [`Error::LogStream`] if reading or writing fails
pub async fn relay_logs<R, W>(mut logs: R, out: &mut W) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = BytesMut::with_capacity(CHUNK);
    let mut total = 0u64;

    loop {
        buf.clear();
        let n = logs
            .read_buf(&mut buf)
            .await
            .map_err(|e| Error::LogStream {
                message: e.to_string(),
            })?;
        if n == 0 {
            break;
        }

        out.write_all(&buf).await.map_err(|e| Error::LogStream {
            message: format!("write: {e}"),
        })?;
        out.flush().await.map_err(|e| Error::LogStream {
            message: format!("flush: {e}"),
        })?;
        total += n as u64;
    }

    Ok(total)
}
