use podenter_core::defaults;
use podenter_core::*;

#[test]
fn test_container_uri_from_status() {
    // Valid URIs
    let uri: ContainerUri = "docker://4f2a9c".parse().unwrap();
    assert_eq!(uri.runtime(), RuntimeKind::Docker);
    assert_eq!(uri.id(), "4f2a9c");

    let uri: ContainerUri = "cri-o://e3b0c44298fc".parse().unwrap();
    assert_eq!(uri.runtime(), RuntimeKind::CriO);
    assert_eq!(uri.id(), "e3b0c44298fc");

    // Trailing path segments are not part of the id
    let uri: ContainerUri = "containerd://abc123/extra".parse().unwrap();
    assert_eq!(uri.id(), "abc123");

    // Invalid URIs
    assert!("".parse::<ContainerUri>().is_err());
    assert!("containerd:/abc".parse::<ContainerUri>().is_err());
    assert!("containerd://".parse::<ContainerUri>().is_err());
}

#[test]
fn test_runtime_conventions() {
    for kind in RuntimeKind::ALL {
        assert!(kind.default_socket().starts_with('/'));
        assert!(kind.state_dir().starts_with('/'));
        assert!(kind.storage_root().starts_with('/'));
        assert_eq!(kind.as_str().parse::<RuntimeKind>().unwrap(), kind);
    }

    assert!(RuntimeKind::Docker.has_direct_api());
    assert!(!RuntimeKind::Containerd.has_direct_api());
    assert_eq!(RuntimeKind::Containerd.runtime_namespace(), Some("k8s.io"));
    assert_eq!(RuntimeKind::CriO.runtime_namespace(), None);
}

#[test]
fn test_helper_selector() {
    assert_eq!(defaults::helper_selector(), "podenter.io/role=helper");
}

#[test]
fn test_error_classes() {
    let err = Error::UnsupportedRuntime {
        runtime: "rkt".to_string(),
    };
    assert_eq!(err.to_string(), "Unsupported container runtime: rkt");

    let err = Error::AttachCompleted {
        message: "cannot attach a container in a completed pod".to_string(),
    };
    assert!(err.is_attach_completed());
}
