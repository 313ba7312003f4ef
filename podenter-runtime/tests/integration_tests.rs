use podenter_core::{ContainerUri, Error, RuntimeKind};
use podenter_runtime::{CliProbe, RuntimeInspector, inspector_for, parse_inspect};

#[test]
fn test_uri_to_inspector() {
    let uri: ContainerUri = "cri-o://5f0e7b2a9c".parse().unwrap();
    let inspector = inspector_for(uri.runtime(), None);
    assert_eq!(inspector.runtime(), RuntimeKind::CriO);
}

#[test]
fn test_crio_absolute_root() {
    let raw = br#"{
      "info": {
        "pid": 977,
        "runtimeSpec": {
          "root": { "path": "/var/lib/containers/storage/overlay/4c1a/merged" },
          "process": { "cwd": "/", "env": ["PATH=/usr/bin"] }
        }
      }
    }"#;

    let descriptor = parse_inspect(RuntimeKind::CriO, "5f0e7b2a9c", raw).unwrap();
    assert_eq!(descriptor.init_pid.as_raw(), 977);
    assert_eq!(
        descriptor.root_path.to_str(),
        Some("/var/lib/containers/storage/overlay/4c1a/merged")
    );
    assert_eq!(descriptor.working_dir, "/");
}

#[tokio::test]
async fn test_failing_probe_program() {
    // `false` exits non-zero with empty stderr
    let probe = CliProbe::new(RuntimeKind::Containerd, "/run/containerd/containerd.sock")
        .with_program("false");

    let err = probe.inspect("abc123").await.unwrap_err();
    assert!(matches!(err, Error::Resolution { .. }));
}

#[tokio::test]
async fn test_direct_client_without_socket() {
    let inspector = inspector_for(RuntimeKind::Docker, Some("/nonexistent/containerd.sock"));

    let err = inspector.inspect("abc123").await.unwrap_err();
    assert!(matches!(err, Error::RuntimeUnreachable { .. }));
}
