use netprobe_common::error::ScanError;
use netprobe_common::request::ScanRequest;
use netprobe_common::results::{ErrorKind, ErrorPayload};
use netprobe_core::network::scripted::ScriptedFactory;

use crate::support::{fast_config, run};

async fn rejection(request: ScanRequest) -> ScanError {
    run(&ScriptedFactory::silent(), request, fast_config()).await.unwrap_err()
}

#[tokio::test]
async fn validation_messages_are_verbatim() {
    let missing_ports = rejection(ScanRequest::new("198.51.100.20", "TCP SYN")).await;
    assert_eq!(missing_ports.to_string(), "port(s) are required for TCP SYN");

    let missing_zombie = rejection(ScanRequest::new("198.51.100.20", "Idle").with_ports("80")).await;
    assert_eq!(missing_zombie.to_string(), "Zombie IP is required for Idle Scan");

    let payload = ErrorPayload::from(&missing_zombie);
    assert_eq!(payload.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn bad_inputs_are_rejected_before_probing() {
    let factory = ScriptedFactory::silent();
    let requests = [
        ScanRequest::new("not-an-ip", "TCP SYN").with_ports("80"),
        ScanRequest::new("198.51.100.20", "TCP SYN").with_ports("0"),
        ScanRequest::new("198.51.100.20", "TCP SYN").with_ports("70000"),
        ScanRequest::new("198.51.100.20", "TCP SYN").with_ports("5-3"),
        ScanRequest::new("198.51.100.20", "TCP Teleport").with_ports("80"),
        ScanRequest::new("198.51.100.20", "Idle").with_ports("80").with_zombie("2001:db8::66"),
        ScanRequest::default(),
    ];
    for request in requests {
        let err = run(&factory, request.clone(), fast_config()).await.unwrap_err();
        assert!(matches!(err, ScanError::Configuration(_)), "{request:?} gave {err}");
    }
    assert!(factory.sent().is_empty());
}

#[tokio::test]
async fn permission_failures_have_their_own_payload() {
    let factory = ScriptedFactory::silent().unprivileged();
    let err = run(&factory, ScanRequest::new("198.51.100.20", "TCP SYN").with_ports("22"), fast_config())
        .await
        .unwrap_err();

    let payload = ErrorPayload::from(&err);
    assert_eq!(payload.kind, ErrorKind::Permission);
    assert!(payload.error.contains("root/Administrator"));

    let body = serde_json::to_value(&payload).unwrap();
    assert_eq!(body["kind"], "permission");
}

#[tokio::test]
async fn request_documents_deserialize() {
    let request: ScanRequest = serde_json::from_str(
        r#"{"target_ip": "198.51.100.20", "ports": "22", "scan_type": "Idle", "zombie_ip": "198.51.100.66"}"#,
    )
    .unwrap();
    assert_eq!(
        request,
        ScanRequest::new("198.51.100.20", "Idle").with_ports("22").with_zombie("198.51.100.66")
    );
}
