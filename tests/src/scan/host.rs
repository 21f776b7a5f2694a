use netprobe_common::request::ScanRequest;
use netprobe_common::results::{HostResult, ProtocolStatus};
use netprobe_core::network::scripted::{self, ScriptedFactory};
use netprobe_core::scanner::os;
use netprobe_core::scanner::sweep::CATALOG;
use netprobe_protocols::icmp::{codes, types};
use netprobe_protocols::reply::ReplyLayer;

use crate::support::{fast_config, host_result, run};

/// Speaks ICMP and TCP, rejects UDP with protocol-unreachable, ignores the rest.
fn router() -> ScriptedFactory {
    ScriptedFactory::new(|probe| {
        let reply = match probe.protocol() {
            1 => Some(scripted::echo_answer(probe)),
            6 => Some(scripted::reply_from(probe, 6, ReplyLayer::Other)),
            17 => Some(scripted::icmp_error(probe, types::DEST_UNREACHABLE_V4, codes::PROTOCOL_UNREACHABLE_V4)),
            _ => None,
        };
        Ok(reply)
    })
}

#[tokio::test]
async fn protocol_sweep_covers_the_catalog_in_order() {
    let factory = router();
    let request = ScanRequest::new("198.51.100.20", "IP Protocol Scan");
    let HostResult::Protocols { protocols } = host_result(run(&factory, request, fast_config()).await.unwrap()) else {
        panic!("expected protocol results");
    };

    let numbers: Vec<u8> = protocols.iter().map(|p| p.protocol_number).collect();
    assert_eq!(numbers, CATALOG.to_vec());

    let status_of = |n: u8| protocols.iter().find(|p| p.protocol_number == n).map(|p| p.status);
    assert_eq!(status_of(1), Some(ProtocolStatus::Open));
    assert_eq!(status_of(6), Some(ProtocolStatus::Open));
    assert_eq!(status_of(17), Some(ProtocolStatus::Closed));
    assert_eq!(status_of(103), Some(ProtocolStatus::OpenFiltered));
    assert_eq!(protocols[0].protocol_name, "ICMP");
}

#[tokio::test]
async fn protocol_sweep_ignores_ports() {
    let factory = router();
    let request = ScanRequest::new("198.51.100.20", "IP Protocol Scan").with_ports("1-5000");
    run(&factory, request, fast_config()).await.unwrap();
    assert_eq!(factory.sent().len(), CATALOG.len());
}

#[tokio::test]
async fn os_detection_on_a_windows_like_host() {
    let factory = ScriptedFactory::new(|probe| {
        let mut reply = scripted::echo_answer(probe);
        reply.ttl = 124;
        Ok(Some(reply))
    });
    let request = ScanRequest::new("198.51.100.20", "OS-Detection");
    let HostResult::Os { os_guess, detail } = host_result(run(&factory, request, fast_config()).await.unwrap()) else {
        panic!("expected an os guess");
    };
    assert_eq!(os_guess, "Windows");
    assert!(detail.starts_with("Received TTL=124."));
    assert_eq!(factory.sent().len(), 1);
}

#[tokio::test]
async fn os_detection_without_an_answer() {
    let request = ScanRequest::new("198.51.100.20", "OS-Detection");
    let result = host_result(run(&ScriptedFactory::silent(), request, fast_config()).await.unwrap());
    assert_eq!(result, HostResult::os("Unknown / No Response", "Host is down or not responding to ICMP Echo Requests."));
}

#[tokio::test]
async fn host_results_serialize_with_wire_names() {
    let request = ScanRequest::new("198.51.100.20", "IP Protocol Scan");
    let report = run(&router(), request, fast_config()).await.unwrap();
    let value = serde_json::to_value(&report).unwrap();

    let first = &value["protocols"][0];
    assert_eq!(first["protocol_number"], 1);
    assert_eq!(first["protocol_name"], "ICMP");
    assert_eq!(first["status"], "open");
}

#[tokio::test]
async fn os_detection_without_privileges_is_an_error_guess() {
    let factory = ScriptedFactory::silent().unprivileged();
    let request = ScanRequest::new("198.51.100.20", "OS-Detection");
    let result = host_result(run(&factory, request, fast_config()).await.unwrap());
    assert_eq!(result, HostResult::os(os::ERROR_GUESS, os::PERMISSION_DETAIL));
    assert!(factory.sent().is_empty());
}
