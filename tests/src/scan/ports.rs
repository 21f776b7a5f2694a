use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use netprobe_common::error::ProbeError;
use netprobe_common::request::ScanRequest;
use netprobe_common::results::{PortResult, PortStatus};
use netprobe_core::network::scripted::{self, ScriptedFactory};
use netprobe_core::{Runner, ScanControl};
use netprobe_protocols::icmp::{codes, types};
use netprobe_protocols::probe::ProbeKind;
use netprobe_protocols::tcp::flags;
use tokio::net::TcpListener;

use crate::support::{TARGET, fast_config, port_results, run};

/// 22 open, 80 closed, everything else silent. Like a real stack, the open
/// port only answers segments carrying SYN.
fn web_host() -> ScriptedFactory {
    ScriptedFactory::new(|probe| {
        let ProbeKind::Tcp(header) = probe.kind else {
            return Ok(None);
        };
        let reply = match header.dst_port {
            22 if header.flags & flags::SYN != 0 && header.flags & flags::RST == 0 => {
                Some(scripted::tcp_answer(probe, flags::SYN_ACK, 29200))
            }
            80 => Some(scripted::tcp_answer(probe, flags::RST_ACK, 0)),
            _ => None,
        };
        Ok(reply)
    })
}

fn statuses(results: &[PortResult]) -> Vec<(u16, PortStatus)> {
    results.iter().map(|r| (r.port, r.status)).collect()
}

#[tokio::test]
async fn syn_scan_classifies_and_tears_down() {
    let factory = web_host();
    let request = ScanRequest::new("198.51.100.20", "TCP SYN").with_ports("80,22,443");
    let results = port_results(run(&factory, request, fast_config()).await.unwrap());

    assert_eq!(
        statuses(&results),
        vec![(22, PortStatus::Open), (80, PortStatus::Closed), (443, PortStatus::Filtered)]
    );
    assert!(results[0].latency_ms.is_some());
    assert!(results[2].latency_ms.is_none());

    let resets: Vec<u16> = factory
        .sent()
        .iter()
        .filter_map(|p| match p.kind {
            ProbeKind::Tcp(header) if header.flags == flags::RST => Some(header.dst_port),
            _ => None,
        })
        .collect();
    assert_eq!(resets, vec![22]);
}

#[tokio::test]
async fn stealth_scans_read_silence_as_open_filtered() {
    for name in ["TCP FIN", "TCP Xmas", "TCP Null"] {
        let request = ScanRequest::new("198.51.100.20", name).with_ports("22,80");
        let results = port_results(run(&web_host(), request, fast_config()).await.unwrap());
        assert_eq!(results[0].status, PortStatus::OpenFiltered, "{name}");
        assert_eq!(results[1].status, PortStatus::Closed, "{name}");
    }
}

#[tokio::test]
async fn ack_and_window_scans_read_resets() {
    let factory = ScriptedFactory::new(|probe| {
        let window: u16 = if probe.ports().map(|(_, dst)| dst) == Some(22) { 512 } else { 0 };
        Ok(Some(scripted::tcp_answer(probe, flags::RST, window)))
    });

    let request = ScanRequest::new("198.51.100.20", "TCP ACK").with_ports("22,23");
    let ack = port_results(run(&factory, request, fast_config()).await.unwrap());
    assert!(ack.iter().all(|r| r.status == PortStatus::Unfiltered));

    let request = ScanRequest::new("198.51.100.20", "TCP Window").with_ports("22,23");
    let window = port_results(run(&factory, request, fast_config()).await.unwrap());
    assert_eq!(statuses(&window), vec![(22, PortStatus::Open), (23, PortStatus::Closed)]);
}

#[tokio::test]
async fn udp_scan_uses_port_unreachable() {
    let factory = ScriptedFactory::new(|probe| {
        let reply = match probe.ports() {
            Some((_, 53)) => Some(scripted::udp_answer(probe)),
            Some((_, 54)) => Some(scripted::icmp_error(probe, types::DEST_UNREACHABLE_V4, codes::PORT_UNREACHABLE_V4)),
            _ => None,
        };
        Ok(reply)
    });
    let request = ScanRequest::new("198.51.100.20", "UDP").with_ports("53-55");
    let results = port_results(run(&factory, request, fast_config()).await.unwrap());
    assert_eq!(
        statuses(&results),
        vec![(53, PortStatus::Open), (54, PortStatus::Closed), (55, PortStatus::OpenFiltered)]
    );
}

#[tokio::test]
async fn failing_probes_keep_length_and_order() {
    let factory = ScriptedFactory::new(|probe| match probe.ports() {
        Some((_, port)) if port % 3 == 0 => Err(ProbeError::Packet(String::from("no buffer space"))),
        _ => Ok(Some(scripted::tcp_answer(probe, flags::RST_ACK, 0))),
    });
    let mut config = fast_config();
    config.max_parallel = 16;
    let request = ScanRequest::new("198.51.100.20", "TCP SYN").with_ports("100-160");
    let results = port_results(run(&factory, request, config).await.unwrap());

    assert_eq!(results.len(), 61);
    assert!(results.windows(2).all(|w| w[0].port < w[1].port));
    for result in &results {
        let expected = if result.port % 3 == 0 { PortStatus::Error } else { PortStatus::Closed };
        assert_eq!(result.status, expected, "port {}", result.port);
    }
    let detail = results[2].detail.as_deref().unwrap();
    assert!(detail.contains("no buffer space"));
}

#[tokio::test]
async fn ipv6_targets_probe_over_ipv6() {
    let factory = web_host();
    let request = ScanRequest::new("2001:db8::20", "TCP SYN").with_ports("22");
    let results = port_results(run(&factory, request, fast_config()).await.unwrap());
    assert_eq!(results[0].status, PortStatus::Open);
    assert!(factory.sent().iter().all(|p| p.is_ipv6()));
}

#[tokio::test]
async fn connect_scan_against_loopback() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open_port: u16 = listener.local_addr().unwrap().port();
    let accept = tokio::spawn(async move {
        let _ = listener.accept().await;
    });

    let request = ScanRequest::new("127.0.0.1", "TCP Connect").with_ports(open_port.to_string());
    let results = port_results(run(&ScriptedFactory::silent(), request, fast_config()).await.unwrap());
    assert_eq!(results[0].port, open_port);
    assert_eq!(results[0].status, PortStatus::Open);
    assert!(results[0].latency_ms.is_some());
    accept.abort();
}

#[tokio::test]
async fn connect_scan_needs_no_privileges() {
    let request = ScanRequest::new("127.0.0.1", "TCP Connect").with_ports("1");
    let factory = ScriptedFactory::silent().unprivileged();
    let results = port_results(run(&factory, request, fast_config()).await.unwrap());
    assert_eq!(results.len(), 1);
    assert!(factory.sent().is_empty());
}

#[tokio::test]
async fn deadline_returns_partial_results_in_order() {
    let factory = ScriptedFactory::new(|probe| {
        std::thread::sleep(Duration::from_millis(30));
        Ok(Some(scripted::tcp_answer(probe, flags::RST_ACK, 0)))
    });
    let control = Arc::new(ScanControl::new(Arc::new(AtomicBool::new(false)), Some(Duration::from_millis(200))));
    let request = ScanRequest::new("198.51.100.20", "TCP SYN").with_ports("1-1000");
    let report = Runner::new(Arc::new(factory), fast_config())
        .run_request(&request, control)
        .await
        .unwrap();

    let results = port_results(report);
    assert!(!results.is_empty());
    assert!(results.len() < 1000);
    assert!(results.windows(2).all(|w| w[0].port < w[1].port));
}

#[tokio::test]
async fn target_is_the_probed_address() {
    let factory = web_host();
    let request = ScanRequest::new("198.51.100.20", "TCP SYN").with_ports("22");
    run(&factory, request, fast_config()).await.unwrap();
    assert!(factory.sent().iter().all(|p| p.target == TARGET && p.spoofed_source.is_none()));
}
