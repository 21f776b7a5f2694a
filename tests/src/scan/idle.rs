use std::sync::atomic::{AtomicU16, Ordering};

use netprobe_common::request::ScanRequest;
use netprobe_common::results::PortStatus;
use netprobe_core::network::scripted::{self, ScriptedFactory};
use netprobe_core::scanner::idle::{ZOMBIE_NOT_RESPONDING, ZOMBIE_PORT};
use netprobe_protocols::tcp::flags;

use crate::support::{TARGET, ZOMBIE, fast_config, port_results, run};

/// A quiet zombie with a global IP ID counter. Every RST it sends uses the
/// next identifier, including the one provoked by an open target port.
fn zombie_in_front_of(open_ports: &'static [u16]) -> ScriptedFactory {
    let counter = AtomicU16::new(4000);
    ScriptedFactory::new(move |probe| {
        let Some((_, dst_port)) = probe.ports() else {
            return Ok(None);
        };
        if probe.spoofed_source == Some(ZOMBIE) {
            if probe.target == TARGET && open_ports.contains(&dst_port) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            return Ok(None);
        }
        if probe.target != ZOMBIE {
            return Ok(None);
        }
        let mut reply = scripted::tcp_answer(probe, flags::RST, 0);
        reply.ip_id = Some(counter.fetch_add(1, Ordering::SeqCst));
        Ok(Some(reply))
    })
}

#[tokio::test]
async fn idle_scan_reads_the_zombie_counter() {
    let factory = zombie_in_front_of(&[22, 443]);
    let request = ScanRequest::new("198.51.100.20", "Idle")
        .with_ports("22,80,443")
        .with_zombie("198.51.100.66");
    let results = port_results(run(&factory, request, fast_config()).await.unwrap());

    let statuses: Vec<PortStatus> = results.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![PortStatus::Open, PortStatus::ClosedFiltered, PortStatus::Open]);
    assert!(results[0].detail.as_deref().unwrap().contains("delta 2"));
}

#[tokio::test]
async fn target_only_sees_spoofed_traffic() {
    let factory = zombie_in_front_of(&[]);
    let request = ScanRequest::new("198.51.100.20", "Idle").with_ports("8080").with_zombie("198.51.100.66");
    run(&factory, request, fast_config()).await.unwrap();

    for probe in factory.sent() {
        if probe.target == TARGET {
            assert_eq!(probe.spoofed_source, Some(ZOMBIE));
        } else {
            assert_eq!(probe.target, ZOMBIE);
            assert_eq!(probe.ports().map(|(_, dst)| dst), Some(ZOMBIE_PORT));
        }
    }
}

#[tokio::test]
async fn idle_scan_ignores_requested_parallelism() {
    let factory = zombie_in_front_of(&[2, 4, 6, 8]);
    let mut config = fast_config();
    config.max_parallel = 64;
    let request = ScanRequest::new("198.51.100.20", "Idle").with_ports("1-8").with_zombie("198.51.100.66");
    let results = port_results(run(&factory, request, config).await.unwrap());

    for result in results {
        let expected = if result.port % 2 == 0 { PortStatus::Open } else { PortStatus::ClosedFiltered };
        assert_eq!(result.status, expected, "port {}", result.port);
    }
}

#[tokio::test]
async fn silent_zombie_is_an_error_per_port() {
    let request = ScanRequest::new("198.51.100.20", "Idle").with_ports("22,23").with_zombie("198.51.100.66");
    let results = port_results(run(&ScriptedFactory::silent(), request, fast_config()).await.unwrap());

    assert_eq!(results.len(), 2);
    for result in results {
        assert_eq!(result.status, PortStatus::Error);
        assert_eq!(result.detail.as_deref(), Some(ZOMBIE_NOT_RESPONDING));
    }
}
