//! IP protocol sweep: one bare IP packet per protocol number, classified by
//! whether the target answers in that protocol, rejects it with an ICMP
//! protocol-unreachable, or stays silent.

use std::net::IpAddr;
use std::thread;
use std::time::{Duration, Instant};

use netprobe_common::config::Config;
use netprobe_common::error::ProbeError;
use netprobe_common::results::{HostResult, ProtocolProbeResult, ProtocolStatus, latency_ms};
use netprobe_protocols::probe::Probe;
use netprobe_protocols::reply::Reply;
use tracing::{debug, info};

use crate::network::transport::{Transport, TransportFactory};
use crate::runner::ScanControl;

/// Protocol numbers probed, in report order.
pub const CATALOG: [u8; 7] = [1, 6, 17, 41, 58, 0, 103];

pub fn protocol_name(protocol: u8) -> String {
    let name: &str = match protocol {
        1 => "ICMP",
        6 => "TCP",
        17 => "UDP",
        41 => "IPv6",
        58 => "ICMPv6",
        other => return format!("Unknown ({other})"),
    };
    String::from(name)
}

pub fn classify(protocol: u8, reply: Option<&Reply>) -> ProtocolStatus {
    let Some(reply) = reply else {
        return ProtocolStatus::OpenFiltered;
    };
    if let Some(icmp) = reply.icmp() {
        if icmp.is_protocol_unreachable() {
            return ProtocolStatus::Closed;
        }
        if icmp.is_destination_unreachable() {
            return ProtocolStatus::Filtered;
        }
    }
    if reply.protocol == protocol {
        ProtocolStatus::Open
    } else {
        ProtocolStatus::OpenFiltered
    }
}

/// Probes every catalog entry in order. Entries are never dropped: a probe
/// that fails becomes an `error` entry. Stops early only when `control`
/// says the scan is over.
pub fn sweep(factory: &dyn TransportFactory, target: IpAddr, config: &Config, control: &ScanControl) -> HostResult {
    info!("Sweeping {} IP protocols on {target}", CATALOG.len());
    let mut protocols: Vec<ProtocolProbeResult> = Vec::with_capacity(CATALOG.len());

    for (idx, protocol) in CATALOG.into_iter().enumerate() {
        if control.is_stopped() {
            debug!("Protocol sweep of {target} stopped after {idx} probes");
            break;
        }
        if idx > 0 {
            thread::sleep(config.sweep_delay);
        }
        protocols.push(probe_protocol(factory, target, protocol, config.sweep_timeout));
        control.record_completed();
    }
    HostResult::Protocols { protocols }
}

pub fn probe_protocol(
    factory: &dyn TransportFactory,
    target: IpAddr,
    protocol: u8,
    wait: Duration,
) -> ProtocolProbeResult {
    let mut result: ProtocolProbeResult = ProtocolProbeResult {
        protocol_number: protocol,
        protocol_name: protocol_name(protocol),
        status: ProtocolStatus::Error,
        latency_ms: None,
        detail: None,
    };
    match exchange(factory, target, protocol, wait) {
        Ok((reply, elapsed)) => {
            result.status = classify(protocol, reply.as_ref());
            result.latency_ms = reply.map(|_| latency_ms(elapsed));
        }
        Err(e) => {
            debug!("Protocol {protocol} probe of {target} failed: {e}");
            result.detail = Some(e.to_string());
        }
    }
    result
}

fn exchange(
    factory: &dyn TransportFactory,
    target: IpAddr,
    protocol: u8,
    wait: Duration,
) -> Result<(Option<Reply>, Duration), ProbeError> {
    let probe: Probe = Probe::bare(target, protocol);
    let mut transport: Box<dyn Transport> = factory.open(target, protocol)?;
    let started: Instant = Instant::now();
    let reply: Option<Reply> = transport.exchange(&probe, wait)?;
    Ok((reply, started.elapsed()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
