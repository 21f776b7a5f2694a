//! Single-packet TCP and UDP techniques: send once, classify whatever comes
//! back (or doesn't) against the technique's rulebook.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use netprobe_common::error::ProbeError;
use netprobe_common::results::{PortResult, PortStatus};
use netprobe_common::technique::Technique;
use netprobe_protocols::probe::Probe;
use netprobe_protocols::reply::{Reply, TcpReply};
use netprobe_protocols::tcp::{describe_flags, flags};
use tracing::debug;

use crate::network::transport::{Transport, TransportFactory};

/// Flags of the single segment each TCP technique sends.
pub fn tcp_flags(technique: Technique) -> Option<u8> {
    match technique {
        Technique::Syn => Some(flags::SYN),
        Technique::Fin => Some(flags::FIN),
        Technique::Xmas => Some(flags::XMAS),
        Technique::Null => Some(flags::NONE),
        Technique::Ack | Technique::Window => Some(flags::ACK),
        _ => None,
    }
}

pub fn build_probe(technique: Technique, target: IpAddr, port: u16) -> Option<Probe> {
    match technique {
        Technique::Udp => Some(Probe::udp(target, port)),
        _ => tcp_flags(technique).map(|bits| Probe::tcp(target, port, bits)),
    }
}

pub fn probe(
    factory: &dyn TransportFactory,
    technique: Technique,
    target: IpAddr,
    port: u16,
    wait: Duration,
) -> PortResult {
    run(factory, technique, target, port, wait).unwrap_or_else(|e| {
        debug!("{technique} probe of {target}:{port} failed: {e}");
        PortResult::error(port, e.to_string())
    })
}

fn run(
    factory: &dyn TransportFactory,
    technique: Technique,
    target: IpAddr,
    port: u16,
    wait: Duration,
) -> Result<PortResult, ProbeError> {
    let probe: Probe = build_probe(technique, target, port)
        .ok_or_else(|| ProbeError::Packet(format!("{technique} has no single-packet probe")))?;
    let mut transport: Box<dyn Transport> = factory.open(target, probe.protocol())?;

    let started: Instant = Instant::now();
    let reply: Option<Reply> = transport.exchange(&probe, wait)?;
    let elapsed: Duration = started.elapsed();

    let status: PortStatus = classify(technique, reply.as_ref());
    debug!("{technique} {target}:{port} -> {status} ({})", describe_reply(reply.as_ref()));

    if technique == Technique::Syn && status == PortStatus::Open {
        teardown(transport.as_mut(), &probe);
    }

    let result: PortResult = PortResult::new(port, status);
    Ok(match reply {
        Some(_) => result.with_latency(elapsed),
        None => result,
    })
}

/// Answers a SYN+ACK with RST so the target does not keep a half-open
/// connection. Failure only costs the target some memory.
pub fn teardown(transport: &mut dyn Transport, syn: &Probe) {
    if let Some(rst) = syn.reset()
        && let Err(e) = transport.send(&rst)
    {
        debug!("Teardown RST to {} failed: {e}", syn.target);
    }
}

/// Maps a reply (or its absence) to a port status.
pub fn classify(technique: Technique, reply: Option<&Reply>) -> PortStatus {
    let Some(reply) = reply else {
        return match technique {
            Technique::Fin | Technique::Xmas | Technique::Null | Technique::Udp => PortStatus::OpenFiltered,
            _ => PortStatus::Filtered,
        };
    };

    if let Some(segment) = reply.tcp() {
        return classify_segment(technique, segment);
    }
    if technique == Technique::Udp {
        if reply.udp().is_some() {
            return PortStatus::Open;
        }
        if reply.icmp().is_some_and(|icmp| icmp.is_port_unreachable()) {
            return PortStatus::Closed;
        }
    }
    PortStatus::Filtered
}

/// One-line summary of what came back, for logs.
fn describe_reply(reply: Option<&Reply>) -> String {
    let Some(reply) = reply else {
        return String::from("no reply");
    };
    if let Some(segment) = reply.tcp() {
        return format!("{} window {}", describe_flags(segment.flags), segment.window);
    }
    match reply.icmp() {
        Some(icmp) if icmp.is_error() => format!("ICMP error {}/{}", icmp.icmp_type, icmp.code),
        Some(icmp) => format!("ICMP type {}", icmp.icmp_type),
        None if reply.udp().is_some() => String::from("UDP datagram"),
        None => format!("protocol {}", reply.protocol),
    }
}

fn classify_segment(technique: Technique, segment: &TcpReply) -> PortStatus {
    let rst: bool = segment.flags & flags::RST != 0;
    match technique {
        Technique::Syn if segment.flags & flags::SYN_ACK == flags::SYN_ACK && !rst => PortStatus::Open,
        Technique::Syn | Technique::Fin | Technique::Xmas | Technique::Null if rst => PortStatus::Closed,
        Technique::Ack if rst => PortStatus::Unfiltered,
        Technique::Window if rst && segment.window > 0 => PortStatus::Open,
        Technique::Window if rst => PortStatus::Closed,
        _ => PortStatus::Filtered,
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
