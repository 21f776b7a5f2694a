//! Idle (zombie) scanning.
//!
//! The target is never contacted from our address. Instead we watch a
//! zombie's IP identifier: a SYN spoofed from the zombie makes an open
//! target answer the zombie with SYN+ACK, the zombie replies RST, and its
//! identifier advances once more than it would have otherwise.
//!
//! IPv6 has no identifier in the base header. The traffic class is sampled
//! in its place, which rarely moves; IPv6 results are best-effort.

use std::fmt;
use std::net::IpAddr;
use std::thread;

use netprobe_common::config::Config;
use netprobe_common::error::ProbeError;
use netprobe_common::results::{PortResult, PortStatus};
use netprobe_protocols::probe::Probe;
use netprobe_protocols::reply::Reply;
use netprobe_protocols::tcp::{self, flags};
use tracing::{debug, warn};

use crate::network::transport::{Transport, TransportFactory};

/// Zombie port the baseline SYN+ACK is sent to.
pub const ZOMBIE_PORT: u16 = 80;

pub const ZOMBIE_NOT_RESPONDING: &str = "zombie not responding";
pub const ZOMBIE_STOPPED_RESPONDING: &str = "zombie stopped responding";

/// One reading of the zombie's counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZombieSample {
    Ipv4Id(u16),
    /// Approximate.
    TrafficClass(u8),
}

impl ZombieSample {
    fn from_reply(reply: &Reply) -> Option<Self> {
        reply
            .ip_id
            .map(ZombieSample::Ipv4Id)
            .or_else(|| reply.traffic_class.map(ZombieSample::TrafficClass))
    }
}

impl fmt::Display for ZombieSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZombieSample::Ipv4Id(id) => write!(f, "IP ID {id}"),
            ZombieSample::TrafficClass(tc) => write!(f, "traffic class {tc}"),
        }
    }
}

/// Before/after pair around the spoofed probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZombieObservation {
    pub before: ZombieSample,
    pub after: ZombieSample,
}

impl ZombieObservation {
    /// Signed counter advance. A counter that went backwards (random IDs, a
    /// rebooted zombie) yields a negative delta.
    pub fn delta(&self) -> Option<i32> {
        match (self.before, self.after) {
            (ZombieSample::Ipv4Id(a), ZombieSample::Ipv4Id(b)) => Some(i32::from(b) - i32::from(a)),
            (ZombieSample::TrafficClass(a), ZombieSample::TrafficClass(b)) => Some(i32::from(b) - i32::from(a)),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<PortStatus> {
        self.delta().map(classify_delta)
    }

    pub fn describe(&self) -> String {
        let delta: String = self.delta().map_or_else(|| String::from("n/a"), |d| d.to_string());
        format!("zombie {} -> {} (delta {delta})", self.before, self.after)
    }
}

/// More than one step means the zombie sent something on our behalf.
pub fn classify_delta(delta: i32) -> PortStatus {
    if delta > 1 { PortStatus::Open } else { PortStatus::ClosedFiltered }
}

pub fn probe(
    factory: &dyn TransportFactory,
    zombie: IpAddr,
    target: IpAddr,
    port: u16,
    config: &Config,
) -> PortResult {
    if zombie.is_ipv6() {
        warn!("IPv6 idle scan samples traffic class; results are unreliable");
    }
    let mut transport: Box<dyn Transport> = match factory.open(zombie, tcp::PROTOCOL_NUMBER) {
        Ok(transport) => transport,
        Err(e) => return PortResult::error(port, e.to_string()),
    };

    let before: ZombieSample = match sample(transport.as_mut(), zombie, config) {
        Ok(Some(sample)) => sample,
        Ok(None) => return PortResult::error(port, ZOMBIE_NOT_RESPONDING),
        Err(e) => return PortResult::error(port, format!("{ZOMBIE_NOT_RESPONDING}: {e}")),
    };

    let spoofed: Probe = Probe::tcp(target, port, flags::SYN).spoofed_from(zombie);
    if let Err(e) = transport.send(&spoofed) {
        return PortResult::error(port, e.to_string());
    }
    thread::sleep(config.idle_settle);

    let after: ZombieSample = match sample(transport.as_mut(), zombie, config) {
        Ok(Some(sample)) => sample,
        Ok(None) => return PortResult::error(port, ZOMBIE_STOPPED_RESPONDING),
        Err(e) => return PortResult::error(port, format!("{ZOMBIE_STOPPED_RESPONDING}: {e}")),
    };

    let observation: ZombieObservation = ZombieObservation { before, after };
    debug!("Idle {target}:{port} via {zombie}: {}", observation.describe());
    match observation.status() {
        Some(status) => PortResult::new(port, status).with_detail(observation.describe()),
        None => PortResult::error(port, format!("inconsistent zombie samples: {}", observation.describe())),
    }
}

/// Unsolicited SYN+ACK to the zombie; its RST carries the counter.
fn sample(
    transport: &mut dyn Transport,
    zombie: IpAddr,
    config: &Config,
) -> Result<Option<ZombieSample>, ProbeError> {
    let probe: Probe = Probe::tcp(zombie, ZOMBIE_PORT, flags::SYN_ACK);
    let reply: Option<Reply> = transport.exchange(&probe, config.idle_timeout)?;
    Ok(reply
        .filter(|reply| reply.source == zombie)
        .as_ref()
        .and_then(ZombieSample::from_reply))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
