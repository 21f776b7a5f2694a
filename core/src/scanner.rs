//! The closed set of concrete scanners and the per-probe entry points the
//! runner dispatches to.
//!
//! Port-level scanners turn one `(target, port)` pair into a [`PortResult`];
//! host-level scanners run once per target and produce a [`HostResult`].
//! Probe failures never escape as errors here: they are folded into an
//! `Error` entry so one bad port cannot sink the batch.

use std::net::IpAddr;

use netprobe_common::config::Config;
use netprobe_common::results::{HostResult, PortResult};
use netprobe_common::technique::Technique;

use crate::network::transport::TransportFactory;
use crate::runner::ScanControl;

pub mod idle;
pub mod os;
pub mod resolver;
pub mod stateless;
pub mod sweep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scanner {
    Connect,
    Syn,
    Fin,
    Xmas,
    Null,
    Ack,
    Window,
    Udp,
    Idle { zombie: IpAddr },
    OsFingerprint,
    ProtocolSweep,
}

/// A validated request, built once by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfiguration {
    pub target: IpAddr,
    /// Ascending and unique. Empty for host-level scanners.
    pub ports: Vec<u16>,
    pub scanner: Scanner,
}

impl Scanner {
    /// `zombie` is only consulted for [`Technique::Idle`], where it is required.
    pub fn from_technique(technique: Technique, zombie: Option<IpAddr>) -> Option<Self> {
        let scanner: Scanner = match technique {
            Technique::Connect => Scanner::Connect,
            Technique::Syn => Scanner::Syn,
            Technique::Fin => Scanner::Fin,
            Technique::Xmas => Scanner::Xmas,
            Technique::Null => Scanner::Null,
            Technique::Ack => Scanner::Ack,
            Technique::Window => Scanner::Window,
            Technique::Udp => Scanner::Udp,
            Technique::Idle => Scanner::Idle { zombie: zombie? },
            Technique::OsFingerprint => Scanner::OsFingerprint,
            Technique::ProtocolSweep => Scanner::ProtocolSweep,
        };
        Some(scanner)
    }

    pub fn technique(&self) -> Technique {
        match self {
            Scanner::Connect => Technique::Connect,
            Scanner::Syn => Technique::Syn,
            Scanner::Fin => Technique::Fin,
            Scanner::Xmas => Technique::Xmas,
            Scanner::Null => Technique::Null,
            Scanner::Ack => Technique::Ack,
            Scanner::Window => Technique::Window,
            Scanner::Udp => Technique::Udp,
            Scanner::Idle { .. } => Technique::Idle,
            Scanner::OsFingerprint => Technique::OsFingerprint,
            Scanner::ProtocolSweep => Technique::ProtocolSweep,
        }
    }

    pub fn is_host_level(&self) -> bool {
        self.technique().is_host_level()
    }

    pub fn requires_raw_socket(&self) -> bool {
        self.technique().requires_raw_socket()
    }
}

/// Runs one raw port probe to completion. Blocks the calling thread.
pub fn probe_port(
    factory: &dyn TransportFactory,
    scanner: Scanner,
    target: IpAddr,
    port: u16,
    config: &Config,
) -> PortResult {
    let technique: Technique = scanner.technique();
    match scanner {
        Scanner::Idle { zombie } => idle::probe(factory, zombie, target, port, config),
        Scanner::Syn
        | Scanner::Fin
        | Scanner::Xmas
        | Scanner::Null
        | Scanner::Ack
        | Scanner::Window
        | Scanner::Udp => stateless::probe(factory, technique, target, port, config.timeout_for(technique)),
        Scanner::Connect | Scanner::OsFingerprint | Scanner::ProtocolSweep => {
            PortResult::error(port, format!("{technique} does not use raw port probes"))
        }
    }
}

/// Runs a host-level scanner once against `target`. Blocks the calling thread.
pub fn probe_host(
    factory: &dyn TransportFactory,
    scanner: Scanner,
    target: IpAddr,
    config: &Config,
    control: &ScanControl,
) -> HostResult {
    match scanner {
        Scanner::ProtocolSweep => sweep::sweep(factory, target, config, control),
        _ => os::fingerprint(factory, target, config),
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn every_technique_maps_back_to_itself() {
        let zombie = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)));
        for technique in Technique::ALL {
            let scanner = Scanner::from_technique(technique, zombie).unwrap();
            assert_eq!(scanner.technique(), technique);
            assert_eq!(scanner.is_host_level(), technique.is_host_level());
        }
    }

    #[test]
    fn idle_requires_a_zombie() {
        assert!(Scanner::from_technique(Technique::Idle, None).is_none());
        assert_eq!(Scanner::from_technique(Technique::Udp, None), Some(Scanner::Udp));
    }

    #[test]
    fn only_connect_runs_unprivileged() {
        assert!(!Scanner::Connect.requires_raw_socket());
        assert!(Scanner::Window.requires_raw_socket());
        assert!(Scanner::ProtocolSweep.requires_raw_socket());
    }
}
