//! The closed set of probing techniques a scan request can name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Technique {
    #[serde(rename = "TCP Connect")]
    Connect,
    #[serde(rename = "TCP SYN")]
    Syn,
    #[serde(rename = "TCP FIN")]
    Fin,
    #[serde(rename = "TCP Xmas")]
    Xmas,
    #[serde(rename = "TCP Null")]
    Null,
    #[serde(rename = "TCP ACK")]
    Ack,
    #[serde(rename = "TCP Window")]
    Window,
    #[serde(rename = "UDP")]
    Udp,
    #[serde(rename = "Idle")]
    Idle,
    #[serde(rename = "OS-Detection")]
    OsFingerprint,
    #[serde(rename = "IP Protocol Scan")]
    ProtocolSweep,
}

impl Technique {
    pub const ALL: [Technique; 11] = [
        Technique::Connect,
        Technique::Syn,
        Technique::Fin,
        Technique::Xmas,
        Technique::Null,
        Technique::Ack,
        Technique::Window,
        Technique::Udp,
        Technique::Idle,
        Technique::OsFingerprint,
        Technique::ProtocolSweep,
    ];

    /// The name used on the wire (`scan_type`).
    pub fn name(self) -> &'static str {
        match self {
            Technique::Connect => "TCP Connect",
            Technique::Syn => "TCP SYN",
            Technique::Fin => "TCP FIN",
            Technique::Xmas => "TCP Xmas",
            Technique::Null => "TCP Null",
            Technique::Ack => "TCP ACK",
            Technique::Window => "TCP Window",
            Technique::Udp => "UDP",
            Technique::Idle => "Idle",
            Technique::OsFingerprint => "OS-Detection",
            Technique::ProtocolSweep => "IP Protocol Scan",
        }
    }

    /// Host-level techniques run once per target and take no port list.
    pub fn is_host_level(self) -> bool {
        matches!(self, Technique::OsFingerprint | Technique::ProtocolSweep)
    }

    /// Everything except the full handshake needs a raw socket.
    pub fn requires_raw_socket(self) -> bool {
        !matches!(self, Technique::Connect)
    }

    /// Returns `true` if `name` belongs to a host-level technique.
    ///
    /// Unknown names count as port-level.
    pub fn is_host_level_name(name: &str) -> bool {
        name.parse::<Technique>()
            .map(Technique::is_host_level)
            .unwrap_or(false)
    }
}

impl FromStr for Technique {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Technique::ALL
            .into_iter()
            .find(|technique| technique.name() == s)
            .ok_or_else(|| format!("unknown scan type: {s}"))
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
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
