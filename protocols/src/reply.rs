//! Parsing of captured packets and matching them back to the probe that
//! provoked them.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ipv4::{Ipv4Flags, Ipv4Packet};
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::tcp::TcpPacket;
use pnet::packet::udp::UdpPacket;
use pnet::packet::Packet;
use pnet::util::MacAddr;

use crate::icmp::{self, codes, types};
use crate::ip::{IPV4_HDR_LEN, IPV6_HDR_LEN};
use crate::probe::{Probe, ProbeKind};
use crate::{tcp, udp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpReply {
    pub src_port: u16,
    pub dst_port: u16,
    pub flags: u8,
    pub window: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpReply {
    pub src_port: u16,
    pub dst_port: u16,
}

/// The original header quoted inside an ICMP error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quoted {
    pub protocol: u8,
    pub destination: IpAddr,
    pub ports: Option<(u16, u16)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpReply {
    pub v6: bool,
    pub icmp_type: u8,
    pub code: u8,
    pub echo_identifier: Option<u16>,
    pub quoted: Option<Quoted>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyLayer {
    Tcp(TcpReply),
    Udp(UdpReply),
    Icmp(IcmpReply),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub source: IpAddr,
    pub destination: IpAddr,
    pub protocol: u8,
    /// TTL for IPv4, hop limit for IPv6.
    pub ttl: u8,
    /// IPv4 identification. Absent for IPv6.
    pub ip_id: Option<u16>,
    /// IPv6 traffic class. Absent for IPv4.
    pub traffic_class: Option<u8>,
    pub dont_fragment: bool,
    pub layer: ReplyLayer,
}

/// A reply captured at layer 2 together with its link addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedFrame {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub reply: Reply,
}

impl IcmpReply {
    pub fn is_echo_reply(&self) -> bool {
        match self.v6 {
            true => self.icmp_type == types::ECHO_REPLY_V6,
            false => self.icmp_type == types::ECHO_REPLY_V4,
        }
    }

    pub fn is_destination_unreachable(&self) -> bool {
        match self.v6 {
            true => self.icmp_type == types::DEST_UNREACHABLE_V6,
            false => self.icmp_type == types::DEST_UNREACHABLE_V4,
        }
    }

    pub fn is_port_unreachable(&self) -> bool {
        let code: u8 = if self.v6 { codes::PORT_UNREACHABLE_V6 } else { codes::PORT_UNREACHABLE_V4 };
        self.is_destination_unreachable() && self.code == code
    }

    /// ICMP protocol unreachable, or the ICMPv6 parameter problem
    /// "unrecognized next header" that plays the same role.
    pub fn is_protocol_unreachable(&self) -> bool {
        match self.v6 {
            true => {
                self.icmp_type == types::PARAMETER_PROBLEM_V6
                    && self.code == codes::UNRECOGNIZED_NEXT_HEADER_V6
            }
            false => self.is_destination_unreachable() && self.code == codes::PROTOCOL_UNREACHABLE_V4,
        }
    }

    pub fn is_error(&self) -> bool {
        is_error_type(self.icmp_type, self.v6)
    }
}

impl Quoted {
    fn matches(&self, probe: &Probe) -> bool {
        if self.destination != probe.target || self.protocol != probe.protocol() {
            return false;
        }
        match (self.ports, probe.ports()) {
            (Some(quoted), Some(sent)) => quoted == sent,
            _ => true,
        }
    }
}

impl Reply {
    pub fn tcp(&self) -> Option<&TcpReply> {
        match &self.layer {
            ReplyLayer::Tcp(tcp) => Some(tcp),
            _ => None,
        }
    }

    pub fn udp(&self) -> Option<&UdpReply> {
        match &self.layer {
            ReplyLayer::Udp(udp) => Some(udp),
            _ => None,
        }
    }

    pub fn icmp(&self) -> Option<&IcmpReply> {
        match &self.layer {
            ReplyLayer::Icmp(icmp) => Some(icmp),
            _ => None,
        }
    }

    /// Whether this packet is a response to `probe`.
    ///
    /// ICMP errors may come from any router on the path, so they match on the
    /// quoted header alone. Everything else must come from the probe target.
    pub fn answers(&self, probe: &Probe) -> bool {
        if let Some(quoted) = self.icmp().and_then(|icmp| icmp.quoted) {
            return quoted.matches(probe);
        }
        if self.source != probe.target {
            return false;
        }
        match (probe.kind, self.layer) {
            (ProbeKind::Tcp(sent), ReplyLayer::Tcp(got)) => {
                got.src_port == sent.dst_port && got.dst_port == sent.src_port
            }
            (ProbeKind::Udp { src_port, dst_port }, ReplyLayer::Udp(got)) => {
                got.src_port == dst_port && got.dst_port == src_port
            }
            (ProbeKind::Echo { identifier, .. }, ReplyLayer::Icmp(got)) => {
                got.is_echo_reply() && got.echo_identifier == Some(identifier)
            }
            (ProbeKind::Bare { protocol }, _) => self.protocol == protocol,
            _ => false,
        }
    }
}

/// Parses an IPv4 packet as delivered by a layer-3 channel.
pub fn parse_ipv4(packet: &[u8]) -> Option<Reply> {
    let ip: Ipv4Packet = Ipv4Packet::new(packet)?;
    if ip.get_version() != 4 {
        return None;
    }
    let header_len: usize = usize::from(ip.get_header_length()) * 4;
    if header_len < IPV4_HDR_LEN || packet.len() < header_len {
        return None;
    }
    // Some stacks rewrite total length on raw delivery; trust the buffer then.
    let total_len: usize = usize::from(ip.get_total_length());
    let end: usize = if (header_len..=packet.len()).contains(&total_len) { total_len } else { packet.len() };
    let protocol: u8 = ip.get_next_level_protocol().0;

    Some(Reply {
        source: IpAddr::V4(ip.get_source()),
        destination: IpAddr::V4(ip.get_destination()),
        protocol,
        ttl: ip.get_ttl(),
        ip_id: Some(ip.get_identification()),
        traffic_class: None,
        dont_fragment: ip.get_flags() & Ipv4Flags::DontFragment != 0,
        layer: parse_layer(protocol, &packet[header_len..end], false),
    })
}

/// Parses an IPv6 packet. Extension headers are not walked.
pub fn parse_ipv6(packet: &[u8]) -> Option<Reply> {
    let ip: Ipv6Packet = Ipv6Packet::new(packet)?;
    if ip.get_version() != 6 {
        return None;
    }
    let payload_len: usize = usize::from(ip.get_payload_length());
    let end: usize = (IPV6_HDR_LEN + payload_len).min(packet.len());
    let protocol: u8 = ip.get_next_header().0;

    Some(Reply {
        source: IpAddr::V6(ip.get_source()),
        destination: IpAddr::V6(ip.get_destination()),
        protocol,
        ttl: ip.get_hop_limit(),
        ip_id: None,
        traffic_class: Some(ip.get_traffic_class()),
        dont_fragment: false,
        layer: parse_layer(protocol, &packet[IPV6_HDR_LEN..end], true),
    })
}

/// Parses an Ethernet II frame carrying IPv4 or IPv6.
pub fn parse_ethernet(frame: &[u8]) -> Option<CapturedFrame> {
    let eth: EthernetPacket = EthernetPacket::new(frame)?;
    let reply: Reply = match eth.get_ethertype() {
        EtherTypes::Ipv4 => parse_ipv4(eth.payload())?,
        EtherTypes::Ipv6 => parse_ipv6(eth.payload())?,
        _ => return None,
    };
    Some(CapturedFrame { src_mac: eth.get_source(), dst_mac: eth.get_destination(), reply })
}

fn parse_layer(protocol: u8, payload: &[u8], v6: bool) -> ReplyLayer {
    match protocol {
        tcp::PROTOCOL_NUMBER => TcpPacket::new(payload)
            .map(|tcp| {
                ReplyLayer::Tcp(TcpReply {
                    src_port: tcp.get_source(),
                    dst_port: tcp.get_destination(),
                    flags: tcp.get_flags(),
                    window: tcp.get_window(),
                })
            })
            .unwrap_or(ReplyLayer::Other),
        udp::PROTOCOL_NUMBER => UdpPacket::new(payload)
            .map(|udp| {
                ReplyLayer::Udp(UdpReply { src_port: udp.get_source(), dst_port: udp.get_destination() })
            })
            .unwrap_or(ReplyLayer::Other),
        icmp::PROTOCOL_NUMBER_V4 if !v6 => parse_icmp(payload, false),
        icmp::PROTOCOL_NUMBER_V6 if v6 => parse_icmp(payload, true),
        _ => ReplyLayer::Other,
    }
}

fn parse_icmp(message: &[u8], v6: bool) -> ReplyLayer {
    if message.len() < 8 {
        return ReplyLayer::Other;
    }
    let icmp_type: u8 = message[0];
    let code: u8 = message[1];
    let echo_reply: u8 = if v6 { types::ECHO_REPLY_V6 } else { types::ECHO_REPLY_V4 };
    let echo_identifier: Option<u16> =
        (icmp_type == echo_reply).then(|| u16::from_be_bytes([message[4], message[5]]));
    let quoted: Option<Quoted> = match is_error_type(icmp_type, v6) {
        true if v6 => parse_quoted_v6(&message[8..]),
        true => parse_quoted_v4(&message[8..]),
        false => None,
    };
    ReplyLayer::Icmp(IcmpReply { v6, icmp_type, code, echo_identifier, quoted })
}

fn is_error_type(icmp_type: u8, v6: bool) -> bool {
    match v6 {
        // unreachable, packet too big, time exceeded, parameter problem
        true => (1..=4).contains(&icmp_type),
        // unreachable, source quench, redirect, time exceeded, parameter problem
        false => matches!(icmp_type, 3 | 4 | 5 | 11 | 12),
    }
}

fn parse_quoted_v4(bytes: &[u8]) -> Option<Quoted> {
    if bytes.len() < IPV4_HDR_LEN || bytes[0] >> 4 != 4 {
        return None;
    }
    let header_len: usize = usize::from(bytes[0] & 0x0f) * 4;
    let protocol: u8 = bytes[9];
    let destination: Ipv4Addr = Ipv4Addr::new(bytes[16], bytes[17], bytes[18], bytes[19]);
    Some(Quoted {
        protocol,
        destination: IpAddr::V4(destination),
        ports: quoted_ports(protocol, bytes.get(header_len..)),
    })
}

fn parse_quoted_v6(bytes: &[u8]) -> Option<Quoted> {
    if bytes.len() < IPV6_HDR_LEN || bytes[0] >> 4 != 6 {
        return None;
    }
    let protocol: u8 = bytes[6];
    let mut octets: [u8; 16] = [0u8; 16];
    octets.copy_from_slice(&bytes[24..40]);
    Some(Quoted {
        protocol,
        destination: IpAddr::V6(Ipv6Addr::from(octets)),
        ports: quoted_ports(protocol, bytes.get(IPV6_HDR_LEN..)),
    })
}

fn quoted_ports(protocol: u8, transport: Option<&[u8]>) -> Option<(u16, u16)> {
    if protocol != tcp::PROTOCOL_NUMBER && protocol != udp::PROTOCOL_NUMBER {
        return None;
    }
    match transport {
        Some(t) if t.len() >= 4 => Some((
            u16::from_be_bytes([t[0], t[1]]),
            u16::from_be_bytes([t[2], t[3]]),
        )),
        _ => None,
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
