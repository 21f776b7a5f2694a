//! A single outgoing probe: what to send, to whom, and from which address.
//!
//! Probes are built per family on demand because TCP/UDP/ICMPv6 checksums
//! depend on the source address the transport routes through.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ops::RangeInclusive;

use anyhow::bail;

use crate::icmp;
use crate::ip::{self, Ipv4Header};
use crate::tcp::{self, TcpHeader, flags};
use crate::udp;

/// Source ports are drawn from this range for raw probes.
pub const EPHEMERAL_PORTS: RangeInclusive<u16> = 40_000..=65_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Tcp(TcpHeader),
    Udp { src_port: u16, dst_port: u16 },
    Echo { identifier: u16, sequence: u16 },
    /// An IP header with the given protocol number and no payload.
    Bare { protocol: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub target: IpAddr,
    pub spoofed_source: Option<IpAddr>,
    pub kind: ProbeKind,
}

impl Probe {
    pub fn tcp(target: IpAddr, dst_port: u16, flag_bits: u8) -> Self {
        let acknowledgement: u32 = if flag_bits & flags::ACK != 0 { rand::random() } else { 0 };
        let header: TcpHeader = TcpHeader {
            src_port: random_source_port(),
            dst_port,
            sequence: rand::random(),
            acknowledgement,
            flags: flag_bits,
            window: tcp::PROBE_WINDOW,
        };
        Self { target, spoofed_source: None, kind: ProbeKind::Tcp(header) }
    }

    pub fn udp(target: IpAddr, dst_port: u16) -> Self {
        let kind: ProbeKind = ProbeKind::Udp { src_port: random_source_port(), dst_port };
        Self { target, spoofed_source: None, kind }
    }

    pub fn echo(target: IpAddr) -> Self {
        let kind: ProbeKind = ProbeKind::Echo { identifier: rand::random(), sequence: 1 };
        Self { target, spoofed_source: None, kind }
    }

    pub fn bare(target: IpAddr, protocol: u8) -> Self {
        Self { target, spoofed_source: None, kind: ProbeKind::Bare { protocol } }
    }

    /// Sends the probe with `source` written into the IP header instead of
    /// the routed local address.
    pub fn spoofed_from(mut self, source: IpAddr) -> Self {
        self.spoofed_source = Some(source);
        self
    }

    pub fn is_ipv6(&self) -> bool {
        self.target.is_ipv6()
    }

    /// Protocol number carried in the IPv4 protocol / IPv6 next-header field.
    pub fn protocol(&self) -> u8 {
        match self.kind {
            ProbeKind::Tcp(_) => tcp::PROTOCOL_NUMBER,
            ProbeKind::Udp { .. } => udp::PROTOCOL_NUMBER,
            ProbeKind::Echo { .. } if self.is_ipv6() => icmp::PROTOCOL_NUMBER_V6,
            ProbeKind::Echo { .. } => icmp::PROTOCOL_NUMBER_V4,
            ProbeKind::Bare { protocol } => protocol,
        }
    }

    pub fn ports(&self) -> Option<(u16, u16)> {
        match self.kind {
            ProbeKind::Tcp(header) => Some((header.src_port, header.dst_port)),
            ProbeKind::Udp { src_port, dst_port } => Some((src_port, dst_port)),
            _ => None,
        }
    }

    pub fn source_or(&self, routed: IpAddr) -> IpAddr {
        self.spoofed_source.unwrap_or(routed)
    }

    /// The bytes following the IP header.
    pub fn transport_payload(&self, source: IpAddr) -> anyhow::Result<Vec<u8>> {
        let src_addr: IpAddr = self.source_or(source);
        match (self.kind, src_addr, self.target) {
            (ProbeKind::Tcp(header), _, _) => tcp::create_segment(&header, src_addr, self.target),
            (ProbeKind::Udp { src_port, dst_port }, _, _) => {
                udp::create_datagram(src_port, dst_port, &[], src_addr, self.target)
            }
            (ProbeKind::Echo { identifier, sequence }, _, IpAddr::V4(_)) => {
                icmp::create_echo_request_v4(identifier, sequence)
            }
            (ProbeKind::Echo { identifier, sequence }, IpAddr::V6(src), IpAddr::V6(dst)) => {
                icmp::create_echo_request_v6(identifier, sequence, src, dst)
            }
            (ProbeKind::Echo { .. }, _, _) => bail!("echo source and target differ in family"),
            (ProbeKind::Bare { .. }, _, _) => Ok(Vec::new()),
        }
    }

    /// Full IPv4 packet, header included.
    pub fn ipv4_packet(&self, routed: Ipv4Addr) -> anyhow::Result<Vec<u8>> {
        let (src_addr, dst_addr): (Ipv4Addr, Ipv4Addr) =
            match (self.source_or(IpAddr::V4(routed)), self.target) {
                (IpAddr::V4(src), IpAddr::V4(dst)) => (src, dst),
                _ => bail!("ipv4 packet requested for non-ipv4 probe to {}", self.target),
            };
        let payload: Vec<u8> = self.transport_payload(IpAddr::V4(src_addr))?;
        let header: Ipv4Header = Ipv4Header::new(src_addr, dst_addr, self.protocol());
        ip::create_ipv4_packet(&header, &payload)
    }

    /// Full IPv6 packet, header included. Used where the kernel does not build
    /// the header for us (spoofed sends framed at layer 2).
    pub fn ipv6_packet(&self, routed: Ipv6Addr) -> anyhow::Result<Vec<u8>> {
        let (src_addr, dst_addr): (Ipv6Addr, Ipv6Addr) =
            match (self.source_or(IpAddr::V6(routed)), self.target) {
                (IpAddr::V6(src), IpAddr::V6(dst)) => (src, dst),
                _ => bail!("ipv6 packet requested for non-ipv6 probe to {}", self.target),
            };
        let payload: Vec<u8> = self.transport_payload(IpAddr::V6(src_addr))?;
        ip::create_ipv6_packet(src_addr, dst_addr, self.protocol(), ip::DEFAULT_TTL, &payload)
    }

    /// RST that tears down a half-open connection this SYN probe provoked.
    pub fn reset(&self) -> Option<Probe> {
        let ProbeKind::Tcp(header) = self.kind else {
            return None;
        };
        let rst: TcpHeader = TcpHeader {
            sequence: header.sequence.wrapping_add(1),
            acknowledgement: 0,
            flags: flags::RST,
            ..header
        };
        Some(Probe { kind: ProbeKind::Tcp(rst), ..*self })
    }
}

fn random_source_port() -> u16 {
    rand::random_range(EPHEMERAL_PORTS)
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
    use crate::checksum;
    use pnet::packet::Packet;
    use pnet::packet::ipv4::Ipv4Packet;
    use pnet::packet::ipv6::Ipv6Packet;
    use pnet::packet::tcp::TcpPacket;

    const TARGET_V4: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));
    const LOCAL_V4: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);

    #[test]
    fn tcp_probe_uses_ephemeral_source_port() {
        for _ in 0..32 {
            let probe = Probe::tcp(TARGET_V4, 80, flags::SYN);
            let (src, dst) = probe.ports().unwrap();
            assert!(EPHEMERAL_PORTS.contains(&src));
            assert_eq!(dst, 80);
        }
    }

    #[test]
    fn ipv4_packet_carries_valid_segment() {
        let probe = Probe::tcp(TARGET_V4, 22, flags::SYN);
        let packet = probe.ipv4_packet(LOCAL_V4).unwrap();

        let ip = Ipv4Packet::new(&packet).unwrap();
        assert_eq!(ip.get_source(), LOCAL_V4);
        assert_eq!(ip.get_next_level_protocol().0, 6);
        assert_eq!(checksum::internet_checksum(&packet[..20]), 0);

        let segment = ip.payload();
        let sum = checksum::pseudo_header_sum(LOCAL_V4.into(), TARGET_V4, 6, segment.len());
        assert_eq!(checksum::finalize(checksum::ones_complement_sum(segment, sum)), 0);
        assert_eq!(TcpPacket::new(segment).unwrap().get_flags(), flags::SYN);
    }

    #[test]
    fn spoofed_source_replaces_routed_address() {
        let zombie: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 99));
        let probe = Probe::tcp(TARGET_V4, 443, flags::SYN).spoofed_from(zombie);
        let packet = probe.ipv4_packet(LOCAL_V4).unwrap();
        let ip = Ipv4Packet::new(&packet).unwrap();
        assert_eq!(IpAddr::V4(ip.get_source()), zombie);
    }

    #[test]
    fn bare_probe_is_header_only() {
        let probe = Probe::bare(TARGET_V4, 103);
        let packet = probe.ipv4_packet(LOCAL_V4).unwrap();
        assert_eq!(packet.len(), ip::IPV4_HDR_LEN);
        assert_eq!(Ipv4Packet::new(&packet).unwrap().get_next_level_protocol().0, 103);
    }

    #[test]
    fn echo_protocol_follows_family() {
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        assert_eq!(Probe::echo(TARGET_V4).protocol(), 1);
        assert_eq!(Probe::echo(v6).protocol(), 58);
    }

    #[test]
    fn ipv6_packet_for_ipv4_probe_fails() {
        let probe = Probe::udp(TARGET_V4, 53);
        assert!(probe.ipv6_packet(Ipv6Addr::LOCALHOST).is_err());
    }

    #[test]
    fn ipv6_packet_sets_next_header() {
        let target: IpAddr = "2001:db8::2".parse().unwrap();
        let probe = Probe::udp(target, 161);
        let packet = probe.ipv6_packet("2001:db8::1".parse().unwrap()).unwrap();
        let ip = Ipv6Packet::new(&packet).unwrap();
        assert_eq!(ip.get_next_header().0, 17);
        assert_eq!(ip.get_payload_length(), 8);
    }

    #[test]
    fn reset_follows_syn_sequence() {
        let probe = Probe::tcp(TARGET_V4, 80, flags::SYN);
        let rst = probe.reset().unwrap();
        let (ProbeKind::Tcp(syn), ProbeKind::Tcp(reset)) = (probe.kind, rst.kind) else {
            panic!("expected tcp probes");
        };
        assert_eq!(reset.flags, flags::RST);
        assert_eq!(reset.sequence, syn.sequence.wrapping_add(1));
        assert_eq!((reset.src_port, reset.dst_port), (syn.src_port, syn.dst_port));
        assert!(Probe::udp(TARGET_V4, 53).reset().is_none());
    }
}
