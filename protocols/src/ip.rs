use std::net::{Ipv4Addr, Ipv6Addr};

use anyhow::Context;
use pnet::packet::ip::IpNextHeaderProtocol;
use pnet::packet::ipv4::{Ipv4Flags, MutableIpv4Packet};
use pnet::packet::ipv6::MutableIpv6Packet;

use crate::checksum;

pub const IPV4_HDR_LEN: usize = 20;
pub const IPV6_HDR_LEN: usize = 40;
pub const DEFAULT_TTL: u8 = 64;

/// Header fields of an outgoing IPv4 packet.
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Header {
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub protocol: u8,
    pub ttl: u8,
    pub identification: u16,
    pub dont_fragment: bool,
}

impl Ipv4Header {
    pub fn new(src_addr: Ipv4Addr, dst_addr: Ipv4Addr, protocol: u8) -> Self {
        Self {
            src_addr,
            dst_addr,
            protocol,
            ttl: DEFAULT_TTL,
            identification: rand::random(),
            dont_fragment: false,
        }
    }
}

/// Builds a complete IPv4 packet, header checksum included.
pub fn create_ipv4_packet(header: &Ipv4Header, payload: &[u8]) -> anyhow::Result<Vec<u8>> {
    let total_len: usize = IPV4_HDR_LEN + payload.len();
    let total_len_u16: u16 = u16::try_from(total_len).context("ipv4 payload too large")?;
    let mut buffer: Vec<u8> = vec![0u8; total_len];
    {
        let mut ipv4: MutableIpv4Packet =
            MutableIpv4Packet::new(&mut buffer).context("creating ipv4 packet")?;
        ipv4.set_version(4);
        ipv4.set_header_length(5); // 5 x 32 bits, no options
        ipv4.set_dscp(0);
        ipv4.set_ecn(0);
        ipv4.set_total_length(total_len_u16);
        ipv4.set_identification(header.identification);
        ipv4.set_flags(if header.dont_fragment { Ipv4Flags::DontFragment } else { 0 });
        ipv4.set_fragment_offset(0);
        ipv4.set_ttl(header.ttl);
        ipv4.set_next_level_protocol(IpNextHeaderProtocol(header.protocol));
        ipv4.set_source(header.src_addr);
        ipv4.set_destination(header.dst_addr);
        ipv4.set_checksum(0);
        ipv4.set_payload(payload);
    }
    let csum: u16 = checksum::internet_checksum(&buffer[..IPV4_HDR_LEN]);
    buffer[10..12].copy_from_slice(&csum.to_be_bytes());
    Ok(buffer)
}

/// Builds a complete IPv6 packet. IPv6 has no header checksum.
pub fn create_ipv6_packet(
    src_addr: Ipv6Addr,
    dst_addr: Ipv6Addr,
    next_header: u8,
    hop_limit: u8,
    payload: &[u8],
) -> anyhow::Result<Vec<u8>> {
    let payload_len: u16 = u16::try_from(payload.len()).context("ipv6 payload too large")?;
    let mut buffer: Vec<u8> = vec![0u8; IPV6_HDR_LEN + payload.len()];
    {
        let mut ipv6: MutableIpv6Packet =
            MutableIpv6Packet::new(&mut buffer).context("creating ipv6 packet")?;
        ipv6.set_version(6);
        ipv6.set_traffic_class(0);
        ipv6.set_flow_label(0);
        ipv6.set_payload_length(payload_len);
        ipv6.set_next_header(IpNextHeaderProtocol(next_header));
        ipv6.set_hop_limit(hop_limit);
        ipv6.set_source(src_addr);
        ipv6.set_destination(dst_addr);
        ipv6.set_payload(payload);
    }
    Ok(buffer)
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
    use pnet::packet::Packet;
    use pnet::packet::ipv4::{self, Ipv4Packet};
    use pnet::packet::ipv6::Ipv6Packet;

    #[test]
    fn ipv4_header_fields_and_checksum() {
        let mut header = Ipv4Header::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), 6);
        header.identification = 0x1234;
        header.dont_fragment = true;
        let packet: Vec<u8> = create_ipv4_packet(&header, &[0xde, 0xad]).unwrap();

        let parsed = Ipv4Packet::new(&packet).unwrap();
        assert_eq!(parsed.get_version(), 4);
        assert_eq!(parsed.get_total_length(), 22);
        assert_eq!(parsed.get_identification(), 0x1234);
        assert_eq!(parsed.get_flags(), Ipv4Flags::DontFragment);
        assert_eq!(parsed.get_ttl(), DEFAULT_TTL);
        assert_eq!(parsed.get_next_level_protocol().0, 6);
        assert_eq!(parsed.payload(), &[0xde, 0xad]);

        assert_eq!(checksum::internet_checksum(&packet[..IPV4_HDR_LEN]), 0);
        assert_eq!(parsed.get_checksum(), ipv4::checksum(&parsed));
    }

    #[test]
    fn ipv6_header_fields() {
        let src: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let dst: Ipv6Addr = "2001:db8::2".parse().unwrap();
        let packet: Vec<u8> = create_ipv6_packet(src, dst, 103, 64, &[]).unwrap();

        let parsed = Ipv6Packet::new(&packet).unwrap();
        assert_eq!(parsed.get_version(), 6);
        assert_eq!(parsed.get_payload_length(), 0);
        assert_eq!(parsed.get_next_header().0, 103);
        assert_eq!(parsed.get_hop_limit(), 64);
        assert_eq!(parsed.get_source(), src);
        assert_eq!(parsed.get_destination(), dst);
    }
}
