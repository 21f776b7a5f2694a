use std::net::Ipv6Addr;

use anyhow::Context;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{IcmpCode, IcmpTypes};
use pnet::packet::icmpv6::echo_request::MutableEchoRequestPacket as MutableEchoRequestV6Packet;
use pnet::packet::icmpv6::{Icmpv6Code, Icmpv6Types};

use crate::checksum;

pub const ICMP_ECHO_LEN: usize = 8;
pub const PROTOCOL_NUMBER_V4: u8 = 1;
pub const PROTOCOL_NUMBER_V6: u8 = 58;

pub mod types {
    pub const ECHO_REPLY_V4: u8 = 0;
    pub const DEST_UNREACHABLE_V4: u8 = 3;

    pub const DEST_UNREACHABLE_V6: u8 = 1;
    pub const PARAMETER_PROBLEM_V6: u8 = 4;
    pub const ECHO_REPLY_V6: u8 = 129;
}

pub mod codes {
    pub const PROTOCOL_UNREACHABLE_V4: u8 = 2;
    pub const PORT_UNREACHABLE_V4: u8 = 3;

    pub const PORT_UNREACHABLE_V6: u8 = 4;
    pub const UNRECOGNIZED_NEXT_HEADER_V6: u8 = 1;
}

/// ICMPv4 echo request. The checksum covers only the ICMP message.
pub fn create_echo_request_v4(identifier: u16, sequence: u16) -> anyhow::Result<Vec<u8>> {
    let mut buffer: Vec<u8> = vec![0u8; ICMP_ECHO_LEN];
    {
        let mut icmp: MutableEchoRequestPacket =
            MutableEchoRequestPacket::new(&mut buffer).context("creating echo request packet")?;
        icmp.set_icmp_type(IcmpTypes::EchoRequest);
        icmp.set_icmp_code(IcmpCode(0));
        icmp.set_identifier(identifier);
        icmp.set_sequence_number(sequence);
        icmp.set_checksum(0);
    }
    let csum: u16 = checksum::internet_checksum(&buffer);
    buffer[2..4].copy_from_slice(&csum.to_be_bytes());
    Ok(buffer)
}

/// ICMPv6 echo request. Unlike v4 the checksum includes the pseudo-header.
pub fn create_echo_request_v6(
    identifier: u16,
    sequence: u16,
    src_addr: Ipv6Addr,
    dst_addr: Ipv6Addr,
) -> anyhow::Result<Vec<u8>> {
    let mut buffer: Vec<u8> = vec![0u8; ICMP_ECHO_LEN];
    {
        let mut icmp: MutableEchoRequestV6Packet = MutableEchoRequestV6Packet::new(&mut buffer)
            .context("creating echo request v6 packet")?;
        icmp.set_icmpv6_type(Icmpv6Types::EchoRequest);
        icmp.set_icmpv6_code(Icmpv6Code(0));
        icmp.set_identifier(identifier);
        icmp.set_sequence_number(sequence);
        icmp.set_checksum(0);
    }
    let csum: u16 = checksum::transport_checksum(
        src_addr.into(),
        dst_addr.into(),
        PROTOCOL_NUMBER_V6,
        &buffer,
    );
    buffer[2..4].copy_from_slice(&csum.to_be_bytes());
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
