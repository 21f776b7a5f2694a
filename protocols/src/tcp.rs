use std::net::IpAddr;

use anyhow::Context;
use pnet::packet::tcp::MutableTcpPacket;

use crate::checksum;

pub const TCP_HDR_LEN: usize = 20;
pub const PROTOCOL_NUMBER: u8 = 6;
/// Advertised window of outgoing probes.
pub const PROBE_WINDOW: u16 = 1024;

/// TCP control bits.
pub mod flags {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;

    pub const SYN_ACK: u8 = SYN | ACK;
    pub const RST_ACK: u8 = RST | ACK;
    pub const XMAS: u8 = FIN | PSH | URG;
    pub const NONE: u8 = 0;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub sequence: u32,
    pub acknowledgement: u32,
    pub flags: u8,
    pub window: u16,
}

/// Builds a 20-byte TCP segment whose checksum covers the pseudo-header of
/// `src_addr` / `dst_addr`.
pub fn create_segment(header: &TcpHeader, src_addr: IpAddr, dst_addr: IpAddr) -> anyhow::Result<Vec<u8>> {
    let mut buffer: Vec<u8> = vec![0u8; TCP_HDR_LEN];
    {
        let mut tcp: MutableTcpPacket =
            MutableTcpPacket::new(&mut buffer).context("creating tcp packet")?;
        tcp.set_source(header.src_port);
        tcp.set_destination(header.dst_port);
        tcp.set_sequence(header.sequence);
        tcp.set_acknowledgement(header.acknowledgement);
        tcp.set_data_offset(5);
        tcp.set_reserved(0);
        tcp.set_flags(header.flags);
        tcp.set_window(header.window);
        tcp.set_urgent_ptr(0);
        tcp.set_checksum(0);
    }
    let csum: u16 = checksum::transport_checksum(src_addr, dst_addr, PROTOCOL_NUMBER, &buffer);
    buffer[16..18].copy_from_slice(&csum.to_be_bytes());
    Ok(buffer)
}

/// Renders set flags as `SYN|ACK` for logs.
pub fn describe_flags(bits: u8) -> String {
    const NAMES: [(u8, &str); 6] = [
        (flags::SYN, "SYN"),
        (flags::ACK, "ACK"),
        (flags::FIN, "FIN"),
        (flags::RST, "RST"),
        (flags::PSH, "PSH"),
        (flags::URG, "URG"),
    ];
    let set: Vec<&str> = NAMES
        .iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    if set.is_empty() {
        String::from("none")
    } else {
        set.join("|")
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
