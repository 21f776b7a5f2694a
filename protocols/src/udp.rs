use std::net::IpAddr;

use anyhow::Context;
use pnet::packet::udp::MutableUdpPacket;

use crate::checksum;

pub const UDP_HDR_LEN: usize = 8;
pub const PROTOCOL_NUMBER: u8 = 17;

/// Builds a UDP datagram with a checksum over the pseudo-header of the given
/// endpoints.
pub fn create_datagram(
    src_port: u16,
    dst_port: u16,
    payload: &[u8],
    src_addr: IpAddr,
    dst_addr: IpAddr,
) -> anyhow::Result<Vec<u8>> {
    let total_len: usize = UDP_HDR_LEN + payload.len();
    let length: u16 = u16::try_from(total_len).context("udp payload too large")?;
    let mut buffer: Vec<u8> = vec![0u8; total_len];
    {
        let mut udp: MutableUdpPacket =
            MutableUdpPacket::new(&mut buffer).context("creating udp packet")?;
        udp.set_source(src_port);
        udp.set_destination(dst_port);
        udp.set_length(length);
        udp.set_payload(payload);
        udp.set_checksum(0);
    }
    let csum: u16 = checksum::udp_checksum(src_addr, dst_addr, &buffer);
    buffer[6..8].copy_from_slice(&csum.to_be_bytes());
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
