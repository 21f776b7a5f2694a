//! Internet checksum (RFC 1071) and the IPv4/IPv6 pseudo-headers used by
//! TCP, UDP and ICMPv6.
//!
//! All functions expect the checksum field of the covered data to be zero.

use std::net::IpAddr;

/// Adds `data` as big-endian 16-bit words to `sum`. An odd trailing byte is
/// padded with zero.
pub fn ones_complement_sum(data: &[u8], mut sum: u32) -> u32 {
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum = sum.wrapping_add(u32::from(u16::from_be_bytes([word[0], word[1]])));
    }
    if let [last] = words.remainder() {
        sum = sum.wrapping_add(u32::from(*last) << 8);
    }
    sum
}

/// Folds the carries back in and returns the one's complement.
pub fn finalize(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// Checksum of a self-contained block (IPv4 header, ICMPv4 message).
pub fn internet_checksum(data: &[u8]) -> u16 {
    finalize(ones_complement_sum(data, 0))
}

/// Sum of the pseudo-header for the address family of `src`/`dst`.
///
/// IPv4: src, dst, zero, protocol, 16-bit length.
/// IPv6: src, dst, 32-bit length, three zero bytes, next header.
pub fn pseudo_header_sum(src: IpAddr, dst: IpAddr, protocol: u8, length: usize) -> u32 {
    match (src, dst) {
        (IpAddr::V4(src), IpAddr::V4(dst)) => {
            let mut sum: u32 = ones_complement_sum(&src.octets(), 0);
            sum = ones_complement_sum(&dst.octets(), sum);
            sum = sum.wrapping_add(u32::from(protocol));
            sum.wrapping_add((length & 0xffff) as u32)
        }
        (src, dst) => {
            let mut sum: u32 = ones_complement_sum(&to_v6_octets(src), 0);
            sum = ones_complement_sum(&to_v6_octets(dst), sum);
            let length: u32 = length as u32;
            sum = sum.wrapping_add(length >> 16).wrapping_add(length & 0xffff);
            sum.wrapping_add(u32::from(protocol))
        }
    }
}

/// Checksum of a transport segment (TCP, UDP, ICMPv6) including its pseudo-header.
pub fn transport_checksum(src: IpAddr, dst: IpAddr, protocol: u8, segment: &[u8]) -> u16 {
    let sum: u32 = pseudo_header_sum(src, dst, protocol, segment.len());
    finalize(ones_complement_sum(segment, sum))
}

/// UDP transmits a computed checksum of zero as all ones (RFC 768).
pub fn udp_checksum(src: IpAddr, dst: IpAddr, datagram: &[u8]) -> u16 {
    match transport_checksum(src, dst, 17, datagram) {
        0 => 0xffff,
        csum => csum,
    }
}

fn to_v6_octets(addr: IpAddr) -> [u8; 16] {
    match addr {
        IpAddr::V6(v6) => v6.octets(),
        IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
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
