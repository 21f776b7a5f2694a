use anyhow::Context;
use pnet::packet::ethernet::{EtherType, EthernetPacket, MutableEthernetPacket};
use pnet::util::MacAddr;

pub const ETH_HDR_LEN: usize = 14;

/// Wraps an IP packet in an Ethernet II frame.
pub fn create_frame(
    src_mac: MacAddr,
    dst_mac: MacAddr,
    ethertype: EtherType,
    payload: &[u8],
) -> anyhow::Result<Vec<u8>> {
    let mut buffer: Vec<u8> = vec![0u8; ETH_HDR_LEN + payload.len()];
    {
        let mut eth: MutableEthernetPacket =
            MutableEthernetPacket::new(&mut buffer).context("creating ethernet frame")?;
        eth.set_source(src_mac);
        eth.set_destination(dst_mac);
        eth.set_ethertype(ethertype);
        eth.set_payload(payload);
    }
    Ok(buffer)
}

/// Source and destination MAC of a captured frame.
pub fn frame_addresses(frame: &[u8]) -> Option<(MacAddr, MacAddr)> {
    let eth: EthernetPacket = EthernetPacket::new(frame)?;
    Some((eth.get_source(), eth.get_destination()))
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
    use pnet::packet::ethernet::EtherTypes;

    #[test]
    fn frame_sets_fields() {
        let src = MacAddr::new(0x00, 0x11, 0x22, 0x33, 0x44, 0x55);
        let dst = MacAddr::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff);

        let frame = create_frame(src, dst, EtherTypes::Ipv6, &[1, 2, 3]).unwrap();

        let eth = EthernetPacket::new(&frame).expect("parse eth");
        assert_eq!(eth.get_source(), src);
        assert_eq!(eth.get_destination(), dst);
        assert_eq!(eth.get_ethertype(), EtherTypes::Ipv6);
        assert_eq!(eth.payload(), &[1, 2, 3]);
        assert_eq!(frame_addresses(&frame), Some((src, dst)));
    }

    #[test]
    fn truncated_frame_has_no_addresses() {
        assert_eq!(frame_addresses(&[0u8; 6]), None);
    }
}
