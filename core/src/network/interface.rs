use std::net::{IpAddr, UdpSocket};

use netprobe_common::error::ProbeError;
use pnet::datalink::{self, NetworkInterface};

/// Port used only to give the routing socket a destination; nothing is sent.
const ROUTE_PROBE_PORT: u16 = 53;

/// Source address the kernel would pick for traffic to `target`.
///
/// Connecting a UDP socket performs the route lookup without emitting a
/// packet.
pub fn route_source(target: IpAddr) -> Result<IpAddr, ProbeError> {
    let bind_addr: &str = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket: UdpSocket = UdpSocket::bind(bind_addr)?;
    socket
        .connect((target, ROUTE_PROBE_PORT))
        .map_err(|_| ProbeError::NoInterface(target.to_string()))?;
    Ok(socket.local_addr()?.ip())
}

/// The interface that carries `source`, for layer-2 capture.
pub fn interface_for_source(source: IpAddr) -> Result<NetworkInterface, ProbeError> {
    let interfaces: Vec<NetworkInterface> = datalink::interfaces();
    owner_of(&interfaces, source)
        .cloned()
        .ok_or_else(|| ProbeError::NoInterface(source.to_string()))
}

fn owner_of(interfaces: &[NetworkInterface], source: IpAddr) -> Option<&NetworkInterface> {
    interfaces
        .iter()
        .find(|iface| iface.is_up() && iface.ips.iter().any(|net| net.ip() == source))
        .or_else(|| {
            let idx: usize = find_local_index(interfaces, source)?;
            interfaces.get(idx)
        })
}

/// Index of the first interface whose subnet contains `target`.
pub fn find_local_index(interfaces: &[NetworkInterface], target: IpAddr) -> Option<usize> {
    interfaces.iter().position(|iface| {
        iface.ips.iter().any(|ip_net| match (target, ip_net.ip()) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => ip_net.contains(target),
            _ => false,
        })
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
