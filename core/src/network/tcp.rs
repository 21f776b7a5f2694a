use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use netprobe_common::results::{PortResult, PortStatus};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Full three-way handshake against `addr:port`. Needs no privileges.
pub async fn connect_probe(addr: IpAddr, port: u16, wait: Duration) -> PortResult {
    let socket_addr: SocketAddr = SocketAddr::new(addr, port);
    let started: Instant = Instant::now();

    match timeout(wait, TcpStream::connect(socket_addr)).await {
        Ok(Ok(_stream)) => PortResult::new(port, PortStatus::Open).with_latency(started.elapsed()),
        Ok(Err(e)) => {
            debug!("Connect to {socket_addr} failed: {e}");
            PortResult::new(port, classify_connect_error(&e)).with_latency(started.elapsed())
        }
        Err(_elapsed) => PortResult::new(port, PortStatus::Filtered),
    }
}

/// Refused or reset means a live host answered for a closed port; anything
/// else is treated as a filter on the path.
pub fn classify_connect_error(err: &io::Error) -> PortStatus {
    match err.kind() {
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => PortStatus::Closed,
        _ => PortStatus::Filtered,
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
