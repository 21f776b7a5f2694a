//! Everything that touches a socket: raw transports, connect handshakes and
//! the routing lookups they depend on.

pub mod interface;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;
pub mod tcp;
pub mod transport;
