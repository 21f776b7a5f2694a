//! Explicit packet construction and reply parsing for every probe the
//! scanner sends. `pnet` supplies field accessors; checksums are computed
//! here.

pub mod checksum;
pub mod ethernet;
pub mod icmp;
pub mod ip;
pub mod probe;
pub mod reply;
pub mod tcp;
pub mod udp;
