//! # Scan Input Validation
//!
//! Parses the raw strings of a scan request into typed values.
//!
//! * **Addresses**: a single IPv4 or IPv6 literal (e.g. `192.168.1.5`, `::1`).
//! * **Ports**: a comma-separated list of single ports and `start-end` ranges
//!   (e.g. `22,80,1000-1010`).

use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::error::ValidationError;

pub const MIN_PORT: u32 = 1;
pub const MAX_PORT: u32 = 65_535;

/// Returns `true` if `s` is a syntactically valid IPv4 or IPv6 literal.
pub fn validate_address(s: &str) -> bool {
    parse_address(s).is_some()
}

/// Parses an IPv4 or IPv6 literal. Surrounding whitespace is not accepted.
pub fn parse_address(s: &str) -> Option<IpAddr> {
    if s.is_empty() {
        return None;
    }
    s.parse::<IpAddr>().ok()
}

/// Parses a port specification into an ascending, deduplicated list.
///
/// Any malformed token fails the whole parse with an error naming that token.
/// An empty token (e.g. a trailing comma) is malformed too.
pub fn parse_ports(spec: &str) -> Result<Vec<u16>, ValidationError> {
    let mut ports: BTreeSet<u16> = BTreeSet::new();

    for token in spec.split(',') {
        let token: &str = token.trim();
        if token.is_empty() {
            return Err(ValidationError::InvalidPort(token.to_string()));
        }

        match token.split_once('-') {
            Some((start_str, end_str)) => {
                let (start, end) = parse_port_range(start_str, end_str)
                    .ok_or_else(|| ValidationError::InvalidPortRange(token.to_string()))?;
                ports.extend(start..=end);
            }
            None => {
                let port: u16 = parse_port(token)
                    .ok_or_else(|| ValidationError::InvalidPort(token.to_string()))?;
                ports.insert(port);
            }
        }
    }

    Ok(ports.into_iter().collect())
}

/// Parses a `start-end` pair, enforcing `0 < start <= end <= 65535`.
fn parse_port_range(start_str: &str, end_str: &str) -> Option<(u16, u16)> {
    let start: u16 = parse_port(start_str.trim())?;
    let end: u16 = parse_port(end_str.trim())?;
    (start <= end).then_some((start, end))
}

/// Parses one port number. Values are read as `u32` first so that `70000`
/// is reported as out of range rather than as garbage.
fn parse_port(s: &str) -> Option<u16> {
    let value: u32 = s.parse::<u32>().ok()?;
    if !(MIN_PORT..=MAX_PORT).contains(&value) {
        return None;
    }
    u16::try_from(value).ok()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
