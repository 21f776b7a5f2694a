//! Turns a raw [`ScanRequest`] into a [`ScanConfiguration`].
//!
//! Rules are applied in a fixed order and the first failure wins, so callers
//! always see the same message for the same bad request.

use std::net::IpAddr;

use netprobe_common::error::ConfigurationError;
use netprobe_common::input;
use netprobe_common::request::ScanRequest;
use netprobe_common::technique::Technique;

use super::{ScanConfiguration, Scanner};

/// A blank field counts as missing. Present values are passed on untrimmed,
/// so padded addresses fail address validation.
fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

pub fn resolve(request: &ScanRequest) -> Result<ScanConfiguration, ConfigurationError> {
    let (Some(target_str), Some(scan_type)) = (non_empty(&request.target_ip), non_empty(&request.scan_type)) else {
        return Err(ConfigurationError::MissingFields);
    };

    let target: IpAddr = input::parse_address(target_str).ok_or(ConfigurationError::InvalidTarget)?;

    // Unknown names count as port-level here; the name check comes after.
    let ports: Vec<u16> = if Technique::is_host_level_name(scan_type) {
        Vec::new()
    } else {
        let spec: &str = non_empty(&request.ports)
            .ok_or_else(|| ConfigurationError::MissingPorts(scan_type.to_string()))?;
        let ports: Vec<u16> = input::parse_ports(spec)?;
        if ports.is_empty() {
            return Err(ConfigurationError::NoPorts);
        }
        ports
    };

    let technique: Technique = scan_type
        .parse::<Technique>()
        .map_err(|_| ConfigurationError::UnknownTechnique(scan_type.to_string()))?;

    let zombie: Option<IpAddr> = match technique {
        Technique::Idle => Some(resolve_zombie(request, target)?),
        _ => None,
    };

    let scanner: Scanner =
        Scanner::from_technique(technique, zombie).ok_or(ConfigurationError::MissingZombie)?;

    Ok(ScanConfiguration { target, ports, scanner })
}

fn resolve_zombie(request: &ScanRequest, target: IpAddr) -> Result<IpAddr, ConfigurationError> {
    let zombie_str: &str = non_empty(&request.zombie_ip).ok_or(ConfigurationError::MissingZombie)?;
    let zombie: IpAddr = input::parse_address(zombie_str).ok_or(ConfigurationError::InvalidZombie)?;
    if zombie.is_ipv4() != target.is_ipv4() {
        return Err(ConfigurationError::ZombieFamilyMismatch);
    }
    Ok(zombie)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
