//! Error taxonomy shared by every crate of the workspace.
//!
//! * [`ValidationError`] / [`ConfigurationError`]: request rejected before any probe.
//! * [`ProbeError`]: a single probe failed; reported as an `Error` entry, never fatal.
//! * [`ScanError`]: request-level failure returned instead of a report.

use std::io;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid port number: {0}")]
    InvalidPort(String),
    #[error("Invalid port range format: {0}")]
    InvalidPortRange(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Missing required fields: target_ip, scan_type")]
    MissingFields,
    #[error("Invalid target IP address format (must be IPv4 or IPv6)")]
    InvalidTarget,
    #[error("port(s) are required for {0}")]
    MissingPorts(String),
    #[error(transparent)]
    InvalidPorts(#[from] ValidationError),
    #[error("No valid ports specified")]
    NoPorts,
    #[error("Invalid scan type")]
    UnknownTechnique(String),
    #[error("Zombie IP is required for Idle Scan")]
    MissingZombie,
    #[error("Invalid zombie IP address format (must be IPv4 or IPv6)")]
    InvalidZombie,
    #[error("Zombie and target must use the same IP version")]
    ZombieFamilyMismatch,
}

/// Failure of one probe (or one step of a probe sequence).
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("no usable network interface for {0}")]
    NoInterface(String),
    #[error("failed to build packet: {0}")]
    Packet(String),
    #[error(transparent)]
    Io(io::Error),
}

impl ProbeError {
    pub fn is_permission(&self) -> bool {
        matches!(self, ProbeError::PermissionDenied(_))
    }
}

impl From<io::Error> for ProbeError {
    /// Raw-socket calls report a missing capability as `EPERM`/`EACCES`;
    /// both surface as [`io::ErrorKind::PermissionDenied`].
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => ProbeError::PermissionDenied(err.to_string()),
            _ => ProbeError::Io(err),
        }
    }
}

/// Request-level failures. Everything else is folded into per-probe results.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Permission denied. Raw-socket scans must run as root/Administrator ({0}).")]
    Permission(String),
    #[error("An unexpected error occurred: {0}")]
    Internal(String),
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

    #[test]
    fn io_permission_errors_become_permission_denied() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "Operation not permitted");
        let probe_err: ProbeError = err.into();
        assert!(probe_err.is_permission());

        let err = io::Error::new(io::ErrorKind::TimedOut, "timed out");
        let probe_err: ProbeError = err.into();
        assert!(!probe_err.is_permission());
    }

    #[test]
    fn configuration_messages_are_surfaced_verbatim() {
        assert_eq!(
            ConfigurationError::MissingZombie.to_string(),
            "Zombie IP is required for Idle Scan"
        );
        assert_eq!(
            ConfigurationError::MissingPorts("TCP SYN".into()).to_string(),
            "port(s) are required for TCP SYN"
        );
        let nested = ConfigurationError::from(ValidationError::InvalidPort("x".into()));
        assert_eq!(nested.to_string(), "Invalid port number: x");
    }
}
