//! # Scan Result Model
//!
//! Wire-facing result types. Field and variant names match the JSON the
//! callers consume (`latency_ms`, `"Open|Filtered"`, `{"protocols": [...]}`).

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortStatus {
    Open,
    Closed,
    Filtered,
    #[serde(rename = "Open|Filtered")]
    OpenFiltered,
    #[serde(rename = "Closed|Filtered")]
    ClosedFiltered,
    Unfiltered,
    Error,
}

impl PortStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PortStatus::Open => "Open",
            PortStatus::Closed => "Closed",
            PortStatus::Filtered => "Filtered",
            PortStatus::OpenFiltered => "Open|Filtered",
            PortStatus::ClosedFiltered => "Closed|Filtered",
            PortStatus::Unfiltered => "Unfiltered",
            PortStatus::Error => "Error",
        }
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortResult {
    pub port: u16,
    pub status: PortStatus,
    pub latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PortResult {
    pub fn new(port: u16, status: PortStatus) -> Self {
        Self {
            port,
            status,
            latency_ms: None,
            detail: None,
        }
    }

    pub fn error(port: u16, detail: impl Into<String>) -> Self {
        Self::new(port, PortStatus::Error).with_detail(detail)
    }

    pub fn with_latency(mut self, elapsed: Duration) -> Self {
        self.latency_ms = Some(latency_ms(elapsed));
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolStatus {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "closed")]
    Closed,
    #[serde(rename = "filtered")]
    Filtered,
    #[serde(rename = "open|filtered")]
    OpenFiltered,
    #[serde(rename = "error")]
    Error,
}

impl ProtocolStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolStatus::Open => "open",
            ProtocolStatus::Closed => "closed",
            ProtocolStatus::Filtered => "filtered",
            ProtocolStatus::OpenFiltered => "open|filtered",
            ProtocolStatus::Error => "error",
        }
    }
}

impl fmt::Display for ProtocolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolProbeResult {
    pub protocol_number: u8,
    pub protocol_name: String,
    pub status: ProtocolStatus,
    pub latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Result of a host-level technique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostResult {
    Protocols { protocols: Vec<ProtocolProbeResult> },
    Os { os_guess: String, detail: String },
}

impl HostResult {
    pub fn os(os_guess: impl Into<String>, detail: impl Into<String>) -> Self {
        HostResult::Os {
            os_guess: os_guess.into(),
            detail: detail.into(),
        }
    }
}

/// What a completed scan hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanReport {
    Ports(Vec<PortResult>),
    Host(HostResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Validation,
    Permission,
    Internal,
}

/// `{"error": ...}` body for request-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    pub kind: ErrorKind,
}

impl From<&ScanError> for ErrorPayload {
    fn from(err: &ScanError) -> Self {
        let kind: ErrorKind = match err {
            ScanError::Configuration(_) => ErrorKind::Validation,
            ScanError::Permission(_) => ErrorKind::Permission,
            ScanError::Internal(_) => ErrorKind::Internal,
        };
        Self {
            error: err.to_string(),
            kind,
        }
    }
}

/// Milliseconds rounded to two decimals.
pub fn latency_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100_000.0).round() / 100.0
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
