use serde::{Deserialize, Serialize};

/// Raw inbound scan request, exactly as a caller submits it.
///
/// Nothing here is validated; the resolver turns it into a scan configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub target_ip: Option<String>,
    #[serde(default)]
    pub ports: Option<String>,
    #[serde(default)]
    pub scan_type: Option<String>,
    #[serde(default)]
    pub zombie_ip: Option<String>,
}

impl ScanRequest {
    pub fn new(target_ip: impl Into<String>, scan_type: impl Into<String>) -> Self {
        Self {
            target_ip: Some(target_ip.into()),
            scan_type: Some(scan_type.into()),
            ..Self::default()
        }
    }

    pub fn with_ports(mut self, ports: impl Into<String>) -> Self {
        self.ports = Some(ports.into());
        self
    }

    pub fn with_zombie(mut self, zombie_ip: impl Into<String>) -> Self {
        self.zombie_ip = Some(zombie_ip.into());
        self
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_deserialize_as_none() {
        let req: ScanRequest =
            serde_json::from_str(r#"{"target_ip": "10.0.0.1", "scan_type": "Idle"}"#).unwrap();
        assert_eq!(req.target_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(req.ports, None);
        assert_eq!(req.zombie_ip, None);
    }
}
