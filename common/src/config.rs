use std::time::Duration;

use crate::technique::Technique;

/// Upper bound for concurrently running probes.
pub const MAX_PARALLEL_PROBES: usize = 64;

/// Runtime knobs for a scan. Defaults follow the per-technique timeouts.
#[derive(Debug, Clone)]
pub struct Config {
    pub connect_timeout: Duration,
    pub syn_timeout: Duration,
    /// FIN, Xmas, Null, ACK and Window probes.
    pub stealth_timeout: Duration,
    pub udp_timeout: Duration,
    /// Each zombie probe of the Idle technique.
    pub idle_timeout: Duration,
    /// Pause after the spoofed SYN so the target can answer the zombie.
    pub idle_settle: Duration,
    pub icmp_timeout: Duration,
    pub sweep_timeout: Duration,
    /// Pause between two probes of the IP-protocol sweep.
    pub sweep_delay: Duration,
    /// Number of port probes in flight. `1` scans sequentially.
    pub max_parallel: usize,
    /// Overall scan deadline. Completed results are returned when it expires.
    pub deadline: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            syn_timeout: Duration::from_secs(1),
            stealth_timeout: Duration::from_secs(2),
            udp_timeout: Duration::from_secs(3),
            idle_timeout: Duration::from_secs(2),
            idle_settle: Duration::from_millis(500),
            icmp_timeout: Duration::from_secs(2),
            sweep_timeout: Duration::from_secs(2),
            sweep_delay: Duration::from_millis(100),
            max_parallel: 1,
            deadline: None,
        }
    }
}

impl Config {
    /// How long a single probe of `technique` waits for its reply.
    pub fn timeout_for(&self, technique: Technique) -> Duration {
        match technique {
            Technique::Connect => self.connect_timeout,
            Technique::Syn => self.syn_timeout,
            Technique::Fin
            | Technique::Xmas
            | Technique::Null
            | Technique::Ack
            | Technique::Window => self.stealth_timeout,
            Technique::Udp => self.udp_timeout,
            Technique::Idle => self.idle_timeout,
            Technique::OsFingerprint => self.icmp_timeout,
            Technique::ProtocolSweep => self.sweep_timeout,
        }
    }

    /// Effective parallelism: clamped to `1..=MAX_PARALLEL_PROBES`, and always
    /// sequential for the timing-sensitive Idle technique.
    pub fn parallelism_for(&self, technique: Technique) -> usize {
        if technique == Technique::Idle {
            return 1;
        }
        self.max_parallel.clamp(1, MAX_PARALLEL_PROBES)
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
