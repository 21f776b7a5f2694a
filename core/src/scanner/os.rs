//! Coarse operating-system guessing from the TTL and DF bit of an echo
//! reply, refined by the TCP window of a SYN+ACK when the TTL points at a
//! Unix-like stack.

use std::net::IpAddr;
use std::time::Duration;

use netprobe_common::config::Config;
use netprobe_common::error::ProbeError;
use netprobe_common::results::HostResult;
use netprobe_protocols::probe::Probe;
use netprobe_protocols::reply::Reply;
use netprobe_protocols::tcp::{self, flags};
use tracing::debug;

use crate::network::transport::{Transport, TransportFactory};
use crate::scanner::stateless;

/// Ports tried in order for the secondary SYN fingerprint.
pub const SECONDARY_PORTS: [u16; 3] = [80, 443, 22];
const LINUX_WINDOWS: [u16; 4] = [5840, 14600, 29200, 5720];
const MACOS_WINDOW: u16 = 65535;

pub const ERROR_GUESS: &str = "Error";
pub const PERMISSION_DETAIL: &str = "Permission denied. ICMP scans require root/sudo privileges.";

/// What the primary echo probe produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoOutcome {
    NoResponse,
    /// Something answered, but not the target's own echo reply.
    Unexpected,
    Reply { ttl: u8, dont_fragment: bool },
}

impl EchoOutcome {
    fn from_reply(target: IpAddr, reply: Option<&Reply>) -> Self {
        match reply {
            None => EchoOutcome::NoResponse,
            Some(reply) if reply.source == target && reply.icmp().is_some_and(|i| i.is_echo_reply()) => {
                EchoOutcome::Reply { ttl: reply.ttl, dont_fragment: reply.dont_fragment }
            }
            Some(_) => EchoOutcome::Unexpected,
        }
    }
}

pub fn fingerprint(factory: &dyn TransportFactory, target: IpAddr, config: &Config) -> HostResult {
    let outcome: EchoOutcome = match echo(factory, target, config.icmp_timeout) {
        Ok(outcome) => outcome,
        Err(e) if e.is_permission() => return HostResult::os(ERROR_GUESS, PERMISSION_DETAIL),
        Err(e) => return HostResult::os(ERROR_GUESS, format!("An unexpected error occurred: {e}")),
    };
    debug!("OS fingerprint of {target}: {outcome:?}");
    guess(outcome, || tcp_window_guess(factory, target, config.syn_timeout))
}

fn echo(factory: &dyn TransportFactory, target: IpAddr, wait: Duration) -> Result<EchoOutcome, ProbeError> {
    let probe: Probe = Probe::echo(target);
    let mut transport: Box<dyn Transport> = factory.open(target, probe.protocol())?;
    let reply: Option<Reply> = transport.exchange(&probe, wait)?;
    Ok(EchoOutcome::from_reply(target, reply.as_ref()))
}

/// Applies the TTL/DF table. `secondary` is only consulted for TTLs in the
/// 33..=64 band.
pub fn guess<F>(outcome: EchoOutcome, secondary: F) -> HostResult
where
    F: FnOnce() -> Option<&'static str>,
{
    let (ttl, df): (u8, bool) = match outcome {
        EchoOutcome::NoResponse => {
            return HostResult::os(
                "Unknown / No Response",
                "Host is down or not responding to ICMP Echo Requests.",
            );
        }
        EchoOutcome::Unexpected => {
            return HostResult::os(
                "Unknown / Unexpected Response",
                "Received a response that was not an echo reply from the target.",
            );
        }
        EchoOutcome::Reply { ttl, dont_fragment } => (ttl, dont_fragment),
    };

    let df_text: &str = if df { "SET" } else { "NOT SET" };
    let mut detail: String = format!("Received TTL={ttl}.");
    let os_guess: &str = match ttl {
        129..=u8::MAX => {
            detail.push_str(" TTL likely started at 255.");
            "Solaris / Cisco / Network Device"
        }
        65..=128 => {
            detail.push_str(&format!(" TTL likely started at 128. DF bit is {df_text}."));
            "Windows"
        }
        33..=64 => {
            detail.push_str(" TTL likely started at 64.");
            match secondary() {
                Some(os) => {
                    detail.push_str(&format!(
                        " DF bit is {df_text}. Enhanced detection via TCP fingerprinting."
                    ));
                    os
                }
                None if df => {
                    detail.push_str(" DF bit is SET (typical for Linux).");
                    "Linux"
                }
                None => {
                    detail.push_str(
                        " DF bit is NOT SET. Could be macOS, BSD, or Linux with specific network config.",
                    );
                    "Linux / macOS / Unix"
                }
            }
        }
        1..=32 => {
            detail.push_str(" TTL likely started very low or is many hops away.");
            "Possible older System / Many Hops"
        }
        0 => {
            detail.push_str(" Received TTL is zero.");
            "Unknown / TTL Expired"
        }
    };
    HostResult::os(os_guess, detail)
}

/// Known initial receive windows.
pub fn window_guess(window: u16) -> Option<&'static str> {
    if window == MACOS_WINDOW {
        Some("macOS")
    } else if LINUX_WINDOWS.contains(&window) {
        Some("Linux")
    } else {
        None
    }
}

/// SYNs to [`SECONDARY_PORTS`] until one draws a TCP reply. Failures are
/// logged and skipped.
fn tcp_window_guess(factory: &dyn TransportFactory, target: IpAddr, wait: Duration) -> Option<&'static str> {
    let mut transport: Box<dyn Transport> = match factory.open(target, tcp::PROTOCOL_NUMBER) {
        Ok(transport) => transport,
        Err(e) => {
            debug!("Secondary fingerprint unavailable: {e}");
            return None;
        }
    };
    for port in SECONDARY_PORTS {
        let probe: Probe = Probe::tcp(target, port, flags::SYN);
        let segment = match transport.exchange(&probe, wait) {
            Ok(Some(reply)) => match reply.tcp() {
                Some(segment) => *segment,
                None => continue,
            },
            Ok(None) => continue,
            Err(e) => {
                debug!("Secondary SYN to {target}:{port} failed: {e}");
                continue;
            }
        };
        if segment.flags & flags::SYN_ACK == flags::SYN_ACK {
            stateless::teardown(transport.as_mut(), &probe);
        }
        debug!("Secondary SYN to {target}:{port} answered with window {}", segment.window);
        return window_guess(segment.window);
    }
    None
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
    use crate::network::scripted::{self, ScriptedFactory};
    use netprobe_protocols::probe::ProbeKind;
    use std::net::Ipv4Addr;

    const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 4));

    fn reply(ttl: u8, dont_fragment: bool) -> EchoOutcome {
        EchoOutcome::Reply { ttl, dont_fragment }
    }

    fn os_guess(result: &HostResult) -> &str {
        match result {
            HostResult::Os { os_guess, .. } => os_guess,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn detail(result: &HostResult) -> &str {
        match result {
            HostResult::Os { detail, .. } => detail,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ttl_bands() {
        assert_eq!(os_guess(&guess(reply(250, false), || None)), "Solaris / Cisco / Network Device");
        assert_eq!(os_guess(&guess(reply(128, true), || None)), "Windows");
        assert_eq!(os_guess(&guess(reply(65, true), || None)), "Windows");
        assert_eq!(os_guess(&guess(reply(64, true), || None)), "Linux");
        assert_eq!(os_guess(&guess(reply(33, false), || None)), "Linux / macOS / Unix");
        assert_eq!(os_guess(&guess(reply(32, false), || None)), "Possible older System / Many Hops");
        assert_eq!(os_guess(&guess(reply(0, false), || None)), "Unknown / TTL Expired");
    }

    #[test]
    fn detail_reports_ttl_and_df() {
        let result = guess(reply(117, true), || None);
        assert!(detail(&result).starts_with("Received TTL=117."));
        assert!(detail(&result).contains("DF bit is SET"));
    }

    #[test]
    fn secondary_only_runs_for_unix_band() {
        let result = guess(reply(120, false), || panic!("must not probe"));
        assert_eq!(os_guess(&result), "Windows");

        let result = guess(reply(61, false), || Some("macOS"));
        assert_eq!(os_guess(&result), "macOS");
        assert!(detail(&result).contains("Enhanced detection via TCP fingerprinting"));
    }

    #[test]
    fn silence_and_oddities() {
        assert_eq!(os_guess(&guess(EchoOutcome::NoResponse, || None)), "Unknown / No Response");
        assert_eq!(os_guess(&guess(EchoOutcome::Unexpected, || None)), "Unknown / Unexpected Response");
    }

    #[test]
    fn window_table() {
        assert_eq!(window_guess(65535), Some("macOS"));
        assert_eq!(window_guess(29200), Some("Linux"));
        assert_eq!(window_guess(5720), Some("Linux"));
        assert_eq!(window_guess(8192), None);
    }

    #[test]
    fn linux_host_end_to_end() {
        let factory = ScriptedFactory::new(|probe| match probe.kind {
            ProbeKind::Echo { .. } => Ok(Some(scripted::echo_answer(probe))),
            ProbeKind::Tcp(header) if header.dst_port == 443 => {
                Ok(Some(scripted::tcp_answer(probe, flags::SYN_ACK, 29200)))
            }
            _ => Ok(None),
        });
        let result = fingerprint(&factory, TARGET, &Config::default());
        assert_eq!(os_guess(&result), "Linux");

        let sent = factory.sent();
        let ports: Vec<u16> = sent.iter().filter_map(|p| p.ports()).map(|(_, dst)| dst).collect();
        // 80 unanswered, 443 answered then torn down, 22 never tried
        assert_eq!(ports, vec![80, 443, 443]);
        let ProbeKind::Tcp(last) = sent.last().unwrap().kind else { panic!("tcp") };
        assert_eq!(last.flags, flags::RST);
    }

    #[test]
    fn permission_failure_has_fixed_detail() {
        let factory = ScriptedFactory::silent().unprivileged();
        let result = fingerprint(&factory, TARGET, &Config::default());
        assert_eq!(result, HostResult::os(ERROR_GUESS, PERMISSION_DETAIL));
    }

    #[test]
    fn other_primary_failures_are_unexpected_errors() {
        let factory = ScriptedFactory::new(|_| Err(ProbeError::Packet(String::from("boom"))));
        let result = fingerprint(&factory, TARGET, &Config::default());
        assert_eq!(os_guess(&result), ERROR_GUESS);
        assert!(detail(&result).starts_with("An unexpected error occurred: "));
    }
}
