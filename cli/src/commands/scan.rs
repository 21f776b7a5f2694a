use std::io::IsTerminal;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use colored::*;
use is_root::is_root;
use netprobe_common::config::Config;
use netprobe_common::error::ScanError;
use netprobe_common::request::ScanRequest;
use netprobe_common::results::{HostResult, PortResult, PortStatus, ScanReport};
use netprobe_common::technique::Technique;
use netprobe_core::scanner::sweep;
use netprobe_core::{Runner, ScanConfiguration, ScanControl, Scanner};
use tracing::warn;

use crate::commands::ScanArgs;
use crate::mprint;
use crate::terminal::input::KeyListener;
use crate::terminal::{colors, print, spinner};

pub async fn scan(args: ScanArgs, json: bool) -> anyhow::Result<()> {
    let request = ScanRequest {
        target_ip: Some(args.target),
        ports: args.ports,
        scan_type: Some(args.technique),
        zombie_ip: args.zombie,
    };
    execute(request, args.tuning.to_config(), json).await
}

/// Resolves and runs one request, then renders the report.
pub async fn execute(request: ScanRequest, config: Config, json: bool) -> anyhow::Result<()> {
    privilege_advisory(&request);
    let configuration: ScanConfiguration = netprobe_core::resolve(&request).map_err(ScanError::from)?;

    let total: usize = expected_probes(&configuration);
    let cancel: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
    let interactive: bool = !json && std::io::stdin().is_terminal() && std::io::stderr().is_terminal();

    if !json {
        print::header(&format!("{} scan of {}", configuration.scanner.technique(), configuration.target));
        spinner::start(interactive);
    }
    let listener: Option<KeyListener> = interactive.then(|| KeyListener::start(Arc::clone(&cancel)));

    let control = ScanControl::new(Arc::clone(&cancel), config.deadline)
        .with_progress(Arc::new(move |completed| spinner::report_progress(completed, total)));
    let runner = Runner::with_raw_sockets(config);

    let start_time: Instant = Instant::now();
    let outcome: Result<ScanReport, ScanError> = runner.run(&configuration, Arc::new(control)).await;

    drop(listener);
    spinner::stop();
    let report: ScanReport = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render(&configuration, &report, total, start_time.elapsed());
    }
    Ok(())
}

fn privilege_advisory(request: &ScanRequest) {
    let needs_raw: bool = request
        .scan_type
        .as_deref()
        .and_then(|name| name.parse::<Technique>().ok())
        .is_some_and(Technique::requires_raw_socket);

    if needs_raw && !is_root() {
        warn!("Not running as root. Raw-socket probes will likely be refused.");
    }
}

fn expected_probes(configuration: &ScanConfiguration) -> usize {
    match configuration.scanner {
        Scanner::ProtocolSweep => sweep::CATALOG.len(),
        Scanner::OsFingerprint => 1,
        _ => configuration.ports.len(),
    }
}

fn transport_label(scanner: Scanner) -> &'static str {
    match scanner {
        Scanner::Udp => "udp",
        _ => "tcp",
    }
}

fn render(configuration: &ScanConfiguration, report: &ScanReport, total: usize, elapsed: Duration) {
    mprint!();
    match report {
        ScanReport::Ports(results) => {
            print_ports(results, configuration.scanner);
            print_summary(configuration.target, results, total, elapsed);
        }
        ScanReport::Host(HostResult::Protocols { protocols }) => {
            print::header("ip protocols");
            for result in protocols {
                let detail: &str = result.detail.as_deref().unwrap_or("");
                print::print(&format!(
                    "{:>3} {:<8} {} {} {}",
                    result.protocol_number.to_string().color(colors::ACCENT),
                    result.protocol_name,
                    print::protocol_status(result.status),
                    print::latency(result.latency_ms),
                    detail.dimmed()
                ));
            }
            print::end_of_program();
        }
        ScanReport::Host(HostResult::Os { os_guess, detail }) => {
            print::header("os fingerprint");
            print::aligned_line("Guess", 6, os_guess.bold());
            print::aligned_line("Detail", 6, detail);
            print::end_of_program();
        }
    }
}

fn print_ports(results: &[PortResult], scanner: Scanner) {
    if results.is_empty() {
        print::no_results();
        return;
    }

    print::header("port results");
    let proto: &str = transport_label(scanner);
    for result in results {
        let port: String = format!("{:>5}/{proto}", result.port);
        let detail: &str = result.detail.as_deref().unwrap_or("");
        print::print(&format!(
            "{} {} {} {}",
            port.color(colors::PRIMARY),
            print::port_status(result.status),
            print::latency(result.latency_ms),
            detail.dimmed()
        ));
    }
}

fn print_summary(target: IpAddr, results: &[PortResult], total: usize, elapsed: Duration) {
    let open: usize = results.iter().filter(|r| r.status == PortStatus::Open).count();
    let open_ports: ColoredString = format!("{open} open").bold().green();
    let total_time: ColoredString = format!("{:.2}s", elapsed.as_secs_f64()).bold().yellow();

    print::fat_separator();
    print::centerln(&format!("{target}: {open_ports} of {} probed in {total_time}", results.len()));
    if results.len() < total {
        print::centerln(&format!("{}", format!("stopped early, {} ports not probed", total - results.len()).yellow()));
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

    fn configuration(name: &str, ports: &str) -> ScanConfiguration {
        netprobe_core::resolve(&ScanRequest::new("10.0.0.1", name).with_ports(ports)).unwrap()
    }

    #[test]
    fn progress_total_follows_scan_shape() {
        assert_eq!(expected_probes(&configuration("TCP SYN", "20-29")), 10);
        assert_eq!(expected_probes(&configuration("IP Protocol Scan", "1-1000")), 7);
        assert_eq!(expected_probes(&configuration("OS-Detection", "")), 1);
    }

    #[test]
    fn udp_results_are_labelled_udp() {
        assert_eq!(transport_label(Scanner::Udp), "udp");
        assert_eq!(transport_label(Scanner::Window), "tcp");
    }

    #[tokio::test]
    async fn invalid_requests_surface_as_scan_errors() {
        let request = ScanRequest::new("not-an-ip", "TCP Connect").with_ports("80");
        let err = execute(request, Config::default(), true).await.unwrap_err();
        let scan_err = err.downcast_ref::<ScanError>().unwrap();
        assert!(matches!(scan_err, ScanError::Configuration(_)));
    }
}
