use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use netprobe_common::config::Config;
use netprobe_common::error::ScanError;
use netprobe_common::request::ScanRequest;
use netprobe_common::results::{HostResult, PortResult, ScanReport};
use netprobe_core::network::scripted::ScriptedFactory;
use netprobe_core::{Runner, ScanControl};

pub const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 20));
pub const ZOMBIE: IpAddr = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 66));

/// Defaults with every deliberate pause removed.
pub fn fast_config() -> Config {
    Config {
        idle_settle: Duration::ZERO,
        sweep_delay: Duration::ZERO,
        ..Config::default()
    }
}

pub async fn run(factory: &ScriptedFactory, request: ScanRequest, config: Config) -> Result<ScanReport, ScanError> {
    Runner::new(Arc::new(factory.clone()), config)
        .run_request(&request, Arc::new(ScanControl::unbounded()))
        .await
}

pub fn port_results(report: ScanReport) -> Vec<PortResult> {
    match report {
        ScanReport::Ports(results) => results,
        other => panic!("expected port results, got {other:?}"),
    }
}

pub fn host_result(report: ScanReport) -> HostResult {
    match report {
        ScanReport::Host(result) => result,
        other => panic!("expected a host result, got {other:?}"),
    }
}
