//! Result aggregation.
//!
//! The runner resolves a request, checks raw-socket privileges once (the OS
//! fingerprint reports missing privileges in its own result instead), then
//! drives the probes: port-level scanners once per port (sequentially by
//! default, or up to `max_parallel` at a time) and host-level scanners once
//! per target. Results come back in port-list order no matter in which
//! order probes finish; a failed probe becomes an `Error` entry.
//!
//! A scan stops early when its [`ScanControl`] is cancelled or its deadline
//! passes. Completed results are returned and in-flight blocking probes are
//! abandoned to finish on their own timeouts.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use netprobe_common::config::Config;
use netprobe_common::error::ScanError;
use netprobe_common::request::ScanRequest;
use netprobe_common::results::{HostResult, PortResult, ScanReport};
use tokio::task::{self, AbortHandle, JoinSet};
use tokio::task::Id as TaskId;
use tracing::{debug, info, warn};

use crate::network::tcp;
use crate::network::transport::{PnetTransportFactory, TransportFactory};
use crate::scanner::{self, ScanConfiguration, Scanner, resolver};

/// How often a waiting scan re-checks cancellation and its deadline.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub type ProgressCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Cancellation, deadline and progress for one scan. Shared read-only with
/// the probe tasks; the completed counter is the only mutable state.
pub struct ScanControl {
    cancel: Arc<AtomicBool>,
    deadline: Option<Instant>,
    completed: AtomicUsize,
    on_progress: Option<ProgressCallback>,
}

impl ScanControl {
    /// `deadline` is measured from now.
    pub fn new(cancel: Arc<AtomicBool>, deadline: Option<Duration>) -> Self {
        Self {
            cancel,
            deadline: deadline.map(|d| Instant::now() + d),
            completed: AtomicUsize::new(0),
            on_progress: None,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)), None)
    }

    /// `callback` receives the running count of completed probes.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.load(Ordering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn record_completed(&self) {
        let count: usize = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(callback) = &self.on_progress {
            callback(count);
        }
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }
}

pub struct Runner {
    factory: Arc<dyn TransportFactory>,
    config: Arc<Config>,
}

impl Runner {
    pub fn new(factory: Arc<dyn TransportFactory>, config: Config) -> Self {
        Self { factory, config: Arc::new(config) }
    }

    /// Runner backed by real raw sockets.
    pub fn with_raw_sockets(config: Config) -> Self {
        Self::new(Arc::new(PnetTransportFactory), config)
    }

    pub async fn run_request(&self, request: &ScanRequest, control: Arc<ScanControl>) -> Result<ScanReport, ScanError> {
        let configuration: ScanConfiguration = resolver::resolve(request)?;
        self.run(&configuration, control).await
    }

    pub async fn run(&self, configuration: &ScanConfiguration, control: Arc<ScanControl>) -> Result<ScanReport, ScanError> {
        let scanner: Scanner = configuration.scanner;
        let target: IpAddr = configuration.target;

        if scanner.requires_raw_socket() && scanner != Scanner::OsFingerprint {
            self.preflight(target).await?;
        }

        info!("Starting {} scan of {target}", scanner.technique());
        let started: Instant = Instant::now();

        let report: ScanReport = if scanner.is_host_level() {
            ScanReport::Host(self.run_host(scanner, target, control).await?)
        } else {
            ScanReport::Ports(self.run_ports(scanner, target, &configuration.ports, control).await)
        };

        info!("Finished {} scan of {target} in {:.2}s", scanner.technique(), started.elapsed().as_secs_f64());
        Ok(report)
    }

    async fn preflight(&self, target: IpAddr) -> Result<(), ScanError> {
        let factory: Arc<dyn TransportFactory> = Arc::clone(&self.factory);
        match task::spawn_blocking(move || factory.check_privileges(target)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.is_permission() => Err(ScanError::Permission(e.to_string())),
            Ok(Err(e)) => Err(ScanError::Internal(e.to_string())),
            Err(e) => Err(ScanError::Internal(e.to_string())),
        }
    }

    async fn run_host(&self, scanner: Scanner, target: IpAddr, control: Arc<ScanControl>) -> Result<HostResult, ScanError> {
        let factory: Arc<dyn TransportFactory> = Arc::clone(&self.factory);
        let config: Arc<Config> = Arc::clone(&self.config);
        let probe_control: Arc<ScanControl> = Arc::clone(&control);

        let result: HostResult = task::spawn_blocking(move || {
            scanner::probe_host(factory.as_ref(), scanner, target, &config, &probe_control)
        })
        .await
        .map_err(|e| ScanError::Internal(e.to_string()))?;

        if scanner == Scanner::OsFingerprint {
            control.record_completed();
        }
        Ok(result)
    }

    async fn run_ports(
        &self,
        scanner: Scanner,
        target: IpAddr,
        ports: &[u16],
        control: Arc<ScanControl>,
    ) -> Vec<PortResult> {
        let parallel: usize = self.config.parallelism_for(scanner.technique());
        debug!("Probing {} ports, {parallel} at a time", ports.len());

        let mut slots: Vec<Option<PortResult>> = vec![None; ports.len()];
        let mut pending = ports.iter().copied().enumerate();
        let mut tasks: JoinSet<PortResult> = JoinSet::new();
        let mut in_flight: HashMap<TaskId, (usize, u16)> = HashMap::new();

        loop {
            while tasks.len() < parallel && !control.is_stopped() {
                let Some((idx, port)) = pending.next() else { break };
                let handle = self.spawn_probe(&mut tasks, scanner, target, port);
                in_flight.insert(handle.id(), (idx, port));
            }
            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                joined = tasks.join_next_with_id() => match joined {
                    Some(Ok((id, result))) => {
                        if let Some((idx, _)) = in_flight.remove(&id) {
                            slots[idx] = Some(result);
                            control.record_completed();
                        }
                    }
                    Some(Err(e)) => {
                        if let Some((idx, port)) = in_flight.remove(&e.id()) {
                            warn!("Probe task for port {port} ended abnormally: {e}");
                            slots[idx] = Some(PortResult::error(port, format!("probe task failed: {e}")));
                            control.record_completed();
                        }
                    }
                    None => break,
                },
                _ = tokio::time::sleep(STOP_POLL_INTERVAL) => {
                    if control.is_stopped() {
                        warn!("Scan stopped with {} probes outstanding", tasks.len());
                        tasks.abort_all();
                        break;
                    }
                }
            }
        }

        slots.into_iter().flatten().collect()
    }

    /// Connect probes are plain async; raw probes block on their socket.
    fn spawn_probe(&self, tasks: &mut JoinSet<PortResult>, scanner: Scanner, target: IpAddr, port: u16) -> AbortHandle {
        let config: Arc<Config> = Arc::clone(&self.config);
        if scanner == Scanner::Connect {
            return tasks.spawn(async move { tcp::connect_probe(target, port, config.connect_timeout).await });
        }
        let factory: Arc<dyn TransportFactory> = Arc::clone(&self.factory);
        tasks.spawn_blocking(move || scanner::probe_port(factory.as_ref(), scanner, target, port, &config))
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
