pub mod request;
pub mod scan;
pub mod techniques;

use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use netprobe_common::config::Config;

#[derive(Parser)]
#[command(name = "netprobe")]
#[command(version, about = "Single-host port and protocol prober.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe one host with the given technique
    #[command(alias = "s")]
    Scan(ScanArgs),
    /// Run a scan request read from a JSON document ('-' for stdin)
    #[command(alias = "r")]
    Request {
        source: String,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// List the supported techniques
    #[command(alias = "t")]
    Techniques,
}

#[derive(Args)]
pub struct ScanArgs {
    /// IPv4 or IPv6 address of the target
    pub target: String,

    /// Ports to probe, e.g. "22,80,1000-1010"
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Technique name, see `netprobe techniques`
    #[arg(short = 't', long = "technique", default_value = "TCP Connect")]
    pub technique: String,

    /// Zombie host for the Idle technique
    #[arg(short, long)]
    pub zombie: Option<String>,

    #[command(flatten)]
    pub tuning: Tuning,
}

#[derive(Args, Clone, Copy)]
pub struct Tuning {
    /// Probes in flight at once (capped at 64, Idle always runs one)
    #[arg(long, default_value_t = 1)]
    pub parallel: usize,

    /// Stop after this many seconds and report what finished
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<f64>,
}

impl Tuning {
    pub fn to_config(self) -> Config {
        Config {
            max_parallel: self.parallel,
            deadline: self
                .deadline
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64),
            ..Config::default()
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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
