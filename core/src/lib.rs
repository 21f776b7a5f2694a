//! Probe execution: transports, per-technique scanners, request resolution
//! and the runner that ties them together.

pub mod network;
pub mod runner;
pub mod scanner;

pub use runner::{ProgressCallback, Runner, ScanControl};
pub use scanner::resolver::resolve;
pub use scanner::{ScanConfiguration, Scanner};
