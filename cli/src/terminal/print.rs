use std::fmt::Display;

use colored::*;
use netprobe_common::results::{PortStatus, ProtocolStatus};
use tracing::info;

use crate::terminal::colors;
use crate::terminal::logging::PRINT_TARGET;

pub const TOTAL_WIDTH: usize = 64;
/// Wide enough for "closed|filtered".
const STATUS_WIDTH: usize = 15;

#[macro_export]
macro_rules! mprint {
    () => {
        $crate::terminal::print::print("");
    };
    ($msg:expr) => {
        $crate::terminal::print::print($msg);
    };
}

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

pub fn header(msg: &str) {
    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = console::measure_text_width(&formatted);

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    print(&format!("{}", line));
}

pub fn fat_separator() {
    let sep: ColoredString = "═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR);
    print(&format!("{}", sep));
}

pub fn aligned_line<V: Display>(key: &str, key_width: usize, value: V) {
    let dots: String = ".".repeat((key_width + 1).saturating_sub(key.len()));
    let colon: String = format!("{}{}", dots.color(colors::SEPARATOR), ":".color(colors::SEPARATOR));
    let prefix: ColoredString = ">".color(colors::SEPARATOR);
    print(&format!("{} {}{} {}", prefix, key.color(colors::PRIMARY), colon, value));
}

pub fn centerln(msg: &str) {
    let space: String = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    print(&format!("{}{}", space, msg));
}

pub fn port_status(status: PortStatus) -> ColoredString {
    let color: Color = match status {
        PortStatus::Open => colors::OPEN,
        PortStatus::Closed => colors::CLOSED,
        PortStatus::Error => colors::FAILED,
        _ => colors::AMBIGUOUS,
    };
    format!("{:<STATUS_WIDTH$}", status.as_str()).color(color).bold()
}

pub fn protocol_status(status: ProtocolStatus) -> ColoredString {
    let color: Color = match status {
        ProtocolStatus::Open => colors::OPEN,
        ProtocolStatus::Closed => colors::CLOSED,
        ProtocolStatus::Error => colors::FAILED,
        _ => colors::AMBIGUOUS,
    };
    format!("{:<STATUS_WIDTH$}", status.as_str()).color(color).bold()
}

pub fn latency(latency_ms: Option<f64>) -> ColoredString {
    match latency_ms {
        Some(ms) => format!("{:>10}", format!("{ms:.2} ms")).color(colors::ACCENT),
        None => format!("{:>10}", "-").color(colors::SEPARATOR),
    }
}

pub fn no_results() {
    centerln(&format!("{}", "nothing completed before the scan stopped".red().bold()));
}

pub fn end_of_program() {
    fat_separator();
}
