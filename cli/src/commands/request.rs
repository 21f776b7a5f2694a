use std::fs;
use std::io::{self, Read};

use anyhow::Context;
use netprobe_common::config::Config;
use netprobe_common::request::ScanRequest;

use crate::commands::scan;

/// Runs a JSON [`ScanRequest`] document read from `source` (`-` is stdin).
pub async fn request(source: &str, config: Config, json: bool) -> anyhow::Result<()> {
    let document: String = read_source(source)?;
    let request: ScanRequest = parse(&document)?;
    scan::execute(request, config, json).await
}

fn read_source(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("reading request from stdin")?;
        return Ok(buffer);
    }
    fs::read_to_string(source).with_context(|| format!("reading request file {source}"))
}

fn parse(document: &str) -> anyhow::Result<ScanRequest> {
    serde_json::from_str(document).context("parsing scan request")
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
