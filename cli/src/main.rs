mod commands;
mod terminal;

use std::process::ExitCode;

use commands::{CommandLine, Commands, request, scan, techniques};
use netprobe_common::error::ScanError;
use netprobe_common::results::{ErrorKind, ErrorPayload};
use tracing::error;

use crate::terminal::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();
    let json: bool = commands.json;

    logging::init(commands.verbose);

    let outcome: anyhow::Result<()> = match commands.command {
        Commands::Scan(args) => scan::scan(args, json).await,
        Commands::Request { source, tuning } => request::request(&source, tuning.to_config(), json).await,
        Commands::Techniques => techniques::techniques(json),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err, json),
    }
}

fn report_failure(err: &anyhow::Error, json: bool) -> ExitCode {
    let payload: ErrorPayload = match err.downcast_ref::<ScanError>() {
        Some(scan_err) => ErrorPayload::from(scan_err),
        None => ErrorPayload {
            error: format!("{err:#}"),
            kind: ErrorKind::Internal,
        },
    };

    if json && let Ok(body) = serde_json::to_string_pretty(&payload) {
        println!("{body}");
    } else {
        error!("{}", payload.error);
    }

    ExitCode::from(exit_code(payload.kind))
}

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Validation => 2,
        ErrorKind::Permission => 3,
    }
}
