use colored::*;
use netprobe_common::technique::Technique;
use serde_json::json;

use crate::terminal::{colors, print};

pub fn techniques(json: bool) -> anyhow::Result<()> {
    if json {
        let listing: Vec<serde_json::Value> = Technique::ALL
            .iter()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "host_level": t.is_host_level(),
                    "requires_raw_socket": t.requires_raw_socket(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    print::header("techniques");
    for technique in Technique::ALL {
        let scope: ColoredString = if technique.is_host_level() { "host".yellow() } else { "port".normal() };
        let privilege: ColoredString = if technique.requires_raw_socket() {
            "raw socket".red()
        } else {
            "unprivileged".green()
        };
        print::print(&format!(
            "{} {:<4} {}",
            format!("{:<18}", technique.name()).color(colors::PRIMARY),
            scope,
            privilege
        ));
    }
    print::end_of_program();
    Ok(())
}
