mod cli;
mod config;
mod menu;
mod terminal;

use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::CliArgs;
use crate::config::CliConfig;
use crate::menu::Session;
use crate::terminal::Terminal;

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let filter = args
        .log_level
        .clone()
        .map(tracing_subscriber::EnvFilter::new)
        .or_else(|| tracing_subscriber::EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let config = CliConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let terminal = Terminal::new(config.colour);
    let mut session = Session::new(config);

    terminal.print_banner()?;

    if let Some(path) = &args.network_file {
        match std::fs::read_to_string(path) {
            Ok(text) => match rrsim_core::format::deserialize(&mut session.topology, &text) {
                Ok(()) => {
                    session.network_path = Some(path.clone());
                    terminal.print_info(&format!("loaded {path}"))?;
                }
                Err(e) => terminal.print_error("load", &e.to_string())?,
            },
            Err(e) => terminal.print_error("load", &e.to_string())?,
        }
    }

    loop {
        let line = match terminal.read_command()? {
            Some(l) => l,
            None => {
                terminal.print_info("goodbye")?;
                break;
            }
        };
        if line.is_empty() {
            continue;
        }
        session.dispatch(&line, &terminal)?;
    }

    Ok(())
}
