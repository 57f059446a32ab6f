//! TrustRouter CLI Binary
//!
//! Command-line interface for discovering and ranking registered agents.

use anyhow::Context;
use clap::Parser;
use std::process;
use trustrouter::config::ConfigLoader;
use trustrouter::logging::init_logging;
use trustrouter::tooling::cli::{Cli, CliContext};

fn run(cli: &Cli) -> anyhow::Result<String> {
    let config = ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(Some(&cli.logging_config(&config.logging)))
        .context("Failed to initialize logging")?;

    let context = CliContext::new(&config).context("Failed to initialize router")?;
    let output = context.execute(&cli.command, &cli.globals)?;
    Ok(output)
}

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
