// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Downpour - a personal download orchestration agent.
//!
//! This is the binary entry point for the Downpour agent.

mod scheduler;
mod serve;
mod shutdown;

use clap::{Parser, Subcommand};

use downpour_config::DownpourConfig;

/// Downpour - a personal download orchestration agent.
#[derive(Parser, Debug)]
#[command(name = "downpour", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Downpour agent (bot front end, engines, gateway, scheduler).
    Serve,
    /// Print the resolved configuration as TOML, secrets redacted.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match downpour_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            for error in &errors {
                eprintln!("error: {error}");
            }
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&redact(&config)) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("error: failed to render config: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("downpour: use --help for available commands");
        }
    }
}

/// Copy of the config with secret material replaced, safe to print.
fn redact(config: &DownpourConfig) -> DownpourConfig {
    let mut redacted = config.clone();
    for secret in [
        &mut redacted.telegram.bot_token,
        &mut redacted.gateway.bearer_token,
        &mut redacted.aria2.secret,
    ] {
        if secret.is_some() {
            *secret = Some("[redacted]".to_string());
        }
    }
    redacted
}
