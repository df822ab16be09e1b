// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Meetlr - post-event task delivery for the booking platform.
//!
//! This is the binary entry point for the delivery service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod adapters;
mod drain;
mod history;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use meetlr_config::model::MeetlrConfig;
use meetlr_core::MeetlrError;

/// Meetlr - post-event task delivery for the booking platform.
#[derive(Parser, Debug)]
#[command(name = "meetlr", version, about, long_about = None)]
struct Cli {
    /// Load this file instead of the XDG configuration hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scheduled poller until interrupted.
    Serve,
    /// Dispatch due tasks once and exit.
    Drain {
        /// Maximum rows to claim (defaults to poller.dispatch_batch_size).
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show pending and archived tasks for a booking.
    History {
        /// Booking id.
        booking: String,
        /// Emit one JSON object per line.
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn load_config(path: Option<&std::path::Path>) -> MeetlrConfig {
    let loaded = match path {
        Some(path) => meetlr_config::load_and_validate_path(path),
        None => meetlr_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            meetlr_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

fn print_config(config: &MeetlrConfig) -> Result<(), MeetlrError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| MeetlrError::Internal(format!("failed to render config: {e}")))?;
    print!("{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Drain { limit }) => drain::run_drain(&config, limit).await,
        Some(Commands::History { booking, json }) => {
            history::run_history(&config, &booking, json).await
        }
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("meetlr: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc answers the epoch and stats controls.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = meetlr_config::load_and_validate_str("").unwrap();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let reparsed = meetlr_config::load_and_validate_str(&rendered).unwrap();
        assert_eq!(reparsed.service.name, config.service.name);
        assert_eq!(
            reparsed.poller.poll_interval_secs,
            config.poller.poll_interval_secs
        );
    }

    #[test]
    fn cli_parses_drain_limit() {
        let cli = Cli::parse_from(["meetlr", "drain", "--limit", "5"]);
        assert!(matches!(cli.command, Some(Commands::Drain { limit: Some(5) })));
    }

    #[test]
    fn cli_parses_history_with_global_config() {
        let cli = Cli::parse_from(["meetlr", "history", "b1", "--json", "--config", "/tmp/m.toml"]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/m.toml")));
        match cli.command {
            Some(Commands::History { booking, json }) => {
                assert_eq!(booking, "b1");
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
