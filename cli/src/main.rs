// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # InteracTrack CLI
//!
//! The `interactrack` binary hosts the drug-interaction risk agent in-process.
//!
//! ## Commands
//!
//! - `interactrack run` - Run the tick scheduler until Ctrl-C
//! - `interactrack tick` - Run one tick and print the report
//! - `interactrack feedback <THERAPY_ID> <TYPE>` - Submit feedback on a warning
//! - `interactrack stats` - Learning statistics
//! - `interactrack therapy add|list|show` - Therapy intake
//! - `interactrack config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::PathBuf;

mod commands;
mod embedded;

use commands::{ConfigCommand, TherapyCommand};
use interactrack_core::domain::agent_config::LoggingConfig;

/// InteracTrack - adaptive drug-drug-interaction risk agent
#[derive(Parser)]
#[command(name = "interactrack")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "INTERACTRACK_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(long, global = true, env = "INTERACTRACK_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent scheduler in the foreground
    Run {
        /// Expose Prometheus metrics on this address
        #[arg(long, env = "INTERACTRACK_METRICS_ADDR", value_name = "ADDR")]
        metrics_addr: Option<SocketAddr>,

        /// Only print events for this therapy
        #[arg(long, value_name = "THERAPY_ID")]
        therapy: Option<String>,
    },

    /// Run ticks immediately and print the reports as JSON
    Tick {
        /// Maximum number of ticks; stops early when nothing is due
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },

    /// Submit feedback on a warning
    Feedback {
        #[arg(value_name = "THERAPY_ID")]
        therapy_id: String,

        /// confirmed, false_alarm or ignored
        #[arg(value_name = "TYPE")]
        feedback_type: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Show learning statistics
    Stats,

    /// Therapy intake
    #[command(name = "therapy")]
    Therapy {
        #[command(subcommand)]
        command: TherapyCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Config errors surface per command; logging falls back to defaults.
    let loaded = embedded::load_config(cli.config.clone());
    let logging = loaded
        .as_ref()
        .map(|c| c.spec.observability.logging.clone())
        .unwrap_or_default();
    init_logging(cli.log_level.as_deref().unwrap_or(&logging.level), &logging)?;

    match cli.command {
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Run {
            metrics_addr,
            therapy,
        }) => commands::agent::run(loaded?, metrics_addr, therapy).await,
        Some(Commands::Tick { count }) => commands::agent::tick(loaded?, count).await,
        Some(Commands::Stats) => commands::agent::stats(loaded?).await,
        Some(Commands::Feedback {
            therapy_id,
            feedback_type,
            notes,
        }) => commands::feedback::submit(loaded?, therapy_id, feedback_type, notes).await,
        Some(Commands::Therapy { command }) => {
            commands::therapy::handle_command(command, loaded?).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
