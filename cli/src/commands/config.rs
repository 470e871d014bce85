// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use interactrack_core::domain::agent_config::{AgentConfigManifest, CONFIG_PATH_ENV};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./interactrack-config.yaml)
        #[arg(short, long, default_value = "./interactrack-config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, force } => generate(output, force).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./interactrack-config.yaml");
        println!("  4. ~/.interactrack/config.yaml");
        println!("  5. /etc/interactrack/config.yaml");
        match AgentConfigManifest::discover_config() {
            Some(found) if config_override.is_none() => {
                println!("  Using: {}", found.display().to_string().green())
            }
            None if config_override.is_none() => {
                println!("  Using: {}", "built-in defaults".yellow())
            }
            _ => {}
        }
        println!();
    }

    let config = AgentConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    let spec = &config.spec;

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Agent:".bold());
    println!("  Name: {}", config.metadata.name);
    if let Some(version) = &config.metadata.version {
        println!("  Version: {}", version);
    }
    println!();

    println!("{}", "Dataset:".bold());
    println!("  Path: {}", spec.dataset.path.display());
    if !spec.dataset.path.exists() {
        println!("  {}", "(file not found, agent commands will fail)".red());
    }
    println!();

    println!("{}", "Storage:".bold());
    println!("  Backend: {:?}", spec.storage.backend);
    if spec.storage.connection_string.is_some() {
        println!("  Connection string: {}", "(set)".dimmed());
    }
    if let Some(seed) = &spec.storage.seed_path {
        println!("  Seed file: {}", seed.display());
    }
    println!();

    println!("{}", "Scheduler:".bold());
    println!("  Tick interval: {}s", spec.scheduler.tick_interval_seconds);
    println!("  Error backoff: {}s", spec.scheduler.error_backoff_seconds);
    println!("  History limit: {}", spec.scheduler.history_limit);
    println!();

    println!("{}", "Assessment & learning:".bold());
    println!(
        "  Reassessment interval: {}s",
        spec.assessment.reassessment_interval_seconds
    );
    println!("  Initial threshold: {:.2}", spec.learning.initial_threshold);
    println!();

    println!("{}", "Logging:".bold());
    println!(
        "  Level: {}  Format: {}",
        spec.observability.logging.level, spec.observability.logging.format
    );

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = AgentConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    AgentConfigManifest::default()
        .to_yaml_file(&output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
