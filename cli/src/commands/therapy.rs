// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Therapy intake commands
//!
//! Commands: add, list, show

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use interactrack_core::{
    domain::{
        agent_config::{AgentConfigManifest, StorageBackendKind},
        drug::Drug,
        repository::TherapyRepository,
        therapy::{Therapy, TherapyId},
    },
    infrastructure::{append_therapy_seed, TherapySeed},
};

use crate::embedded::open_repositories;

#[derive(Subcommand)]
pub enum TherapyCommand {
    /// Register a new active therapy
    Add {
        /// Patient identifier
        #[arg(long)]
        patient: String,

        /// Drug as ID[:NAME[:DOSAGE]], repeatable
        #[arg(long = "drug", value_name = "DRUG")]
        drugs: Vec<String>,

        /// Per-therapy risk tolerance
        #[arg(long)]
        risk_tolerance: Option<f64>,

        /// Known prior adverse incidents
        #[arg(long, default_value_t = 0)]
        previous_incidents: u32,
    },

    /// List therapies
    List {
        /// Include therapies that are not active
        #[arg(long)]
        all: bool,
    },

    /// Show one therapy with its risk and feedback history
    Show {
        #[arg(value_name = "THERAPY_ID")]
        therapy_id: String,
    },
}

pub async fn handle_command(command: TherapyCommand, config: AgentConfigManifest) -> Result<()> {
    match command {
        TherapyCommand::Add {
            patient,
            drugs,
            risk_tolerance,
            previous_incidents,
        } => add(config, patient, drugs, risk_tolerance, previous_incidents).await,
        TherapyCommand::List { all } => list(config, all).await,
        TherapyCommand::Show { therapy_id } => show(config, &therapy_id).await,
    }
}

/// Parse `ID[:NAME[:DOSAGE]]`. The name defaults to the id.
pub fn parse_drug_spec(spec: &str) -> Result<Drug> {
    let mut parts = spec.splitn(3, ':').map(str::trim);
    let id = parts.next().unwrap_or_default();
    if id.is_empty() {
        anyhow::bail!("Drug '{}' has an empty id", spec);
    }
    let name = parts.next().filter(|s| !s.is_empty()).unwrap_or(id);
    let drug = Drug::new(id, name);
    Ok(match parts.next().filter(|s| !s.is_empty()) {
        Some(dosage) => drug.with_dosage(dosage),
        None => drug,
    })
}

async fn add(
    config: AgentConfigManifest,
    patient: String,
    drug_specs: Vec<String>,
    risk_tolerance: Option<f64>,
    previous_incidents: u32,
) -> Result<()> {
    let drugs = drug_specs
        .iter()
        .map(|s| parse_drug_spec(s))
        .collect::<Result<Vec<_>>>()?;

    let seed = TherapySeed {
        id: Some(TherapyId::new()),
        patient_id: patient,
        drugs,
        risk_tolerance,
        previous_incidents,
    };

    let storage = &config.spec.storage;
    let therapy = match (storage.backend, &storage.seed_path) {
        (StorageBackendKind::Postgres, _) => {
            let repositories = open_repositories(&config).await?;
            repositories
                .therapies
                .save(&seed.into_therapy())
                .await
                .context("Failed to save therapy")?
        }
        (StorageBackendKind::InMemory, Some(path)) => {
            let therapy = seed.clone().into_therapy();
            append_therapy_seed(path, seed)
                .with_context(|| format!("Failed to update seed file {}", path.display()))?;
            therapy
        }
        (StorageBackendKind::InMemory, None) => {
            anyhow::bail!(
                "The in_memory backend has nowhere to keep this therapy. \
                 Set spec.storage.seed_path or use the postgres backend."
            );
        }
    };

    println!(
        "{}",
        format!("✓ Therapy {} registered for {}", therapy.id, therapy.patient_id).green()
    );
    Ok(())
}

async fn list(config: AgentConfigManifest, include_inactive: bool) -> Result<()> {
    let repositories = open_repositories(&config).await?;
    let therapies = if include_inactive {
        repositories.therapies.find_all().await?
    } else {
        repositories.therapies.find_all_active().await?
    };

    if therapies.is_empty() {
        println!("{}", "No therapies found".dimmed());
        return Ok(());
    }

    println!(
        "{:<38} {:<16} {:<10} {:>5}  {}",
        "ID".bold(),
        "PATIENT".bold(),
        "STATUS".bold(),
        "DRUGS".bold(),
        "LAST RISK".bold()
    );
    for therapy in &therapies {
        let last = therapy
            .last_risk_level()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<38} {:<16} {:<10} {:>5}  {}",
            therapy.id.to_string(),
            therapy.patient_id,
            therapy.status.to_string(),
            therapy.drug_count(),
            last
        );
    }
    Ok(())
}

async fn show(config: AgentConfigManifest, therapy_id: &str) -> Result<()> {
    let id = TherapyId::from_string(therapy_id)
        .with_context(|| format!("Invalid therapy id '{}'", therapy_id))?;
    let repositories = open_repositories(&config).await?;
    let therapy: Therapy = repositories
        .therapies
        .find_by_id(id)
        .await?
        .with_context(|| format!("Therapy {} not found", id))?;

    println!("{}", serde_json::to_string_pretty(&therapy)?);
    Ok(())
}
