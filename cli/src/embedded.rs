// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-process agent host
//!
//! Composition root: configuration → repositories → interaction index →
//! runner and feedback service. Every agent command builds one of these.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use interactrack_core::{
    application::{
        create_repositories, AgentScheduler, FeedbackService, Repositories, RiskAssessmentRunner,
        RunnerConfig, SchedulerConfig, ScoringService,
    },
    domain::agent_config::AgentConfigManifest,
    infrastructure::{event_bus::EventBus, load_interaction_index},
};

/// Load, override and validate the configuration.
pub fn load_config(config_path: Option<PathBuf>) -> Result<AgentConfigManifest> {
    let config = AgentConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

/// Repositories only, for commands that never score anything.
pub async fn open_repositories(config: &AgentConfigManifest) -> Result<Repositories> {
    let backend = config.spec.storage.to_backend()?;
    create_repositories(&backend, config.spec.storage.seed_path.as_deref())
        .await
        .context("Failed to initialize storage")
}

pub struct AgentHost {
    config: AgentConfigManifest,
    runner: Arc<RiskAssessmentRunner>,
    feedback: FeedbackService,
}

impl AgentHost {
    pub async fn new(config: AgentConfigManifest) -> Result<Self> {
        let repositories = open_repositories(&config).await?;

        let dataset = &config.spec.dataset.path;
        let index = load_interaction_index(dataset).with_context(|| {
            format!(
                "Risk assessment agent unavailable: interaction dataset {} could not be loaded",
                dataset.display()
            )
        })?;

        let runner_config = RunnerConfig {
            reassessment_interval: chrono::Duration::seconds(
                i64::try_from(config.spec.assessment.reassessment_interval_seconds)
                    .context("spec.assessment.reassessment_interval_seconds is too large")?,
            ),
            initial_threshold: config.spec.learning.initial_threshold,
        };

        let runner = Arc::new(
            RiskAssessmentRunner::new(
                ScoringService::new(Arc::new(index)),
                repositories.therapies,
                repositories.learning,
                EventBus::with_default_capacity(),
                runner_config,
            )
            .await
            .context("Risk assessment agent unavailable")?,
        );
        let feedback = FeedbackService::new(runner.clone());

        info!(agent = %config.metadata.name, "Agent initialized");

        Ok(Self {
            config,
            runner,
            feedback,
        })
    }

    pub fn runner(&self) -> &Arc<RiskAssessmentRunner> {
        &self.runner
    }

    pub fn feedback(&self) -> &FeedbackService {
        &self.feedback
    }

    pub fn scheduler(&self) -> AgentScheduler {
        AgentScheduler::new(
            self.runner.clone(),
            SchedulerConfig::from(&self.config.spec.scheduler),
        )
    }
}
