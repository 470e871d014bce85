// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent Scheduler - Background tick loop
//!
//! Runs one tick, sleeps for the tick interval (or the longer error backoff
//! after a failed tick), repeats. Tick failures are logged and never end the
//! loop. Cancellation is observed between ticks only, so an in-flight tick
//! always completes.
//!
//! Ticks that found work are kept in a bounded in-memory history, whether
//! they came from the loop or from an on-demand [`AgentScheduler::tick_now`].
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Periodic driver for the risk assessment runner

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::application::runner::{AgentError, RiskAssessmentRunner, TickResult};
use crate::domain::agent_config::SchedulerSettings;
use crate::domain::risk::ActionType;
use crate::domain::therapy::TherapyId;

/// Anything that can run one agent tick.
#[async_trait]
pub trait TickRunner: Send + Sync {
    async fn tick(&self) -> Result<TickResult, AgentError>;
}

#[async_trait]
impl TickRunner for RiskAssessmentRunner {
    async fn tick(&self) -> Result<TickResult, AgentError> {
        RiskAssessmentRunner::tick(self).await
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    pub error_backoff: Duration,
    pub history_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            error_backoff: Duration::from_secs(10),
            history_limit: 50,
        }
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self {
            tick_interval: Duration::from_secs(settings.tick_interval_seconds),
            error_backoff: Duration::from_secs(settings.error_backoff_seconds),
            history_limit: settings.history_limit,
        }
    }
}

/// One line of the "recent actions" view.
#[derive(Debug, Clone, Serialize)]
pub struct RecentAction {
    pub therapy_id: Option<TherapyId>,
    pub patient_id: Option<String>,
    pub action: Option<ActionType>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub total_ticks: u64,
    pub failed_ticks: u64,
    pub history_len: usize,
    pub recent_actions: Vec<RecentAction>,
}

const RECENT_ACTIONS: usize = 5;

pub struct AgentScheduler {
    runner: Arc<dyn TickRunner>,
    config: SchedulerConfig,
    history: Mutex<VecDeque<TickResult>>,
    total_ticks: AtomicU64,
    failed_ticks: AtomicU64,
    running: AtomicBool,
    shutdown_token: CancellationToken,
}

impl AgentScheduler {
    pub fn new(runner: Arc<dyn TickRunner>, config: SchedulerConfig) -> Self {
        Self {
            runner,
            config,
            history: Mutex::new(VecDeque::new()),
            total_ticks: AtomicU64::new(0),
            failed_ticks: AtomicU64::new(0),
            running: AtomicBool::new(false),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run until the shutdown token is cancelled.
    pub async fn run(&self) {
        info!(
            tick_interval_ms = self.config.tick_interval.as_millis() as u64,
            error_backoff_ms = self.config.error_backoff.as_millis() as u64,
            history_limit = self.config.history_limit,
            "Starting agent scheduler"
        );
        self.running.store(true, Ordering::SeqCst);

        loop {
            if self.shutdown_token.is_cancelled() {
                break;
            }

            let pause = match self.tick_now().await {
                Ok(result) => {
                    if let (Some(patient_id), Some(action)) = (&result.patient_id, result.action_taken) {
                        info!(
                            tick = self.total_ticks.load(Ordering::SeqCst),
                            patient_id = %patient_id,
                            action = %action,
                            "Tick completed"
                        );
                    }
                    self.config.tick_interval
                }
                Err(e) => {
                    error!(error = %e, backoff_ms = self.config.error_backoff.as_millis() as u64, "Agent tick failed");
                    self.config.error_backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping agent scheduler");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Agent scheduler stopped");
    }

    /// Run one tick immediately and record it in the history.
    pub async fn tick_now(&self) -> Result<TickResult, AgentError> {
        self.total_ticks.fetch_add(1, Ordering::SeqCst);
        match self.runner.tick().await {
            Ok(result) => {
                if result.has_work {
                    self.record(result.clone());
                } else {
                    debug!("Tick found no work");
                }
                Ok(result)
            }
            Err(e) => {
                self.failed_ticks.fetch_add(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn record(&self, result: TickResult) {
        let mut history = self.history.lock();
        history.push_back(result);
        while history.len() > self.config.history_limit {
            history.pop_front();
        }
    }

    /// Most recent has-work ticks, oldest first.
    pub fn history(&self, limit: usize) -> Vec<TickResult> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SchedulerStatus {
        let recent_actions = self
            .history(RECENT_ACTIONS)
            .into_iter()
            .map(|r| RecentAction {
                therapy_id: r.therapy_id,
                patient_id: r.patient_id,
                action: r.action_taken,
                timestamp: r.timestamp,
            })
            .collect();

        SchedulerStatus {
            running: self.is_running(),
            total_ticks: self.total_ticks.load(Ordering::SeqCst),
            failed_ticks: self.failed_ticks.load(Ordering::SeqCst),
            history_len: self.history.lock().len(),
            recent_actions,
        }
    }
}
