// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Feedback Service
//!
//! Entry point for user feedback on past warnings. Input is validated before
//! anything is touched; valid feedback is recorded on the therapy and fed to
//! the learning state through the runner, which serializes it against ticks.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Validate feedback, apply learning, report the outcome

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::application::runner::RiskAssessmentRunner;
use crate::domain::learning::round2;
use crate::domain::repository::RepositoryError;
use crate::domain::therapy::{FeedbackType, TherapyId};

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("Invalid feedback type '{0}': expected one of confirmed, false_alarm, ignored")]
    InvalidFeedbackType(String),

    #[error("Therapy id is required")]
    MissingTherapyId,

    #[error("Invalid therapy id '{0}'")]
    InvalidTherapyId(String),

    #[error("Therapy {0} not found")]
    TherapyNotFound(TherapyId),

    #[error("Failed to persist feedback: {0}")]
    Persistence(#[from] RepositoryError),
}

/// Therapy counters after the feedback was applied.
#[derive(Debug, Clone, Serialize)]
pub struct TherapySnapshot {
    pub id: TherapyId,
    pub patient_id: String,
    pub confirmed_warnings: u32,
    pub false_alarms: u32,
    pub ignored_warnings: u32,
    pub total_feedback: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackResult {
    pub therapy_id: TherapyId,
    pub feedback_type: FeedbackType,
    pub learning_applied: bool,
    pub threshold_before: f64,
    pub threshold_after: f64,
    pub threshold_change: f64,
    pub therapy_snapshot: TherapySnapshot,
}

#[derive(Clone)]
pub struct FeedbackService {
    runner: Arc<RiskAssessmentRunner>,
}

impl FeedbackService {
    pub fn new(runner: Arc<RiskAssessmentRunner>) -> Self {
        Self { runner }
    }

    pub async fn submit_feedback(
        &self,
        therapy_id: &str,
        feedback_type: &str,
        notes: Option<String>,
    ) -> Result<FeedbackResult, FeedbackError> {
        let feedback_type: FeedbackType = feedback_type
            .parse()
            .map_err(FeedbackError::InvalidFeedbackType)?;

        let therapy_id = therapy_id.trim();
        if therapy_id.is_empty() {
            return Err(FeedbackError::MissingTherapyId);
        }
        let therapy_id = TherapyId::from_string(therapy_id)
            .map_err(|_| FeedbackError::InvalidTherapyId(therapy_id.to_string()))?;

        let notes = notes.filter(|n| !n.trim().is_empty());

        let applied = self
            .runner
            .apply_feedback(therapy_id, feedback_type, notes)
            .await
            .map_err(|e| {
                warn!(therapy_id = %therapy_id, error = %e, "Feedback could not be applied");
                FeedbackError::Persistence(e)
            })?
            .ok_or(FeedbackError::TherapyNotFound(therapy_id))?;

        let change = applied.threshold_change;
        let therapy = applied.therapy;

        Ok(FeedbackResult {
            therapy_id,
            feedback_type,
            learning_applied: true,
            threshold_before: change.before,
            threshold_after: change.after,
            threshold_change: round2(change.after - change.before),
            therapy_snapshot: TherapySnapshot {
                id: therapy.id,
                patient_id: therapy.patient_id.clone(),
                confirmed_warnings: therapy.confirmed_warnings_count,
                false_alarms: therapy.false_alarms_count,
                ignored_warnings: therapy.ignored_warnings_count,
                total_feedback: therapy.feedback_history.len(),
            },
        })
    }
}
