// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Warnings
//!
//! Produced by the Act step for every action except `Inform`. A warning is a
//! transient artifact handed back to the caller; it is not persisted by the
//! agent and its status stays `Pending` (feedback mutates the therapy and the
//! learning state, not the warning).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::risk::{ActionType, RiskAssessment, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WarningId(pub Uuid);

impl WarningId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WarningId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Highest,
}

impl From<RiskLevel> for Priority {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Critical => Priority::Highest,
            RiskLevel::High => Priority::High,
            RiskLevel::Moderate => Priority::Medium,
            RiskLevel::Low | RiskLevel::None => Priority::Low,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Highest => "HIGHEST",
        };
        f.write_str(label)
    }
}

/// Warnings are returned to the caller and never tracked afterwards, so
/// `Pending` is the only status the agent produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningStatus {
    Pending,
}

#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub id: WarningId,
    #[serde(skip)]
    pub assessment: RiskAssessment,
    pub action_type: ActionType,
    pub message: String,
    pub priority: Priority,
    pub suggestions: Vec<String>,
    pub status: WarningStatus,
    pub timestamp: DateTime<Utc>,
}

impl Warning {
    /// Build the warning for a decided action. `Inform` yields `None`.
    pub fn compose(assessment: &RiskAssessment, action: ActionType) -> Option<Self> {
        if action == ActionType::Inform {
            return None;
        }

        Some(Self {
            id: WarningId::new(),
            assessment: assessment.clone(),
            action_type: action,
            message: compose_message(assessment, action),
            priority: Priority::from(assessment.risk_level),
            suggestions: compose_suggestions(assessment),
            status: WarningStatus::Pending,
            timestamp: Utc::now(),
        })
    }
}

/// Fixed per-action message template.
pub fn compose_message(assessment: &RiskAssessment, action: ActionType) -> String {
    match action {
        ActionType::Escalate => format!(
            "CRITICAL RISK! Found {} critical interactions. CONSULT A PHYSICIAN IMMEDIATELY!",
            assessment.critical_count()
        ),
        ActionType::Warn => format!(
            "HIGH RISK! {} interactions with a combined score of {:.1}. Therapy modification is recommended.",
            assessment.interaction_count(),
            assessment.total_score
        ),
        ActionType::RequestInfo => format!(
            "MODERATE RISK. {} interactions found. Please confirm the therapy is correct.",
            assessment.interaction_count()
        ),
        ActionType::Inform => format!(
            "{} interactions found. Regular monitoring is recommended.",
            assessment.interaction_count()
        ),
    }
}

pub fn compose_suggestions(assessment: &RiskAssessment) -> Vec<String> {
    let mut suggestions = Vec::new();

    if assessment.critical_count() > 0 {
        suggestions.push("Consult a physician urgently".to_string());
        suggestions.push("Consider replacing the critically interacting drugs".to_string());
    }

    if assessment.high_risk_count() > 0 {
        suggestions.push("Increase monitoring of vital signs".to_string());
        suggestions.push("Consider alternative drugs with lower risk".to_string());
    }

    if assessment.interaction_count() > 5 {
        suggestions.push("Simplify the therapy where possible".to_string());
        suggestions.push("Consider consolidating medications".to_string());
    }

    if assessment.total_score > 10.0 {
        suggestions.push("Consider hospitalization for monitoring".to_string());
    }

    suggestions
}
