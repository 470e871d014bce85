// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::risk::{ActionType, RiskLevel};
use crate::domain::therapy::{FeedbackType, TherapyId};
use crate::domain::warning::{Priority, WarningId};

/// What moved the adaptive threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdTrigger {
    CriticalRisk,
    Feedback(FeedbackType),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    TickCompleted {
        therapy_id: TherapyId,
        risk_level: RiskLevel,
        total_score: f64,
        action: ActionType,
        completed_at: DateTime<Utc>,
    },
    WarningRaised {
        warning_id: WarningId,
        therapy_id: TherapyId,
        action: ActionType,
        priority: Priority,
        raised_at: DateTime<Utc>,
    },
    ThresholdAdjusted {
        before: f64,
        after: f64,
        trigger: ThresholdTrigger,
        adjusted_at: DateTime<Utc>,
    },
    FeedbackReceived {
        therapy_id: TherapyId,
        feedback_type: FeedbackType,
        received_at: DateTime<Utc>,
    },
}

impl AgentEvent {
    pub fn therapy_id(&self) -> Option<TherapyId> {
        match self {
            AgentEvent::TickCompleted { therapy_id, .. }
            | AgentEvent::WarningRaised { therapy_id, .. }
            | AgentEvent::FeedbackReceived { therapy_id, .. } => Some(*therapy_id),
            AgentEvent::ThresholdAdjusted { .. } => None,
        }
    }
}
