// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Records scoring at or above this value are critical and force escalation.
pub const CRITICAL_INTERACTION_SCORE: f64 = 4.5;

/// Records scoring at or above this value count towards the high-risk tally.
/// Not the same cutoff as the `RiskLevel::High` breakpoint (3.5).
pub const HIGH_RISK_INTERACTION_SCORE: f64 = 3.0;

/// A drug attached to a therapy. Immutable once attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drug {
    pub drug_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
}

impl Drug {
    pub fn new(drug_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            drug_id: drug_id.into(),
            name: name.into(),
            dosage: None,
        }
    }

    pub fn with_dosage(mut self, dosage: impl Into<String>) -> Self {
        self.dosage = Some(dosage.into());
        self
    }
}

impl fmt::Display for Drug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.drug_id)
    }
}

/// A documented interaction between two drugs, taken verbatim from the
/// precomputed interaction dataset. Never created or mutated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugInteraction {
    pub drug1_id: String,
    pub drug2_id: String,
    pub interaction_type: String,
    pub risk_score: f64,
    pub risk_category: String,
}

impl DrugInteraction {
    pub fn is_critical(&self) -> bool {
        self.risk_score >= CRITICAL_INTERACTION_SCORE
    }

    pub fn is_high_risk(&self) -> bool {
        self.risk_score >= HIGH_RISK_INTERACTION_SCORE
    }
}

impl fmt::Display for DrugInteraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}+{}: {} (score: {})",
            self.drug1_id, self.drug2_id, self.interaction_type, self.risk_score
        )
    }
}

/// Read-only lookup of interaction records for an unordered drug pair.
///
/// Implemented by `infrastructure::interaction_index::InteractionIndex`.
/// A miss is an empty vector, never an error.
pub trait InteractionLookup: Send + Sync {
    fn lookup(&self, drug_a: &str, drug_b: &str) -> Vec<DrugInteraction>;
}
