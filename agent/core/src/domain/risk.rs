// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Risk Levels, Actions and Assessments
//!
//! `RiskLevel` and `ActionType` are closed, ordered enums. Comparisons between
//! levels go through their derived `Ord` (declaration order), never through
//! string equality.
//!
//! ## Risk Level Breakpoints (on the maximum pairwise score)
//! | Max score | Level |
//! |-----------|-------|
//! | ≥ 4.5 | `Critical` |
//! | ≥ 3.5 | `High` |
//! | ≥ 2.5 | `Moderate` |
//! | ≥ 1.0 | `Low` |
//! | otherwise | `None` |

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::drug::DrugInteraction;

/// Maximum number of interaction details included in a serialized assessment.
pub const MAX_REPORTED_INTERACTIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    None,
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    /// Discretize a maximum pairwise score. Breakpoints are inclusive.
    pub fn from_score(score: f64) -> Self {
        if score >= 4.5 {
            RiskLevel::Critical
        } else if score >= 3.5 {
            RiskLevel::High
        } else if score >= 2.5 {
            RiskLevel::Moderate
        } else if score >= 1.0 {
            RiskLevel::Low
        } else {
            RiskLevel::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "NONE",
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(RiskLevel::None),
            "LOW" => Ok(RiskLevel::Low),
            "MODERATE" => Ok(RiskLevel::Moderate),
            "HIGH" => Ok(RiskLevel::High),
            "CRITICAL" => Ok(RiskLevel::Critical),
            other => Err(format!("unknown risk level: {}", other)),
        }
    }
}

/// What the agent does with an assessment, in increasing order of urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Informational log only; no warning is produced
    Inform,
    /// Ask the user to confirm the therapy
    RequestInfo,
    /// Warn the user
    Warn,
    /// Recommend consulting a clinician
    Escalate,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Inform => "INFORM",
            ActionType::RequestInfo => "REQUEST_INFO",
            ActionType::Warn => "WARN",
            ActionType::Escalate => "ESCALATE",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate risk for a drug set at one point in time.
///
/// Derived, never stored on its own: a snapshot lands in the therapy's risk
/// history during Learn. Contains no timestamp so that assessing an unchanged
/// drug set twice yields equal values.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub total_score: f64,
    pub max_score: f64,
    pub risk_level: RiskLevel,
    pub interactions: Vec<DrugInteraction>,
}

impl RiskAssessment {
    /// The floor for therapies with fewer than two drugs.
    pub fn none() -> Self {
        Self {
            total_score: 0.0,
            max_score: 0.0,
            risk_level: RiskLevel::None,
            interactions: Vec::new(),
        }
    }

    pub fn from_interactions(interactions: Vec<DrugInteraction>) -> Self {
        let total_score = interactions.iter().map(|i| i.risk_score).sum();
        let max_score = interactions
            .iter()
            .map(|i| i.risk_score)
            .fold(0.0_f64, f64::max);

        Self {
            total_score,
            max_score,
            risk_level: RiskLevel::from_score(max_score),
            interactions,
        }
    }

    pub fn has_critical_interactions(&self) -> bool {
        self.interactions.iter().any(DrugInteraction::is_critical)
    }

    pub fn critical_count(&self) -> usize {
        self.interactions.iter().filter(|i| i.is_critical()).count()
    }

    pub fn high_risk_count(&self) -> usize {
        self.interactions.iter().filter(|i| i.is_high_risk()).count()
    }

    pub fn interaction_count(&self) -> usize {
        self.interactions.len()
    }

    pub fn average_score(&self) -> f64 {
        if self.interactions.is_empty() {
            0.0
        } else {
            self.total_score / self.interactions.len() as f64
        }
    }

    /// Record count per risk category, ordered by category label.
    pub fn category_breakdown(&self) -> BTreeMap<String, usize> {
        let mut categories = BTreeMap::new();
        for interaction in &self.interactions {
            *categories.entry(interaction.risk_category.clone()).or_insert(0) += 1;
        }
        categories
    }

    pub fn summary(&self) -> AssessmentSummary {
        AssessmentSummary {
            total_score: self.total_score,
            max_score: self.max_score,
            average_score: self.average_score(),
            risk_level: self.risk_level,
            interaction_count: self.interaction_count(),
            critical_count: self.critical_count(),
            high_risk_count: self.high_risk_count(),
            categories: self.category_breakdown(),
            interactions: self
                .interactions
                .iter()
                .take(MAX_REPORTED_INTERACTIONS)
                .map(InteractionDetail::from)
                .collect(),
        }
    }
}

impl Serialize for RiskAssessment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.summary().serialize(serializer)
    }
}

/// Serializable view of a `RiskAssessment` handed to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentSummary {
    pub total_score: f64,
    pub max_score: f64,
    pub average_score: f64,
    pub risk_level: RiskLevel,
    pub interaction_count: usize,
    pub critical_count: usize,
    pub high_risk_count: usize,
    pub categories: BTreeMap<String, usize>,
    pub interactions: Vec<InteractionDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionDetail {
    pub drug1_id: String,
    pub drug2_id: String,
    #[serde(rename = "type")]
    pub interaction_type: String,
    pub score: f64,
    pub category: String,
    pub is_critical: bool,
    pub is_high_risk: bool,
}

impl From<&DrugInteraction> for InteractionDetail {
    fn from(interaction: &DrugInteraction) -> Self {
        Self {
            drug1_id: interaction.drug1_id.clone(),
            drug2_id: interaction.drug2_id.clone(),
            interaction_type: interaction.interaction_type.clone(),
            score: interaction.risk_score,
            category: interaction.risk_category.clone(),
            is_critical: interaction.is_critical(),
            is_high_risk: interaction.is_high_risk(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction(a: &str, b: &str, score: f64, category: &str) -> DrugInteraction {
        DrugInteraction {
            drug1_id: a.to_string(),
            drug2_id: b.to_string(),
            interaction_type: "test".to_string(),
            risk_score: score,
            risk_category: category.to_string(),
        }
    }

    #[test]
    fn test_risk_level_breakpoints_are_exact() {
        assert_eq!(RiskLevel::from_score(4.5), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(4.49999), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(3.5), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(3.49999), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(2.5), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(1.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.99999), RiskLevel::None);
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::None);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::High > RiskLevel::Moderate);
        assert!(RiskLevel::Moderate > RiskLevel::Low);
        assert!(RiskLevel::Low > RiskLevel::None);
        assert!(ActionType::Escalate > ActionType::Warn);
        assert!(ActionType::RequestInfo > ActionType::Inform);
    }

    #[test]
    fn test_risk_level_parse_and_serde() {
        assert_eq!("critical".parse::<RiskLevel>().unwrap(), RiskLevel::Critical);
        assert!("MEDIUM".parse::<RiskLevel>().is_err());
        assert_eq!(serde_json::to_string(&RiskLevel::Moderate).unwrap(), "\"MODERATE\"");
        assert_eq!(serde_json::to_string(&ActionType::RequestInfo).unwrap(), "\"REQUEST_INFO\"");
    }

    #[test]
    fn test_assessment_aggregates() {
        let assessment = RiskAssessment::from_interactions(vec![
            interaction("A", "B", 5.0, "CRITICAL_BLEEDING"),
            interaction("A", "B", 3.0, "MODERATE"),
            interaction("A", "C", 2.0, "LOW"),
        ]);

        assert_eq!(assessment.total_score, 10.0);
        assert_eq!(assessment.max_score, 5.0);
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
        assert_eq!(assessment.critical_count(), 1);
        assert_eq!(assessment.high_risk_count(), 2);
        assert_eq!(assessment.interaction_count(), 3);
        assert!(assessment.has_critical_interactions());

        let categories = assessment.category_breakdown();
        assert_eq!(categories.get("CRITICAL_BLEEDING"), Some(&1));
        assert_eq!(categories.len(), 3);
    }

    #[test]
    fn test_empty_assessment_is_none_level() {
        let assessment = RiskAssessment::from_interactions(vec![]);
        assert_eq!(assessment, RiskAssessment::none());
        assert_eq!(assessment.average_score(), 0.0);
    }

    #[test]
    fn test_serialized_summary_truncates_interactions() {
        let interactions = (0..15)
            .map(|i| interaction("A", &format!("D{}", i), 2.0, "LOW"))
            .collect();
        let assessment = RiskAssessment::from_interactions(interactions);

        let json = serde_json::to_value(&assessment).unwrap();
        assert_eq!(json["interaction_count"], 15);
        assert_eq!(json["interactions"].as_array().unwrap().len(), MAX_REPORTED_INTERACTIONS);
        assert_eq!(json["risk_level"], "LOW");
        assert_eq!(json["interactions"][0]["type"], "test");
    }
}
