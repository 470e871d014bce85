// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Therapy Aggregate
//!
//! A patient's current drug therapy under assessment. Created by case intake,
//! mutated only by the Learn step of a tick and by feedback submission, never
//! deleted by the agent.
//!
//! ## Invariants
//!
//! - The four counters are monotonically non-decreasing.
//! - `risk_history` and `feedback_history` are append-only, ordered by
//!   occurrence time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::drug::Drug;
use crate::domain::risk::{ActionType, RiskAssessment, RiskLevel};

/// Default per-therapy risk tolerance.
pub const DEFAULT_RISK_TOLERANCE: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TherapyId(pub Uuid);

impl TherapyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

impl Default for TherapyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TherapyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TherapyStatus {
    Active,
    Completed,
    Suspended,
    Modified,
}

impl TherapyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TherapyStatus::Active => "active",
            TherapyStatus::Completed => "completed",
            TherapyStatus::Suspended => "suspended",
            TherapyStatus::Modified => "modified",
        }
    }
}

impl FromStr for TherapyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(TherapyStatus::Active),
            "completed" => Ok(TherapyStatus::Completed),
            "suspended" => Ok(TherapyStatus::Suspended),
            "modified" => Ok(TherapyStatus::Modified),
            other => Err(format!("unknown therapy status: {}", other)),
        }
    }
}

impl fmt::Display for TherapyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User classification of a past warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Confirmed,
    Ignored,
    FalseAlarm,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Confirmed => "confirmed",
            FeedbackType::Ignored => "ignored",
            FeedbackType::FalseAlarm => "false_alarm",
        }
    }
}

impl FromStr for FeedbackType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(FeedbackType::Confirmed),
            "ignored" => Ok(FeedbackType::Ignored),
            "false_alarm" => Ok(FeedbackType::FalseAlarm),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one tick's assessment, appended by Learn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub total_score: f64,
    pub risk_level: RiskLevel,
    pub action_taken: ActionType,
    pub interaction_count: usize,
    pub critical_count: usize,
    pub high_risk_count: usize,
}

impl RiskHistoryEntry {
    pub fn from_assessment(
        assessment: &RiskAssessment,
        action: ActionType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            total_score: assessment.total_score,
            risk_level: assessment.risk_level,
            action_taken: action,
            interaction_count: assessment.interaction_count(),
            critical_count: assessment.critical_count(),
            high_risk_count: assessment.high_risk_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub timestamp: DateTime<Utc>,
    pub feedback_type: FeedbackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Therapy {
    pub id: TherapyId,
    pub patient_id: String,
    pub drugs: Vec<Drug>,
    pub status: TherapyStatus,
    pub start_date: DateTime<Utc>,
    pub risk_tolerance: f64,
    pub ignored_warnings_count: u32,
    pub previous_incidents: u32,
    pub confirmed_warnings_count: u32,
    pub false_alarms_count: u32,
    pub risk_history: Vec<RiskHistoryEntry>,
    pub feedback_history: Vec<FeedbackRecord>,
    pub updated_at: DateTime<Utc>,
}

impl Therapy {
    /// New active therapy with zeroed counters and empty histories.
    pub fn new(patient_id: impl Into<String>, drugs: Vec<Drug>) -> Self {
        let now = Utc::now();
        Self {
            id: TherapyId::new(),
            patient_id: patient_id.into(),
            drugs,
            status: TherapyStatus::Active,
            start_date: now,
            risk_tolerance: DEFAULT_RISK_TOLERANCE,
            ignored_warnings_count: 0,
            previous_incidents: 0,
            confirmed_warnings_count: 0,
            false_alarms_count: 0,
            risk_history: Vec::new(),
            feedback_history: Vec::new(),
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TherapyStatus::Active
    }

    /// Distinct drug identifiers in attachment order.
    pub fn drug_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.drugs.len());
        for drug in &self.drugs {
            if !ids.contains(&drug.drug_id) {
                ids.push(drug.drug_id.clone());
            }
        }
        ids
    }

    pub fn drug_count(&self) -> usize {
        self.drugs.len()
    }

    pub fn has_multiple_drugs(&self) -> bool {
        self.drugs.len() > 1
    }

    pub fn add_drug(&mut self, drug: Drug) {
        self.drugs.push(drug);
        self.updated_at = Utc::now();
    }

    /// Returns whether a drug with that identifier was attached.
    pub fn remove_drug(&mut self, drug_id: &str) -> bool {
        let before = self.drugs.len();
        self.drugs.retain(|d| d.drug_id != drug_id);
        let removed = self.drugs.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn last_assessment_time(&self) -> Option<DateTime<Utc>> {
        self.risk_history.last().map(|entry| entry.timestamp)
    }

    pub fn last_risk_level(&self) -> Option<RiskLevel> {
        self.risk_history.last().map(|entry| entry.risk_level)
    }

    pub fn record_assessment(&mut self, entry: RiskHistoryEntry) {
        self.updated_at = entry.timestamp;
        self.risk_history.push(entry);
    }

    /// Append a feedback record and bump the matching counter.
    pub fn record_feedback(&mut self, feedback_type: FeedbackType, notes: Option<String>) {
        let now = Utc::now();
        match feedback_type {
            FeedbackType::Confirmed => self.confirmed_warnings_count += 1,
            FeedbackType::Ignored => self.ignored_warnings_count += 1,
            FeedbackType::FalseAlarm => self.false_alarms_count += 1,
        }
        self.feedback_history.push(FeedbackRecord {
            timestamp: now,
            feedback_type,
            notes,
        });
        self.updated_at = now;
    }

    /// Occurrences of a feedback type in the history.
    pub fn feedback_count(&self, feedback_type: FeedbackType) -> usize {
        self.feedback_history
            .iter()
            .filter(|record| record.feedback_type == feedback_type)
            .count()
    }
}

/// What Sense observes about one therapy. Lives for a single tick.
#[derive(Debug, Clone)]
pub struct TherapyPercept {
    pub therapy: Therapy,
    pub requires_assessment: bool,
    pub last_assessment_time: Option<DateTime<Utc>>,
}

impl TherapyPercept {
    pub fn observe(therapy: Therapy, now: DateTime<Utc>, reassessment_window: Duration) -> Self {
        let last_assessment_time = therapy.last_assessment_time();
        let requires_assessment = match last_assessment_time {
            None => true,
            Some(last) => now - last > reassessment_window,
        };
        Self {
            therapy,
            requires_assessment,
            last_assessment_time,
        }
    }

    pub fn should_be_assessed(&self) -> bool {
        self.requires_assessment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn therapy() -> Therapy {
        Therapy::new(
            "patient-1",
            vec![Drug::new("DB001", "Warfarin"), Drug::new("DB002", "Aspirin")],
        )
    }

    fn entry_at(timestamp: DateTime<Utc>) -> RiskHistoryEntry {
        RiskHistoryEntry {
            timestamp,
            total_score: 2.0,
            risk_level: RiskLevel::Low,
            action_taken: ActionType::Inform,
            interaction_count: 1,
            critical_count: 0,
            high_risk_count: 0,
        }
    }

    #[test]
    fn test_new_therapy_defaults() {
        let t = therapy();
        assert!(t.is_active());
        assert_eq!(t.risk_tolerance, DEFAULT_RISK_TOLERANCE);
        assert_eq!(t.ignored_warnings_count, 0);
        assert_eq!(t.previous_incidents, 0);
        assert!(t.risk_history.is_empty());
        assert!(t.last_risk_level().is_none());
    }

    #[test]
    fn test_drug_ids_are_distinct_in_order() {
        let mut t = therapy();
        t.add_drug(Drug::new("DB001", "Warfarin").with_dosage("2mg"));
        assert_eq!(t.drug_count(), 3);
        assert_eq!(t.drug_ids(), vec!["DB001".to_string(), "DB002".to_string()]);

        assert!(t.remove_drug("DB001"));
        assert!(!t.remove_drug("DB999"));
        assert_eq!(t.drug_ids(), vec!["DB002".to_string()]);
        assert!(!t.has_multiple_drugs());
    }

    #[test]
    fn test_record_feedback_increments_matching_counter() {
        let mut t = therapy();
        t.record_feedback(FeedbackType::Confirmed, None);
        t.record_feedback(FeedbackType::FalseAlarm, Some("not relevant".into()));
        t.record_feedback(FeedbackType::Ignored, None);
        t.record_feedback(FeedbackType::Ignored, None);

        assert_eq!(t.confirmed_warnings_count, 1);
        assert_eq!(t.false_alarms_count, 1);
        assert_eq!(t.ignored_warnings_count, 2);
        assert_eq!(t.feedback_history.len(), 4);
        assert_eq!(t.feedback_count(FeedbackType::Ignored), 2);
        assert_eq!(t.feedback_history[1].notes.as_deref(), Some("not relevant"));
    }

    #[test]
    fn test_feedback_type_parsing() {
        assert_eq!(" Confirmed ".parse::<FeedbackType>(), Ok(FeedbackType::Confirmed));
        assert_eq!("FALSE_ALARM".parse::<FeedbackType>(), Ok(FeedbackType::FalseAlarm));
        assert!("maybe".parse::<FeedbackType>().is_err());
        assert_eq!(serde_json::to_string(&FeedbackType::FalseAlarm).unwrap(), "\"false_alarm\"");
    }

    #[test]
    fn test_percept_requires_assessment_without_history() {
        let percept = TherapyPercept::observe(therapy(), Utc::now(), Duration::seconds(3600));
        assert!(percept.should_be_assessed());
        assert!(percept.last_assessment_time.is_none());
    }

    #[test]
    fn test_percept_window_is_strict() {
        let now = Utc::now();
        let window = Duration::seconds(3600);

        let mut recent = therapy();
        recent.record_assessment(entry_at(now - window));
        assert!(!TherapyPercept::observe(recent, now, window).should_be_assessed());

        let mut stale = therapy();
        stale.record_assessment(entry_at(now - window - Duration::seconds(1)));
        assert!(TherapyPercept::observe(stale, now, window).should_be_assessed());
    }
}
