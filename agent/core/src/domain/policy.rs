// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Decision Policy
//!
//! Maps a [`RiskAssessment`] plus a therapy's case history to an [`ActionType`]
//! using the adaptive threshold owned by the learning state.
//!
//! Evaluation order:
//!
//! 1. Any critical interaction record → `Escalate`. Nothing overrides this.
//! 2. Compute the effective threshold from the adaptive threshold, ignored
//!    warnings, prior incidents, feedback trust and drug count.
//! 3. Therapies with feedback history use the feedback-aware bands; all
//!    others use the standard bands around the effective threshold.

use serde::Serialize;

use crate::domain::learning::{round2, MAX_ADAPTIVE_THRESHOLD, MIN_ADAPTIVE_THRESHOLD};
use crate::domain::risk::{ActionType, RiskAssessment};
use crate::domain::therapy::{FeedbackType, Therapy};

pub const NEUTRAL_TRUST: f64 = 0.5;
pub const MIN_TRUST: f64 = 0.1;
pub const MAX_TRUST: f64 = 0.9;

const IGNORED_WARNING_WEIGHT: f64 = 0.15;
const INCIDENT_WEIGHT: f64 = 0.2;
const CONFIRMED_WARNING_WEIGHT: f64 = 0.1;
const WARN_MARGIN: f64 = 2.0;

/// Confidence in [0.1, 0.9] that warnings for this therapy are useful,
/// derived from its feedback history. Fewer than two entries → 0.5.
pub fn trust_factor(therapy: &Therapy) -> f64 {
    let total = therapy.feedback_history.len();
    if total < 2 {
        return NEUTRAL_TRUST;
    }

    let total = total as f64;
    let accuracy = therapy.feedback_count(FeedbackType::Confirmed) as f64 / total;
    let false_rate = therapy.feedback_count(FeedbackType::FalseAlarm) as f64 / total;

    (accuracy * 0.7 + (1.0 - false_rate) * 0.3).clamp(MIN_TRUST, MAX_TRUST)
}

/// Outcome of one policy evaluation, with the intermediate values that led
/// to it (logged by the runner).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolicyDecision {
    pub action: ActionType,
    pub effective_threshold: f64,
    pub trust_factor: f64,
    pub feedback_aware: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    adaptive_threshold: f64,
}

impl DecisionPolicy {
    pub fn new(adaptive_threshold: f64) -> Self {
        Self { adaptive_threshold }
    }

    pub fn adaptive_threshold(&self) -> f64 {
        self.adaptive_threshold
    }

    pub fn decide(&self, assessment: &RiskAssessment, therapy: &Therapy) -> ActionType {
        self.evaluate(assessment, therapy).action
    }

    pub fn evaluate(&self, assessment: &RiskAssessment, therapy: &Therapy) -> PolicyDecision {
        let trust = trust_factor(therapy);
        let effective_threshold = self.effective_threshold(therapy, trust);
        let feedback_aware = !therapy.feedback_history.is_empty();

        let action = if assessment.has_critical_interactions() {
            ActionType::Escalate
        } else if feedback_aware {
            self.feedback_aware_action(assessment, therapy, trust)
        } else if assessment.total_score >= effective_threshold + WARN_MARGIN {
            ActionType::Warn
        } else if assessment.total_score >= effective_threshold {
            ActionType::RequestInfo
        } else {
            ActionType::Inform
        };

        PolicyDecision {
            action,
            effective_threshold,
            trust_factor: trust,
            feedback_aware,
        }
    }

    /// Adaptive threshold adjusted for this therapy's history, rounded to two
    /// decimals.
    pub fn effective_threshold(&self, therapy: &Therapy, trust: f64) -> f64 {
        let mut threshold = self.adaptive_threshold;

        threshold += therapy.ignored_warnings_count as f64 * IGNORED_WARNING_WEIGHT;

        if therapy.previous_incidents > 0 {
            threshold = (threshold - therapy.previous_incidents as f64 * INCIDENT_WEIGHT)
                .max(MIN_ADAPTIVE_THRESHOLD);
        }

        threshold += (1.0 - trust) * 0.3;
        threshold -= (therapy.drug_count() as f64 / 5.0) * 0.5;

        round2(threshold)
    }

    fn feedback_aware_action(
        &self,
        assessment: &RiskAssessment,
        therapy: &Therapy,
        trust: f64,
    ) -> ActionType {
        let mut base = self.adaptive_threshold;

        if therapy.confirmed_warnings_count > 0 {
            base = (base - therapy.confirmed_warnings_count as f64 * CONFIRMED_WARNING_WEIGHT)
                .max(MIN_ADAPTIVE_THRESHOLD);
        }
        if therapy.ignored_warnings_count > 0 {
            base = (base + therapy.ignored_warnings_count as f64 * IGNORED_WARNING_WEIGHT)
                .min(MAX_ADAPTIVE_THRESHOLD);
        }

        let trust_adjustment = (1.0 - trust) * 0.5;

        if assessment.total_score >= base * (2.0 - trust_adjustment) {
            ActionType::Warn
        } else if assessment.total_score >= base * (1.5 - trust_adjustment * 0.5) {
            ActionType::RequestInfo
        } else {
            ActionType::Inform
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::domain::drug::{Drug, DrugInteraction};

    fn therapy_with(drugs: usize) -> Therapy {
        Therapy::new(
            "patient",
            (0..drugs)
                .map(|i| Drug::new(format!("D{}", i), format!("Drug {}", i)))
                .collect(),
        )
    }

    fn assessment(scores: &[f64]) -> RiskAssessment {
        RiskAssessment::from_interactions(
            scores
                .iter()
                .map(|s| DrugInteraction {
                    drug1_id: "D0".into(),
                    drug2_id: "D1".into(),
                    interaction_type: "t".into(),
                    risk_score: *s,
                    risk_category: "C".into(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_trust_is_neutral_with_little_feedback() {
        let mut t = therapy_with(2);
        assert_eq!(trust_factor(&t), 0.5);
        t.record_feedback(FeedbackType::Confirmed, None);
        assert_eq!(trust_factor(&t), 0.5);
    }

    #[test]
    fn test_trust_bounds() {
        let mut confirmed = therapy_with(2);
        for _ in 0..4 {
            confirmed.record_feedback(FeedbackType::Confirmed, None);
        }
        assert_eq!(trust_factor(&confirmed), 0.9);

        let mut false_alarms = therapy_with(2);
        for _ in 0..4 {
            false_alarms.record_feedback(FeedbackType::FalseAlarm, None);
        }
        assert_eq!(trust_factor(&false_alarms), 0.1);
    }

    #[test]
    fn test_critical_always_escalates() {
        let mut t = therapy_with(2);
        t.ignored_warnings_count = 50;
        for _ in 0..5 {
            t.record_feedback(FeedbackType::FalseAlarm, None);
        }
        let policy = DecisionPolicy::new(5.0);
        assert_eq!(policy.decide(&assessment(&[4.5]), &t), ActionType::Escalate);
    }

    #[test]
    fn test_standard_bands() {
        let t = therapy_with(2);
        let policy = DecisionPolicy::new(3.0);
        // 3.0 + 0.15 (neutral trust) - 0.2 (two drugs)
        assert_eq!(policy.effective_threshold(&t, 0.5), 2.95);

        assert_eq!(policy.decide(&assessment(&[2.0]), &t), ActionType::Inform);
        assert_eq!(policy.decide(&assessment(&[3.0]), &t), ActionType::RequestInfo);
        assert_eq!(policy.decide(&assessment(&[3.0, 2.0]), &t), ActionType::Warn);
    }

    #[test]
    fn test_ignored_warnings_raise_threshold() {
        let mut t = therapy_with(2);
        t.ignored_warnings_count = 3;
        let policy = DecisionPolicy::new(3.0);
        let decision = policy.evaluate(&assessment(&[2.0]), &t);
        assert_eq!(decision.effective_threshold, 3.4);
        assert_eq!(decision.action, ActionType::Inform);
        assert!(!decision.feedback_aware);
    }

    #[test]
    fn test_incidents_floor_at_one() {
        let mut t = therapy_with(0);
        t.previous_incidents = 30;
        let policy = DecisionPolicy::new(3.0);
        // floor 1.0, then +0.15 trust term
        assert_eq!(policy.effective_threshold(&t, 0.5), 1.15);
    }

    #[test]
    fn test_feedback_aware_bands() {
        let mut t = therapy_with(2);
        t.record_feedback(FeedbackType::Confirmed, None);
        t.record_feedback(FeedbackType::Confirmed, None);
        // trust 0.9, adjustment 0.05; base 3.0 - 0.2 = 2.8
        // warn at 2.8 * 1.95 = 5.46, request at 2.8 * 1.475 = 4.13
        let policy = DecisionPolicy::new(3.0);

        let decision = policy.evaluate(&assessment(&[2.0, 2.0]), &t);
        assert!(decision.feedback_aware);
        assert_eq!(decision.action, ActionType::Inform);
        assert_eq!(policy.decide(&assessment(&[2.2, 2.0]), &t), ActionType::RequestInfo);
        assert_eq!(policy.decide(&assessment(&[3.0, 2.5]), &t), ActionType::Warn);
    }

    proptest! {
        #[test]
        fn prop_trust_factor_is_bounded(
            feedback in proptest::collection::vec(0u8..3, 0..40),
        ) {
            let mut therapy = therapy_with(2);
            for kind in &feedback {
                let feedback_type = match kind {
                    0 => FeedbackType::Confirmed,
                    1 => FeedbackType::Ignored,
                    _ => FeedbackType::FalseAlarm,
                };
                therapy.record_feedback(feedback_type, None);
            }

            let trust = trust_factor(&therapy);
            if feedback.len() < 2 {
                prop_assert_eq!(trust, NEUTRAL_TRUST);
            } else {
                prop_assert!((MIN_TRUST..=MAX_TRUST).contains(&trust));
            }
        }
    }
}
