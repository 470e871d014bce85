// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Learning State
//!
//! The single persisted record that makes the agent adaptive: the adaptive
//! threshold plus aggregate feedback counters and a trailing accuracy series.
//!
//! All mutation goes through [`LearningState::observe_risk_level`] (tick-driven)
//! and [`LearningState::apply_feedback`] (feedback-driven). Fields are private so
//! the threshold bounds cannot be bypassed.
//!
//! ## Threshold Rules
//!
//! | Trigger | Delta | Bound |
//! |---------|-------|-------|
//! | Critical risk level observed in a tick | −0.1 | floor 2.0 |
//! | `confirmed` feedback | −0.2 × severity multiplier | floor 1.0 |
//! | `ignored` feedback | +0.3 | ceiling 5.0 |
//! | `false_alarm` feedback | +0.5 | ceiling 5.0 |
//!
//! Severity multiplier: 2.0 for `CRITICAL`, 1.5 for `HIGH`, 1.0 otherwise.
//! The threshold is rounded to two decimals after every mutation.

use serde::{Deserialize, Serialize};

use crate::domain::risk::RiskLevel;
use crate::domain::therapy::FeedbackType;

pub const DEFAULT_ADAPTIVE_THRESHOLD: f64 = 3.0;
pub const CRITICAL_LEARNING_RATE: f64 = 0.1;
pub const CRITICAL_THRESHOLD_FLOOR: f64 = 2.0;
pub const MIN_ADAPTIVE_THRESHOLD: f64 = 1.0;
pub const MAX_ADAPTIVE_THRESHOLD: f64 = 5.0;
pub const CONFIRMED_ADJUSTMENT: f64 = -0.2;
pub const IGNORED_ADJUSTMENT: f64 = 0.3;
pub const FALSE_ALARM_PENALTY: f64 = 0.5;
/// Length of the trailing accuracy series.
pub const ACCURACY_HISTORY_LIMIT: usize = 100;

const TREND_WINDOW: usize = 10;

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Before/after pair for one threshold mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdChange {
    pub before: f64,
    pub after: f64,
}

impl ThresholdChange {
    pub fn delta(&self) -> f64 {
        round2(self.after - self.before)
    }

    pub fn is_change(&self) -> bool {
        self.before != self.after
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningState {
    adaptive_threshold: f64,
    total_feedbacks: u64,
    confirmed_count: u64,
    ignored_count: u64,
    false_alarm_count: u64,
    accuracy_history: Vec<f64>,
}

impl Default for LearningState {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_ADAPTIVE_THRESHOLD)
    }
}

impl LearningState {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            adaptive_threshold: round2(threshold.clamp(MIN_ADAPTIVE_THRESHOLD, MAX_ADAPTIVE_THRESHOLD)),
            total_feedbacks: 0,
            confirmed_count: 0,
            ignored_count: 0,
            false_alarm_count: 0,
            accuracy_history: Vec::new(),
        }
    }

    /// Rebuild from a persisted record. The accuracy series keeps its most
    /// recent `ACCURACY_HISTORY_LIMIT` values.
    pub fn restore(
        adaptive_threshold: f64,
        total_feedbacks: u64,
        confirmed_count: u64,
        ignored_count: u64,
        false_alarm_count: u64,
        mut accuracy_history: Vec<f64>,
    ) -> Self {
        if accuracy_history.len() > ACCURACY_HISTORY_LIMIT {
            let excess = accuracy_history.len() - ACCURACY_HISTORY_LIMIT;
            accuracy_history.drain(..excess);
        }
        Self {
            adaptive_threshold,
            total_feedbacks,
            confirmed_count,
            ignored_count,
            false_alarm_count,
            accuracy_history,
        }
    }

    pub fn adaptive_threshold(&self) -> f64 {
        self.adaptive_threshold
    }

    pub fn total_feedbacks(&self) -> u64 {
        self.total_feedbacks
    }

    pub fn confirmed_count(&self) -> u64 {
        self.confirmed_count
    }

    pub fn ignored_count(&self) -> u64 {
        self.ignored_count
    }

    pub fn false_alarm_count(&self) -> u64 {
        self.false_alarm_count
    }

    pub fn accuracy_history(&self) -> &[f64] {
        &self.accuracy_history
    }

    /// Tick-driven rule: only a `Critical` level moves the threshold.
    pub fn observe_risk_level(&mut self, level: RiskLevel) -> Option<ThresholdChange> {
        if level != RiskLevel::Critical {
            return None;
        }
        let before = self.adaptive_threshold;
        self.adaptive_threshold =
            round2((before - CRITICAL_LEARNING_RATE).max(CRITICAL_THRESHOLD_FLOOR));
        Some(ThresholdChange {
            before,
            after: self.adaptive_threshold,
        })
    }

    /// Feedback-driven rule. `severity` is the risk level of the warning the
    /// feedback refers to; `None` counts as medium severity.
    pub fn apply_feedback(
        &mut self,
        feedback_type: FeedbackType,
        severity: Option<RiskLevel>,
    ) -> ThresholdChange {
        let before = self.adaptive_threshold;

        let adjusted = match feedback_type {
            FeedbackType::Confirmed => {
                let adjustment = CONFIRMED_ADJUSTMENT * severity_multiplier(severity);
                (before + adjustment).max(MIN_ADAPTIVE_THRESHOLD)
            }
            FeedbackType::Ignored => (before + IGNORED_ADJUSTMENT).min(MAX_ADAPTIVE_THRESHOLD),
            FeedbackType::FalseAlarm => (before + FALSE_ALARM_PENALTY).min(MAX_ADAPTIVE_THRESHOLD),
        };
        self.adaptive_threshold = round2(adjusted);

        self.total_feedbacks += 1;
        match feedback_type {
            FeedbackType::Confirmed => self.confirmed_count += 1,
            FeedbackType::Ignored => self.ignored_count += 1,
            FeedbackType::FalseAlarm => self.false_alarm_count += 1,
        }

        let accuracy = self.confirmed_count as f64 / self.total_feedbacks as f64 * 100.0;
        self.accuracy_history.push(accuracy);
        if self.accuracy_history.len() > ACCURACY_HISTORY_LIMIT {
            self.accuracy_history.remove(0);
        }

        ThresholdChange {
            before,
            after: self.adaptive_threshold,
        }
    }

    pub fn current_accuracy(&self) -> f64 {
        self.accuracy_history.last().copied().unwrap_or(0.0)
    }

    pub fn average_accuracy(&self) -> f64 {
        mean(&self.accuracy_history)
    }

    /// Mean of the last ten accuracy values minus the mean of the ten before
    /// them (or of the first ten when fewer than twenty exist).
    pub fn accuracy_trend(&self) -> f64 {
        let history = &self.accuracy_history;
        if history.len() < TREND_WINDOW {
            return 0.0;
        }
        let recent = &history[history.len() - TREND_WINDOW..];
        let older = if history.len() >= 2 * TREND_WINDOW {
            &history[history.len() - 2 * TREND_WINDOW..history.len() - TREND_WINDOW]
        } else {
            &history[..TREND_WINDOW]
        };
        mean(recent) - mean(older)
    }

    pub fn stats(&self) -> LearningStats {
        LearningStats {
            adaptive_threshold: self.adaptive_threshold,
            total_feedbacks: self.total_feedbacks,
            confirmed_count: self.confirmed_count,
            ignored_count: self.ignored_count,
            false_alarm_count: self.false_alarm_count,
            current_accuracy: self.current_accuracy(),
            average_accuracy: self.average_accuracy(),
            accuracy_trend: self.accuracy_trend(),
            accuracy_history: self.accuracy_history.clone(),
        }
    }
}

fn severity_multiplier(severity: Option<RiskLevel>) -> f64 {
    match severity {
        Some(RiskLevel::Critical) => 2.0,
        Some(RiskLevel::High) => 1.5,
        _ => 1.0,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Read-only snapshot of the learning state for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStats {
    pub adaptive_threshold: f64,
    pub total_feedbacks: u64,
    pub confirmed_count: u64,
    pub ignored_count: u64,
    pub false_alarm_count: u64,
    pub current_accuracy: f64,
    pub average_accuracy: f64,
    pub accuracy_trend: f64,
    pub accuracy_history: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_threshold() {
        let state = LearningState::default();
        assert_eq!(state.adaptive_threshold(), 3.0);
        assert_eq!(state.stats().current_accuracy, 0.0);
    }

    #[test]
    fn test_critical_observation_lowers_threshold_to_floor() {
        let mut state = LearningState::with_threshold(2.15);
        let change = state.observe_risk_level(RiskLevel::Critical).unwrap();
        assert_eq!(change.before, 2.15);
        assert_eq!(change.after, 2.05);

        state.observe_risk_level(RiskLevel::Critical);
        assert_eq!(state.adaptive_threshold(), 2.0);
        state.observe_risk_level(RiskLevel::Critical);
        assert_eq!(state.adaptive_threshold(), 2.0);
    }

    #[test]
    fn test_non_critical_observation_is_noop() {
        let mut state = LearningState::default();
        assert!(state.observe_risk_level(RiskLevel::High).is_none());
        assert_eq!(state.adaptive_threshold(), 3.0);
    }

    #[test]
    fn test_confirmed_high_severity() {
        let mut state = LearningState::default();
        let change = state.apply_feedback(FeedbackType::Confirmed, Some(RiskLevel::High));
        assert_eq!(change.after, 2.7);
        assert_eq!(change.delta(), -0.3);
        assert_eq!(state.confirmed_count(), 1);
        assert_eq!(state.current_accuracy(), 100.0);
    }

    #[test]
    fn test_confirmed_severity_multipliers() {
        let mut critical = LearningState::default();
        critical.apply_feedback(FeedbackType::Confirmed, Some(RiskLevel::Critical));
        assert_eq!(critical.adaptive_threshold(), 2.6);

        let mut medium = LearningState::default();
        medium.apply_feedback(FeedbackType::Confirmed, None);
        assert_eq!(medium.adaptive_threshold(), 2.8);
    }

    #[test]
    fn test_threshold_bounds() {
        let mut state = LearningState::with_threshold(1.1);
        state.apply_feedback(FeedbackType::Confirmed, Some(RiskLevel::Critical));
        assert_eq!(state.adaptive_threshold(), 1.0);

        let mut state = LearningState::with_threshold(4.9);
        state.apply_feedback(FeedbackType::Ignored, None);
        assert_eq!(state.adaptive_threshold(), 5.0);
        state.apply_feedback(FeedbackType::FalseAlarm, None);
        assert_eq!(state.adaptive_threshold(), 5.0);
    }

    #[test]
    fn test_accuracy_tracks_confirmed_share() {
        let mut state = LearningState::default();
        state.apply_feedback(FeedbackType::Confirmed, None);
        state.apply_feedback(FeedbackType::FalseAlarm, None);
        assert_eq!(state.accuracy_history(), &[100.0, 50.0]);
        assert_eq!(state.average_accuracy(), 75.0);
        assert_eq!(state.total_feedbacks(), 2);
        assert_eq!(state.false_alarm_count(), 1);
    }

    #[test]
    fn test_accuracy_history_is_bounded() {
        let mut state = LearningState::default();
        for _ in 0..(ACCURACY_HISTORY_LIMIT + 20) {
            state.apply_feedback(FeedbackType::Ignored, None);
        }
        assert_eq!(state.accuracy_history().len(), ACCURACY_HISTORY_LIMIT);
        assert_eq!(state.total_feedbacks(), (ACCURACY_HISTORY_LIMIT + 20) as u64);
    }

    #[test]
    fn test_accuracy_trend() {
        let mut history: Vec<f64> = vec![40.0; 10];
        history.extend(vec![60.0; 10]);
        let state = LearningState::restore(3.0, 20, 10, 10, 0, history);
        assert_eq!(state.accuracy_trend(), 20.0);

        let short = LearningState::restore(3.0, 5, 1, 4, 0, vec![20.0; 5]);
        assert_eq!(short.accuracy_trend(), 0.0);
    }

    #[test]
    fn test_restore_trims_history() {
        let state = LearningState::restore(2.5, 150, 10, 140, 0, vec![1.0; 150]);
        assert_eq!(state.accuracy_history().len(), ACCURACY_HISTORY_LIMIT);
        assert_eq!(state.adaptive_threshold(), 2.5);
    }

    fn feedback_type() -> impl Strategy<Value = FeedbackType> {
        prop_oneof![
            Just(FeedbackType::Confirmed),
            Just(FeedbackType::Ignored),
            Just(FeedbackType::FalseAlarm),
        ]
    }

    fn risk_level() -> impl Strategy<Value = RiskLevel> {
        prop_oneof![
            Just(RiskLevel::None),
            Just(RiskLevel::Low),
            Just(RiskLevel::Moderate),
            Just(RiskLevel::High),
            Just(RiskLevel::Critical),
        ]
    }

    proptest! {
        #[test]
        fn prop_threshold_stays_clamped(
            initial in 1.0f64..=5.0,
            steps in proptest::collection::vec(
                (feedback_type(), proptest::option::of(risk_level()), risk_level()),
                0..60,
            ),
        ) {
            let mut state = LearningState::with_threshold(initial);
            for (feedback, severity, observed) in steps {
                state.apply_feedback(feedback, severity);
                prop_assert!(state.adaptive_threshold() >= MIN_ADAPTIVE_THRESHOLD);
                prop_assert!(state.adaptive_threshold() <= MAX_ADAPTIVE_THRESHOLD);
                state.observe_risk_level(observed);
                prop_assert!(state.adaptive_threshold() >= MIN_ADAPTIVE_THRESHOLD);
                prop_assert!(state.adaptive_threshold() <= MAX_ADAPTIVE_THRESHOLD);
            }
            prop_assert!(state.accuracy_history().len() <= ACCURACY_HISTORY_LIMIT);
        }
    }
}
