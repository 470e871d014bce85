// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Risk Assessment Runner
//!
//! One tick is one Sense → Think → Act → Learn traversal over at most one
//! therapy:
//!
//! - **Sense:** first active therapy (stable order) that is due for assessment
//! - **Think:** score its drug set, evaluate the decision policy
//! - **Act:** compose a warning unless the action is `Inform`
//! - **Learn:** append a risk-history entry and persist the therapy, then
//!   apply the critical-risk threshold rule (and persist the learning state
//!   when it moved)
//!
//! A tick with nothing due returns a no-work result and writes nothing.
//!
//! The learning state lives behind a `tokio::sync::Mutex` that is held for the
//! whole tick and for the whole feedback path, so ticks are serialized with
//! each other and with feedback (no lost threshold updates).
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Orchestrates scoring, policy, warnings and learning

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::application::scoring::ScoringService;
use crate::domain::events::{AgentEvent, ThresholdTrigger};
use crate::domain::learning::{LearningState, LearningStats, ThresholdChange};
use crate::domain::policy::{DecisionPolicy, PolicyDecision};
use crate::domain::repository::{LearningStateRepository, RepositoryError, TherapyRepository};
use crate::domain::risk::{ActionType, RiskAssessment};
use crate::domain::therapy::{FeedbackType, RiskHistoryEntry, Therapy, TherapyId, TherapyPercept};
use crate::domain::warning::Warning;
use crate::infrastructure::dataset::DatasetError;
use crate::infrastructure::event_bus::EventBus;

/// Tick-level failure. Lookup misses are never errors.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Persistence failure: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Interaction dataset unavailable: {0}")]
    Dataset(#[from] DatasetError),
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// A therapy assessed longer ago than this is due again
    pub reassessment_interval: Duration,

    /// Threshold used when no learning state has been persisted
    pub initial_threshold: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            reassessment_interval: Duration::seconds(3600),
            initial_threshold: crate::domain::learning::DEFAULT_ADAPTIVE_THRESHOLD,
        }
    }
}

/// Outcome of one tick, handed to callers (CLI, scheduler history).
#[derive(Debug, Clone, Serialize)]
pub struct TickResult {
    pub has_work: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub therapy_id: Option<TherapyId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drug_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<RiskAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_taken: Option<ActionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<PolicyDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_change: Option<ThresholdChange>,
    pub timestamp: DateTime<Utc>,
}

impl TickResult {
    pub fn no_work() -> Self {
        Self {
            has_work: false,
            therapy_id: None,
            patient_id: None,
            drug_count: None,
            assessment: None,
            warning: None,
            action_taken: None,
            decision: None,
            threshold_change: None,
            timestamp: Utc::now(),
        }
    }
}

/// Therapy state after feedback was recorded, with the threshold movement it
/// caused.
#[derive(Debug, Clone)]
pub struct FeedbackApplied {
    pub therapy: Therapy,
    pub threshold_change: ThresholdChange,
}

pub struct RiskAssessmentRunner {
    scoring: ScoringService,
    therapies: Arc<dyn TherapyRepository>,
    learning_repo: Arc<dyn LearningStateRepository>,
    learning: Mutex<LearningState>,
    event_bus: EventBus,
    config: RunnerConfig,
}

impl RiskAssessmentRunner {
    /// Load the persisted learning state, or start from
    /// `config.initial_threshold` when none exists. Load failures propagate.
    pub async fn new(
        scoring: ScoringService,
        therapies: Arc<dyn TherapyRepository>,
        learning_repo: Arc<dyn LearningStateRepository>,
        event_bus: EventBus,
        config: RunnerConfig,
    ) -> Result<Self, AgentError> {
        let learning = match learning_repo.load().await? {
            Some(state) => {
                info!(
                    threshold = state.adaptive_threshold(),
                    total_feedbacks = state.total_feedbacks(),
                    "Restored learning state"
                );
                state
            }
            None => {
                info!(
                    threshold = config.initial_threshold,
                    "No persisted learning state, starting from initial threshold"
                );
                LearningState::with_threshold(config.initial_threshold)
            }
        };
        metrics::gauge!("interactrack_adaptive_threshold").set(learning.adaptive_threshold());

        Ok(Self {
            scoring,
            therapies,
            learning_repo,
            learning: Mutex::new(learning),
            event_bus,
            config,
        })
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn therapies(&self) -> &Arc<dyn TherapyRepository> {
        &self.therapies
    }

    pub fn scoring(&self) -> &ScoringService {
        &self.scoring
    }

    pub async fn adaptive_threshold(&self) -> f64 {
        self.learning.lock().await.adaptive_threshold()
    }

    pub async fn learning_stats(&self) -> LearningStats {
        self.learning.lock().await.stats()
    }

    /// Run one Sense → Think → Act → Learn cycle.
    pub async fn tick(&self) -> Result<TickResult, AgentError> {
        let mut learning = self.learning.lock().await;

        let Some(percept) = self.sense().await? else {
            debug!("No therapy due for assessment");
            metrics::counter!("interactrack_ticks_total", "outcome" => "no_work").increment(1);
            return Ok(TickResult::no_work());
        };
        let mut therapy = percept.therapy;

        // Think
        let assessment = self.scoring.assess_therapy(&therapy);
        let decision = DecisionPolicy::new(learning.adaptive_threshold()).evaluate(&assessment, &therapy);
        info!(
            therapy_id = %therapy.id,
            total_score = assessment.total_score,
            risk_level = %assessment.risk_level,
            interactions = assessment.interaction_count(),
            effective_threshold = decision.effective_threshold,
            trust_factor = decision.trust_factor,
            feedback_aware = decision.feedback_aware,
            action = %decision.action,
            "Assessed therapy"
        );

        // Act
        let warning = Warning::compose(&assessment, decision.action);
        match &warning {
            Some(w) => info!(
                therapy_id = %therapy.id,
                priority = %w.priority,
                action = %w.action_type,
                "{}",
                w.message
            ),
            None => info!(
                therapy_id = %therapy.id,
                interactions = assessment.interaction_count(),
                "Informational only, no warning raised"
            ),
        }
        metrics::counter!("interactrack_actions_total", "action" => decision.action.as_str()).increment(1);

        // Learn. The threshold only moves once the assessment is on record, so
        // a failed save leaves the therapy due and the threshold untouched.
        let now = Utc::now();
        therapy.record_assessment(RiskHistoryEntry::from_assessment(&assessment, decision.action, now));

        if let Err(e) = self.therapies.save(&therapy).await {
            error!(therapy_id = %therapy.id, error = %e, "Failed to persist therapy after assessment");
            metrics::counter!("interactrack_ticks_total", "outcome" => "error").increment(1);
            return Err(e.into());
        }

        let threshold_change = learning.observe_risk_level(assessment.risk_level);
        if let Some(change) = threshold_change {
            info!(
                before = change.before,
                after = change.after,
                "Critical risk observed, adaptive threshold lowered"
            );
            metrics::gauge!("interactrack_adaptive_threshold").set(change.after);
            if let Err(e) = self.learning_repo.save(&learning).await {
                warn!(
                    error = %e,
                    threshold = change.after,
                    "Failed to persist learning state, in-memory threshold diverges until next save"
                );
                metrics::counter!("interactrack_ticks_total", "outcome" => "error").increment(1);
                return Err(e.into());
            }
            self.event_bus.publish(AgentEvent::ThresholdAdjusted {
                before: change.before,
                after: change.after,
                trigger: ThresholdTrigger::CriticalRisk,
                adjusted_at: now,
            });
        }

        if let Some(w) = &warning {
            self.event_bus.publish(AgentEvent::WarningRaised {
                warning_id: w.id,
                therapy_id: therapy.id,
                action: w.action_type,
                priority: w.priority,
                raised_at: w.timestamp,
            });
        }
        self.event_bus.publish(AgentEvent::TickCompleted {
            therapy_id: therapy.id,
            risk_level: assessment.risk_level,
            total_score: assessment.total_score,
            action: decision.action,
            completed_at: now,
        });
        metrics::counter!("interactrack_ticks_total", "outcome" => "work").increment(1);

        Ok(TickResult {
            has_work: true,
            therapy_id: Some(therapy.id),
            patient_id: Some(therapy.patient_id.clone()),
            drug_count: Some(therapy.drug_count()),
            assessment: Some(assessment),
            warning,
            action_taken: Some(decision.action),
            decision: Some(decision),
            threshold_change,
            timestamp: now,
        })
    }

    async fn sense(&self) -> Result<Option<TherapyPercept>, RepositoryError> {
        let active = self.therapies.find_all_active().await?;
        let now = Utc::now();
        debug!(active = active.len(), "Scanning active therapies");

        Ok(active
            .into_iter()
            .map(|therapy| TherapyPercept::observe(therapy, now, self.config.reassessment_interval))
            .find(TherapyPercept::should_be_assessed))
    }

    /// Record feedback on a therapy and learn from it. The warning severity is
    /// the risk level of the therapy's latest assessment.
    ///
    /// Returns `Ok(None)` when the therapy does not exist; nothing is mutated
    /// in that case.
    pub async fn apply_feedback(
        &self,
        therapy_id: TherapyId,
        feedback_type: FeedbackType,
        notes: Option<String>,
    ) -> Result<Option<FeedbackApplied>, RepositoryError> {
        let mut learning = self.learning.lock().await;

        if !self
            .therapies
            .update_feedback_counts(therapy_id, feedback_type, notes)
            .await?
        {
            return Ok(None);
        }

        let Some(therapy) = self.therapies.find_by_id(therapy_id).await? else {
            warn!(therapy_id = %therapy_id, "Therapy disappeared after feedback update");
            return Ok(None);
        };

        let severity = therapy.last_risk_level();
        let change = learning.apply_feedback(feedback_type, severity);
        info!(
            therapy_id = %therapy_id,
            feedback = %feedback_type,
            severity = ?severity,
            before = change.before,
            after = change.after,
            "Learned from feedback"
        );
        metrics::counter!("interactrack_feedback_total", "type" => feedback_type.as_str()).increment(1);
        metrics::gauge!("interactrack_adaptive_threshold").set(change.after);

        if let Err(e) = self.learning_repo.save(&learning).await {
            warn!(
                error = %e,
                threshold = change.after,
                "Failed to persist learning state, in-memory threshold diverges until next save"
            );
            return Err(e);
        }

        let now = Utc::now();
        self.event_bus.publish(AgentEvent::FeedbackReceived {
            therapy_id,
            feedback_type,
            received_at: now,
        });
        if change.is_change() {
            self.event_bus.publish(AgentEvent::ThresholdAdjusted {
                before: change.before,
                after: change.after,
                trigger: ThresholdTrigger::Feedback(feedback_type),
                adjusted_at: now,
            });
        }

        Ok(Some(FeedbackApplied {
            therapy,
            threshold_change: change,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drug::{Drug, DrugInteraction};
    use crate::domain::risk::RiskLevel;
    use crate::infrastructure::interaction_index::InteractionIndex;
    use crate::infrastructure::repositories::{InMemoryLearningStateRepository, InMemoryTherapyRepository};
    use async_trait::async_trait;

    /// Counts writes; the first `failing_saves` calls to `save` fail.
    struct MockTherapyRepository {
        inner: InMemoryTherapyRepository,
        saves: Arc<tokio::sync::Mutex<usize>>,
        failing_saves: usize,
    }

    impl MockTherapyRepository {
        fn new(therapies: Vec<Therapy>, failing_saves: usize) -> Self {
            Self {
                inner: InMemoryTherapyRepository::with_therapies(therapies),
                saves: Arc::new(tokio::sync::Mutex::new(0)),
                failing_saves,
            }
        }
    }

    #[async_trait]
    impl TherapyRepository for MockTherapyRepository {
        async fn find_all_active(&self) -> Result<Vec<Therapy>, RepositoryError> {
            self.inner.find_all_active().await
        }

        async fn find_all(&self) -> Result<Vec<Therapy>, RepositoryError> {
            self.inner.find_all().await
        }

        async fn find_by_id(&self, id: TherapyId) -> Result<Option<Therapy>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn save(&self, therapy: &Therapy) -> Result<Therapy, RepositoryError> {
            let mut saves = self.saves.lock().await;
            *saves += 1;
            if *saves <= self.failing_saves {
                return Err(RepositoryError::Database("connection refused".to_string()));
            }
            drop(saves);
            self.inner.save(therapy).await
        }

        async fn update_feedback_counts(
            &self,
            id: TherapyId,
            feedback_type: FeedbackType,
            notes: Option<String>,
        ) -> Result<bool, RepositoryError> {
            *self.saves.lock().await += 1;
            self.inner.update_feedback_counts(id, feedback_type, notes).await
        }
    }

    struct MockLearningRepository {
        saves: Arc<tokio::sync::Mutex<usize>>,
        fail_saves: bool,
    }

    #[async_trait]
    impl LearningStateRepository for MockLearningRepository {
        async fn load(&self) -> Result<Option<LearningState>, RepositoryError> {
            Ok(None)
        }

        async fn save(&self, _state: &LearningState) -> Result<(), RepositoryError> {
            *self.saves.lock().await += 1;
            if self.fail_saves {
                return Err(RepositoryError::Database("disk full".to_string()));
            }
            Ok(())
        }
    }

    fn scoring() -> ScoringService {
        let index: InteractionIndex = vec![
            DrugInteraction {
                drug1_id: "A".into(),
                drug2_id: "B".into(),
                interaction_type: "bleeding".into(),
                risk_score: 5.0,
                risk_category: "CRITICAL_BLEEDING".into(),
            },
            DrugInteraction {
                drug1_id: "C".into(),
                drug2_id: "D".into(),
                interaction_type: "sedation".into(),
                risk_score: 2.0,
                risk_category: "LOW".into(),
            },
        ]
        .into_iter()
        .collect();
        ScoringService::new(Arc::new(index))
    }

    fn therapy(a: &str, b: &str) -> Therapy {
        Therapy::new("patient", vec![Drug::new(a, a), Drug::new(b, b)])
    }

    async fn runner_with(
        therapies: Arc<dyn TherapyRepository>,
        learning: Arc<dyn LearningStateRepository>,
    ) -> RiskAssessmentRunner {
        RiskAssessmentRunner::new(scoring(), therapies, learning, EventBus::new(16), RunnerConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_no_work_tick_writes_nothing() {
        let therapies = Arc::new(MockTherapyRepository::new(vec![], 0));
        let learning_saves = Arc::new(tokio::sync::Mutex::new(0));
        let learning = Arc::new(MockLearningRepository {
            saves: learning_saves.clone(),
            fail_saves: false,
        });
        let runner = runner_with(therapies.clone(), learning).await;

        let result = runner.tick().await.unwrap();
        assert!(!result.has_work);
        assert!(result.assessment.is_none());
        assert_eq!(*therapies.saves.lock().await, 0);
        assert_eq!(*learning_saves.lock().await, 0);
    }

    #[tokio::test]
    async fn test_critical_tick_escalates_and_learns() {
        let t = therapy("A", "B");
        let therapies = Arc::new(InMemoryTherapyRepository::with_therapies(vec![t.clone()]));
        let learning = Arc::new(InMemoryLearningStateRepository::new());
        let runner = runner_with(therapies.clone(), learning.clone()).await;
        let mut events = runner.event_bus().subscribe();

        let result = runner.tick().await.unwrap();
        assert!(result.has_work);
        assert_eq!(result.action_taken, Some(ActionType::Escalate));
        assert!(result.warning.is_some());
        assert_eq!(result.threshold_change.map(|c| c.after), Some(2.9));

        let stored = therapies.find_by_id(t.id).await.unwrap().unwrap();
        assert_eq!(stored.risk_history.len(), 1);
        assert_eq!(stored.last_risk_level(), Some(RiskLevel::Critical));
        assert_eq!(learning.load().await.unwrap().unwrap().adaptive_threshold(), 2.9);

        assert!(matches!(events.recv().await.unwrap(), AgentEvent::ThresholdAdjusted { .. }));
        assert!(matches!(events.recv().await.unwrap(), AgentEvent::WarningRaised { .. }));
        assert!(matches!(events.recv().await.unwrap(), AgentEvent::TickCompleted { .. }));
    }

    #[tokio::test]
    async fn test_assessed_therapy_is_not_reselected() {
        let therapies = Arc::new(InMemoryTherapyRepository::with_therapies(vec![therapy("C", "D")]));
        let runner = runner_with(therapies, Arc::new(InMemoryLearningStateRepository::new())).await;

        let first = runner.tick().await.unwrap();
        assert_eq!(first.action_taken, Some(ActionType::Inform));
        assert!(first.warning.is_none());

        let second = runner.tick().await.unwrap();
        assert!(!second.has_work);
    }

    #[tokio::test]
    async fn test_tick_persistence_failure_is_surfaced() {
        let therapies = Arc::new(MockTherapyRepository::new(vec![therapy("C", "D")], usize::MAX));
        let runner = runner_with(therapies, Arc::new(InMemoryLearningStateRepository::new())).await;

        let err = runner.tick().await.unwrap_err();
        assert!(matches!(err, AgentError::Repository(RepositoryError::Database(_))));
    }

    #[tokio::test]
    async fn test_learning_save_failure_keeps_in_memory_threshold() {
        let therapies = Arc::new(InMemoryTherapyRepository::with_therapies(vec![therapy("A", "B")]));
        let learning = Arc::new(MockLearningRepository {
            saves: Arc::new(tokio::sync::Mutex::new(0)),
            fail_saves: true,
        });
        let runner = runner_with(therapies, learning).await;

        assert!(runner.tick().await.is_err());
        assert_eq!(runner.adaptive_threshold().await, 2.9);
    }

    #[tokio::test]
    async fn test_feedback_on_unknown_therapy_is_none() {
        let runner = runner_with(
            Arc::new(InMemoryTherapyRepository::new()),
            Arc::new(InMemoryLearningStateRepository::new()),
        )
        .await;

        let outcome = runner
            .apply_feedback(TherapyId::new(), FeedbackType::Confirmed, None)
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(runner.adaptive_threshold().await, 3.0);
    }

    #[tokio::test]
    async fn test_feedback_uses_latest_risk_level_as_severity() {
        let t = therapy("A", "B");
        let therapies = Arc::new(InMemoryTherapyRepository::with_therapies(vec![t.clone()]));
        let runner = runner_with(therapies, Arc::new(InMemoryLearningStateRepository::new())).await;

        // critical tick: 3.0 -> 2.9
        runner.tick().await.unwrap();
        let applied = runner
            .apply_feedback(t.id, FeedbackType::Confirmed, Some("seen by GP".into()))
            .await
            .unwrap()
            .unwrap();

        // critical multiplier: 2.9 - 0.4
        assert_eq!(applied.threshold_change.before, 2.9);
        assert_eq!(applied.threshold_change.after, 2.5);
        assert_eq!(applied.therapy.confirmed_warnings_count, 1);
        assert_eq!(runner.learning_stats().await.current_accuracy, 100.0);
    }

    #[tokio::test]
    async fn test_failed_therapy_save_does_not_move_threshold() {
        let t = therapy("A", "B");
        let therapies = Arc::new(MockTherapyRepository::new(vec![t.clone()], 1));
        let learning = Arc::new(InMemoryLearningStateRepository::new());
        let runner = runner_with(therapies.clone(), learning.clone()).await;

        let err = runner.tick().await.unwrap_err();
        assert!(matches!(err, AgentError::Repository(RepositoryError::Database(_))));
        assert_eq!(runner.adaptive_threshold().await, 3.0);
        assert!(learning.load().await.unwrap().is_none());

        // The therapy is still due; the retry applies the critical step once.
        let retry = runner.tick().await.unwrap();
        assert!(retry.has_work);
        assert_eq!(retry.threshold_change.map(|c| (c.before, c.after)), Some((3.0, 2.9)));
        assert_eq!(runner.adaptive_threshold().await, 2.9);
        assert_eq!(learning.load().await.unwrap().unwrap().adaptive_threshold(), 2.9);

        let stored = therapies.find_by_id(t.id).await.unwrap().unwrap();
        assert_eq!(stored.risk_history.len(), 1);
        assert!(!runner.tick().await.unwrap().has_work);
    }

    #[tokio::test]
    async fn test_concurrent_tick_and_feedback_keep_both_updates() {
        let t = therapy("A", "B");
        let therapies = Arc::new(InMemoryTherapyRepository::with_therapies(vec![t.clone()]));
        let learning = Arc::new(InMemoryLearningStateRepository::new());
        let runner = Arc::new(runner_with(therapies, learning.clone()).await);

        let ticker = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.tick().await })
        };
        let feedback = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.apply_feedback(t.id, FeedbackType::Ignored, None).await })
        };
        let (tick, applied) = tokio::join!(ticker, feedback);

        let tick = tick.unwrap().unwrap();
        assert_eq!(tick.action_taken, Some(ActionType::Escalate));
        assert!(applied.unwrap().unwrap().is_some());

        // 3.0 - 0.1 (critical) + 0.3 (ignored), in either order
        assert_eq!(runner.adaptive_threshold().await, 3.2);
        assert_eq!(learning.load().await.unwrap().unwrap().adaptive_threshold(), 3.2);
        assert_eq!(runner.learning_stats().await.ignored_count, 1);
    }
}
