// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository traits defined in
//! `crate::domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve therapies and the learning state
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresTherapyRepository** - `therapies` table, histories as JSON
//! - **PostgresLearningStateRepository** - single row of `agent_learning`
//!
//! ## In-Memory Repositories
//!
//! Lightweight implementations for testing and development:
//! - **InMemoryTherapyRepository** - lock-guarded map with stable ordering
//! - **InMemoryLearningStateRepository** - single optional slot

pub mod postgres_learning;
pub mod postgres_therapy;

pub use postgres_learning::PostgresLearningStateRepository;
pub use postgres_therapy::PostgresTherapyRepository;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::learning::LearningState;
use crate::domain::repository::{LearningStateRepository, RepositoryError, TherapyRepository};
use crate::domain::therapy::{FeedbackType, Therapy, TherapyId};

/// Stable ordering shared by every therapy repository.
pub(crate) fn sort_therapies(therapies: &mut [Therapy]) {
    therapies.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
}

#[derive(Clone, Default)]
pub struct InMemoryTherapyRepository {
    therapies: Arc<RwLock<HashMap<TherapyId, Therapy>>>,
}

impl InMemoryTherapyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_therapies(therapies: impl IntoIterator<Item = Therapy>) -> Self {
        let repo = Self::new();
        {
            let mut map = repo.therapies.write();
            for therapy in therapies {
                map.insert(therapy.id, therapy);
            }
        }
        repo
    }
}

#[async_trait]
impl TherapyRepository for InMemoryTherapyRepository {
    async fn find_all_active(&self) -> Result<Vec<Therapy>, RepositoryError> {
        let mut active: Vec<Therapy> = self
            .therapies
            .read()
            .values()
            .filter(|t| t.is_active())
            .cloned()
            .collect();
        sort_therapies(&mut active);
        Ok(active)
    }

    async fn find_all(&self) -> Result<Vec<Therapy>, RepositoryError> {
        let mut all: Vec<Therapy> = self.therapies.read().values().cloned().collect();
        sort_therapies(&mut all);
        Ok(all)
    }

    async fn find_by_id(&self, id: TherapyId) -> Result<Option<Therapy>, RepositoryError> {
        Ok(self.therapies.read().get(&id).cloned())
    }

    async fn save(&self, therapy: &Therapy) -> Result<Therapy, RepositoryError> {
        self.therapies.write().insert(therapy.id, therapy.clone());
        Ok(therapy.clone())
    }

    async fn update_feedback_counts(
        &self,
        id: TherapyId,
        feedback_type: FeedbackType,
        notes: Option<String>,
    ) -> Result<bool, RepositoryError> {
        let mut therapies = self.therapies.write();
        match therapies.get_mut(&id) {
            Some(therapy) => {
                therapy.record_feedback(feedback_type, notes);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryLearningStateRepository {
    state: Arc<RwLock<Option<LearningState>>>,
}

impl InMemoryLearningStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: LearningState) -> Self {
        Self {
            state: Arc::new(RwLock::new(Some(state))),
        }
    }
}

#[async_trait]
impl LearningStateRepository for InMemoryLearningStateRepository {
    async fn load(&self) -> Result<Option<LearningState>, RepositoryError> {
        Ok(self.state.read().clone())
    }

    async fn save(&self, state: &LearningState) -> Result<(), RepositoryError> {
        *self.state.write() = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drug::Drug;
    use crate::domain::therapy::TherapyStatus;
    use chrono::{Duration, Utc};

    fn therapy(patient: &str, started_minutes_ago: i64) -> Therapy {
        let mut t = Therapy::new(patient, vec![Drug::new("A", "Alpha"), Drug::new("B", "Beta")]);
        t.start_date = Utc::now() - Duration::minutes(started_minutes_ago);
        t
    }

    #[tokio::test]
    async fn test_find_all_active_is_ordered_and_filtered() {
        let oldest = therapy("p1", 30);
        let newest = therapy("p2", 5);
        let mut done = therapy("p3", 60);
        done.status = TherapyStatus::Completed;

        let repo = InMemoryTherapyRepository::with_therapies(vec![
            newest.clone(),
            done.clone(),
            oldest.clone(),
        ]);

        let active = repo.find_all_active().await.unwrap();
        let ids: Vec<TherapyId> = active.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![oldest.id, newest.id]);

        assert_eq!(repo.find_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_feedback_counts() {
        let t = therapy("p1", 1);
        let repo = InMemoryTherapyRepository::with_therapies(vec![t.clone()]);

        assert!(repo
            .update_feedback_counts(t.id, FeedbackType::Ignored, Some("busy".into()))
            .await
            .unwrap());
        assert!(!repo
            .update_feedback_counts(TherapyId::new(), FeedbackType::Ignored, None)
            .await
            .unwrap());

        let stored = repo.find_by_id(t.id).await.unwrap().unwrap();
        assert_eq!(stored.ignored_warnings_count, 1);
        assert_eq!(stored.feedback_history.len(), 1);
    }

    #[tokio::test]
    async fn test_learning_state_slot() {
        let repo = InMemoryLearningStateRepository::new();
        assert!(repo.load().await.unwrap().is_none());

        let state = LearningState::with_threshold(2.4);
        repo.save(&state).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), Some(state));
    }
}
