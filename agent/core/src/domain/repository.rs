// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for the two records the agent reads and writes. The
//! interfaces live in the domain layer and are implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Record | Implementations |
//! |-------|--------|----------------|
//! | `TherapyRepository` | `Therapy` | `InMemoryTherapyRepository`, `PostgresTherapyRepository` |
//! | `LearningStateRepository` | `LearningState` | `InMemoryLearningStateRepository`, `PostgresLearningStateRepository` |
//!
//! ## Storage Backend Abstraction
//!
//! Concrete implementations are selected at startup from `storage.backend` in
//! `interactrack-config.yaml`. In-memory implementations are used for
//! development and testing; PostgreSQL implementations for deployments that
//! must survive restarts.

use async_trait::async_trait;

use crate::domain::learning::LearningState;
use crate::domain::therapy::{FeedbackType, Therapy, TherapyId};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
}

#[async_trait]
pub trait TherapyRepository: Send + Sync {
    /// Active therapies in a stable order: by start date, then by id.
    async fn find_all_active(&self) -> Result<Vec<Therapy>, RepositoryError>;

    /// Every therapy regardless of status, same ordering as `find_all_active`.
    async fn find_all(&self) -> Result<Vec<Therapy>, RepositoryError>;

    async fn find_by_id(&self, id: TherapyId) -> Result<Option<Therapy>, RepositoryError>;

    /// Create or update. Returns the stored record.
    async fn save(&self, therapy: &Therapy) -> Result<Therapy, RepositoryError>;

    /// Append a feedback record and bump the matching counter as one atomic
    /// step. Returns `false` when the therapy does not exist.
    async fn update_feedback_counts(
        &self,
        id: TherapyId,
        feedback_type: FeedbackType,
        notes: Option<String>,
    ) -> Result<bool, RepositoryError>;
}

/// Single-record store for the agent's learning state.
#[async_trait]
pub trait LearningStateRepository: Send + Sync {
    /// `None` when nothing has been persisted yet.
    async fn load(&self) -> Result<Option<LearningState>, RepositoryError>;

    /// Upsert.
    async fn save(&self, state: &LearningState) -> Result<(), RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
