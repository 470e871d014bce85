// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Learning State Repository
//!
//! Keeps the agent's learning state in the single row `id = 1` of
//! `agent_learning`. The accuracy series is a JSONB array.
//!
//! ```sql
//! CREATE TABLE agent_learning (
//!     id INTEGER PRIMARY KEY,
//!     adaptive_threshold DOUBLE PRECISION NOT NULL,
//!     total_feedbacks BIGINT NOT NULL DEFAULT 0,
//!     confirmed_count BIGINT NOT NULL DEFAULT 0,
//!     ignored_count BIGINT NOT NULL DEFAULT 0,
//!     false_alarm_count BIGINT NOT NULL DEFAULT 0,
//!     current_accuracy DOUBLE PRECISION NOT NULL DEFAULT 0,
//!     accuracy_history JSONB NOT NULL DEFAULT '[]',
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::learning::LearningState;
use crate::domain::repository::{LearningStateRepository, RepositoryError};

const LEARNING_ROW_ID: i32 = 1;

pub struct PostgresLearningStateRepository {
    pool: PgPool,
}

impl PostgresLearningStateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn non_negative(value: i64, column: &str) -> Result<u64, RepositoryError> {
    u64::try_from(value)
        .map_err(|_| RepositoryError::Serialization(format!("negative counter in {}: {}", column, value)))
}

#[async_trait]
impl LearningStateRepository for PostgresLearningStateRepository {
    async fn load(&self) -> Result<Option<LearningState>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT adaptive_threshold, total_feedbacks, confirmed_count,
                   ignored_count, false_alarm_count, accuracy_history
            FROM agent_learning
            WHERE id = $1
            "#,
        )
        .bind(LEARNING_ROW_ID)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to load learning state: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let accuracy_history: serde_json::Value = row.try_get("accuracy_history")?;
        let accuracy_history: Vec<f64> = serde_json::from_value(accuracy_history)?;

        Ok(Some(LearningState::restore(
            row.try_get("adaptive_threshold")?,
            non_negative(row.try_get("total_feedbacks")?, "total_feedbacks")?,
            non_negative(row.try_get("confirmed_count")?, "confirmed_count")?,
            non_negative(row.try_get("ignored_count")?, "ignored_count")?,
            non_negative(row.try_get("false_alarm_count")?, "false_alarm_count")?,
            accuracy_history,
        )))
    }

    async fn save(&self, state: &LearningState) -> Result<(), RepositoryError> {
        let accuracy_history = serde_json::to_value(state.accuracy_history())?;

        sqlx::query(
            r#"
            INSERT INTO agent_learning (
                id, adaptive_threshold, total_feedbacks, confirmed_count,
                ignored_count, false_alarm_count, current_accuracy,
                accuracy_history, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                adaptive_threshold = EXCLUDED.adaptive_threshold,
                total_feedbacks = EXCLUDED.total_feedbacks,
                confirmed_count = EXCLUDED.confirmed_count,
                ignored_count = EXCLUDED.ignored_count,
                false_alarm_count = EXCLUDED.false_alarm_count,
                current_accuracy = EXCLUDED.current_accuracy,
                accuracy_history = EXCLUDED.accuracy_history,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(LEARNING_ROW_ID)
        .bind(state.adaptive_threshold())
        .bind(state.total_feedbacks() as i64)
        .bind(state.confirmed_count() as i64)
        .bind(state.ignored_count() as i64)
        .bind(state.false_alarm_count() as i64)
        .bind(state.current_accuracy())
        .bind(accuracy_history)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save learning state: {}", e)))?;

        Ok(())
    }
}
