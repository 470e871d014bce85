// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Therapy Repository
//!
//! `TherapyRepository` backed by the `therapies` table. Drugs, risk history
//! and feedback history are stored as JSONB columns; the four counters are
//! plain integer columns.
//!
//! ```sql
//! CREATE TABLE therapies (
//!     id UUID PRIMARY KEY,
//!     patient_id TEXT NOT NULL,
//!     drugs JSONB NOT NULL,
//!     status TEXT NOT NULL,
//!     start_date TIMESTAMPTZ NOT NULL,
//!     risk_tolerance DOUBLE PRECISION NOT NULL,
//!     ignored_warnings_count INTEGER NOT NULL DEFAULT 0,
//!     previous_incidents INTEGER NOT NULL DEFAULT 0,
//!     confirmed_warnings_count INTEGER NOT NULL DEFAULT 0,
//!     false_alarms_count INTEGER NOT NULL DEFAULT 0,
//!     risk_history JSONB NOT NULL DEFAULT '[]',
//!     feedback_history JSONB NOT NULL DEFAULT '[]',
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::repository::{RepositoryError, TherapyRepository};
use crate::domain::therapy::{FeedbackType, Therapy, TherapyId, TherapyStatus};

const THERAPY_COLUMNS: &str = "id, patient_id, drugs, status, start_date, risk_tolerance, \
     ignored_warnings_count, previous_incidents, confirmed_warnings_count, false_alarms_count, \
     risk_history, feedback_history, updated_at";

pub struct PostgresTherapyRepository {
    pool: PgPool,
}

impl PostgresTherapyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn counter(row: &PgRow, column: &str) -> Result<u32, RepositoryError> {
    let value: i32 = row.try_get(column)?;
    u32::try_from(value)
        .map_err(|_| RepositoryError::Serialization(format!("negative counter in {}: {}", column, value)))
}

fn row_to_therapy(row: &PgRow) -> Result<Therapy, RepositoryError> {
    let id: uuid::Uuid = row.try_get("id")?;
    let status_str: String = row.try_get("status")?;
    let status = status_str
        .parse::<TherapyStatus>()
        .map_err(RepositoryError::Serialization)?;

    let drugs: serde_json::Value = row.try_get("drugs")?;
    let risk_history: serde_json::Value = row.try_get("risk_history")?;
    let feedback_history: serde_json::Value = row.try_get("feedback_history")?;

    Ok(Therapy {
        id: TherapyId(id),
        patient_id: row.try_get("patient_id")?,
        drugs: serde_json::from_value(drugs)?,
        status,
        start_date: row.try_get::<DateTime<Utc>, _>("start_date")?,
        risk_tolerance: row.try_get("risk_tolerance")?,
        ignored_warnings_count: counter(row, "ignored_warnings_count")?,
        previous_incidents: counter(row, "previous_incidents")?,
        confirmed_warnings_count: counter(row, "confirmed_warnings_count")?,
        false_alarms_count: counter(row, "false_alarms_count")?,
        risk_history: serde_json::from_value(risk_history)?,
        feedback_history: serde_json::from_value(feedback_history)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[async_trait]
impl TherapyRepository for PostgresTherapyRepository {
    async fn find_all_active(&self) -> Result<Vec<Therapy>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM therapies WHERE status = 'active' ORDER BY start_date ASC, id ASC",
            THERAPY_COLUMNS
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to list active therapies: {}", e)))?;

        rows.iter().map(row_to_therapy).collect()
    }

    async fn find_all(&self) -> Result<Vec<Therapy>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM therapies ORDER BY start_date ASC, id ASC",
            THERAPY_COLUMNS
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to list therapies: {}", e)))?;

        rows.iter().map(row_to_therapy).collect()
    }

    async fn find_by_id(&self, id: TherapyId) -> Result<Option<Therapy>, RepositoryError> {
        let query = format!("SELECT {} FROM therapies WHERE id = $1", THERAPY_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.as_ref().map(row_to_therapy).transpose()
    }

    async fn save(&self, therapy: &Therapy) -> Result<Therapy, RepositoryError> {
        let drugs = serde_json::to_value(&therapy.drugs)?;
        let risk_history = serde_json::to_value(&therapy.risk_history)?;
        let feedback_history = serde_json::to_value(&therapy.feedback_history)?;

        sqlx::query(
            r#"
            INSERT INTO therapies (
                id, patient_id, drugs, status, start_date, risk_tolerance,
                ignored_warnings_count, previous_incidents, confirmed_warnings_count,
                false_alarms_count, risk_history, feedback_history, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                patient_id = EXCLUDED.patient_id,
                drugs = EXCLUDED.drugs,
                status = EXCLUDED.status,
                risk_tolerance = EXCLUDED.risk_tolerance,
                ignored_warnings_count = EXCLUDED.ignored_warnings_count,
                previous_incidents = EXCLUDED.previous_incidents,
                confirmed_warnings_count = EXCLUDED.confirmed_warnings_count,
                false_alarms_count = EXCLUDED.false_alarms_count,
                risk_history = EXCLUDED.risk_history,
                feedback_history = EXCLUDED.feedback_history,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(therapy.id.0)
        .bind(&therapy.patient_id)
        .bind(drugs)
        .bind(therapy.status.as_str())
        .bind(therapy.start_date)
        .bind(therapy.risk_tolerance)
        .bind(therapy.ignored_warnings_count as i32)
        .bind(therapy.previous_incidents as i32)
        .bind(therapy.confirmed_warnings_count as i32)
        .bind(therapy.false_alarms_count as i32)
        .bind(risk_history)
        .bind(feedback_history)
        .bind(therapy.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save therapy: {}", e)))?;

        Ok(therapy.clone())
    }

    async fn update_feedback_counts(
        &self,
        id: TherapyId,
        feedback_type: FeedbackType,
        notes: Option<String>,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let query = format!("SELECT {} FROM therapies WHERE id = $1 FOR UPDATE", THERAPY_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(false);
        };

        let mut therapy = row_to_therapy(&row)?;
        therapy.record_feedback(feedback_type, notes);
        let feedback_history = serde_json::to_value(&therapy.feedback_history)?;

        sqlx::query(
            r#"
            UPDATE therapies SET
                ignored_warnings_count = $2,
                confirmed_warnings_count = $3,
                false_alarms_count = $4,
                feedback_history = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(therapy.ignored_warnings_count as i32)
        .bind(therapy.confirmed_warnings_count as i32)
        .bind(therapy.false_alarms_count as i32)
        .bind(feedback_history)
        .bind(therapy.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update feedback counts: {}", e)))?;

        tx.commit().await?;
        Ok(true)
    }
}
