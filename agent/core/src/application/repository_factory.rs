// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on storage backend
//! configuration. The domain layer only knows the traits.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Pick in-memory or PostgreSQL persistence at startup

use anyhow::Context;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;

use crate::domain::repository::{LearningStateRepository, StorageBackend, TherapyRepository};
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::{
    InMemoryLearningStateRepository, InMemoryTherapyRepository, PostgresLearningStateRepository,
    PostgresTherapyRepository,
};
use crate::infrastructure::therapy_seed::load_therapy_seed;

/// Both repositories the agent needs, built for one backend.
#[derive(Clone)]
pub struct Repositories {
    pub therapies: Arc<dyn TherapyRepository>,
    pub learning: Arc<dyn LearningStateRepository>,
}

/// Creates a TherapyRepository implementation based on the configured backend
pub fn create_therapy_repository(
    backend: &StorageBackend,
    pool: Option<PgPool>,
) -> anyhow::Result<Arc<dyn TherapyRepository>> {
    match backend {
        StorageBackend::InMemory => Ok(Arc::new(InMemoryTherapyRepository::new())),
        StorageBackend::PostgreSQL(_) => {
            let pool = pool.context("PostgreSQL backend selected but no connection pool was provided")?;
            Ok(Arc::new(PostgresTherapyRepository::new(pool)))
        }
    }
}

/// Creates a LearningStateRepository implementation based on the configured backend
pub fn create_learning_repository(
    backend: &StorageBackend,
    pool: Option<PgPool>,
) -> anyhow::Result<Arc<dyn LearningStateRepository>> {
    match backend {
        StorageBackend::InMemory => Ok(Arc::new(InMemoryLearningStateRepository::new())),
        StorageBackend::PostgreSQL(_) => {
            let pool = pool.context("PostgreSQL backend selected but no connection pool was provided")?;
            Ok(Arc::new(PostgresLearningStateRepository::new(pool)))
        }
    }
}

/// Connects to PostgreSQL when needed and builds both repositories. A seed
/// file, if given, pre-populates the in-memory therapy store.
pub async fn create_repositories(
    backend: &StorageBackend,
    seed_path: Option<&Path>,
) -> anyhow::Result<Repositories> {
    match backend {
        StorageBackend::InMemory => {
            let therapies = match seed_path {
                Some(path) => InMemoryTherapyRepository::with_therapies(load_therapy_seed(path)?),
                None => InMemoryTherapyRepository::new(),
            };
            Ok(Repositories {
                therapies: Arc::new(therapies),
                learning: create_learning_repository(backend, None)?,
            })
        }
        StorageBackend::PostgreSQL(config) => {
            if seed_path.is_some() {
                anyhow::bail!("Therapy seed files are only supported by the in-memory backend");
            }
            let database = Database::new(&config.connection_string).await?;
            let pool = database.get_pool().clone();
            Ok(Repositories {
                therapies: create_therapy_repository(backend, Some(pool.clone()))?,
                learning: create_learning_repository(backend, Some(pool))?,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::PostgresConfig;
    use std::io::Write;

    #[test]
    fn test_postgres_without_pool_is_an_error() {
        let backend = StorageBackend::PostgreSQL(PostgresConfig {
            connection_string: "postgres://localhost/ddi".into(),
        });
        assert!(create_therapy_repository(&backend, None).is_err());
        assert!(create_learning_repository(&backend, None).is_err());
    }

    #[tokio::test]
    async fn test_in_memory_with_seed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"patient_id": "p1", "drugs": [{{"drug_id": "A", "name": "A"}}, {{"drug_id": "B", "name": "B"}}]}}]"#
        )
        .unwrap();

        let repos = create_repositories(&StorageBackend::InMemory, Some(file.path()))
            .await
            .unwrap();
        let active = repos.therapies.find_all_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].patient_id, "p1");
        assert!(repos.learning.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_without_seed_is_empty() {
        let repos = create_repositories(&StorageBackend::InMemory, None).await.unwrap();
        assert!(repos.therapies.find_all().await.unwrap().is_empty());
    }
}
