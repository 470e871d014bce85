// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Therapy Seed File
//!
//! The in-memory backend forgets everything when the process exits. A seed
//! file gives it a starting set of therapies:
//!
//! ```json
//! [
//!   {
//!     "patient_id": "patient-001",
//!     "drugs": [
//!       { "drug_id": "DB00682", "name": "Warfarin" },
//!       { "drug_id": "DB00945", "name": "Aspirin", "dosage": "100mg" }
//!     ],
//!     "risk_tolerance": 3.0,
//!     "previous_incidents": 1
//!   }
//! ]
//! ```
//!
//! Every seeded therapy starts active with empty histories. An entry may pin
//! its `id`; without one a fresh id is generated on every load.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::domain::drug::Drug;
use crate::domain::therapy::{Therapy, TherapyId};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read therapy seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed therapy seed file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Seed entry {index}: {reason}")]
    InvalidEntry { index: usize, reason: String },
}

/// Minimal description of a new therapy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapySeed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TherapyId>,
    pub patient_id: String,
    pub drugs: Vec<Drug>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_tolerance: Option<f64>,
    #[serde(default)]
    pub previous_incidents: u32,
}

impl TherapySeed {
    pub fn into_therapy(self) -> Therapy {
        let mut therapy = Therapy::new(self.patient_id, self.drugs);
        if let Some(id) = self.id {
            therapy.id = id;
        }
        if let Some(tolerance) = self.risk_tolerance {
            therapy.risk_tolerance = tolerance;
        }
        therapy.previous_incidents = self.previous_incidents;
        therapy
    }

    fn validate(&self, index: usize) -> Result<(), SeedError> {
        let invalid = |reason: &str| SeedError::InvalidEntry {
            index,
            reason: reason.to_string(),
        };
        if self.patient_id.trim().is_empty() {
            return Err(invalid("patient_id is empty"));
        }
        if self.drugs.iter().any(|d| d.drug_id.trim().is_empty()) {
            return Err(invalid("drug_id is empty"));
        }
        if let Some(tolerance) = self.risk_tolerance {
            if !tolerance.is_finite() {
                return Err(invalid("risk_tolerance is not a finite number"));
            }
        }
        Ok(())
    }
}

pub fn parse_therapy_seed(json: &str) -> Result<Vec<Therapy>, SeedError> {
    let seeds: Vec<TherapySeed> = serde_json::from_str(json)?;
    let mut seen = std::collections::HashSet::new();
    for (index, seed) in seeds.iter().enumerate() {
        if let Some(id) = seed.id {
            if !seen.insert(id) {
                return Err(SeedError::InvalidEntry {
                    index,
                    reason: format!("duplicate id {}", id),
                });
            }
        }
    }
    seeds
        .into_iter()
        .enumerate()
        .map(|(index, seed)| {
            seed.validate(index)?;
            Ok(seed.into_therapy())
        })
        .collect()
}

pub fn load_therapy_seed(path: impl AsRef<Path>) -> Result<Vec<Therapy>, SeedError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let therapies = parse_therapy_seed(&content)?;
    info!(path = %path.display(), therapies = therapies.len(), "Loaded therapy seed file");
    Ok(therapies)
}

/// Append one entry to a seed file, creating the file if it does not exist.
pub fn append_therapy_seed(path: impl AsRef<Path>, seed: TherapySeed) -> Result<(), SeedError> {
    let path = path.as_ref();
    let io_err = |source| SeedError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut seeds: Vec<TherapySeed> = if path.exists() {
        serde_json::from_str(&std::fs::read_to_string(path).map_err(io_err)?)?
    } else {
        Vec::new()
    };
    seed.validate(seeds.len())?;
    seeds.push(seed);

    let json = serde_json::to_string_pretty(&seeds)?;
    std::fs::write(path, json).map_err(io_err)?;
    Ok(())
}
