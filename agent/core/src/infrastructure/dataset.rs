// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Interaction Dataset Loader
//!
//! Reads the precomputed interaction table into an [`InteractionIndex`].
//!
//! Expected CSV header (extra columns are ignored):
//!
//! ```text
//! drug1_id,drug2_id,interaction_type,risk_score,risk_category
//! ```
//!
//! A missing or unreadable file is a configuration error: the agent cannot be
//! constructed without its dataset.

use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::domain::drug::DrugInteraction;
use crate::infrastructure::interaction_index::InteractionIndex;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Failed to open interaction dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed interaction dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid interaction record on line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },
}

#[derive(Debug, Deserialize)]
struct InteractionRow {
    drug1_id: String,
    drug2_id: String,
    interaction_type: String,
    risk_score: f64,
    risk_category: String,
}

pub fn load_interaction_index(path: impl AsRef<Path>) -> Result<InteractionIndex, DatasetError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let index = read_interaction_index(file)?;
    info!(
        path = %path.display(),
        records = index.len(),
        pairs = index.pair_count(),
        "Loaded interaction dataset"
    );
    Ok(index)
}

pub fn read_interaction_index<R: Read>(reader: R) -> Result<InteractionIndex, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut record = csv::StringRecord::new();
    let mut index = InteractionIndex::new();
    while csv_reader.read_record(&mut record)? {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row: InteractionRow = record.deserialize(Some(&headers))?;
        index.insert(validate_row(row, line)?);
    }
    Ok(index)
}

fn validate_row(row: InteractionRow, line: u64) -> Result<DrugInteraction, DatasetError> {
    if row.drug1_id.is_empty() || row.drug2_id.is_empty() {
        return Err(DatasetError::InvalidRow {
            line,
            reason: "empty drug identifier".to_string(),
        });
    }
    if !row.risk_score.is_finite() {
        return Err(DatasetError::InvalidRow {
            line,
            reason: format!("risk_score is not a finite number: {}", row.risk_score),
        });
    }

    Ok(DrugInteraction {
        drug1_id: row.drug1_id,
        drug2_id: row.drug2_id,
        interaction_type: row.interaction_type,
        risk_score: row.risk_score,
        risk_category: row.risk_category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drug::InteractionLookup;
    use std::io::Write;

    const SAMPLE: &str = "\
drug1_id,drug2_id,interaction_type,risk_score,risk_category
DB00682,DB00945,bleeding,5.0,CRITICAL_BLEEDING
DB00945,DB00682,gastrointestinal irritation,2.5,MODERATE
DB00331,DB00682, hypoglycemia ,3.2,HIGH_METABOLIC
";

    #[test]
    fn test_reads_sample_dataset() {
        let index = read_interaction_index(SAMPLE.as_bytes()).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.pair_count(), 2);

        let pair = index.lookup("DB00945", "DB00682");
        assert_eq!(pair.len(), 2);
        assert_eq!(pair[0].risk_score, 5.0);

        let trimmed = index.lookup("DB00682", "DB00331");
        assert_eq!(trimmed[0].interaction_type, "hypoglycemia");
    }

    #[test]
    fn test_rejects_non_numeric_score() {
        let data = "drug1_id,drug2_id,interaction_type,risk_score,risk_category\nA,B,x,high,C\n";
        assert!(matches!(read_interaction_index(data.as_bytes()), Err(DatasetError::Csv(_))));
    }

    #[test]
    fn test_rejects_empty_identifier() {
        let data = "drug1_id,drug2_id,interaction_type,risk_score,risk_category\n,B,x,2.0,C\n";
        assert!(matches!(
            read_interaction_index(data.as_bytes()),
            Err(DatasetError::InvalidRow { line: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_row_reports_its_own_line() {
        let data = "\
drug1_id,drug2_id,interaction_type,risk_score,risk_category
A,B,bleeding,4.0,HIGH
A,,sedation,2.0,LOW
C,D,sedation,2.0,LOW
";
        match read_interaction_index(data.as_bytes()) {
            Err(DatasetError::InvalidRow { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("empty drug identifier"));
            }
            other => panic!("expected InvalidRow, got {:?}", other.map(|i| i.len())),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_interaction_index("/nonexistent/ddi.csv").unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let index = load_interaction_index(file.path()).unwrap();
        assert_eq!(index.len(), 3);
    }
}
