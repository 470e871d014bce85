// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Interaction Index
//!
//! In-memory multimap from an unordered drug pair to every interaction record
//! known for it. Built once from the interaction dataset; read-only afterwards.
//!
//! Keys are normalized as `min(a, b)|max(a, b)`, so the direction a pair was
//! recorded in is irrelevant. Several records may share a pair (different
//! interaction types); lookups return all of them in insertion order. A pair
//! with no records yields an empty vector.

use std::collections::HashMap;
use std::fmt;

use crate::domain::drug::{DrugInteraction, InteractionLookup};

/// Order-independent key for a drug pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    first: String,
    second: String,
}

impl PairKey {
    pub fn new(drug_a: &str, drug_b: &str) -> Self {
        let (first, second) = if drug_a <= drug_b {
            (drug_a, drug_b)
        } else {
            (drug_b, drug_a)
        };
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.first, self.second)
    }
}

#[derive(Debug, Default, Clone)]
pub struct InteractionIndex {
    pairs: HashMap<PairKey, Vec<DrugInteraction>>,
    record_count: usize,
}

impl InteractionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, interaction: DrugInteraction) {
        let key = PairKey::new(&interaction.drug1_id, &interaction.drug2_id);
        self.pairs.entry(key).or_default().push(interaction);
        self.record_count += 1;
    }

    /// Total records indexed.
    pub fn len(&self) -> usize {
        self.record_count
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// Distinct drug pairs with at least one record.
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }
}

impl FromIterator<DrugInteraction> for InteractionIndex {
    fn from_iter<I: IntoIterator<Item = DrugInteraction>>(iter: I) -> Self {
        let mut index = Self::new();
        for interaction in iter {
            index.insert(interaction);
        }
        index
    }
}

impl InteractionLookup for InteractionIndex {
    fn lookup(&self, drug_a: &str, drug_b: &str) -> Vec<DrugInteraction> {
        self.pairs
            .get(&PairKey::new(drug_a, drug_b))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(a: &str, b: &str, kind: &str, score: f64) -> DrugInteraction {
        DrugInteraction {
            drug1_id: a.to_string(),
            drug2_id: b.to_string(),
            interaction_type: kind.to_string(),
            risk_score: score,
            risk_category: "TEST".to_string(),
        }
    }

    #[test]
    fn test_pair_key_is_normalized() {
        assert_eq!(PairKey::new("DB2", "DB1"), PairKey::new("DB1", "DB2"));
        assert_eq!(PairKey::new("DB2", "DB1").to_string(), "DB1|DB2");
    }

    #[test]
    fn test_lookup_returns_all_records_for_pair() {
        let index: InteractionIndex = vec![
            record("A", "B", "bleeding", 5.0),
            record("B", "A", "sedation", 2.0),
            record("A", "C", "nausea", 1.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(index.len(), 3);
        assert_eq!(index.pair_count(), 2);

        let found = index.lookup("A", "B");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].interaction_type, "bleeding");
        assert_eq!(found[1].interaction_type, "sedation");
    }

    #[test]
    fn test_missing_pair_is_empty() {
        let index = InteractionIndex::new();
        assert!(index.is_empty());
        assert!(index.lookup("X", "Y").is_empty());
    }

    proptest! {
        #[test]
        fn prop_lookup_is_order_independent(
            records in proptest::collection::vec(("[A-E]", "[A-E]", 1.0f64..5.0), 0..30),
            a in "[A-E]",
            b in "[A-E]",
        ) {
            let index: InteractionIndex = records
                .iter()
                .map(|(x, y, s)| record(x, y, "t", *s))
                .collect();
            prop_assert_eq!(index.lookup(&a, &b), index.lookup(&b, &a));
        }
    }
}
