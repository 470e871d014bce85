// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Risk Scoring Service
//!
//! Turns a drug set into a [`RiskAssessment`] by enumerating every unordered
//! pair and concatenating the interaction records the index holds for it.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Think step, first half (the decision policy is the second)

use std::sync::Arc;

use crate::domain::drug::InteractionLookup;
use crate::domain::risk::RiskAssessment;
use crate::domain::therapy::Therapy;

#[derive(Clone)]
pub struct ScoringService {
    index: Arc<dyn InteractionLookup>,
}

impl ScoringService {
    pub fn new(index: Arc<dyn InteractionLookup>) -> Self {
        Self { index }
    }

    /// Assess a drug set. Duplicate identifiers are ignored; fewer than two
    /// distinct drugs yields the zero assessment.
    pub fn assess(&self, drug_ids: &[String]) -> RiskAssessment {
        let mut distinct: Vec<&str> = Vec::with_capacity(drug_ids.len());
        for id in drug_ids {
            if !distinct.contains(&id.as_str()) {
                distinct.push(id.as_str());
            }
        }

        if distinct.len() < 2 {
            return RiskAssessment::none();
        }

        let mut interactions = Vec::new();
        for (i, first) in distinct.iter().enumerate() {
            for second in &distinct[i + 1..] {
                interactions.extend(self.index.lookup(first, second));
            }
        }

        RiskAssessment::from_interactions(interactions)
    }

    pub fn assess_therapy(&self, therapy: &Therapy) -> RiskAssessment {
        self.assess(&therapy.drug_ids())
    }
}
