// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! InteracTrack Core
//!
//! Drug-drug-interaction risk assessment agent. One tick runs a
//! Sense → Think → Act → Learn cycle over a single active therapy.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, scoring, adaptive decision policy and learning loop

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
