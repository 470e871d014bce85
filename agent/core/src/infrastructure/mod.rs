// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod dataset;
pub mod db;
pub mod event_bus;
pub mod interaction_index;
pub mod repositories;
pub mod therapy_seed;

pub use dataset::{load_interaction_index, DatasetError};
pub use interaction_index::InteractionIndex;
pub use therapy_seed::{append_therapy_seed, load_therapy_seed, SeedError, TherapySeed};
