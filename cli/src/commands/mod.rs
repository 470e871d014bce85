// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the InteracTrack CLI

pub mod agent;
pub mod config;
pub mod feedback;
pub mod therapy;

pub use self::config::ConfigCommand;
pub use self::therapy::TherapyCommand;
