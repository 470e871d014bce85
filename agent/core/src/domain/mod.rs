// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Entities, value objects and pure decision logic of the risk assessment agent.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Therapy aggregate, interaction records, decision policy, learning state

pub mod drug;
pub mod risk;
pub mod therapy;
pub mod warning;
pub mod policy;
pub mod learning;
pub mod events;
pub mod repository;
pub mod agent_config;

pub use drug::*;
pub use risk::*;
pub use therapy::*;
pub use warning::*;
pub use policy::*;
pub use learning::*;
