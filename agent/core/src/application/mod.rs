// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application
//!
//! Use cases built on the domain: scoring, the tick runner, feedback
//! handling and the background scheduler.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Orchestrate domain logic against repositories and the event bus

pub mod feedback;
pub mod repository_factory;
pub mod runner;
pub mod scheduler;
pub mod scoring;

pub use feedback::{FeedbackError, FeedbackResult, FeedbackService, TherapySnapshot};
pub use repository_factory::{create_repositories, Repositories};
pub use runner::{AgentError, FeedbackApplied, RiskAssessmentRunner, RunnerConfig, TickResult};
pub use scheduler::{AgentScheduler, SchedulerConfig, SchedulerStatus, TickRunner};
pub use scoring::ScoringService;
