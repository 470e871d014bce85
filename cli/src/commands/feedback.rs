// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Feedback submission

use anyhow::Result;
use colored::Colorize;

use interactrack_core::domain::agent_config::AgentConfigManifest;

use crate::embedded::AgentHost;

pub async fn submit(
    config: AgentConfigManifest,
    therapy_id: String,
    feedback_type: String,
    notes: Option<String>,
) -> Result<()> {
    let host = AgentHost::new(config).await?;
    let result = host
        .feedback()
        .submit_feedback(&therapy_id, &feedback_type, notes)
        .await?;

    println!(
        "{}",
        format!(
            "✓ Feedback '{}' recorded, threshold {:.2} → {:.2}",
            result.feedback_type, result.threshold_before, result.threshold_after
        )
        .green()
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
