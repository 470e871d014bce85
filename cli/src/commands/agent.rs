// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent commands: run, tick, stats

use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use interactrack_core::{
    domain::{agent_config::AgentConfigManifest, events::AgentEvent, TherapyId},
    infrastructure::event_bus::EventBusError,
};

use crate::embedded::AgentHost;

/// Run the scheduler until Ctrl-C or SIGTERM. With `therapy` set, only that
/// therapy's events are printed.
pub async fn run(
    config: AgentConfigManifest,
    metrics_addr: Option<SocketAddr>,
    therapy: Option<String>,
) -> Result<()> {
    let therapy_filter = therapy
        .map(|id| {
            TherapyId::from_string(&id).with_context(|| format!("Invalid therapy id '{}'", id))
        })
        .transpose()?;

    if let Some(addr) = metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(%addr, "Prometheus metrics exporter listening");
    }

    let host = AgentHost::new(config).await?;
    let scheduler = Arc::new(host.scheduler());
    let shutdown = scheduler.shutdown_token();

    let bus = host.runner().event_bus();
    let printer = match therapy_filter {
        Some(therapy_id) => {
            info!(therapy_id = %therapy_id, "Printing events for one therapy");
            let mut events = bus.subscribe_therapy(therapy_id);
            tokio::spawn(async move { while print_received(events.recv().await) {} })
        }
        None => {
            let mut events = bus.subscribe();
            tokio::spawn(async move { while print_received(events.recv().await) {} })
        }
    };

    println!("{}", "InteracTrack agent running. Press Ctrl-C to stop.".bold());
    let handle = scheduler.clone().start();

    shutdown_signal().await;
    shutdown.cancel();
    handle.await.context("Scheduler task panicked")?;
    printer.abort();

    let status = scheduler.status();
    println!();
    println!("{}", "Scheduler summary:".bold());
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// Run `count` ticks back to back and print each report.
pub async fn tick(config: AgentConfigManifest, count: u32) -> Result<()> {
    let host = AgentHost::new(config).await?;

    for _ in 0..count {
        let result = host.runner().tick().await.context("Agent tick failed")?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        if !result.has_work {
            eprintln!("{}", "No therapy is due for assessment.".dimmed());
            break;
        }
    }
    Ok(())
}

pub async fn stats(config: AgentConfigManifest) -> Result<()> {
    let host = AgentHost::new(config).await?;
    let stats = host.runner().learning_stats().await;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Print one received event. Returns false once the bus is closed.
fn print_received(received: Result<AgentEvent, EventBusError>) -> bool {
    match received {
        Ok(event) => {
            print_event(&event);
            true
        }
        Err(EventBusError::Lagged(n)) => {
            warn!(dropped = n, "Event printer lagged");
            true
        }
        Err(_) => false,
    }
}

fn print_event(event: &AgentEvent) {
    match event {
        AgentEvent::WarningRaised {
            therapy_id,
            action,
            priority,
            ..
        } => {
            let line = format!("[{}] {} for therapy {}", priority, action, therapy_id);
            println!("{}", line.red().bold());
        }
        AgentEvent::ThresholdAdjusted {
            before,
            after,
            trigger,
            ..
        } => {
            let line = format!("Threshold {:.2} → {:.2} ({:?})", before, after, trigger);
            println!("{}", line.yellow());
        }
        AgentEvent::TickCompleted {
            therapy_id,
            risk_level,
            total_score,
            action,
            ..
        } => {
            println!(
                "{} therapy {} scored {:.2} ({}) → {}",
                "✓".green(),
                therapy_id,
                total_score,
                risk_level,
                action
            );
        }
        AgentEvent::FeedbackReceived { .. } => {}
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use interactrack_core::domain::FeedbackType;
    use interactrack_core::infrastructure::event_bus::EventBus;

    fn feedback(therapy_id: TherapyId) -> AgentEvent {
        AgentEvent::FeedbackReceived {
            therapy_id,
            feedback_type: FeedbackType::Ignored,
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_therapy_printer_skips_others_and_stops_on_close() {
        let bus = EventBus::new(8);
        let wanted = TherapyId::new();
        let mut events = bus.subscribe_therapy(wanted);

        bus.publish(feedback(TherapyId::new()));
        bus.publish(feedback(wanted));
        drop(bus);

        let received = events.recv().await;
        assert!(matches!(&received, Ok(event) if event.therapy_id() == Some(wanted)));
        assert!(print_received(received));
        assert!(!print_received(events.recv().await));
    }
}
