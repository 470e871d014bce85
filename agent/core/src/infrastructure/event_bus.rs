// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Agent Events
//
// In-memory event streaming over tokio broadcast channels. Events are lost on
// restart; subscribers that fall behind lose the oldest events.

use crate::domain::events::AgentEvent;
use crate::domain::therapy::TherapyId;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Event bus for publishing and subscribing to agent events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<AgentEvent>>,
}

impl EventBus {
    /// Capacity is how many events are buffered before the oldest are dropped
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish to all subscribers. No subscribers is not an error.
    pub fn publish(&self, event: AgentEvent) {
        debug!("Publishing event: {:?}", event);

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the events of a single therapy
    pub fn subscribe_therapy(&self, therapy_id: TherapyId) -> TherapyEventReceiver {
        TherapyEventReceiver {
            receiver: self.sender.subscribe(),
            therapy_id,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<AgentEvent>,
}

impl EventReceiver {
    /// Wait for the next event
    pub async fn recv(&mut self) -> Result<AgentEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    pub fn try_recv(&mut self) -> Result<AgentEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered to one therapy. Events without a therapy (threshold
/// adjustments) are skipped.
pub struct TherapyEventReceiver {
    receiver: broadcast::Receiver<AgentEvent>,
    therapy_id: TherapyId,
}

impl TherapyEventReceiver {
    pub async fn recv(&mut self) -> Result<AgentEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.therapy_id() == Some(self.therapy_id) {
                return Ok(event);
            }
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
