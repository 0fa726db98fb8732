//! Hub lifecycle audit utilities.
//!
//! Channels and the hub report registrations, pruning, publications and
//! handler failures as [`HubAuditEvent`] records so callers can buffer or
//! inspect the routing history without reaching into the channels.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

/// Distinct checkpoints emitted by channels and the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubAuditStage {
    /// The hub transitioned to running.
    HubInitialized,
    /// A subscriber was added to a channel.
    SubscriberRegistered,
    /// A subscriber was removed explicitly.
    SubscriberDeregistered,
    /// A weakly tracked subscriber was found dead and swept.
    SubscriberPruned,
    /// A payload finished fanning out.
    EventPublished,
    /// A subscriber callback returned an error.
    HandlerFailed,
    /// The hub was shut down and its channels cleared.
    HubShutDown,
}

#[derive(Debug, Clone)]
pub struct HubAuditEvent {
    pub timestamp: SystemTime,
    pub stage: HubAuditStage,
    pub details: Vec<(String, Value)>,
}

impl HubAuditEvent {
    fn new(stage: HubAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

/// Builder helper to append fields ergonomically.
pub struct HubAuditEventBuilder {
    event: HubAuditEvent,
}

impl HubAuditEventBuilder {
    pub fn new(stage: HubAuditStage) -> Self {
        Self {
            event: HubAuditEvent::new(stage),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.details.push((key.into(), value.into()));
        self
    }

    pub fn finish(self) -> HubAuditEvent {
        self.event
    }
}

/// Trait implemented by any audit sink.
pub trait HubAudit: Send + Sync {
    fn record(&self, event: HubAuditEvent);
}

/// Default no-op implementation used when auditing is disabled.
#[derive(Debug, Default)]
pub struct NullHubAudit;

impl HubAudit for NullHubAudit {
    fn record(&self, _event: HubAuditEvent) {}
}

/// Buffers every record in memory.
#[derive(Debug, Default)]
pub struct RecordingAudit {
    events: Mutex<Vec<HubAuditEvent>>,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HubAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<HubAuditStage> {
        self.events().into_iter().map(|event| event.stage).collect()
    }

    pub fn count(&self, stage: HubAuditStage) -> usize {
        self.events()
            .iter()
            .filter(|event| event.stage == stage)
            .count()
    }
}

impl HubAudit for RecordingAudit {
    fn record(&self, event: HubAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
