use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;

/// Counters shared by every channel of a hub.
#[derive(Debug, Default, Clone)]
pub struct HubMetrics {
    publishes: u64,
    deliveries: u64,
    handler_failures: u64,
    pruned_subscribers: u64,
    registrations: u64,
    deregistrations: u64,
}

impl HubMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_publish(&mut self, delivered: usize, failed: usize) {
        self.publishes = self.publishes.saturating_add(1);
        self.deliveries = self.deliveries.saturating_add(delivered as u64);
        self.handler_failures = self.handler_failures.saturating_add(failed as u64);
    }

    pub fn record_pruned(&mut self, count: usize) {
        if count > 0 {
            self.pruned_subscribers = self.pruned_subscribers.saturating_add(count as u64);
        }
    }

    pub fn record_registration(&mut self) {
        self.registrations = self.registrations.saturating_add(1);
    }

    pub fn record_deregistration(&mut self) {
        self.deregistrations = self.deregistrations.saturating_add(1);
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            publishes: self.publishes,
            deliveries: self.deliveries,
            handler_failures: self.handler_failures,
            pruned_subscribers: self.pruned_subscribers,
            registrations: self.registrations,
            deregistrations: self.deregistrations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub publishes: u64,
    pub deliveries: u64,
    pub handler_failures: u64,
    pub pruned_subscribers: u64,
    pub registrations: u64,
    pub deregistrations: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "hub_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("publishes".to_string(), json!(self.publishes));
        map.insert("deliveries".to_string(), json!(self.deliveries));
        map.insert("handler_failures".to_string(), json!(self.handler_failures));
        map.insert("pruned_subscribers".to_string(), json!(self.pruned_subscribers));
        map.insert("registrations".to_string(), json!(self.registrations));
        map.insert("deregistrations".to_string(), json!(self.deregistrations));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_counters() {
        let mut metrics = HubMetrics::new();
        metrics.record_registration();
        metrics.record_publish(3, 1);
        metrics.record_pruned(2);
        metrics.record_pruned(0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.publishes, 1);
        assert_eq!(snapshot.deliveries, 3);
        assert_eq!(snapshot.handler_failures, 1);
        assert_eq!(snapshot.pruned_subscribers, 2);
        assert_eq!(snapshot.registrations, 1);

        let event = snapshot.to_log_event("widget_hub::metrics");
        assert_eq!(event.message, "hub_metrics");
        assert_eq!(event.field("deliveries"), Some(&json!(3)));
    }
}
