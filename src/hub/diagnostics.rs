use std::collections::HashSet;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{HubError, Result};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};

use super::core::{EventHub, HubEvent};
use super::events::{
    AuthenticationChanged, AuthenticationStarted, CollectionFollowStateChanged,
    ConnectivityChanged, DialogRequested, EntitlementRefreshRequested, EventCategory,
    ListAllModsCompleted, MediaDownloaded, ModEnabledStateChanged, ModInfoReceived,
    ModManagementEvent, PurchaseCompleted, SubscriptionRequestCompleted,
    SubscriptionStatusChanged, WalletBalanceUpdated,
};

const EVENTS_TARGET: &str = "widget_hub::hub.events";

/// Logs every domain event routed through a hub, with per-category toggles.
///
/// Attached as a dynamic subscriber: dropping the returned `Rc` detaches it
/// from every channel on the next publish.
pub struct HubEventLogger {
    logger: Logger,
    level: LogLevel,
    muted: HashSet<EventCategory>,
}

impl HubEventLogger {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            level: LogLevel::Debug,
            muted: [EventCategory::Media].into_iter().collect(),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn log_category(mut self, category: EventCategory, enabled: bool) -> Self {
        if enabled {
            self.muted.remove(&category);
        } else {
            self.muted.insert(category);
        }
        self
    }

    pub fn logs(&self, category: EventCategory) -> bool {
        !self.muted.contains(&category)
    }

    /// Subscribes to every hub channel and returns the shared receiver.
    pub fn attach(self, hub: &EventHub) -> Result<Rc<Self>> {
        let receiver = Rc::new(self);
        macro_rules! attach {
            ($($event:ty),+ $(,)?) => {
                $(hub.subscribe_weak::<$event, _, _>(&receiver, Self::record::<$event>)?;)+
            };
        }
        attach!(
            SubscriptionRequestCompleted,
            SubscriptionStatusChanged,
            CollectionFollowStateChanged,
            MediaDownloaded,
            AuthenticationStarted,
            AuthenticationChanged,
            ModInfoReceived,
            ListAllModsCompleted,
            ModManagementEvent,
            WalletBalanceUpdated,
            PurchaseCompleted,
            ConnectivityChanged,
            ModEnabledStateChanged,
            EntitlementRefreshRequested,
            DialogRequested,
        );
        receiver.announce();
        Ok(receiver)
    }

    fn record<E>(&self, event: &E) -> Result<()>
    where
        E: HubEvent + Serialize,
    {
        if !self.logs(E::KIND.category()) {
            return Ok(());
        }
        let payload =
            serde_json::to_value(event).map_err(|err| HubError::handler(err.to_string()))?;
        let mut fields = vec![json_kv("category", json!(E::KIND.category()))];
        match payload {
            Value::Object(map) => fields.extend(map),
            Value::Null => {}
            other => fields.push(json_kv("payload", other)),
        }
        self.emit(&format!("event.{}", E::KIND.name()), fields);
        Ok(())
    }

    fn announce(&self) {
        let muted: Vec<Value> = self.muted.iter().map(|category| json!(category)).collect();
        self.emit(
            "logger_attached",
            [
                json_kv("logger_level", json!(format!("{:?}", self.level))),
                json_kv("muted", Value::Array(muted)),
            ],
        );
    }

    fn emit(&self, message: &str, fields: impl IntoIterator<Item = (String, Value)>) {
        let event = event_with_fields(self.level, EVENTS_TARGET, message, fields);
        let _ = self.logger.log_event(event);
    }
}
