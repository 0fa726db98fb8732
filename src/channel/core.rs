use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::audit::{HubAudit, HubAuditEventBuilder, HubAuditStage, NullHubAudit};
use crate::error::{HubError, Result};
use crate::logging::{LogLevel, Logger, emit, json_kv};
use crate::metrics::HubMetrics;

const CHANNEL_TARGET: &str = "widget_hub::channel";

/// Stable identity of a subscriber, used as the registration map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriberKey {
    /// Address of a reference-counted object.
    Object(usize),
    /// Caller-chosen identifier for subscribers without a backing object.
    Named(u64),
}

impl SubscriberKey {
    pub fn of<O: ?Sized>(target: &Rc<O>) -> Self {
        Self::of_ref(&**target)
    }

    /// Key for an object already borrowed out of its `Rc`; equals [`SubscriberKey::of`].
    pub fn of_ref<O: ?Sized>(target: &O) -> Self {
        Self::Object(target as *const O as *const () as usize)
    }

    pub fn named(id: u64) -> Self {
        Self::Named(id)
    }
}

/// Token returned by every subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberKind {
    /// Closure registered under an explicit key.
    Closure,
    /// Strongly held object plus method.
    Native,
    /// Weakly tracked object; pruned once the object is gone.
    Dynamic,
}

impl SubscriberKind {
    fn label(self) -> &'static str {
        match self {
            SubscriberKind::Closure => "closure",
            SubscriberKind::Native => "native",
            SubscriberKind::Dynamic => "dynamic",
        }
    }
}

/// Outcome of a single [`EventChannel::publish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
    /// Dead dynamic subscribers swept before delivery.
    pub pruned: usize,
    /// Subscribers removed by an earlier callback of the same publish.
    pub skipped: usize,
}

impl PublishReport {
    pub fn merge(&mut self, other: PublishReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.pruned += other.pruned;
        self.skipped += other.skipped;
    }
}

/// Shared observability handles for a channel.
#[derive(Clone)]
pub struct ChannelConfig {
    pub name: String,
    pub logger: Option<Logger>,
    pub metrics: Option<Arc<Mutex<HubMetrics>>>,
    pub audit: Arc<dyn HubAudit>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: "channel".to_string(),
            logger: None,
            metrics: None,
            audit: Arc::new(NullHubAudit),
        }
    }
}

impl ChannelConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }
}

type Callback<T> = Rc<dyn Fn(&T) -> Result<()>>;

struct Registration<T> {
    key: SubscriberKey,
    handle: SubscriptionHandle,
    kind: SubscriberKind,
    callback: Callback<T>,
    alive: Option<Box<dyn Fn() -> bool>>,
}

impl<T> Registration<T> {
    fn is_alive(&self) -> bool {
        self.alive.as_ref().map(|alive| alive()).unwrap_or(true)
    }
}

struct ChannelInner<T> {
    entries: Vec<Registration<T>>,
    next_handle: u64,
}

/// Typed, single-threaded multicast channel.
///
/// Delivery is synchronous and follows registration order. The subscriber
/// table belongs to the channel; subscribers themselves are never owned
/// beyond what their registration form implies (a strong `Rc` for native
/// subscribers, nothing for dynamic ones).
pub struct EventChannel<T> {
    config: ChannelConfig,
    inner: RefCell<ChannelInner<T>>,
}

impl<T> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("name", &self.config.name)
            .field("subscribers", &self.inner.borrow().entries.len())
            .finish()
    }
}

impl<T: 'static> Default for EventChannel<T> {
    fn default() -> Self {
        Self::with_config(ChannelConfig::default())
    }
}

impl<T: 'static> EventChannel<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(ChannelConfig::named(name))
    }

    pub fn with_config(config: ChannelConfig) -> Self {
        Self {
            config,
            inner: RefCell::new(ChannelInner {
                entries: Vec::new(),
                next_handle: 1,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Registers `callback` under `key`. Registering a key that is already
    /// live returns the existing handle and changes nothing.
    pub fn subscribe<F>(&self, key: SubscriberKey, callback: F) -> SubscriptionHandle
    where
        F: Fn(&T) -> Result<()> + 'static,
    {
        self.insert(key, SubscriberKind::Closure, Rc::new(callback), None)
    }

    /// Native subscriber: the channel keeps `target` alive until it is
    /// unsubscribed.
    pub fn subscribe_strong<O>(
        &self,
        target: &Rc<O>,
        method: fn(&O, &T) -> Result<()>,
    ) -> SubscriptionHandle
    where
        O: ?Sized + 'static,
    {
        let key = SubscriberKey::of(target);
        let target = Rc::clone(target);
        self.insert(
            key,
            SubscriberKind::Native,
            Rc::new(move |payload: &T| method(&target, payload)),
            None,
        )
    }

    /// Dynamic subscriber: only a weak reference is held, and the
    /// registration is pruned once `target` has been dropped.
    pub fn subscribe_weak<O, F>(&self, target: &Rc<O>, callback: F) -> SubscriptionHandle
    where
        O: ?Sized + 'static,
        F: Fn(&O, &T) -> Result<()> + 'static,
    {
        let key = SubscriberKey::of(target);
        let weak: Weak<O> = Rc::downgrade(target);
        let tracker = weak.clone();
        self.insert(
            key,
            SubscriberKind::Dynamic,
            Rc::new(move |payload: &T| match weak.upgrade() {
                Some(target) => callback(&target, payload),
                None => Ok(()),
            }),
            Some(Box::new(move || tracker.strong_count() > 0)),
        )
    }

    fn insert(
        &self,
        key: SubscriberKey,
        kind: SubscriberKind,
        callback: Callback<T>,
        alive: Option<Box<dyn Fn() -> bool>>,
    ) -> SubscriptionHandle {
        // Sweep first so an address reused by a new object never matches a
        // dead registration.
        self.sweep();

        let handle = {
            let mut inner = self.inner.borrow_mut();
            let existing = inner
                .entries
                .iter()
                .find(|entry| entry.key == key)
                .map(|entry| entry.handle);
            if let Some(handle) = existing {
                drop(inner);
                self.log(
                    LogLevel::Trace,
                    "duplicate_registration",
                    [json_kv("handle", json!(handle.id()))],
                );
                return handle;
            }
            let handle = SubscriptionHandle(inner.next_handle);
            inner.next_handle += 1;
            inner.entries.push(Registration {
                key,
                handle,
                kind,
                callback,
                alive,
            });
            handle
        };

        self.with_metrics(|metrics| metrics.record_registration());
        self.audit(
            HubAuditEventBuilder::new(HubAuditStage::SubscriberRegistered)
                .detail("channel", self.config.name.as_str())
                .detail("handle", handle.id())
                .detail("kind", kind.label()),
        );
        self.log(
            LogLevel::Debug,
            "subscriber_registered",
            [
                json_kv("handle", json!(handle.id())),
                json_kv("kind", json!(kind.label())),
            ],
        );
        handle
    }

    /// Removes the registration for `key`; returns whether one existed.
    pub fn unsubscribe(&self, key: SubscriberKey) -> bool {
        self.sweep();
        self.remove_where(|entry| entry.key == key)
    }

    pub fn unsubscribe_handle(&self, handle: SubscriptionHandle) -> bool {
        self.sweep();
        self.remove_where(|entry| entry.handle == handle)
    }

    fn remove_where(&self, predicate: impl Fn(&Registration<T>) -> bool) -> bool {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let position = inner.entries.iter().position(|entry| predicate(entry));
            position.map(|idx| inner.entries.remove(idx))
        };
        match removed {
            Some(entry) => {
                self.with_metrics(|metrics| metrics.record_deregistration());
                self.audit(
                    HubAuditEventBuilder::new(HubAuditStage::SubscriberDeregistered)
                        .detail("channel", self.config.name.as_str())
                        .detail("handle", entry.handle.id()),
                );
                self.log(
                    LogLevel::Debug,
                    "subscriber_deregistered",
                    [json_kv("handle", json!(entry.handle.id()))],
                );
                true
            }
            None => false,
        }
    }

    /// Drops every registration.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut self.inner.borrow_mut().entries);
        if !removed.is_empty() {
            self.log(
                LogLevel::Debug,
                "channel_cleared",
                [json_kv("count", json!(removed.len()))],
            );
        }
    }

    pub fn is_subscribed(&self, key: SubscriberKey) -> bool {
        self.inner
            .borrow()
            .entries
            .iter()
            .any(|entry| entry.key == key && entry.is_alive())
    }

    /// Registration form of the live subscriber under `key`.
    pub fn subscriber_kind(&self, key: SubscriberKey) -> Option<SubscriberKind> {
        self.inner
            .borrow()
            .entries
            .iter()
            .find(|entry| entry.key == key && entry.is_alive())
            .map(|entry| entry.kind)
    }

    /// Live registrations; dead dynamic entries awaiting a sweep are not counted.
    pub fn len(&self) -> usize {
        self.inner
            .borrow()
            .entries
            .iter()
            .filter(|entry| entry.is_alive())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `payload` to every live subscriber in registration order.
    ///
    /// Subscribers added by a callback are not reached by this publish;
    /// subscribers removed by a callback are skipped. A callback that returns
    /// `Err` is logged and the fan-out continues. Handlers report failure
    /// through `Err`: a panic is not caught and unwinds out of `publish`,
    /// leaving the remaining subscribers undelivered for this payload. No
    /// borrow of the subscriber table is held while a callback runs, so the
    /// channel stays usable afterwards.
    pub fn publish(&self, payload: &T) -> PublishReport {
        let mut report = PublishReport {
            pruned: self.sweep(),
            ..PublishReport::default()
        };

        let snapshot: Vec<(SubscriptionHandle, SubscriberKind, Callback<T>)> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|entry| (entry.handle, entry.kind, Rc::clone(&entry.callback)))
            .collect();

        for (handle, kind, callback) in snapshot {
            if !self.is_live_handle(handle) {
                report.skipped += 1;
                continue;
            }
            match callback(payload) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    self.report_failure(handle, kind, &err);
                }
            }
        }

        self.with_metrics(|metrics| metrics.record_publish(report.delivered, report.failed));
        self.audit(
            HubAuditEventBuilder::new(HubAuditStage::EventPublished)
                .detail("channel", self.config.name.as_str())
                .detail("delivered", report.delivered)
                .detail("failed", report.failed),
        );
        report
    }

    fn is_live_handle(&self, handle: SubscriptionHandle) -> bool {
        self.inner
            .borrow()
            .entries
            .iter()
            .any(|entry| entry.handle == handle && entry.is_alive())
    }

    fn report_failure(&self, handle: SubscriptionHandle, kind: SubscriberKind, err: &HubError) {
        self.audit(
            HubAuditEventBuilder::new(HubAuditStage::HandlerFailed)
                .detail("channel", self.config.name.as_str())
                .detail("handle", handle.id())
                .detail("kind", kind.label())
                .detail("error", err.to_string()),
        );
        self.log(
            LogLevel::Warn,
            "handler_failed",
            [
                json_kv("handle", json!(handle.id())),
                json_kv("kind", json!(kind.label())),
                json_kv("error", json!(err.to_string())),
            ],
        );
    }

    /// Evicts dynamic subscribers whose object is gone; returns how many.
    fn sweep(&self) -> usize {
        let pruned: Vec<SubscriptionHandle> = {
            let mut inner = self.inner.borrow_mut();
            let mut pruned = Vec::new();
            inner.entries.retain(|entry| {
                let alive = entry.is_alive();
                if !alive {
                    pruned.push(entry.handle);
                }
                alive
            });
            pruned
        };

        if pruned.is_empty() {
            return 0;
        }
        self.with_metrics(|metrics| metrics.record_pruned(pruned.len()));
        for handle in &pruned {
            self.audit(
                HubAuditEventBuilder::new(HubAuditStage::SubscriberPruned)
                    .detail("channel", self.config.name.as_str())
                    .detail("handle", handle.id()),
            );
        }
        self.log(
            LogLevel::Debug,
            "subscriber_pruned",
            [json_kv("count", json!(pruned.len()))],
        );
        pruned.len()
    }

    fn with_metrics(&self, record: impl FnOnce(&mut HubMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut guard);
            }
        }
    }

    fn audit(&self, builder: HubAuditEventBuilder) {
        self.config.audit.record(builder.finish());
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        let channel = json_kv("channel", json!(self.config.name));
        emit(
            self.config.logger.as_ref(),
            level,
            CHANNEL_TARGET,
            message,
            std::iter::once(channel).chain(fields),
        );
    }
}
