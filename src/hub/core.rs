use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::audit::{HubAudit, HubAuditEventBuilder, HubAuditStage, NullHubAudit};
use crate::channel::{ChannelConfig, EventChannel, PublishReport, SubscriberKey, SubscriptionHandle};
use crate::error::{HubError, Result};
use crate::logging::{FileSink, LogLevel, Logger, LoggingResult, emit, json_kv};
use crate::metrics::{HubMetrics, MetricSnapshot};

use super::events::{
    AuthenticationChanged, AuthenticationStarted, CollectionFollowStateChanged, CollectionId,
    ConnectivityChanged, DialogKind, DialogRequested, EntitlementRefreshRequested, EventKind,
    ListAllModsCompleted, MediaDownloaded, ModEnabledStateChanged, ModId, ModInfo,
    ModInfoReceived, ModManagementEvent, OperationError, PurchaseCompleted,
    SubscriptionRequestCompleted, SubscriptionStatusChanged, Transaction, User,
    WalletBalanceUpdated,
};

/// Configuration shared by the hub and every channel it owns.
#[derive(Clone)]
pub struct HubConfig {
    /// Optional structured logger used by the hub and its channels.
    pub logger: Option<Logger>,
    /// Counters shared by every channel.
    pub metrics: Option<Arc<Mutex<HubMetrics>>>,
    pub audit: Arc<dyn HubAudit>,
    /// Target used for hub lifecycle logs.
    pub log_target: String,
    /// Target used when emitting metrics snapshots.
    pub metrics_target: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            logger: None,
            metrics: None,
            audit: Arc::new(NullHubAudit),
            log_target: "widget_hub::hub".to_string(),
            metrics_target: "widget_hub::metrics".to_string(),
        }
    }
}

impl std::fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConfig")
            .field("logger", &self.logger)
            .field("metrics", &self.metrics.is_some())
            .field("log_target", &self.log_target)
            .field("metrics_target", &self.metrics_target)
            .finish_non_exhaustive()
    }
}

impl HubConfig {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Logs to a rotating JSON-lines file at or above `min_level`.
    pub fn with_log_file(
        self,
        path: impl AsRef<Path>,
        max_bytes: u64,
        min_level: LogLevel,
    ) -> LoggingResult<Self> {
        let sink = FileSink::new(path, max_bytes)?;
        Ok(self.with_logger(Logger::new(sink).with_min_level(min_level)))
    }

    pub fn with_audit(mut self, audit: Arc<dyn HubAudit>) -> Self {
        self.audit = audit;
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(HubMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<HubMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }

    fn channel_config(&self, kind: EventKind) -> ChannelConfig {
        ChannelConfig {
            name: kind.name().to_string(),
            logger: self.logger.clone(),
            metrics: self.metrics_handle(),
            audit: Arc::clone(&self.audit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubState {
    Created,
    Running,
    ShutDown,
}

/// A payload type routed through one of the hub's typed channels.
pub trait HubEvent: Sized + 'static {
    const KIND: EventKind;

    fn channel(hub: &EventHub) -> &EventChannel<Self>;
}

macro_rules! hub_channels {
    ($($field:ident: $event:ty => $kind:ident),+ $(,)?) => {
        struct HubChannels {
            $($field: EventChannel<$event>,)+
        }

        impl HubChannels {
            fn new(config: &HubConfig) -> Self {
                Self {
                    $($field: EventChannel::with_config(config.channel_config(EventKind::$kind)),)+
                }
            }

            fn clear(&self) {
                $(self.$field.clear();)+
            }

            fn subscriber_counts(&self) -> Vec<(EventKind, usize)> {
                vec![$((EventKind::$kind, self.$field.len()),)+]
            }
        }

        $(
            impl HubEvent for $event {
                const KIND: EventKind = EventKind::$kind;

                fn channel(hub: &EventHub) -> &EventChannel<Self> {
                    &hub.channels.$field
                }
            }
        )+
    };
}

hub_channels! {
    subscription_request_completed: SubscriptionRequestCompleted => SubscriptionRequestCompleted,
    subscription_status_changed: SubscriptionStatusChanged => SubscriptionStatusChanged,
    collection_follow_state_changed: CollectionFollowStateChanged => CollectionFollowStateChanged,
    media_downloaded: MediaDownloaded => MediaDownloaded,
    authentication_started: AuthenticationStarted => AuthenticationStarted,
    authentication_changed: AuthenticationChanged => AuthenticationChanged,
    mod_info_received: ModInfoReceived => ModInfoReceived,
    list_all_mods_completed: ListAllModsCompleted => ListAllModsCompleted,
    mod_management: ModManagementEvent => ModManagement,
    wallet_balance_updated: WalletBalanceUpdated => WalletBalanceUpdated,
    purchase_completed: PurchaseCompleted => PurchaseCompleted,
    connectivity_changed: ConnectivityChanged => ConnectivityChanged,
    mod_enabled_state_changed: ModEnabledStateChanged => ModEnabledStateChanged,
    entitlement_refresh_requested: EntitlementRefreshRequested => EntitlementRefreshRequested,
    dialog_requested: DialogRequested => DialogRequested,
}

#[derive(Debug)]
struct HubCache {
    current_user: Option<User>,
    online: bool,
    wallet_balance: Option<u64>,
    enabled: HashMap<ModId, bool>,
}

impl Default for HubCache {
    fn default() -> Self {
        Self {
            current_user: None,
            online: true,
            wallet_balance: None,
            enabled: HashMap::new(),
        }
    }
}

/// Explicitly constructed router fanning domain events out to widgets.
///
/// Domain services call the `notify_*` entry points once their operation
/// completes; the hub updates its cached view of the session and publishes
/// the typed event. Widgets subscribe per event type, either strongly
/// (native) or weakly (dynamic), through the generic methods.
pub struct EventHub {
    config: HubConfig,
    state: Cell<HubState>,
    channels: HubChannels,
    cache: RefCell<HubCache>,
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("state", &self.state.get())
            .field("cache", &self.cache.borrow())
            .finish_non_exhaustive()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl EventHub {
    pub fn new(config: HubConfig) -> Self {
        let channels = HubChannels::new(&config);
        Self {
            config,
            state: Cell::new(HubState::Created),
            channels,
            cache: RefCell::new(HubCache::default()),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn state(&self) -> HubState {
        self.state.get()
    }

    /// Starts accepting publications. A shut-down hub cannot be restarted.
    pub fn initialize(&self) -> Result<()> {
        match self.state.get() {
            HubState::Running => Ok(()),
            HubState::ShutDown => Err(HubError::HubShutDown),
            HubState::Created => {
                self.state.set(HubState::Running);
                self.config
                    .audit
                    .record(HubAuditEventBuilder::new(HubAuditStage::HubInitialized).finish());
                self.log(
                    LogLevel::Info,
                    "hub_initialized",
                    [json_kv("channels", json!(EventKind::ALL.len()))],
                );
                Ok(())
            }
        }
    }

    /// Drops every registration and stops accepting publications.
    pub fn shutdown(&self) {
        if self.state.replace(HubState::ShutDown) == HubState::ShutDown {
            return;
        }
        let live: usize = self
            .channels
            .subscriber_counts()
            .iter()
            .map(|(_, count)| count)
            .sum();
        self.channels.clear();
        self.config.audit.record(
            HubAuditEventBuilder::new(HubAuditStage::HubShutDown)
                .detail("released_subscribers", live)
                .finish(),
        );
        self.log(
            LogLevel::Info,
            "hub_shutdown",
            [json_kv("released_subscribers", json!(live))],
        );
        if let (Some(logger), Some(snapshot)) = (self.config.logger.as_ref(), self.metrics_snapshot())
        {
            let _ = logger.log_event(snapshot.to_log_event(&self.config.metrics_target));
        }
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.config.metrics.as_ref()?;
        metrics.lock().ok().map(|guard| guard.snapshot())
    }

    // generic routing

    pub fn channel<E: HubEvent>(&self) -> &EventChannel<E> {
        E::channel(self)
    }

    pub fn subscribe<E, F>(&self, key: SubscriberKey, callback: F) -> Result<SubscriptionHandle>
    where
        E: HubEvent,
        F: Fn(&E) -> Result<()> + 'static,
    {
        self.ensure_accepting(E::KIND)?;
        Ok(E::channel(self).subscribe(key, callback))
    }

    /// Native registration: `target` stays alive until it unsubscribes.
    pub fn subscribe_strong<E, O>(
        &self,
        target: &Rc<O>,
        method: fn(&O, &E) -> Result<()>,
    ) -> Result<SubscriptionHandle>
    where
        E: HubEvent,
        O: ?Sized + 'static,
    {
        self.ensure_accepting(E::KIND)?;
        Ok(E::channel(self).subscribe_strong(target, method))
    }

    /// Dynamic registration: pruned automatically once `target` is dropped.
    pub fn subscribe_weak<E, O, F>(&self, target: &Rc<O>, callback: F) -> Result<SubscriptionHandle>
    where
        E: HubEvent,
        O: ?Sized + 'static,
        F: Fn(&O, &E) -> Result<()> + 'static,
    {
        self.ensure_accepting(E::KIND)?;
        Ok(E::channel(self).subscribe_weak(target, callback))
    }

    pub fn unsubscribe<E: HubEvent>(&self, key: SubscriberKey) -> bool {
        E::channel(self).unsubscribe(key)
    }

    pub fn publish<E: HubEvent>(&self, event: &E) -> Result<PublishReport> {
        self.ensure_running(E::KIND)?;
        Ok(E::channel(self).publish(event))
    }

    pub fn subscriber_count<E: HubEvent>(&self) -> usize {
        E::channel(self).len()
    }

    pub fn subscriber_counts(&self) -> Vec<(EventKind, usize)> {
        self.channels.subscriber_counts()
    }

    fn ensure_running(&self, kind: EventKind) -> Result<()> {
        match self.state.get() {
            HubState::Running => Ok(()),
            state => {
                self.log(
                    LogLevel::Warn,
                    "publish_dropped",
                    [
                        json_kv("event", json!(kind.name())),
                        json_kv("state", json!(format!("{:?}", state))),
                    ],
                );
                Err(HubError::HubShutDown)
            }
        }
    }

    /// Registrations are accepted before `initialize` but refused after
    /// `shutdown`, since nothing would ever be delivered to them.
    fn ensure_accepting(&self, kind: EventKind) -> Result<()> {
        if self.state.get() != HubState::ShutDown {
            return Ok(());
        }
        self.log(
            LogLevel::Warn,
            "subscribe_refused",
            [json_kv("event", json!(kind.name()))],
        );
        Err(HubError::HubShutDown)
    }

    // late-subscriber seeding

    /// Registers a dynamic authentication receiver and immediately hands it
    /// the current user, so it never waits for the next change.
    pub fn register_authentication_receiver<O, F>(
        &self,
        target: &Rc<O>,
        callback: F,
    ) -> Result<SubscriptionHandle>
    where
        O: ?Sized + 'static,
        F: Fn(&O, &AuthenticationChanged) -> Result<()> + 'static,
    {
        self.register_seeded(target, callback, |hub| AuthenticationChanged {
            user: hub.current_user(),
        })
    }

    /// Registers a dynamic connectivity receiver seeded with the current state.
    pub fn register_connectivity_receiver<O, F>(
        &self,
        target: &Rc<O>,
        callback: F,
    ) -> Result<SubscriptionHandle>
    where
        O: ?Sized + 'static,
        F: Fn(&O, &ConnectivityChanged) -> Result<()> + 'static,
    {
        self.register_seeded(target, callback, |hub| ConnectivityChanged {
            online: hub.is_online(),
        })
    }

    fn register_seeded<E, O, F>(
        &self,
        target: &Rc<O>,
        callback: F,
        seed: impl FnOnce(&Self) -> E,
    ) -> Result<SubscriptionHandle>
    where
        E: HubEvent,
        O: ?Sized + 'static,
        F: Fn(&O, &E) -> Result<()> + 'static,
    {
        self.ensure_accepting(E::KIND)?;
        let channel = E::channel(self);
        let fresh = !channel.is_subscribed(SubscriberKey::of(target));
        let callback = Rc::new(callback);
        let deliver = Rc::clone(&callback);
        let handle = channel.subscribe_weak(target, move |receiver: &O, event: &E| {
            (*deliver)(receiver, event)
        });
        if fresh {
            if let Err(err) = (*callback)(&**target, &seed(self)) {
                self.log(
                    LogLevel::Warn,
                    "seed_delivery_failed",
                    [
                        json_kv("event", json!(E::KIND.name())),
                        json_kv("error", json!(err.to_string())),
                    ],
                );
            }
        }
        Ok(handle)
    }

    // cached session state

    pub fn current_user(&self) -> Option<User> {
        self.cache.borrow().current_user.clone()
    }

    pub fn is_online(&self) -> bool {
        self.cache.borrow().online
    }

    pub fn wallet_balance(&self) -> Option<u64> {
        self.cache.borrow().wallet_balance
    }

    /// Mods are enabled until a domain service reports otherwise.
    pub fn is_mod_enabled(&self, mod_id: ModId) -> bool {
        self.cache
            .borrow()
            .enabled
            .get(&mod_id)
            .copied()
            .unwrap_or(true)
    }

    // domain completion entry points

    pub fn notify_subscription_completed(
        &self,
        mod_id: ModId,
        error: Option<OperationError>,
    ) -> Result<PublishReport> {
        self.publish(&SubscriptionRequestCompleted { mod_id, error })
    }

    pub fn notify_subscription_status(&self, mod_id: ModId, subscribed: bool) -> Result<PublishReport> {
        self.publish(&SubscriptionStatusChanged { mod_id, subscribed })
    }

    pub fn notify_follow_state(
        &self,
        collection_id: CollectionId,
        following: bool,
    ) -> Result<PublishReport> {
        self.publish(&CollectionFollowStateChanged {
            collection_id,
            following,
        })
    }

    pub fn notify_media_downloaded(&self, event: MediaDownloaded) -> Result<PublishReport> {
        self.publish(&event)
    }

    pub fn notify_authentication_started(&self) -> Result<PublishReport> {
        self.publish(&AuthenticationStarted)
    }

    pub fn notify_authentication_changed(&self, user: Option<User>) -> Result<PublishReport> {
        self.ensure_running(EventKind::AuthenticationChanged)?;
        {
            let mut cache = self.cache.borrow_mut();
            if user.is_none() {
                cache.wallet_balance = None;
            }
            cache.current_user = user.clone();
        }
        self.publish(&AuthenticationChanged { user })
    }

    pub fn notify_mod_info(
        &self,
        mod_id: ModId,
        info: Option<ModInfo>,
        error: Option<OperationError>,
    ) -> Result<PublishReport> {
        self.publish(&ModInfoReceived {
            mod_id,
            info,
            error,
        })
    }

    pub fn notify_list_all_mods(
        &self,
        request_id: impl Into<String>,
        mods: Vec<ModId>,
        error: Option<OperationError>,
    ) -> Result<PublishReport> {
        self.publish(&ListAllModsCompleted {
            request_id: request_id.into(),
            mods,
            error,
        })
    }

    pub fn notify_mod_management(&self, event: ModManagementEvent) -> Result<PublishReport> {
        self.publish(&event)
    }

    pub fn notify_wallet_balance(&self, balance: u64) -> Result<PublishReport> {
        self.ensure_running(EventKind::WalletBalanceUpdated)?;
        self.cache.borrow_mut().wallet_balance = Some(balance);
        self.publish(&WalletBalanceUpdated { balance })
    }

    /// A successful purchase also refreshes the cached wallet balance.
    pub fn notify_purchase_completed(
        &self,
        transaction: Option<Transaction>,
        error: Option<OperationError>,
    ) -> Result<PublishReport> {
        self.ensure_running(EventKind::PurchaseCompleted)?;
        if let (Some(transaction), None) = (transaction.as_ref(), error.as_ref()) {
            self.cache.borrow_mut().wallet_balance = Some(transaction.updated_balance);
        }
        self.publish(&PurchaseCompleted { transaction, error })
    }

    pub fn notify_connectivity(&self, online: bool) -> Result<PublishReport> {
        self.ensure_running(EventKind::ConnectivityChanged)?;
        self.cache.borrow_mut().online = online;
        self.publish(&ConnectivityChanged { online })
    }

    pub fn notify_mod_enabled(&self, mod_id: ModId, enabled: bool) -> Result<PublishReport> {
        self.ensure_running(EventKind::ModEnabledStateChanged)?;
        self.cache.borrow_mut().enabled.insert(mod_id, enabled);
        self.publish(&ModEnabledStateChanged { mod_id, enabled })
    }

    pub fn request_entitlement_refresh(&self) -> Result<PublishReport> {
        self.publish(&EntitlementRefreshRequested)
    }

    pub fn request_dialog(&self, dialog: DialogKind, context: Option<ModId>) -> Result<PublishReport> {
        self.publish(&DialogRequested { dialog, context })
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        emit(
            self.config.logger.as_ref(),
            level,
            &self.config.log_target,
            message,
            fields,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::RecordingAudit;
    use crate::hub::events::UserId;
    use crate::logging::MemorySink;

    fn running_hub() -> EventHub {
        let hub = EventHub::default();
        hub.initialize().unwrap();
        hub
    }

    fn user(name: &str) -> User {
        User {
            id: UserId(1),
            username: name.to_string(),
        }
    }

    #[derive(Default)]
    struct Tile {
        subscribed: RefCell<Vec<ModId>>,
        users: RefCell<Vec<Option<String>>>,
    }

    impl Tile {
        fn on_status(&self, event: &SubscriptionStatusChanged) -> Result<()> {
            if event.subscribed {
                self.subscribed.borrow_mut().push(event.mod_id);
            }
            Ok(())
        }

        fn on_user(&self, event: &AuthenticationChanged) -> Result<()> {
            self.users
                .borrow_mut()
                .push(event.user.as_ref().map(|user| user.username.clone()));
            Ok(())
        }
    }

    #[test]
    fn publishing_requires_a_running_hub() {
        let sink = Arc::new(MemorySink::new());
        let hub = EventHub::new(HubConfig::default().with_logger(Logger::from_arc(sink.clone())));
        assert_eq!(hub.state(), HubState::Created);
        assert_eq!(
            hub.notify_subscription_status(ModId(1), true),
            Err(HubError::HubShutDown)
        );
        assert_eq!(sink.messages("publish_dropped").len(), 1);

        hub.initialize().unwrap();
        assert!(hub.notify_subscription_status(ModId(1), true).is_ok());

        hub.shutdown();
        assert_eq!(hub.initialize(), Err(HubError::HubShutDown));
        assert_eq!(hub.notify_connectivity(false), Err(HubError::HubShutDown));
        assert!(hub.is_online());
    }

    #[test]
    fn dynamic_subscriber_is_pruned_and_others_still_receive() {
        let hub = running_hub();
        let doomed = Rc::new(Tile::default());
        let survivor = Rc::new(Tile::default());
        hub.subscribe_weak(&doomed, Tile::on_status).unwrap();
        hub.subscribe_weak(&survivor, Tile::on_status).unwrap();
        drop(doomed);

        let report = hub.notify_subscription_status(ModId(9), true).unwrap();
        assert_eq!(report.pruned, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(*survivor.subscribed.borrow(), vec![ModId(9)]);
    }

    #[test]
    fn native_subscriber_registers_once() {
        let hub = running_hub();
        let tile = Rc::new(Tile::default());
        let first = hub.subscribe_strong(&tile, Tile::on_status).unwrap();
        let second = hub.subscribe_strong(&tile, Tile::on_status).unwrap();
        assert_eq!(first, second);
        assert_eq!(hub.subscriber_count::<SubscriptionStatusChanged>(), 1);

        hub.notify_subscription_status(ModId(2), true).unwrap();
        assert_eq!(tile.subscribed.borrow().len(), 1);
        assert!(hub.unsubscribe::<SubscriptionStatusChanged>(SubscriberKey::of(&tile)));
        assert_eq!(hub.subscriber_count::<SubscriptionStatusChanged>(), 0);
    }

    #[test]
    fn late_authentication_receiver_is_seeded_once() {
        let hub = running_hub();
        hub.notify_authentication_changed(Some(user("ada"))).unwrap();

        let tile = Rc::new(Tile::default());
        hub.register_authentication_receiver(&tile, Tile::on_user).unwrap();
        hub.register_authentication_receiver(&tile, Tile::on_user).unwrap();
        assert_eq!(*tile.users.borrow(), vec![Some("ada".to_string())]);

        hub.notify_authentication_changed(None).unwrap();
        assert_eq!(
            *tile.users.borrow(),
            vec![Some("ada".to_string()), None]
        );
        assert_eq!(hub.current_user(), None);
    }

    #[test]
    fn connectivity_receiver_sees_cached_state() {
        let hub = running_hub();
        hub.notify_connectivity(false).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        hub.register_connectivity_receiver(&seen, |seen: &RefCell<Vec<bool>>, event| {
            seen.borrow_mut().push(event.online);
            Ok(())
        })
        .unwrap();
        hub.notify_connectivity(true).unwrap();
        assert_eq!(*seen.borrow(), vec![false, true]);
    }

    #[test]
    fn cached_commerce_and_enabled_state() {
        let hub = running_hub();
        assert!(hub.is_mod_enabled(ModId(3)));
        hub.notify_mod_enabled(ModId(3), false).unwrap();
        assert!(!hub.is_mod_enabled(ModId(3)));

        hub.notify_wallet_balance(500).unwrap();
        hub.notify_purchase_completed(
            Some(Transaction {
                mod_id: ModId(3),
                price: 120,
                updated_balance: 380,
            }),
            None,
        )
        .unwrap();
        assert_eq!(hub.wallet_balance(), Some(380));

        hub.notify_purchase_completed(None, Some(OperationError::new(402, "insufficient funds")))
            .unwrap();
        assert_eq!(hub.wallet_balance(), Some(380));
    }

    #[test]
    fn shutdown_releases_every_subscriber() {
        let audit = Arc::new(RecordingAudit::new());
        let mut config = HubConfig::default().with_audit(audit.clone());
        config.enable_metrics();
        let hub = EventHub::new(config);
        hub.initialize().unwrap();

        let tile = Rc::new(Tile::default());
        hub.subscribe_strong(&tile, Tile::on_status).unwrap();
        hub.subscribe_weak(&tile, Tile::on_user).unwrap();
        hub.shutdown();

        assert_eq!(Rc::strong_count(&tile), 1);
        assert!(hub.subscriber_counts().iter().all(|(_, count)| *count == 0));
        assert_eq!(audit.count(HubAuditStage::HubInitialized), 1);
        assert_eq!(audit.count(HubAuditStage::HubShutDown), 1);
        let snapshot = hub.metrics_snapshot().unwrap();
        assert_eq!(snapshot.registrations, 2);
    }

    #[test]
    fn handler_failure_is_isolated() {
        let hub = running_hub();
        hub.subscribe::<DialogRequested, _>(SubscriberKey::named(1), |_| {
            Err(HubError::handler("dialog stack full"))
        })
        .unwrap();
        let opened = Rc::new(Cell::new(0));
        let counter = Rc::clone(&opened);
        hub.subscribe::<DialogRequested, _>(SubscriberKey::named(2), move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .unwrap();

        let report = hub.request_dialog(DialogKind::ReportMod, Some(ModId(4))).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(opened.get(), 1);
    }

    #[test]
    fn shut_down_hub_refuses_registrations() {
        let sink = Arc::new(MemorySink::new());
        let hub = EventHub::new(HubConfig::default().with_logger(Logger::from_arc(sink.clone())));
        let early = Rc::new(Tile::default());
        assert!(hub.subscribe_weak(&early, Tile::on_status).is_ok());

        hub.initialize().unwrap();
        hub.shutdown();

        let tile = Rc::new(Tile::default());
        assert_eq!(
            hub.subscribe_strong(&tile, Tile::on_status),
            Err(HubError::HubShutDown)
        );
        assert_eq!(
            hub.register_connectivity_receiver(&tile, |_: &Tile, _| Ok(())),
            Err(HubError::HubShutDown)
        );
        assert_eq!(Rc::strong_count(&tile), 1);
        assert_eq!(hub.subscriber_count::<SubscriptionStatusChanged>(), 0);
        assert_eq!(sink.messages("subscribe_refused").len(), 2);
    }

    #[test]
    fn log_file_receives_lifecycle_records() {
        let dir = std::env::temp_dir().join(format!("widget_hub_hub_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hub.log");
        let _ = std::fs::remove_file(&path);

        let config = HubConfig::default()
            .with_log_file(&path, 0, LogLevel::Info)
            .unwrap();
        let hub = EventHub::new(config);
        hub.initialize().unwrap();
        hub.notify_connectivity(false).unwrap();
        hub.shutdown();

        let contents = std::fs::read_to_string(&path).unwrap();
        let messages: Vec<String> = contents
            .lines()
            .map(|line| {
                let record: serde_json::Value = serde_json::from_str(line).unwrap();
                record["message"].as_str().unwrap_or_default().to_string()
            })
            .collect();
        assert_eq!(messages, vec!["hub_initialized", "hub_shutdown"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
