//! Domain event routing.
//!
//! The [`EventHub`] owns one typed [`EventChannel`](crate::channel::EventChannel)
//! per domain event and is constructed explicitly by the application. Domain
//! services report completions through its `notify_*` entry points; widgets
//! register natively or dynamically per event type.

mod core;
mod diagnostics;
mod events;

pub use core::{EventHub, HubConfig, HubEvent, HubState};
pub use diagnostics::HubEventLogger;
pub use events::{
    AuthenticationChanged, AuthenticationStarted, CollectionFollowStateChanged, CollectionId,
    ConnectivityChanged, DialogKind, DialogRequested, EntitlementRefreshRequested, EventCategory,
    EventKind, ListAllModsCompleted, MediaDownloaded, MediaKind, ModEnabledStateChanged, ModId,
    ModInfo, ModInfoReceived, ModManagementEvent, ModOperation, OperationError, PurchaseCompleted,
    SubscriptionRequestCompleted, SubscriptionStatusChanged, Transaction, User, UserId,
    WalletBalanceUpdated,
};
