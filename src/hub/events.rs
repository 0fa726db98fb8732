use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Identifier of a mod in the remote catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModId(pub u64);

impl fmt::Display for ModId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mod:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CollectionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UserId(pub u64);

/// Failure reported by a domain operation that completed unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationError {
    pub code: i32,
    pub message: String,
}

impl OperationError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModInfo {
    pub id: ModId,
    pub name: String,
    pub summary: String,
}

/// Coarse grouping used by diagnostics to toggle logging per area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Subscription,
    Media,
    Authentication,
    Catalogue,
    Management,
    Commerce,
    Connectivity,
    Interface,
}

/// One variant per typed hub channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SubscriptionRequestCompleted,
    SubscriptionStatusChanged,
    CollectionFollowStateChanged,
    MediaDownloaded,
    AuthenticationStarted,
    AuthenticationChanged,
    ModInfoReceived,
    ListAllModsCompleted,
    ModManagement,
    WalletBalanceUpdated,
    PurchaseCompleted,
    ConnectivityChanged,
    ModEnabledStateChanged,
    EntitlementRefreshRequested,
    DialogRequested,
}

impl EventKind {
    pub const ALL: [EventKind; 15] = [
        EventKind::SubscriptionRequestCompleted,
        EventKind::SubscriptionStatusChanged,
        EventKind::CollectionFollowStateChanged,
        EventKind::MediaDownloaded,
        EventKind::AuthenticationStarted,
        EventKind::AuthenticationChanged,
        EventKind::ModInfoReceived,
        EventKind::ListAllModsCompleted,
        EventKind::ModManagement,
        EventKind::WalletBalanceUpdated,
        EventKind::PurchaseCompleted,
        EventKind::ConnectivityChanged,
        EventKind::ModEnabledStateChanged,
        EventKind::EntitlementRefreshRequested,
        EventKind::DialogRequested,
    ];

    /// Stable channel name, also used as the log field value.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::SubscriptionRequestCompleted => "subscription_request_completed",
            EventKind::SubscriptionStatusChanged => "subscription_status_changed",
            EventKind::CollectionFollowStateChanged => "collection_follow_state_changed",
            EventKind::MediaDownloaded => "media_downloaded",
            EventKind::AuthenticationStarted => "authentication_started",
            EventKind::AuthenticationChanged => "authentication_changed",
            EventKind::ModInfoReceived => "mod_info_received",
            EventKind::ListAllModsCompleted => "list_all_mods_completed",
            EventKind::ModManagement => "mod_management",
            EventKind::WalletBalanceUpdated => "wallet_balance_updated",
            EventKind::PurchaseCompleted => "purchase_completed",
            EventKind::ConnectivityChanged => "connectivity_changed",
            EventKind::ModEnabledStateChanged => "mod_enabled_state_changed",
            EventKind::EntitlementRefreshRequested => "entitlement_refresh_requested",
            EventKind::DialogRequested => "dialog_requested",
        }
    }

    pub fn category(self) -> EventCategory {
        match self {
            EventKind::SubscriptionRequestCompleted
            | EventKind::SubscriptionStatusChanged
            | EventKind::CollectionFollowStateChanged => EventCategory::Subscription,
            EventKind::MediaDownloaded => EventCategory::Media,
            EventKind::AuthenticationStarted | EventKind::AuthenticationChanged => {
                EventCategory::Authentication
            }
            EventKind::ModInfoReceived | EventKind::ListAllModsCompleted => {
                EventCategory::Catalogue
            }
            EventKind::ModManagement | EventKind::ModEnabledStateChanged => {
                EventCategory::Management
            }
            EventKind::WalletBalanceUpdated
            | EventKind::PurchaseCompleted
            | EventKind::EntitlementRefreshRequested => EventCategory::Commerce,
            EventKind::ConnectivityChanged => EventCategory::Connectivity,
            EventKind::DialogRequested => EventCategory::Interface,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRequestCompleted {
    pub mod_id: ModId,
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscriptionStatusChanged {
    pub mod_id: ModId,
    pub subscribed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionFollowStateChanged {
    pub collection_id: CollectionId,
    pub following: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "media", rename_all = "snake_case")]
pub enum MediaKind {
    Logo,
    GalleryImage { index: u32 },
    CreatorAvatar,
    UserAvatar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaDownloaded {
    /// `None` for the signed-in user's own avatar.
    pub mod_id: Option<ModId>,
    pub kind: MediaKind,
    pub path: Option<PathBuf>,
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AuthenticationStarted;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AuthenticationChanged {
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModInfoReceived {
    pub mod_id: ModId,
    pub info: Option<ModInfo>,
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListAllModsCompleted {
    pub request_id: String,
    pub mods: Vec<ModId>,
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModOperation {
    Installed,
    Updated,
    Uninstalled,
    Uploaded,
    BeginInstall,
    BeginUpdate,
    BeginUninstall,
    BeginUpload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModManagementEvent {
    pub mod_id: ModId,
    pub operation: ModOperation,
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalletBalanceUpdated {
    pub balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub mod_id: ModId,
    pub price: u64,
    pub updated_balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseCompleted {
    pub transaction: Option<Transaction>,
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectivityChanged {
    pub online: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModEnabledStateChanged {
    pub mod_id: ModId,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EntitlementRefreshRequested;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    Login,
    Logout,
    ReportMod,
    Uninstall,
    Unsubscribe,
    Purchase,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogRequested {
    pub dialog: DialogKind,
    /// Mod the dialog is about, when it has one.
    pub context: Option<ModId>,
}
