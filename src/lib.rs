//! Capability contracts, event routing and selection coordination for
//! widget frameworks.
//!
//! Widgets declare the interaction contracts they fulfil through
//! [`Component`]; a [`ComponentRegistry`] validates them against the contract
//! set of their role. Domain events travel through an explicitly constructed
//! [`EventHub`] built from typed [`EventChannel`]s, and every list-like widget
//! shares the [`SelectionCoordinator`] protocol for exclusive selection and
//! deduplicated change notification.
//!
//! Everything here is single-threaded and synchronous: channels hold `Rc`
//! and `Weak` subscribers and deliver in registration order on the caller's
//! thread.

pub mod audit;
pub mod capability;
pub mod channel;
pub mod error;
pub mod hub;
pub mod logging;
pub mod metrics;
pub mod selection;
pub mod suppression;

pub use audit::{
    HubAudit, HubAuditEvent, HubAuditEventBuilder, HubAuditStage, NullHubAudit, RecordingAudit,
};
pub use capability::{
    Capability, CapabilitySet, Clickable, Clicked, Component, ComponentKind, ComponentMetadata,
    ComponentRegistry, ComponentRegistryBuilder, ObjectList, ObjectSelector, Selectable,
    ValidationReport, ValidationStatus, missing_capabilities,
};
pub use channel::{
    ChannelConfig, EventChannel, PublishReport, SubscriberKey, SubscriberKind, SubscriptionHandle,
};
pub use error::{HubError, Result};
pub use hub::{EventHub, EventKind, HubConfig, HubEvent, HubEventLogger, HubState, ModId};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink, NullSink,
};
pub use metrics::{HubMetrics, MetricSnapshot};
pub use selection::{
    SelectionChanged, SelectionConfig, SelectionCoordinator, SelectionMode, SelectionPhase,
};
pub use suppression::{SuppressionScope, SuppressionStack};
