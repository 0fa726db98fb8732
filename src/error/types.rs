use thiserror::Error;

use crate::capability::{CapabilitySet, ComponentKind};

/// Unified result type for the widget hub crate.
pub type Result<T> = std::result::Result<T, HubError>;

/// Errors surfaced by the registry, channels, and selection coordinators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("component kind `{0}` has no registered metadata")]
    UnknownComponentKind(ComponentKind),
    #[error("component does not satisfy `{kind}`: missing {missing}")]
    ContractValidation {
        kind: ComponentKind,
        missing: CapabilitySet,
    },
    #[error("suppression stack underflow")]
    StackUnderflow,
    #[error("index {index} out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("value is not present in the list")]
    UnknownValue,
    #[error("component is missing the `{0}` capability")]
    MissingCapability(&'static str),
    #[error("event hub is not running")]
    HubShutDown,
    #[error("handler failed: {0}")]
    Handler(String),
}

impl HubError {
    /// Convenience constructor for subscriber callbacks reporting a failure.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}
