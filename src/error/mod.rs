//! Error module orchestrator.
//!
//! Everything that can fail in this crate reports through [`HubError`];
//! the logger keeps its own error type in [`crate::logging`].

mod types;

pub use types::{HubError, Result};
