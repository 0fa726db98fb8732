//! Selection coordination shared by list, grid and menu widgets.
//!
//! A [`SelectionCoordinator`] owns the selection of one list-like widget:
//! single-select exclusivity across its bound entry widgets, a weak
//! reference to the entry last told it is selected, and exactly one
//! [`SelectionChanged`] per logical action no matter how many internal
//! callbacks that action triggers.

mod core;
mod types;

pub use core::SelectionCoordinator;
pub use types::{SelectionChanged, SelectionConfig, SelectionMode, SelectionPhase};
