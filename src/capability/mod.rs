//! Capability contracts and the component registry.
//!
//! Widgets advertise the interaction contracts they fulfil through the
//! [`Component`] accessors. The [`ComponentRegistry`] maps each
//! [`ComponentKind`] to the contract set it requires and checks concrete
//! widgets against it when screens are composed.

mod contracts;
mod core;

pub use contracts::{
    Capability, CapabilitySet, Clickable, Clicked, CommandMenu, Component, DataSourceBound, Dialog,
    HasText, HasTooltip, HoverChanged, Hoverable, ImageDisplay, ListEntry, ModListView,
    ObjectList, ObjectSelector, ProgressDisplay, Selectable, StringInput, TextValidator,
    missing_capabilities,
};
pub use core::{
    ComponentKind, ComponentMetadata, ComponentRegistry, ComponentRegistryBuilder,
    ValidationReport, ValidationStatus,
};
