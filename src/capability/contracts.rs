use std::any::Any;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::Result;
use crate::channel::EventChannel;
use crate::hub::ModId;

/// A named interaction contract a component can fulfil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Capability {
    Clickable,
    Selectable,
    Hoverable,
    HasText,
    HasTooltip,
    DataSource,
    ObjectList,
    ObjectSelector,
    ListEntry,
    StringInput,
    TextValidator,
    ImageDisplay,
    Progress,
    Dialog,
    CommandMenu,
    ModListView,
}

impl Capability {
    pub const ALL: [Capability; 16] = [
        Capability::Clickable,
        Capability::Selectable,
        Capability::Hoverable,
        Capability::HasText,
        Capability::HasTooltip,
        Capability::DataSource,
        Capability::ObjectList,
        Capability::ObjectSelector,
        Capability::ListEntry,
        Capability::StringInput,
        Capability::TextValidator,
        Capability::ImageDisplay,
        Capability::Progress,
        Capability::Dialog,
        Capability::CommandMenu,
        Capability::ModListView,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Capability::Clickable => "Clickable",
            Capability::Selectable => "Selectable",
            Capability::Hoverable => "Hoverable",
            Capability::HasText => "HasText",
            Capability::HasTooltip => "HasTooltip",
            Capability::DataSource => "DataSource",
            Capability::ObjectList => "ObjectList",
            Capability::ObjectSelector => "ObjectSelector",
            Capability::ListEntry => "ListEntry",
            Capability::StringInput => "StringInput",
            Capability::TextValidator => "TextValidator",
            Capability::ImageDisplay => "ImageDisplay",
            Capability::Progress => "Progress",
            Capability::Dialog => "Dialog",
            Capability::CommandMenu => "CommandMenu",
            Capability::ModListView => "ModListView",
        }
    }

    pub fn flag(self) -> CapabilitySet {
        CapabilitySet::from_bits_truncate(1 << self as u32)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Set of capability contracts. Iteration follows declaration order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CapabilitySet: u32 {
        const CLICKABLE = 1 << 0;
        const SELECTABLE = 1 << 1;
        const HOVERABLE = 1 << 2;
        const HAS_TEXT = 1 << 3;
        const HAS_TOOLTIP = 1 << 4;
        const DATA_SOURCE = 1 << 5;
        const OBJECT_LIST = 1 << 6;
        const OBJECT_SELECTOR = 1 << 7;
        const LIST_ENTRY = 1 << 8;
        const STRING_INPUT = 1 << 9;
        const TEXT_VALIDATOR = 1 << 10;
        const IMAGE_DISPLAY = 1 << 11;
        const PROGRESS = 1 << 12;
        const DIALOG = 1 << 13;
        const COMMAND_MENU = 1 << 14;
        const MOD_LIST_VIEW = 1 << 15;
    }
}

impl CapabilitySet {
    pub fn of(capabilities: &[Capability]) -> Self {
        capabilities
            .iter()
            .fold(Self::empty(), |set, capability| set | capability.flag())
    }

    pub fn has(self, capability: Capability) -> bool {
        self.contains(capability.flag())
    }

    pub fn capabilities(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |capability| self.has(*capability))
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        for (idx, capability) in self.capabilities().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str(capability.name())?;
        }
        Ok(())
    }
}

impl Serialize for CapabilitySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.bits().count_ones() as usize))?;
        for capability in self.capabilities() {
            seq.serialize_element(&capability)?;
        }
        seq.end()
    }
}

/// Payload delivered by a [`Clickable`] when it is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Clicked;

/// Payload delivered by a [`Hoverable`] when the pointer enters or leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverChanged {
    pub hovered: bool,
}

pub trait Clickable {
    fn enable_click(&self);
    fn disable_click(&self);
    fn click_enabled(&self) -> bool;
    /// Channel fired on activation; listeners register here.
    fn clicked(&self) -> &EventChannel<Clicked>;
}

pub trait Selectable {
    fn set_selectable(&self, selectable: bool);
    fn is_selectable(&self) -> bool;
    fn set_selected_state(&self, selected: bool);
    fn selected_state(&self) -> bool;

    fn toggle_selected_state(&self) {
        self.set_selected_state(!self.selected_state());
    }
}

pub trait Hoverable {
    fn set_hover_events_enabled(&self, enabled: bool);
    fn hover_changed(&self) -> &EventChannel<HoverChanged>;
}

pub trait HasText {
    fn set_widget_text(&self, text: &str);
    fn widget_text(&self) -> String;
}

pub trait HasTooltip {
    fn set_tooltip_enabled(&self, enabled: bool);
    fn configure_tooltip(&self, title: &str, info: &str);
}

pub trait DataSourceBound {
    fn set_data_source(&self, source: Option<Rc<dyn Any>>);
    fn data_source(&self) -> Option<Rc<dyn Any>>;
}

pub trait ObjectList {
    fn num_objects(&self) -> usize;
}

/// Index-based selection surface shared by list, grid and menu widgets.
pub trait ObjectSelector {
    fn selected_index(&self) -> Option<usize>;
    fn set_single_selection_by_index(&self, index: usize, emit: bool) -> Result<()>;
    fn clear_selected_values(&self);
    fn multi_selection_allowed(&self) -> bool;
    fn set_multi_selection_allowed(&self, allowed: bool);
}

/// A widget generated by a list to visualise one item.
pub trait ListEntry {
    fn set_list_index(&self, index: Option<usize>);
    fn list_index(&self) -> Option<usize>;
}

pub trait StringInput {
    fn set_hint(&self, hint: &str);
    fn set_input(&self, input: &str);
    fn input(&self) -> String;
}

pub trait TextValidator {
    /// `Err` carries the message to display next to the input.
    fn validate_text(&self, text: &str) -> std::result::Result<(), String>;
    fn set_validation_error(&self, message: Option<&str>);
}

pub trait ImageDisplay {
    fn begin_load_image(&self, path: &std::path::Path);
}

pub trait ProgressDisplay {
    fn set_progress(&self, value: f32);
    fn progress(&self) -> f32;
    fn set_marquee(&self, marquee: bool);
}

pub trait Dialog {
    fn show_modal(&self, focus_cancel: bool);
    fn close_modal(&self);
}

pub trait CommandMenu {
    fn rebuild_command_list(&self);
    fn command_count(&self) -> usize;
}

pub trait ModListView {
    fn set_mod_selection_by_id(&self, id: ModId) -> Result<()>;
}

/// A widget viewed through the contracts it fulfils.
///
/// Each accessor answers `Some` when the implementor supports the contract;
/// [`Component::capabilities`] is derived from those answers, so a type can
/// never claim a contract it does not actually implement.
pub trait Component {
    fn component_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn as_clickable(&self) -> Option<&dyn Clickable> {
        None
    }
    fn as_selectable(&self) -> Option<&dyn Selectable> {
        None
    }
    fn as_hoverable(&self) -> Option<&dyn Hoverable> {
        None
    }
    fn as_has_text(&self) -> Option<&dyn HasText> {
        None
    }
    fn as_has_tooltip(&self) -> Option<&dyn HasTooltip> {
        None
    }
    fn as_data_source(&self) -> Option<&dyn DataSourceBound> {
        None
    }
    fn as_object_list(&self) -> Option<&dyn ObjectList> {
        None
    }
    fn as_object_selector(&self) -> Option<&dyn ObjectSelector> {
        None
    }
    fn as_list_entry(&self) -> Option<&dyn ListEntry> {
        None
    }
    fn as_string_input(&self) -> Option<&dyn StringInput> {
        None
    }
    fn as_text_validator(&self) -> Option<&dyn TextValidator> {
        None
    }
    fn as_image_display(&self) -> Option<&dyn ImageDisplay> {
        None
    }
    fn as_progress(&self) -> Option<&dyn ProgressDisplay> {
        None
    }
    fn as_dialog(&self) -> Option<&dyn Dialog> {
        None
    }
    fn as_command_menu(&self) -> Option<&dyn CommandMenu> {
        None
    }
    fn as_mod_list_view(&self) -> Option<&dyn ModListView> {
        None
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Clickable => self.as_clickable().is_some(),
            Capability::Selectable => self.as_selectable().is_some(),
            Capability::Hoverable => self.as_hoverable().is_some(),
            Capability::HasText => self.as_has_text().is_some(),
            Capability::HasTooltip => self.as_has_tooltip().is_some(),
            Capability::DataSource => self.as_data_source().is_some(),
            Capability::ObjectList => self.as_object_list().is_some(),
            Capability::ObjectSelector => self.as_object_selector().is_some(),
            Capability::ListEntry => self.as_list_entry().is_some(),
            Capability::StringInput => self.as_string_input().is_some(),
            Capability::TextValidator => self.as_text_validator().is_some(),
            Capability::ImageDisplay => self.as_image_display().is_some(),
            Capability::Progress => self.as_progress().is_some(),
            Capability::Dialog => self.as_dialog().is_some(),
            Capability::CommandMenu => self.as_command_menu().is_some(),
            Capability::ModListView => self.as_mod_list_view().is_some(),
        }
    }

    fn capabilities(&self) -> CapabilitySet {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.supports(*capability))
            .fold(CapabilitySet::empty(), |set, capability| {
                set | capability.flag()
            })
    }
}

/// Every contract in `required` that `component` does not fulfil.
pub fn missing_capabilities(component: &dyn Component, required: CapabilitySet) -> CapabilitySet {
    required
        .capabilities()
        .filter(|capability| !component.supports(*capability))
        .fold(CapabilitySet::empty(), |set, capability| {
            set | capability.flag()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Toggle {
        selectable: Cell<bool>,
        selected: Cell<bool>,
    }

    impl Selectable for Toggle {
        fn set_selectable(&self, selectable: bool) {
            self.selectable.set(selectable);
        }
        fn is_selectable(&self) -> bool {
            self.selectable.get()
        }
        fn set_selected_state(&self, selected: bool) {
            self.selected.set(selected);
        }
        fn selected_state(&self) -> bool {
            self.selected.get()
        }
    }

    impl Component for Toggle {
        fn as_selectable(&self) -> Option<&dyn Selectable> {
            Some(self)
        }
    }

    #[test]
    fn flags_follow_declaration_order() {
        for (bit, capability) in Capability::ALL.into_iter().enumerate() {
            assert_eq!(capability.flag().bits(), 1 << bit);
        }
        assert_eq!(Capability::Selectable.flag(), CapabilitySet::SELECTABLE);
        assert_eq!(Capability::ModListView.flag(), CapabilitySet::MOD_LIST_VIEW);
    }

    #[test]
    fn set_display_lists_names_in_order() {
        let set = CapabilitySet::of(&[Capability::Selectable, Capability::Clickable]);
        assert_eq!(set.to_string(), "Clickable, Selectable");
        assert_eq!(CapabilitySet::empty().to_string(), "none");
    }

    #[test]
    fn capabilities_derive_from_accessors() {
        let toggle = Toggle::default();
        assert_eq!(toggle.capabilities(), CapabilitySet::SELECTABLE);
        toggle.toggle_selected_state();
        assert!(toggle.selected_state());
    }

    #[test]
    fn missing_capabilities_enumerates_every_gap() {
        let toggle = Toggle::default();
        let required = CapabilitySet::of(&[
            Capability::Clickable,
            Capability::Selectable,
            Capability::Hoverable,
            Capability::DataSource,
        ]);
        let missing = missing_capabilities(&toggle, required);
        assert_eq!(
            missing,
            CapabilitySet::CLICKABLE | CapabilitySet::HOVERABLE | CapabilitySet::DATA_SOURCE
        );
    }

    #[test]
    fn set_serializes_as_capability_names() {
        let set = CapabilitySet::HAS_TEXT | CapabilitySet::CLICKABLE;
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[\"Clickable\",\"HasText\"]");
    }
}
