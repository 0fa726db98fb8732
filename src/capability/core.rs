use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::json;

use crate::error::{HubError, Result};
use crate::logging::{LogLevel, Logger, emit, json_kv};

use super::contracts::{Capability, CapabilitySet, Component, missing_capabilities};

const REGISTRY_TARGET: &str = "widget_hub::registry";

/// Role a widget plays in a composed screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ComponentKind {
    Button,
    StaticText,
    EditableText,
    MultilineEditableText,
    CodeInputText,
    EnumSelector,
    PresetFilterSelector,
    ModTile,
    ModalDialog,
    Image,
    ProgressWidget,
    CheckBox,
    ModList,
    TagDisplay,
    ObjectList,
    EnumSelectorEntry,
    CommandMenu,
    FilterSelectorEntry,
    ModPropertyCollection,
    UserDisplay,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 20] = [
        ComponentKind::Button,
        ComponentKind::StaticText,
        ComponentKind::EditableText,
        ComponentKind::MultilineEditableText,
        ComponentKind::CodeInputText,
        ComponentKind::EnumSelector,
        ComponentKind::PresetFilterSelector,
        ComponentKind::ModTile,
        ComponentKind::ModalDialog,
        ComponentKind::Image,
        ComponentKind::ProgressWidget,
        ComponentKind::CheckBox,
        ComponentKind::ModList,
        ComponentKind::TagDisplay,
        ComponentKind::ObjectList,
        ComponentKind::EnumSelectorEntry,
        ComponentKind::CommandMenu,
        ComponentKind::FilterSelectorEntry,
        ComponentKind::ModPropertyCollection,
        ComponentKind::UserDisplay,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::Button => "Button",
            ComponentKind::StaticText => "StaticText",
            ComponentKind::EditableText => "EditableText",
            ComponentKind::MultilineEditableText => "MultilineEditableText",
            ComponentKind::CodeInputText => "CodeInputText",
            ComponentKind::EnumSelector => "EnumSelector",
            ComponentKind::PresetFilterSelector => "PresetFilterSelector",
            ComponentKind::ModTile => "ModTile",
            ComponentKind::ModalDialog => "ModalDialog",
            ComponentKind::Image => "Image",
            ComponentKind::ProgressWidget => "ProgressWidget",
            ComponentKind::CheckBox => "CheckBox",
            ComponentKind::ModList => "ModList",
            ComponentKind::TagDisplay => "TagDisplay",
            ComponentKind::ObjectList => "ObjectList",
            ComponentKind::EnumSelectorEntry => "EnumSelectorEntry",
            ComponentKind::CommandMenu => "CommandMenu",
            ComponentKind::FilterSelectorEntry => "FilterSelectorEntry",
            ComponentKind::ModPropertyCollection => "ModPropertyCollection",
            ComponentKind::UserDisplay => "UserDisplay",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Contract requirements for one component kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMetadata {
    pub kind: ComponentKind,
    pub display_name: String,
    pub required: CapabilitySet,
}

impl ComponentMetadata {
    pub fn new(kind: ComponentKind, display_name: impl Into<String>, required: &[Capability]) -> Self {
        Self {
            kind,
            display_name: display_name.into(),
            required: CapabilitySet::of(required),
        }
    }

    /// Placeholder returned for kinds with no registered metadata.
    pub fn unvalidated(kind: ComponentKind) -> Self {
        Self {
            kind,
            display_name: String::new(),
            required: CapabilitySet::empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "missing", rename_all = "snake_case")]
pub enum ValidationStatus {
    Satisfied,
    Missing(CapabilitySet),
    /// No metadata exists for the kind, so nothing was checked.
    Unvalidated,
}

/// Outcome of checking one component against one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub kind: ComponentKind,
    pub component: String,
    #[serde(flatten)]
    pub status: ValidationStatus,
}

impl ValidationReport {
    pub fn is_satisfied(&self) -> bool {
        matches!(self.status, ValidationStatus::Satisfied)
    }

    pub fn missing(&self) -> CapabilitySet {
        match self.status {
            ValidationStatus::Missing(missing) => missing,
            _ => CapabilitySet::empty(),
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self.status {
            ValidationStatus::Satisfied => Ok(()),
            ValidationStatus::Missing(missing) => Err(HubError::ContractValidation {
                kind: self.kind,
                missing,
            }),
            ValidationStatus::Unvalidated => Err(HubError::UnknownComponentKind(self.kind)),
        }
    }
}

/// Immutable table mapping component kinds to their required contracts.
///
/// Built once at startup and handed to whoever composes widgets; validation
/// happens at composition time, never on the event path.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    entries: HashMap<ComponentKind, ComponentMetadata>,
    order: Vec<ComponentKind>,
}

impl ComponentRegistry {
    pub fn builder() -> ComponentRegistryBuilder {
        ComponentRegistryBuilder::default()
    }

    /// The stock table for every widget kind shipped with the framework.
    pub fn builtin() -> Self {
        use Capability::*;

        let entry_contracts = [ListEntry, Clickable, Selectable, DataSource];
        Self::builder()
            .with(ComponentMetadata::new(
                ComponentKind::Button,
                "Button",
                &[Clickable, Selectable, Hoverable, HasTooltip, DataSource],
            ))
            .with(ComponentMetadata::new(ComponentKind::StaticText, "Text", &[HasText]))
            .with(ComponentMetadata::new(
                ComponentKind::EditableText,
                "Editable Text",
                &[StringInput, TextValidator],
            ))
            .with(ComponentMetadata::new(
                ComponentKind::CodeInputText,
                "Code Input",
                &[StringInput, TextValidator, HasTooltip],
            ))
            .with(ComponentMetadata::new(ComponentKind::ModalDialog, "Modal Dialog", &[Dialog]))
            .with(ComponentMetadata::new(ComponentKind::Image, "Image", &[ImageDisplay]))
            .with(ComponentMetadata::new(ComponentKind::ProgressWidget, "Progress", &[Progress]))
            .with(ComponentMetadata::new(
                ComponentKind::CheckBox,
                "CheckBox",
                &[Selectable, HasText, HasTooltip],
            ))
            .with(ComponentMetadata::new(ComponentKind::TagDisplay, "Tag", &[HasText]))
            .with(ComponentMetadata::new(ComponentKind::ObjectList, "Object List", &[ObjectList]))
            .with(ComponentMetadata::new(
                ComponentKind::ModList,
                "Mod List",
                &[ObjectList, ModListView],
            ))
            .with(ComponentMetadata::new(
                ComponentKind::EnumSelector,
                "Enum Selector",
                &[ObjectSelector],
            ))
            .with(ComponentMetadata::new(
                ComponentKind::EnumSelectorEntry,
                "Enum Selector Entry",
                &entry_contracts,
            ))
            .with(ComponentMetadata::new(
                ComponentKind::PresetFilterSelector,
                "Preset Filter Selector",
                &[ObjectSelector],
            ))
            .with(ComponentMetadata::new(ComponentKind::CommandMenu, "Command Menu", &[CommandMenu]))
            .with(ComponentMetadata::new(
                ComponentKind::FilterSelectorEntry,
                "Filter Selector Entry",
                &entry_contracts,
            ))
            .with(ComponentMetadata::new(
                ComponentKind::ModPropertyCollection,
                "Mod Property Collection Visualizer",
                &[DataSource],
            ))
            .with(ComponentMetadata::new(ComponentKind::ModTile, "Mod Tile", &entry_contracts))
            .with(ComponentMetadata::new(ComponentKind::UserDisplay, "User Display", &[DataSource]))
            .build()
    }

    pub fn metadata(&self, kind: ComponentKind) -> Option<&ComponentMetadata> {
        self.entries.get(&kind)
    }

    /// Metadata for `kind`, or an empty placeholder plus `false` when unknown.
    pub fn metadata_or_default(&self, kind: ComponentKind) -> (ComponentMetadata, bool) {
        match self.entries.get(&kind) {
            Some(meta) => (meta.clone(), true),
            None => (ComponentMetadata::unvalidated(kind), false),
        }
    }

    pub fn required_contracts(&self, kind: ComponentKind) -> Result<CapabilitySet> {
        self.entries
            .get(&kind)
            .map(|meta| meta.required)
            .ok_or(HubError::UnknownComponentKind(kind))
    }

    pub fn check(&self, component: &dyn Component, kind: ComponentKind) -> ValidationReport {
        let status = match self.entries.get(&kind) {
            None => ValidationStatus::Unvalidated,
            Some(meta) => {
                let missing = missing_capabilities(component, meta.required);
                if missing.is_empty() {
                    ValidationStatus::Satisfied
                } else {
                    ValidationStatus::Missing(missing)
                }
            }
        };
        ValidationReport {
            kind,
            component: component.component_name().to_string(),
            status,
        }
    }

    pub fn validate(&self, component: &dyn Component, kind: ComponentKind) -> Result<()> {
        self.check(component, kind).into_result()
    }

    /// Registered kinds in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ComponentRegistryBuilder {
    entries: HashMap<ComponentKind, ComponentMetadata>,
    order: Vec<ComponentKind>,
    logger: Option<Logger>,
}

impl ComponentRegistryBuilder {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Adds `metadata`; the first registration for a kind wins.
    pub fn with(mut self, metadata: ComponentMetadata) -> Self {
        if self.entries.contains_key(&metadata.kind) {
            emit(
                self.logger.as_ref(),
                LogLevel::Debug,
                REGISTRY_TARGET,
                "duplicate_metadata_ignored",
                [
                    json_kv("kind", json!(metadata.kind.name())),
                    json_kv("display_name", json!(metadata.display_name)),
                ],
            );
            return self;
        }
        self.order.push(metadata.kind);
        self.entries.insert(metadata.kind, metadata);
        self
    }

    /// Registers `kind` as the union of the contracts of already registered `parts`.
    pub fn with_composite(
        self,
        kind: ComponentKind,
        display_name: impl Into<String>,
        parts: &[ComponentKind],
    ) -> Result<Self> {
        let mut required = CapabilitySet::empty();
        for part in parts {
            let meta = self
                .entries
                .get(part)
                .ok_or(HubError::UnknownComponentKind(*part))?;
            required |= meta.required;
        }
        Ok(self.with(ComponentMetadata {
            kind,
            display_name: display_name.into(),
            required,
        }))
    }

    pub fn build(self) -> ComponentRegistry {
        ComponentRegistry {
            entries: self.entries,
            order: self.order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::contracts::{Clickable, Clicked, Selectable};
    use crate::channel::EventChannel;
    use std::cell::Cell;

    #[derive(Default)]
    struct BareTile {
        selected: Cell<bool>,
        clicks: EventChannel<Clicked>,
        click_enabled: Cell<bool>,
    }

    impl Clickable for BareTile {
        fn enable_click(&self) {
            self.click_enabled.set(true);
        }
        fn disable_click(&self) {
            self.click_enabled.set(false);
        }
        fn click_enabled(&self) -> bool {
            self.click_enabled.get()
        }
        fn clicked(&self) -> &EventChannel<Clicked> {
            &self.clicks
        }
    }

    impl Selectable for BareTile {
        fn set_selectable(&self, _selectable: bool) {}
        fn is_selectable(&self) -> bool {
            true
        }
        fn set_selected_state(&self, selected: bool) {
            self.selected.set(selected);
        }
        fn selected_state(&self) -> bool {
            self.selected.get()
        }
    }

    impl Component for BareTile {
        fn component_name(&self) -> &str {
            "BareTile"
        }
        fn as_clickable(&self) -> Option<&dyn Clickable> {
            Some(self)
        }
        fn as_selectable(&self) -> Option<&dyn Selectable> {
            Some(self)
        }
    }

    #[test]
    fn builtin_covers_every_kind_but_multiline_text() {
        let registry = ComponentRegistry::builtin();
        assert_eq!(registry.len(), ComponentKind::ALL.len() - 1);
        assert!(registry.metadata(ComponentKind::MultilineEditableText).is_none());
        let (meta, found) = registry.metadata_or_default(ComponentKind::MultilineEditableText);
        assert!(!found);
        assert!(meta.required.is_empty());
    }

    #[test]
    fn required_contracts_for_unknown_kind_errors() {
        let registry = ComponentRegistry::builder().build();
        let err = registry.required_contracts(ComponentKind::Button).unwrap_err();
        assert_eq!(err, HubError::UnknownComponentKind(ComponentKind::Button));
    }

    #[test]
    fn missing_two_of_four_reports_both() {
        let registry = ComponentRegistry::builtin();
        let tile = BareTile::default();
        let report = registry.check(&tile, ComponentKind::ModTile);
        assert!(!report.is_satisfied());
        assert_eq!(
            report.missing(),
            CapabilitySet::LIST_ENTRY | CapabilitySet::DATA_SOURCE
        );
        let err = registry.validate(&tile, ComponentKind::ModTile).unwrap_err();
        assert!(matches!(
            err,
            HubError::ContractValidation { kind: ComponentKind::ModTile, missing }
                if missing.bits().count_ones() == 2
        ));
    }

    #[test]
    fn checkbox_needs_no_click_contract() {
        use crate::capability::contracts::{HasText, HasTooltip};

        #[derive(Default)]
        struct Toggle {
            on: Cell<bool>,
        }
        impl Selectable for Toggle {
            fn set_selectable(&self, _selectable: bool) {}
            fn is_selectable(&self) -> bool {
                true
            }
            fn set_selected_state(&self, selected: bool) {
                self.on.set(selected);
            }
            fn selected_state(&self) -> bool {
                self.on.get()
            }
        }
        impl HasText for Toggle {
            fn set_widget_text(&self, _text: &str) {}
            fn widget_text(&self) -> String {
                "Show installed".to_string()
            }
        }
        impl HasTooltip for Toggle {
            fn set_tooltip_enabled(&self, _enabled: bool) {}
            fn configure_tooltip(&self, _title: &str, _info: &str) {}
        }
        impl Component for Toggle {
            fn as_selectable(&self) -> Option<&dyn Selectable> {
                Some(self)
            }
            fn as_has_text(&self) -> Option<&dyn HasText> {
                Some(self)
            }
            fn as_has_tooltip(&self) -> Option<&dyn HasTooltip> {
                Some(self)
            }
        }

        let registry = ComponentRegistry::builtin();
        let toggle = Toggle::default();
        let report = registry.check(&toggle, ComponentKind::CheckBox);
        assert_eq!(report.status, ValidationStatus::Satisfied);
        assert!(registry.validate(&toggle, ComponentKind::CheckBox).is_ok());
        assert!(
            !registry
                .required_contracts(ComponentKind::CheckBox)
                .unwrap()
                .contains(CapabilitySet::CLICKABLE)
        );
    }

    #[test]
    fn unknown_kind_degrades_to_unvalidated() {
        let registry = ComponentRegistry::builtin();
        let tile = BareTile::default();
        let report = registry.check(&tile, ComponentKind::MultilineEditableText);
        assert_eq!(report.status, ValidationStatus::Unvalidated);
        assert_eq!(report.component, "BareTile");
    }

    #[test]
    fn first_registration_wins() {
        let registry = ComponentRegistry::builder()
            .with(ComponentMetadata::new(
                ComponentKind::EditableText,
                "Editable Text",
                &[Capability::StringInput],
            ))
            .with(ComponentMetadata::new(
                ComponentKind::EditableText,
                "Multiline Editable Text",
                &[Capability::HasText],
            ))
            .build();
        let meta = registry.metadata(ComponentKind::EditableText).unwrap();
        assert_eq!(meta.display_name, "Editable Text");
        assert_eq!(meta.required, CapabilitySet::STRING_INPUT);
    }

    #[test]
    fn composite_takes_union_of_parts() {
        let registry = ComponentRegistry::builder()
            .with(ComponentMetadata::new(
                ComponentKind::CheckBox,
                "CheckBox",
                &[Capability::Clickable, Capability::Selectable],
            ))
            .with(ComponentMetadata::new(
                ComponentKind::UserDisplay,
                "User Display",
                &[Capability::DataSource, Capability::Selectable],
            ))
            .with_composite(
                ComponentKind::ModTile,
                "Mod Tile",
                &[ComponentKind::CheckBox, ComponentKind::UserDisplay],
            )
            .unwrap()
            .build();
        assert_eq!(
            registry.required_contracts(ComponentKind::ModTile).unwrap(),
            CapabilitySet::CLICKABLE | CapabilitySet::SELECTABLE | CapabilitySet::DATA_SOURCE
        );
        let kinds: Vec<_> = registry.kinds().collect();
        assert_eq!(kinds.last(), Some(&ComponentKind::ModTile));
    }

    #[test]
    fn composite_with_unknown_part_fails() {
        let result = ComponentRegistry::builder().with_composite(
            ComponentKind::ModTile,
            "Mod Tile",
            &[ComponentKind::Button],
        );
        assert!(matches!(
            result,
            Err(HubError::UnknownComponentKind(ComponentKind::Button))
        ));
    }

    #[test]
    fn report_serializes_missing_contracts() {
        let registry = ComponentRegistry::builtin();
        let tile = BareTile::default();
        let report = registry.check(&tile, ComponentKind::ModTile);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["kind"], json!("ModTile"));
        assert_eq!(value["status"], json!("missing"));
        assert_eq!(value["missing"], json!(["DataSource", "ListEntry"]));
    }
}
