use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use serde_json::json;

use crate::capability::{
    CapabilitySet, Clicked, Component, ComponentKind, ObjectList, ObjectSelector,
    missing_capabilities,
};
use crate::channel::{ChannelConfig, EventChannel, SubscriberKey};
use crate::error::{HubError, Result};
use crate::logging::{LogLevel, Logger, emit, json_kv};
use crate::suppression::{SuppressionScope, SuppressionStack};

use super::types::{SelectionChanged, SelectionConfig, SelectionMode, SelectionPhase};

const SELECTION_TARGET: &str = "widget_hub::selection";

fn same_widget(a: &Rc<dyn Component>, b: &Rc<dyn Component>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

fn set_widget_state(entry: &Rc<dyn Component>, selected: bool) {
    if let Some(selectable) = entry.as_selectable() {
        selectable.set_selected_state(selected);
    }
}

/// Selection state and notification protocol for one list-like widget.
///
/// Every mutating entry point runs inside a [`SuppressionScope`]. Only the
/// outermost operation publishes, once, after its scope has closed; callbacks
/// that fire while a mutation is in progress are bookkeeping only. Bound
/// entry widgets and the previously selected entry are tracked weakly.
pub struct SelectionCoordinator<V> {
    name: String,
    values: RefCell<Vec<V>>,
    selected: RefCell<Vec<usize>>,
    entries: RefCell<BTreeMap<usize, Weak<dyn Component>>>,
    previous: RefCell<Option<Weak<dyn Component>>>,
    mode: Cell<SelectionMode>,
    suppression: SuppressionStack,
    base_depth: usize,
    entry_kind: ComponentKind,
    changed: EventChannel<SelectionChanged<V>>,
    logger: Option<Logger>,
}

impl<V> std::fmt::Debug for SelectionCoordinator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionCoordinator")
            .field("name", &self.name)
            .field("selected", &self.selected.borrow())
            .field("mode", &self.mode.get())
            .field("bound_entries", &self.entries.borrow().len())
            .finish_non_exhaustive()
    }
}

impl<V> SelectionCoordinator<V>
where
    V: Clone + PartialEq + 'static,
{
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Self::with_config(SelectionConfig::named(name))
    }

    pub fn with_config(config: SelectionConfig) -> Rc<Self> {
        let suppression = SuppressionStack::with_initial(config.emit_by_default);
        let base_depth = suppression.depth();
        let mut channel = ChannelConfig::named(format!("{}.selection_changed", config.name));
        channel.logger = config.logger.clone();
        Rc::new(Self {
            name: config.name,
            values: RefCell::new(Vec::new()),
            selected: RefCell::new(Vec::new()),
            entries: RefCell::new(BTreeMap::new()),
            previous: RefCell::new(None),
            mode: Cell::new(config.mode),
            suppression,
            base_depth,
            entry_kind: config.entry_kind,
            changed: EventChannel::with_config(channel),
            logger: config.logger,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel carrying one [`SelectionChanged`] per logical action.
    pub fn selection_changed(&self) -> &EventChannel<SelectionChanged<V>> {
        &self.changed
    }

    pub fn phase(&self) -> SelectionPhase {
        if self.suppression.depth() > self.base_depth {
            SelectionPhase::MutatingSelection
        } else {
            SelectionPhase::Idle
        }
    }

    /// Silences every operation started while the returned scope is alive.
    pub fn suppress_events(&self) -> SuppressionScope<'_> {
        self.suppression.scope(false)
    }

    // items

    /// Replaces the item list. Selection and bound entries are reset.
    pub fn set_values(&self, values: Vec<V>) {
        let bound: Vec<Weak<dyn Component>> =
            std::mem::take(&mut *self.entries.borrow_mut()).into_values().collect();
        for entry in bound.iter().filter_map(Weak::upgrade) {
            set_widget_state(&entry, false);
            if let Some(clickable) = entry.as_clickable() {
                clickable.clicked().unsubscribe(self.subscriber_key());
            }
        }
        self.selected.borrow_mut().clear();
        self.previous.borrow_mut().take();
        let count = values.len();
        *self.values.borrow_mut() = values;
        self.log(
            LogLevel::Debug,
            "values_replaced",
            [json_kv("count", json!(count))],
        );
    }

    pub fn values(&self) -> Vec<V> {
        self.values.borrow().clone()
    }

    pub fn value_at(&self, index: usize) -> Option<V> {
        self.values.borrow().get(index).cloned()
    }

    pub fn index_of(&self, value: &V) -> Option<usize> {
        self.values.borrow().iter().position(|candidate| candidate == value)
    }

    pub fn num_entries(&self) -> usize {
        self.values.borrow().len()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.num_entries();
        if index < len {
            Ok(())
        } else {
            Err(HubError::IndexOutOfRange { index, len })
        }
    }

    fn require_index(&self, value: &V) -> Result<usize> {
        self.index_of(value).ok_or(HubError::UnknownValue)
    }

    // entries

    /// Attaches the widget visualising item `index`.
    ///
    /// The widget must be clickable and selectable. Its click channel gets a
    /// weak subscription keyed by this coordinator, so binding the same
    /// widget again never duplicates delivery.
    pub fn bind_entry(self: &Rc<Self>, index: usize, entry: Rc<dyn Component>) -> Result<()> {
        self.check_index(index)?;
        let missing = missing_capabilities(
            &*entry,
            CapabilitySet::CLICKABLE | CapabilitySet::SELECTABLE,
        );
        if !missing.is_empty() {
            return Err(HubError::ContractValidation {
                kind: self.entry_kind,
                missing,
            });
        }
        let clickable = entry
            .as_clickable()
            .ok_or(HubError::MissingCapability("Clickable"))?;
        let selectable = entry
            .as_selectable()
            .ok_or(HubError::MissingCapability("Selectable"))?;

        clickable.enable_click();
        selectable.set_selectable(true);
        let weak_entry = Rc::downgrade(&entry);
        clickable
            .clicked()
            .subscribe_weak(self, move |coordinator: &Self, _: &Clicked| {
                match weak_entry.upgrade() {
                    Some(entry) => coordinator.entry_clicked(&entry),
                    None => Ok(()),
                }
            });
        if let Some(list_entry) = entry.as_list_entry() {
            list_entry.set_list_index(Some(index));
        }

        let displaced = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|bound, weak| {
                *bound == index || !std::ptr::addr_eq(weak.as_ptr(), Rc::as_ptr(&entry))
            });
            entries.insert(index, Rc::downgrade(&entry))
        };
        if let Some(old) = displaced.and_then(|weak| weak.upgrade()) {
            if !same_widget(&old, &entry) {
                self.detach(&old);
            }
        }

        let selected = self.is_selected(index);
        selectable.set_selected_state(selected);
        if selected && self.mode.get() == SelectionMode::Single {
            *self.previous.borrow_mut() = Some(Rc::downgrade(&entry));
        }
        self.log(
            LogLevel::Trace,
            "entry_bound",
            [
                json_kv("index", json!(index)),
                json_kv("widget", json!(entry.component_name())),
            ],
        );
        Ok(())
    }

    /// Detaches the widget bound to `index`, returning it if still alive.
    pub fn unbind_entry(&self, index: usize) -> Option<Rc<dyn Component>> {
        let removed = self.entries.borrow_mut().remove(&index)?;
        let entry = removed.upgrade()?;
        self.detach(&entry);
        Some(entry)
    }

    fn subscriber_key(&self) -> SubscriberKey {
        SubscriberKey::of_ref(self)
    }

    fn detach(&self, entry: &Rc<dyn Component>) {
        if let Some(clickable) = entry.as_clickable() {
            clickable.clicked().unsubscribe(self.subscriber_key());
        }
        if let Some(list_entry) = entry.as_list_entry() {
            list_entry.set_list_index(None);
        }
        set_widget_state(entry, false);
        let is_previous = self
            .previous_entry()
            .is_some_and(|previous| same_widget(&previous, entry));
        if is_previous {
            self.previous.borrow_mut().take();
        }
    }

    pub fn entry_for(&self, index: usize) -> Option<Rc<dyn Component>> {
        self.entries.borrow().get(&index).and_then(Weak::upgrade)
    }

    fn index_of_entry(&self, entry: &Rc<dyn Component>) -> Option<usize> {
        self.entries
            .borrow()
            .iter()
            .find(|(_, weak)| std::ptr::addr_eq(weak.as_ptr(), Rc::as_ptr(entry)))
            .map(|(index, _)| *index)
    }

    fn set_entry_state(&self, index: usize, selected: bool) {
        if let Some(entry) = self.entry_for(index) {
            set_widget_state(&entry, selected);
        }
    }

    /// Entry last told it is selected, if it still exists.
    pub fn previous_entry(&self) -> Option<Rc<dyn Component>> {
        self.previous.borrow().as_ref().and_then(Weak::upgrade)
    }

    // selection operations

    pub fn set_single_selection_by_index(&self, index: usize, emit: bool) -> Result<()> {
        self.check_index(index)?;
        self.run("select_index", emit, || {
            self.apply_single(index);
            Ok(true)
        })
    }

    pub fn set_single_selection_by_value(&self, value: &V, emit: bool) -> Result<()> {
        let index = self.require_index(value)?;
        self.set_single_selection_by_index(index, emit)
    }

    pub fn set_selected_state_for_index(&self, index: usize, selected: bool, emit: bool) -> Result<()> {
        self.check_index(index)?;
        self.run("set_state", emit, || {
            match (self.mode.get(), selected) {
                (SelectionMode::Single, true) => self.apply_single(index),
                (SelectionMode::Multi, true) => self.apply_multi_select(index),
                (_, false) => self.apply_deselect(index),
            }
            Ok(true)
        })
    }

    pub fn set_selected_state_for_value(&self, value: &V, selected: bool, emit: bool) -> Result<()> {
        let index = self.require_index(value)?;
        self.set_selected_state_for_index(index, selected, emit)
    }

    /// Deselects every bound entry and every recorded value.
    pub fn clear_selected_values(&self) {
        let emit = self.suppression.peek(true);
        // infallible: the operation never returns Err
        let _ = self.run("clear", emit, || {
            let bound: Vec<Rc<dyn Component>> = self
                .entries
                .borrow()
                .values()
                .filter_map(Weak::upgrade)
                .collect();
            for entry in &bound {
                set_widget_state(entry, false);
            }
            self.selected.borrow_mut().clear();
            self.previous.borrow_mut().take();
            Ok(true)
        });
    }

    /// Click on a bound entry. Single mode selects it, multi mode toggles it.
    /// Publishes only when the recorded selection actually changes, so a
    /// click the toolkit also reports generically yields one notification.
    pub fn entry_clicked(&self, entry: &Rc<dyn Component>) -> Result<()> {
        let index = self.index_of_entry(entry).ok_or(HubError::UnknownValue)?;
        let emit = self.suppression.peek(true);
        self.run("click", emit, || {
            let changed = match self.mode.get() {
                SelectionMode::Single => {
                    let changed = *self.selected.borrow() != [index];
                    self.apply_single(index);
                    changed
                }
                SelectionMode::Multi => {
                    if self.is_selected(index) {
                        self.apply_deselect(index);
                    } else {
                        self.apply_multi_select(index);
                    }
                    true
                }
            };
            Ok(changed)
        })
    }

    /// Generic selection callback of the underlying list toolkit.
    ///
    /// Ignored while a mutation is in flight. Otherwise it counts as one
    /// user action and publishes only if it changes the recorded selection.
    pub fn toolkit_selection_changed(&self, value: Option<&V>) -> Result<()> {
        if self.phase() == SelectionPhase::MutatingSelection {
            self.log(
                LogLevel::Trace,
                "toolkit_echo_ignored",
                [json_kv("depth", json!(self.suppression.depth()))],
            );
            return Ok(());
        }
        let index = value.map(|value| self.require_index(value)).transpose()?;
        let emit = self.suppression.peek(true);
        self.run("toolkit", emit, || {
            let changed = match index {
                None => {
                    let stale: Vec<usize> = self.selected.borrow().clone();
                    for old in &stale {
                        self.set_entry_state(*old, false);
                    }
                    self.selected.borrow_mut().clear();
                    self.previous.borrow_mut().take();
                    !stale.is_empty()
                }
                Some(index) => match self.mode.get() {
                    SelectionMode::Single => {
                        let changed = *self.selected.borrow() != [index];
                        self.apply_single(index);
                        changed
                    }
                    SelectionMode::Multi => {
                        let changed = !self.is_selected(index);
                        self.apply_multi_select(index);
                        changed
                    }
                },
            };
            Ok(changed)
        })
    }

    fn apply_single(&self, index: usize) {
        let target = self.entry_for(index);
        if let Some(previous) = self.previous_entry() {
            let same = target
                .as_ref()
                .is_some_and(|target| same_widget(target, &previous));
            if !same {
                set_widget_state(&previous, false);
            }
        }
        let stale: Vec<usize> = self
            .selected
            .borrow()
            .iter()
            .copied()
            .filter(|selected| *selected != index)
            .collect();
        for old in stale {
            self.set_entry_state(old, false);
        }
        *self.selected.borrow_mut() = vec![index];
        if let Some(target) = target.as_ref() {
            set_widget_state(target, true);
        }
        *self.previous.borrow_mut() = target.as_ref().map(Rc::downgrade);
    }

    fn apply_multi_select(&self, index: usize) {
        {
            let mut selected = self.selected.borrow_mut();
            selected.retain(|existing| *existing != index);
            selected.push(index);
        }
        let target = self.entry_for(index);
        if let Some(target) = target.as_ref() {
            set_widget_state(target, true);
        }
        *self.previous.borrow_mut() = target.as_ref().map(Rc::downgrade);
    }

    fn apply_deselect(&self, index: usize) {
        self.selected.borrow_mut().retain(|existing| *existing != index);
        let target = self.entry_for(index);
        if let Some(target) = target.as_ref() {
            set_widget_state(target, false);
            let was_previous = self
                .previous_entry()
                .is_some_and(|previous| same_widget(&previous, target));
            if was_previous {
                let latest = self.selected.borrow().last().copied();
                *self.previous.borrow_mut() = latest
                    .and_then(|latest| self.entries.borrow().get(&latest).cloned());
            }
        }
    }

    /// Runs `op` inside a suppression scope holding `emit`. `op` reports
    /// whether its change deserves a notification.
    fn run<F>(&self, action: &'static str, emit: bool, op: F) -> Result<()>
    where
        F: FnOnce() -> Result<bool>,
    {
        let outermost = self.phase() == SelectionPhase::Idle;
        let notify = {
            let _scope = self.suppression.scope(emit);
            op()?
        };
        if !notify {
            return Ok(());
        }
        if outermost && emit {
            self.publish(action);
        } else if !outermost {
            self.log(
                LogLevel::Trace,
                "notification_coalesced",
                [json_kv("action", json!(action))],
            );
        }
        Ok(())
    }

    fn publish(&self, action: &'static str) {
        let event = SelectionChanged {
            value: self.selected_value(),
            index: self.selected_index(),
        };
        let report = self.changed.publish(&event);
        self.log(
            LogLevel::Debug,
            "selection_changed",
            [
                json_kv("action", json!(action)),
                json_kv("index", json!(event.index)),
                json_kv("delivered", json!(report.delivered)),
            ],
        );
    }

    // queries

    /// Most recently selected value.
    pub fn selected_value(&self) -> Option<V> {
        self.selected_index().and_then(|index| self.value_at(index))
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected.borrow().last().copied()
    }

    /// Selected values in the order they were selected.
    pub fn selected_values(&self) -> Vec<V> {
        let values = self.values.borrow();
        self.selected
            .borrow()
            .iter()
            .filter_map(|index| values.get(*index).cloned())
            .collect()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.borrow().contains(&index)
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode.get()
    }

    pub fn multi_selection_allowed(&self) -> bool {
        self.mode.get() == SelectionMode::Multi
    }

    /// Switching back to single mode keeps only the most recent selection.
    pub fn set_multi_selection_allowed(&self, allowed: bool) {
        let mode = if allowed {
            SelectionMode::Multi
        } else {
            SelectionMode::Single
        };
        if self.mode.replace(mode) == mode || allowed {
            return;
        }
        let latest = self.selected_index();
        let stale: Vec<usize> = self
            .selected
            .borrow()
            .iter()
            .copied()
            .filter(|index| Some(*index) != latest)
            .collect();
        for index in stale {
            self.set_entry_state(index, false);
        }
        *self.selected.borrow_mut() = latest.into_iter().collect();
        *self.previous.borrow_mut() =
            latest.and_then(|index| self.entries.borrow().get(&index).cloned());
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        let list = json_kv("list", json!(self.name));
        emit(
            self.logger.as_ref(),
            level,
            SELECTION_TARGET,
            message,
            std::iter::once(list).chain(fields),
        );
    }
}

impl<V> ObjectList for SelectionCoordinator<V>
where
    V: Clone + PartialEq + 'static,
{
    fn num_objects(&self) -> usize {
        self.num_entries()
    }
}

impl<V> ObjectSelector for SelectionCoordinator<V>
where
    V: Clone + PartialEq + 'static,
{
    fn selected_index(&self) -> Option<usize> {
        Self::selected_index(self)
    }

    fn set_single_selection_by_index(&self, index: usize, emit: bool) -> Result<()> {
        Self::set_single_selection_by_index(self, index, emit)
    }

    fn clear_selected_values(&self) {
        Self::clear_selected_values(self)
    }

    fn multi_selection_allowed(&self) -> bool {
        Self::multi_selection_allowed(self)
    }

    fn set_multi_selection_allowed(&self, allowed: bool) {
        Self::set_multi_selection_allowed(self, allowed)
    }
}

impl<V> Component for SelectionCoordinator<V>
where
    V: Clone + PartialEq + 'static,
{
    fn component_name(&self) -> &str {
        &self.name
    }

    fn as_object_list(&self) -> Option<&dyn ObjectList> {
        Some(self)
    }

    fn as_object_selector(&self) -> Option<&dyn ObjectSelector> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Clickable, ListEntry, Selectable};
    use crate::logging::MemorySink;
    use std::sync::Arc;

    #[derive(Default)]
    struct Row {
        selected: Cell<bool>,
        selectable: Cell<bool>,
        click_enabled: Cell<bool>,
        list_index: Cell<Option<usize>>,
        clicks: EventChannel<Clicked>,
    }

    impl Row {
        fn click(&self) -> crate::channel::PublishReport {
            self.clicks.publish(&Clicked)
        }
    }

    impl Clickable for Row {
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

    impl Selectable for Row {
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

    impl ListEntry for Row {
        fn set_list_index(&self, index: Option<usize>) {
            self.list_index.set(index);
        }
        fn list_index(&self) -> Option<usize> {
            self.list_index.get()
        }
    }

    impl Component for Row {
        fn as_clickable(&self) -> Option<&dyn Clickable> {
            Some(self)
        }
        fn as_selectable(&self) -> Option<&dyn Selectable> {
            Some(self)
        }
        fn as_list_entry(&self) -> Option<&dyn ListEntry> {
            Some(self)
        }
    }

    struct Fixture {
        list: Rc<SelectionCoordinator<&'static str>>,
        rows: Vec<Rc<Row>>,
        events: Rc<RefCell<Vec<Option<&'static str>>>>,
    }

    fn fixture(values: &[&'static str]) -> Fixture {
        let list = SelectionCoordinator::new("letters");
        list.set_values(values.to_vec());
        let mut rows = Vec::new();
        for index in 0..values.len() {
            let row = Rc::new(Row::default());
            list.bind_entry(index, row.clone()).unwrap();
            rows.push(row);
        }
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        list.selection_changed()
            .subscribe(SubscriberKey::named(0), move |event| {
                sink.borrow_mut().push(event.value);
                Ok(())
            });
        Fixture { list, rows, events }
    }

    fn selected_rows(rows: &[Rc<Row>]) -> usize {
        rows.iter().filter(|row| row.selected_state()).count()
    }

    #[test]
    fn select_then_silent_select_then_clear() {
        let f = fixture(&["A", "B", "C"]);

        f.list.set_single_selection_by_value(&"A", true).unwrap();
        assert_eq!(*f.events.borrow(), vec![Some("A")]);
        assert!(f.rows[0].selected_state());

        f.list.set_single_selection_by_index(1, false).unwrap();
        assert_eq!(f.events.borrow().len(), 1);
        assert!(!f.rows[0].selected_state());
        assert!(f.rows[1].selected_state());

        f.list.clear_selected_values();
        assert_eq!(*f.events.borrow(), vec![Some("A"), None]);
        assert!(!f.rows[1].selected_state());
        assert_eq!(f.list.selected_value(), None);
    }

    #[test]
    fn click_and_toolkit_report_publish_once() {
        let f = fixture(&["A", "B", "C"]);

        f.rows[2].click();
        f.list.toolkit_selection_changed(Some(&"C")).unwrap();
        assert_eq!(*f.events.borrow(), vec![Some("C")]);

        f.list.toolkit_selection_changed(Some(&"B")).unwrap();
        f.rows[1].click();
        assert_eq!(*f.events.borrow(), vec![Some("C"), Some("B")]);
        assert_eq!(selected_rows(&f.rows), 1);
        assert!(f.rows[1].selected_state());
    }

    #[test]
    fn reselecting_keeps_previous_entry_and_does_not_refire_on_click() {
        let f = fixture(&["A", "B"]);
        f.rows[0].click();
        f.rows[0].click();
        assert_eq!(f.events.borrow().len(), 1);
        let previous = f.list.previous_entry().unwrap();
        let row: Rc<dyn Component> = f.rows[0].clone();
        assert!(same_widget(&previous, &row));
    }

    #[test]
    fn suppressed_region_publishes_nothing() {
        let f = fixture(&["A", "B", "C"]);
        {
            let _quiet = f.list.suppress_events();
            assert_eq!(f.list.phase(), SelectionPhase::MutatingSelection);
            f.list.set_single_selection_by_index(0, true).unwrap();
            f.rows[2].click();
            f.list.clear_selected_values();
            f.list.set_single_selection_by_index(1, true).unwrap();
        }
        assert_eq!(f.list.phase(), SelectionPhase::Idle);
        assert!(f.events.borrow().is_empty());
        assert_eq!(f.list.selected_index(), Some(1));
        assert_eq!(selected_rows(&f.rows), 1);
    }

    #[test]
    fn toolkit_echo_during_mutation_is_ignored() {
        let f = fixture(&["A", "B"]);
        {
            let _quiet = f.list.suppress_events();
            f.list.toolkit_selection_changed(Some(&"B")).unwrap();
        }
        assert_eq!(f.list.selected_index(), None);
        assert!(f.events.borrow().is_empty());
    }

    #[test]
    fn multi_mode_toggles_and_collapses_to_latest() {
        let f = fixture(&["A", "B", "C"]);
        f.list.set_multi_selection_allowed(true);

        f.rows[0].click();
        f.rows[2].click();
        assert_eq!(f.list.selected_values(), vec!["A", "C"]);
        assert_eq!(selected_rows(&f.rows), 2);

        f.rows[0].click();
        assert_eq!(f.list.selected_values(), vec!["C"]);
        assert_eq!(f.events.borrow().len(), 3);

        f.rows[1].click();
        f.list.set_multi_selection_allowed(false);
        assert_eq!(f.list.selected_values(), vec!["B"]);
        assert_eq!(selected_rows(&f.rows), 1);
        assert!(f.rows[1].selected_state());
    }

    #[test]
    fn bind_entry_rejects_missing_contracts() {
        struct Label;
        impl Component for Label {}

        let list = SelectionCoordinator::<u8>::new("bytes");
        list.set_values(vec![1, 2]);
        let err = list.bind_entry(0, Rc::new(Label)).unwrap_err();
        assert_eq!(
            err,
            HubError::ContractValidation {
                kind: ComponentKind::EnumSelectorEntry,
                missing: CapabilitySet::CLICKABLE | CapabilitySet::SELECTABLE,
            }
        );
        assert!(matches!(
            list.bind_entry(5, Rc::new(Row::default())),
            Err(HubError::IndexOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn rebinding_entry_does_not_duplicate_click_delivery() {
        let f = fixture(&["A", "B"]);
        f.list.bind_entry(0, f.rows[0].clone()).unwrap();
        assert_eq!(f.rows[0].clicked().len(), 1);
        assert_eq!(f.rows[0].click().delivered, 1);
        assert_eq!(f.events.borrow().len(), 1);
        assert_eq!(f.rows[0].list_index(), Some(0));
    }

    #[test]
    fn rebinding_selected_index_clears_displaced_widget() {
        let f = fixture(&["A", "B"]);
        f.list.set_single_selection_by_index(0, false).unwrap();
        assert!(f.rows[0].selected_state());

        let replacement = Rc::new(Row::default());
        f.list.bind_entry(0, replacement.clone()).unwrap();
        assert!(replacement.selected_state());
        assert!(!f.rows[0].selected_state());
        assert_eq!(f.rows[0].list_index(), None);

        let previous = f.list.previous_entry().unwrap();
        let replacement_dyn: Rc<dyn Component> = replacement.clone();
        assert!(same_widget(&previous, &replacement_dyn));

        let unbound = f.list.unbind_entry(0).unwrap();
        assert!(!unbound.as_selectable().unwrap().selected_state());
        assert_eq!(f.list.selected_index(), Some(0));
        assert!(f.list.previous_entry().is_none());
    }

    #[test]
    fn moving_entry_to_another_index_forgets_old_slot() {
        let f = fixture(&["A", "B"]);
        f.list.bind_entry(1, f.rows[0].clone()).unwrap();
        assert!(f.list.entry_for(0).is_none());
        assert_eq!(f.rows[1].list_index(), None);
        f.rows[0].click();
        assert_eq!(*f.events.borrow(), vec![Some("B")]);
        assert_eq!(f.rows[1].click().delivered, 0);
    }

    #[test]
    fn dropped_coordinator_leaves_entries_inert() {
        let f = fixture(&["A"]);
        let row = Rc::clone(&f.rows[0]);
        drop(f);
        let report = row.click();
        assert_eq!(report.delivered, 0);
        assert_eq!(report.pruned, 1);
    }

    #[test]
    fn dropped_previous_entry_is_not_an_error() {
        let f = fixture(&["A", "B"]);
        f.list.set_single_selection_by_index(0, true).unwrap();
        let Fixture { list, mut rows, events } = f;
        let first = rows.remove(0);
        drop(first);
        assert!(list.entry_for(0).is_none());
        list.set_single_selection_by_index(1, true).unwrap();
        assert!(rows[0].selected_state());
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn invalid_value_and_index_are_rejected() {
        let f = fixture(&["A"]);
        assert_eq!(
            f.list.set_single_selection_by_value(&"Z", true),
            Err(HubError::UnknownValue)
        );
        assert_eq!(
            f.list.set_selected_state_for_index(3, true, true),
            Err(HubError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert_eq!(f.list.phase(), SelectionPhase::Idle);
        assert!(f.events.borrow().is_empty());
    }

    #[test]
    fn coordinator_is_an_object_selector() {
        let f = fixture(&["A", "B"]);
        let component: &dyn Component = &*f.list;
        assert_eq!(
            component.capabilities(),
            CapabilitySet::OBJECT_LIST | CapabilitySet::OBJECT_SELECTOR
        );
        let selector = component.as_object_selector().unwrap();
        selector.set_single_selection_by_index(1, true).unwrap();
        assert_eq!(selector.selected_index(), Some(1));
        assert_eq!(component.as_object_list().unwrap().num_objects(), 2);
    }

    #[test]
    fn selection_changes_are_logged() {
        let sink = Arc::new(MemorySink::new());
        let list = SelectionCoordinator::with_config(
            SelectionConfig::named("logged").with_logger(Logger::from_arc(sink.clone())),
        );
        list.set_values(vec![10u32, 20]);
        list.set_single_selection_by_index(1, true).unwrap();
        let logged = sink.messages("selection_changed");
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].field("index"), Some(&json!(1)));
    }
}
