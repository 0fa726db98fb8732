use serde::Serialize;

use crate::capability::ComponentKind;
use crate::logging::Logger;

/// The single externally visible notification per logical selection action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionChanged<V> {
    /// Most recently selected value, `None` once nothing is selected.
    pub value: Option<V>,
    pub index: Option<usize>,
}

impl<V> SelectionChanged<V> {
    pub fn cleared() -> Self {
        Self {
            value: None,
            index: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Single,
    Multi,
}

/// Whether a selection mutation is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Idle,
    MutatingSelection,
}

#[derive(Debug, Clone)]
pub struct SelectionConfig {
    pub name: String,
    pub logger: Option<Logger>,
    /// Base value of the suppression stack, used by user-originated actions.
    pub emit_by_default: bool,
    pub mode: SelectionMode,
    /// Kind reported when a bound entry lacks the click or select contract.
    pub entry_kind: ComponentKind,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            name: "selection".to_string(),
            logger: None,
            emit_by_default: true,
            mode: SelectionMode::Single,
            entry_kind: ComponentKind::EnumSelectorEntry,
        }
    }
}

impl SelectionConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_entry_kind(mut self, kind: ComponentKind) -> Self {
        self.entry_kind = kind;
        self
    }

    pub fn emit_by_default(mut self, emit: bool) -> Self {
        self.emit_by_default = emit;
        self
    }
}
