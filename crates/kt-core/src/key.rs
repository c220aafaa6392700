//! Key signal classification.
//!
//! The event source reports every key twice: on press, together with the edit
//! context (cursor column and line text) captured before the editor applies
//! the key, and on release. Deletions are classified on press because by
//! release the character under the cursor is already gone; everything else
//! is classified on release.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::LINE_BREAK;

/// Key identifier of the deletion key.
pub const DELETE_KEY: &str = "Backspace";

/// Whether a signal reports a key going down or coming up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPhase {
    Press,
    Release,
}

/// Editor state captured at key press, before the edit is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditContext {
    /// Cursor position within the line, in characters.
    pub column: usize,
    /// Full text of the line containing the cursor.
    pub line: String,
}

/// A raw key signal from the event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySignal {
    pub phase: KeyPhase,
    /// Key identifier, e.g. `a`, `Backspace`, `Shift`.
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    /// Only present on press.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<EditContext>,
}

impl KeySignal {
    pub fn press(key: impl Into<String>) -> Self {
        Self {
            phase: KeyPhase::Press,
            key: key.into(),
            ctrl: false,
            meta: false,
            context: None,
        }
    }

    pub fn release(key: impl Into<String>) -> Self {
        Self {
            phase: KeyPhase::Release,
            ..Self::press(key)
        }
    }

    #[must_use]
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    #[must_use]
    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    #[must_use]
    pub fn with_context(mut self, column: usize, line: impl Into<String>) -> Self {
        self.context = Some(EditContext {
            column,
            line: line.into(),
        });
        self
    }
}

/// Origin of a shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortcutNamespace {
    /// Control/command modifier combinations.
    System,
    /// Modal editing commands. Reserved: no event path produces these yet.
    Vim,
}

impl ShortcutNamespace {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Vim => "vim",
        }
    }
}

impl fmt::Display for ShortcutNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified key action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A printable character typed without modifiers.
    TypedChar(char),
    /// The symbol removed by a deletion, or [`LINE_BREAK`] when lines were joined.
    Deletion(String),
    /// A modifier combination.
    ShortcutInvoked {
        signature: String,
        namespace: ShortcutNamespace,
    },
}

/// Classifies a raw key signal.
///
/// Returns `None` for signals that carry no telemetry: the other half of each
/// press/release pair, bare modifiers, navigation and other named keys.
pub fn classify(signal: &KeySignal) -> Option<Action> {
    if signal.ctrl || signal.meta {
        return (signal.phase == KeyPhase::Release).then(|| Action::ShortcutInvoked {
            signature: shortcut_signature(signal),
            namespace: ShortcutNamespace::System,
        });
    }

    if signal.key == DELETE_KEY {
        if signal.phase != KeyPhase::Press {
            return None;
        }
        let Some(context) = &signal.context else {
            tracing::debug!("deletion without edit context, ignoring");
            return None;
        };
        return deleted_symbol(context).map(Action::Deletion);
    }

    if signal.phase != KeyPhase::Release {
        return None;
    }
    let mut chars = signal.key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() => Some(Action::TypedChar(c)),
        _ => None,
    }
}

/// The symbol a deletion at `context` removes.
fn deleted_symbol(context: &EditContext) -> Option<String> {
    if context.column == 0 {
        return Some(LINE_BREAK.to_string());
    }
    let deleted = context.line.chars().nth(context.column - 1);
    if deleted.is_none() {
        tracing::debug!(
            column = context.column,
            "cursor past end of line, ignoring deletion"
        );
    }
    deleted.map(String::from)
}

/// Modifier-prefixed key combination, e.g. `ctrl+s` or `ctrl+meta+k`.
fn shortcut_signature(signal: &KeySignal) -> String {
    let mut signature = String::new();
    if signal.ctrl {
        signature.push_str("ctrl+");
    }
    if signal.meta {
        signature.push_str("meta+");
    }
    signature.push_str(&signal.key);
    signature
}
