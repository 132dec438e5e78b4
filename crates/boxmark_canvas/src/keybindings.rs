//! Customizable keybindings.
//!
//! Covers both canvas-local actions (mode switches, delete, cancel) and the
//! navigation/history actions the host workspace handles. Category
//! shortcuts come from the categories themselves, not from this table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{Key, Modifiers};
use crate::model::Category;

/// A key plus the modifiers that must accompany it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    pub key: Key,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
}

impl Shortcut {
    /// A bare key.
    pub const fn key(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
        }
    }

    /// Ctrl (Cmd on macOS) + key.
    pub const fn ctrl(key: Key) -> Self {
        Self {
            key,
            ctrl: true,
            shift: false,
        }
    }

    /// Ctrl + Shift + key.
    pub const fn ctrl_shift(key: Key) -> Self {
        Self {
            key,
            ctrl: true,
            shift: true,
        }
    }

    /// Check a key press against this shortcut. Shift only matters for
    /// command shortcuts; bare character keys match either case.
    pub fn matches(&self, key: Key, modifiers: &Modifiers) -> bool {
        if key.normalized() != self.key.normalized() || modifiers.command() != self.ctrl {
            return false;
        }
        !self.ctrl || modifiers.shift == self.shift
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.shift {
            write!(f, "Shift+")?;
        }
        write!(f, "{}", self.key.label())
    }
}

/// Actions reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    AnnotateMode,
    PanMode,
    DeleteSelected,
    Cancel,
    Undo,
    Redo,
    SaveAndNext,
    Skip,
    PreviousImage,
    NextImage,
    FitView,
    ZoomIn,
    ZoomOut,
}

impl KeyAction {
    /// Human-readable action name.
    pub fn name(&self) -> &'static str {
        match self {
            KeyAction::AnnotateMode => "Annotate mode",
            KeyAction::PanMode => "Pan mode",
            KeyAction::DeleteSelected => "Delete selected",
            KeyAction::Cancel => "Cancel",
            KeyAction::Undo => "Undo",
            KeyAction::Redo => "Redo",
            KeyAction::SaveAndNext => "Save and next",
            KeyAction::Skip => "Skip image",
            KeyAction::PreviousImage => "Previous image",
            KeyAction::NextImage => "Next image",
            KeyAction::FitView => "Fit to view",
            KeyAction::ZoomIn => "Zoom in",
            KeyAction::ZoomOut => "Zoom out",
        }
    }
}

/// Keybinding configuration. Bindings missing from a stored config keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub annotate_mode: Shortcut,
    pub pan_mode: Shortcut,
    /// Key held for temporary panning in any mode
    pub temporary_pan: Key,
    pub delete: Vec<Shortcut>,
    pub cancel: Shortcut,
    pub undo: Shortcut,
    pub redo: Vec<Shortcut>,
    pub save_and_next: Shortcut,
    pub skip: Shortcut,
    pub previous_image: Shortcut,
    pub next_image: Shortcut,
    pub fit_view: Shortcut,
    pub zoom_in: Shortcut,
    pub zoom_out: Shortcut,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            annotate_mode: Shortcut::key(Key::Char('w')),
            pan_mode: Shortcut::key(Key::Char('q')),
            temporary_pan: Key::Space,
            delete: vec![Shortcut::key(Key::Delete), Shortcut::key(Key::Backspace)],
            cancel: Shortcut::key(Key::Escape),
            undo: Shortcut::ctrl(Key::Char('z')),
            redo: vec![
                Shortcut::ctrl(Key::Char('y')),
                Shortcut::ctrl_shift(Key::Char('z')),
            ],
            save_and_next: Shortcut::key(Key::Enter),
            skip: Shortcut::ctrl(Key::Enter),
            previous_image: Shortcut::key(Key::Left),
            next_image: Shortcut::key(Key::Right),
            fit_view: Shortcut::key(Key::Home),
            zoom_in: Shortcut::key(Key::Char('=')),
            zoom_out: Shortcut::key(Key::Char('-')),
        }
    }
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// All bindings in lookup order. Command shortcuts come first so that
    /// Ctrl+Shift+Z resolves to redo before anything else is considered.
    pub fn bindings(&self) -> Vec<(KeyAction, Shortcut)> {
        let mut all = Vec::with_capacity(16);
        for shortcut in &self.redo {
            all.push((KeyAction::Redo, *shortcut));
        }
        all.push((KeyAction::Undo, self.undo));
        all.push((KeyAction::Skip, self.skip));
        all.push((KeyAction::SaveAndNext, self.save_and_next));
        all.push((KeyAction::PreviousImage, self.previous_image));
        all.push((KeyAction::NextImage, self.next_image));
        all.push((KeyAction::AnnotateMode, self.annotate_mode));
        all.push((KeyAction::PanMode, self.pan_mode));
        for shortcut in &self.delete {
            all.push((KeyAction::DeleteSelected, *shortcut));
        }
        all.push((KeyAction::Cancel, self.cancel));
        all.push((KeyAction::FitView, self.fit_view));
        all.push((KeyAction::ZoomIn, self.zoom_in));
        all.push((KeyAction::ZoomOut, self.zoom_out));
        all
    }

    /// The action bound to a key press, if any.
    pub fn action_for(&self, key: Key, modifiers: &Modifiers) -> Option<KeyAction> {
        self.bindings()
            .into_iter()
            .find(|(_, shortcut)| shortcut.matches(key, modifiers))
            .map(|(action, _)| action)
    }

    /// Whether `key` is the temporary-pan key.
    pub fn is_temporary_pan(&self, key: Key) -> bool {
        key.normalized() == self.temporary_pan.normalized()
    }

    /// The category whose shortcut matches a bare key press. When several
    /// categories share a key, the lowest sort order wins.
    pub fn category_for_key<'a>(
        &self,
        key: Key,
        modifiers: &Modifiers,
        categories: &'a [Category],
    ) -> Option<&'a Category> {
        if modifiers.command() || modifiers.alt {
            return None;
        }
        let Key::Char(c) = key.normalized() else {
            return None;
        };
        categories
            .iter()
            .filter(|category| category.shortcut_key == Some(c))
            .min_by_key(|category| category.sort_order)
    }

    /// Shortcut problems in a category list: duplicates between categories
    /// and category keys shadowed by a reserved binding.
    pub fn conflicts(&self, categories: &[Category]) -> Vec<ShortcutConflict> {
        let mut conflicts = Vec::new();
        let mut sorted: Vec<&Category> = categories.iter().collect();
        sorted.sort_by_key(|category| category.sort_order);

        for (i, category) in sorted.iter().enumerate() {
            let Some(key) = category.shortcut_key else {
                continue;
            };

            if let Some(first) = sorted[..i]
                .iter()
                .find(|earlier| earlier.shortcut_key == Some(key))
            {
                conflicts.push(ShortcutConflict::Duplicate {
                    key,
                    kept: first.name.clone(),
                    shadowed: category.name.clone(),
                });
            }

            if let Some(action) = self.action_for(Key::Char(key), &Modifiers::default()) {
                conflicts.push(ShortcutConflict::Reserved {
                    key,
                    category: category.name.clone(),
                    action,
                });
            }
        }
        conflicts
    }
}

/// A category shortcut that cannot be used as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutConflict {
    /// Two categories share a key; the first in sort order keeps it.
    Duplicate {
        key: char,
        kept: String,
        shadowed: String,
    },
    /// A category key is already bound to an action.
    Reserved {
        key: char,
        category: String,
        action: KeyAction,
    },
}

impl fmt::Display for ShortcutConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortcutConflict::Duplicate {
                key,
                kept,
                shadowed,
            } => write!(
                f,
                "Shortcut '{}' is used by both '{}' and '{}'; '{}' keeps it",
                key, kept, shadowed, kept
            ),
            ShortcutConflict::Reserved {
                key,
                category,
                action,
            } => write!(
                f,
                "Shortcut '{}' of category '{}' is reserved for '{}'",
                key,
                category,
                action.name()
            ),
        }
    }
}
