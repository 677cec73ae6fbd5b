//! Keyboard shortcuts for the labeling canvas.
//!
//! Keys are resolved into [`KeyAction`]s here; executing them is up to the
//! session (navigation, saving) or the canvas (deleting the selection).
//! Every shortcut is ignored while a text input has focus.

use serde::{Deserialize, Serialize};

use crate::constants::CLASS_HOTKEY_COUNT;

/// A key as reported by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    /// Digit key `0`-`9`.
    Digit(u8),
    /// Any printable character key (compared case-insensitively).
    Char(char),
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Delete,
    Backspace,
    Escape,
    Enter,
}

impl Key {
    /// Parse a DOM-style key name (`"ArrowLeft"`, `"Delete"`, `"d"`, `"3"`).
    pub fn from_name(name: &str) -> Option<Key> {
        let key = match name {
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "Delete" => Key::Delete,
            "Backspace" => Key::Backspace,
            "Escape" => Key::Escape,
            "Enter" => Key::Enter,
            _ => {
                let mut chars = name.chars();
                let c = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                match c.to_digit(10) {
                    Some(d) => Key::Digit(d as u8),
                    None => Key::Char(c),
                }
            }
        };
        Some(key)
    }

    fn matches(&self, other: &Key) -> bool {
        match (self, other) {
            (Key::Char(a), Key::Char(b)) => a.eq_ignore_ascii_case(b),
            _ => self == other,
        }
    }
}

/// Modifier key state accompanying a key or wheel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        shift: false,
    };

    /// Ctrl on Linux/Windows, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Make the class at this list position (0-based) active.
    SelectClass(usize),
    PreviousImage,
    NextImage,
    DeleteSelected,
    /// Persist the current image now.
    SaveCurrent,
}

/// Keybinding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBindings {
    /// Keys that go to the previous image
    pub previous_image: Vec<Key>,
    /// Keys that go to the next image
    pub next_image: Vec<Key>,
    /// Keys that delete the selected box
    pub delete_selected: Vec<Key>,
    /// Key that saves when combined with Ctrl/Cmd
    pub save: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            previous_image: vec![Key::Char('a'), Key::ArrowLeft],
            next_image: vec![Key::Char('d'), Key::ArrowRight],
            delete_selected: vec![Key::Delete, Key::Backspace],
            save: Key::Char('s'),
        }
    }
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a key press. Returns `None` for unbound keys and for any key
    /// while a text field has focus.
    pub fn action_for(
        &self,
        key: Key,
        modifiers: Modifiers,
        text_input_focused: bool,
    ) -> Option<KeyAction> {
        if text_input_focused {
            return None;
        }

        if modifiers.command() {
            return key.matches(&self.save).then_some(KeyAction::SaveCurrent);
        }

        if let Key::Digit(d) = key {
            let d = usize::from(d);
            if (1..=CLASS_HOTKEY_COUNT).contains(&d) {
                return Some(KeyAction::SelectClass(d - 1));
            }
            return None;
        }

        let bound = |keys: &[Key]| keys.iter().any(|k| k.matches(&key));
        if bound(&self.previous_image) {
            Some(KeyAction::PreviousImage)
        } else if bound(&self.next_image) {
            Some(KeyAction::NextImage)
        } else if bound(&self.delete_selected) {
            Some(KeyAction::DeleteSelected)
        } else {
            None
        }
    }
}
