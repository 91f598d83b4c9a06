//! Keyboard shortcut mapping.
//!
//! Maps `KeyboardEvent.key` + modifiers to editor actions. Lives in Rust so
//! the browser bridge and the CLI replay resolve keys the same way.

use crate::input::Modifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// Abandon the current gesture or pending label.
    Cancel,
    DeleteSelected,
    /// Accept the pending label prompt.
    ConfirmLabel,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    /// Insert the default box.
    AddAnnotation,
}

pub struct ShortcutMap;

impl ShortcutMap {
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        if modifiers.command() {
            return match key {
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" | "_" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ZoomReset),
                _ => None,
            };
        }

        match key {
            "Escape" => Some(ShortcutAction::Cancel),
            "Delete" | "Backspace" => Some(ShortcutAction::DeleteSelected),
            "Enter" => Some(ShortcutAction::ConfirmLabel),
            "a" | "A" if modifiers.alt => Some(ShortcutAction::AddAnnotation),
            _ => None,
        }
    }
}
