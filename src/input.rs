#[cfg(target_arch = "wasm32")]
pub mod wasm;

use serde::{Deserialize, Serialize};

/// Pointer button, numbered the way DOM `MouseEvent.button` numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Auxiliary,
    Secondary,
    Other(u16),
}

impl PointerButton {
    pub fn from_index(index: u16) -> Self {
        match index {
            0 => Self::Primary,
            1 => Self::Auxiliary,
            2 => Self::Secondary,
            other => Self::Other(other),
        }
    }
}

/// Keys the sketch reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Space,
    Tab,
    Up,
    Down,
    PageUp,
    PageDown,
    Escape,
}

impl KeyCode {
    /// Parses DOM `KeyboardEvent.key` values and their short aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let key = match name {
            " " | "Space" | "Spacebar" => Self::Space,
            "Tab" => Self::Tab,
            "ArrowUp" | "Up" => Self::Up,
            "ArrowDown" | "Down" => Self::Down,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            "Escape" | "Esc" => Self::Escape,
            _ => return None,
        };
        Some(key)
    }
}

/// Action bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePlayback,
    SelectNextSlider,
    /// Move the selected slider by this many steps.
    Nudge(i32),
    Quit,
}

pub fn command_for_key(key: KeyCode) -> Command {
    match key {
        KeyCode::Space => Command::TogglePlayback,
        KeyCode::Tab => Command::SelectNextSlider,
        KeyCode::Up => Command::Nudge(1),
        KeyCode::Down => Command::Nudge(-1),
        KeyCode::PageUp => Command::Nudge(10),
        KeyCode::PageDown => Command::Nudge(-10),
        KeyCode::Escape => Command::Quit,
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn map_winit_key(key: winit::keyboard::KeyCode) -> Option<KeyCode> {
    use winit::keyboard::KeyCode as Key;
    Some(match key {
        Key::Space => KeyCode::Space,
        Key::Tab => KeyCode::Tab,
        Key::ArrowUp => KeyCode::Up,
        Key::ArrowDown => KeyCode::Down,
        Key::PageUp => KeyCode::PageUp,
        Key::PageDown => KeyCode::PageDown,
        Key::Escape => KeyCode::Escape,
        _ => return None,
    })
}

#[cfg(not(target_arch = "wasm32"))]
pub fn map_winit_button(button: winit::event::MouseButton) -> PointerButton {
    use winit::event::MouseButton;
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Middle => PointerButton::Auxiliary,
        MouseButton::Right => PointerButton::Secondary,
        MouseButton::Back => PointerButton::Other(3),
        MouseButton::Forward => PointerButton::Other(4),
        MouseButton::Other(value) => PointerButton::Other(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dom_key_names() {
        assert_eq!(KeyCode::from_name(" "), Some(KeyCode::Space));
        assert_eq!(KeyCode::from_name("ArrowUp"), Some(KeyCode::Up));
        assert_eq!(KeyCode::from_name("Esc"), Some(KeyCode::Escape));
        assert_eq!(KeyCode::from_name("q"), None);
    }

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(command_for_key(KeyCode::Space), Command::TogglePlayback);
        assert_eq!(command_for_key(KeyCode::PageDown), Command::Nudge(-10));
    }

    #[test]
    fn button_indices_follow_dom_numbering() {
        assert_eq!(PointerButton::from_index(0), PointerButton::Primary);
        assert_eq!(PointerButton::from_index(2), PointerButton::Secondary);
        assert_eq!(PointerButton::from_index(7), PointerButton::Other(7));
    }
}
