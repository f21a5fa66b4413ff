//! Pointer and keyboard input.
//!
//! winit reports the cursor relative to the window, but the pet lives in
//! screen coordinates and the window itself follows the pet around. Input is
//! translated into screen space with the window origin we last set.

use glam::Vec2;
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

/// What the pet should hear about
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerAction {
    Press(Vec2),
    Move(Vec2),
    Release,
}

#[derive(Debug, Default)]
pub struct InputState {
    /// Cursor relative to the window (physical pixels)
    pub cursor: Vec2,
    pub mouse_down: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor_on_screen(&self, window_origin: Vec2) -> Vec2 {
        window_origin + self.cursor
    }

    pub fn cursor_moved(&mut self, local: Vec2, window_origin: Vec2) -> Option<PointerAction> {
        self.cursor = local;
        self.mouse_down
            .then(|| PointerAction::Move(self.cursor_on_screen(window_origin)))
    }

    /// Only the left button matters
    pub fn mouse_input(&mut self, button: MouseButton, state: ElementState, window_origin: Vec2) -> Option<PointerAction> {
        if button != MouseButton::Left {
            return None;
        }
        match state {
            ElementState::Pressed if !self.mouse_down => {
                self.mouse_down = true;
                Some(PointerAction::Press(self.cursor_on_screen(window_origin)))
            }
            ElementState::Released if self.mouse_down => {
                self.mouse_down = false;
                Some(PointerAction::Release)
            }
            _ => None,
        }
    }
}

pub fn is_quit_key(key: KeyCode) -> bool {
    key == KeyCode::Escape
}
