//! Keyboard and mouse state collected from the SDL2 event queue each frame.

use std::collections::HashSet;

use glam::Vec2;
use sdl2::{keyboard::Keycode, mouse::MouseButton};

/// The current state of the keyboard.
#[derive(Default)]
pub struct KeyboardState {
    pub down: HashSet<Keycode>,
    pub pressed: HashSet<Keycode>,
    pub released: HashSet<Keycode>,
    pub text_input: String,
}

impl KeyboardState {
    /// Clears the per-frame sets; held keys persist.
    pub fn begin_frame(&mut self) {
        self.pressed.clear();
        self.released.clear();
        self.text_input.clear();
    }
}

/// The current state of the mouse.
#[derive(Default)]
pub struct MouseState {
    pub position: Vec2,
    pub delta: Vec2,
    pub down: HashSet<MouseButton>,
    pub pressed: HashSet<MouseButton>,
    pub released: HashSet<MouseButton>,
    pub scroll_delta: Vec2,
}

impl MouseState {
    /// Clears the per-frame sets and deltas; held buttons persist.
    pub fn begin_frame(&mut self) {
        self.delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
        self.pressed.clear();
        self.released.clear();
    }
}
