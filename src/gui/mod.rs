//! Immediate-mode GUI overlay.
//!
//! Widgets are invoked synchronously between [`Gui::begin_frame`] and
//! [`Gui::end_frame`]; all drawing is deferred and happens in one batched
//! pass at frame end, on top of the 3D scene.

pub mod font;
pub mod renderer;

use std::sync::Arc;

use fxhash::FxHashMap;
use glam::{Mat4, Vec2, Vec4, vec2, vec4};
use image::GenericImageView;
use sdl2::keyboard::Keycode;
use sdl2::mouse::MouseButton;

use crate::abs::{Shader, ShaderProgram, Texture};
use crate::input::{KeyboardState, MouseState};
use font::BitmapFont;
use renderer::{DrawCommand, UiRenderMode, UiRenderer};

const FONT_SIZE: f32 = 16.0;
const PADDING: f32 = 8.0;
const SPACING: f32 = 6.0;
const WIDGET_HEIGHT: f32 = FONT_SIZE + 8.0;

const PANEL_BG: Vec4 = vec4(0.08, 0.08, 0.1, 0.92);
const WIDGET_BG: Vec4 = vec4(0.2, 0.2, 0.24, 1.0);
const WIDGET_BG_HOVER: Vec4 = vec4(0.32, 0.32, 0.38, 1.0);
const TEXT_COLOR: Vec4 = vec4(1.0, 1.0, 1.0, 1.0);
const PLACEHOLDER_COLOR: Vec4 = vec4(0.6, 0.6, 0.6, 1.0);

/// Snapshot of the input state a GUI frame works with.
#[derive(Default)]
struct FrameInput {
    mouse_pos: Vec2,
    mouse_pressed: bool,
    text_input: String,
    backspace: bool,
    delete: bool,
    left: bool,
    right: bool,
}

/// Editing state persisted across frames for stateful widgets.
#[derive(Default, Clone, Copy)]
struct TextFieldState {
    cursor: usize,
}

/// The immediate-mode GUI context: glyph atlas, draw batcher and widget
/// state.
pub struct Gui {
    renderer: UiRenderer,
    font: BitmapFont,
    font_texture: Texture,
    state: FxHashMap<u64, TextFieldState>,
    focus: Option<u64>,
    frame: FrameInput,
    cursor: Vec2,
    content_width: f32,
}

impl Gui {
    /// Compiles the UI shader and uploads the embedded glyph atlas. Failure
    /// here is fatal, like any other context setup failure.
    pub fn new(gl: &Arc<glow::Context>, width: u32, height: u32) -> Result<Self, String> {
        let vert = Shader::new(
            gl,
            glow::VERTEX_SHADER,
            include_str!("../shaders/ui/vert.glsl"),
        )?;
        let frag = Shader::new(
            gl,
            glow::FRAGMENT_SHADER,
            include_str!("../shaders/ui/frag.glsl"),
        )?;
        let shader_program = ShaderProgram::new(gl, &[&vert, &frag])?;

        let atlas = image::load_from_memory(include_bytes!("../assets/font.png"))
            .map_err(|e| e.to_string())?;
        let (atlas_width, atlas_height) = atlas.dimensions();
        let font = BitmapFont::new(atlas_width, atlas_height, ' ', 16, 8, 8);
        let font_texture = Texture::from_image(gl, &atlas);

        let renderer = UiRenderer::new(gl, shader_program, Self::projection(width, height));

        Ok(Self {
            renderer,
            font,
            font_texture,
            state: FxHashMap::default(),
            focus: None,
            frame: FrameInput::default(),
            cursor: Vec2::ZERO,
            content_width: 0.0,
        })
    }

    fn projection(width: u32, height: u32) -> Mat4 {
        Mat4::orthographic_rh_gl(0.0, width as f32, height as f32, 0.0, -1.0, 1.0)
    }

    /// Updates the overlay projection after a framebuffer resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.projection_matrix = Self::projection(width, height);
    }

    /// Starts a new GUI frame from the current input state.
    pub fn begin_frame(&mut self, keyboard: &KeyboardState, mouse: &MouseState) {
        self.frame = FrameInput {
            mouse_pos: mouse.position,
            mouse_pressed: mouse.pressed.contains(&MouseButton::Left),
            text_input: keyboard.text_input.clone(),
            backspace: keyboard.pressed.contains(&Keycode::Backspace),
            delete: keyboard.pressed.contains(&Keycode::Delete),
            left: keyboard.pressed.contains(&Keycode::Left),
            right: keyboard.pressed.contains(&Keycode::Right),
        };
    }

    /// Draws the queued overlay. Call after the 3D passes so the GUI ends up
    /// on top; depth testing is suspended for the duration.
    pub fn end_frame(&mut self, gl: &glow::Context) {
        use glow::HasContext;
        unsafe {
            gl.disable(glow::DEPTH_TEST);
        }
        self.renderer.draw(&self.font_texture);
        unsafe {
            gl.enable(glow::DEPTH_TEST);
        }
    }

    /// True when a text field has keyboard focus, in which case camera-style
    /// key handling should be suspended.
    pub fn wants_keyboard(&self) -> bool {
        self.focus.is_some()
    }

    /// Starts a panel at the given position and size and places the layout
    /// cursor inside it.
    pub fn begin_window(&mut self, title: &str, position: Vec2, size: Vec2) {
        self.push_rect([position, position + size], PANEL_BG);
        self.draw_text(title, position + vec2(PADDING, PADDING), TEXT_COLOR);
        self.cursor = position + vec2(PADDING, PADDING + FONT_SIZE + SPACING);
        self.content_width = size.x - 2.0 * PADDING;
    }

    /// A line of text.
    pub fn label(&mut self, text: &str) {
        let metrics = self.font.text_metrics(text, FONT_SIZE);
        self.draw_text(text, self.cursor, TEXT_COLOR);
        self.cursor.y += metrics.y + SPACING;
    }

    /// A clickable button. Returns true on the frame it is clicked.
    pub fn button(&mut self, text: &str) -> bool {
        let metrics = self.font.text_metrics(text, FONT_SIZE);
        let size = vec2(metrics.x + 2.0 * PADDING, WIDGET_HEIGHT);
        let rect = [self.cursor, self.cursor + size];
        let hovered = Self::contains(rect, self.frame.mouse_pos);
        let clicked = hovered && self.frame.mouse_pressed;

        self.push_rect(rect, if hovered { WIDGET_BG_HOVER } else { WIDGET_BG });
        self.draw_text(
            text,
            self.cursor + vec2(PADDING, (WIDGET_HEIGHT - FONT_SIZE) * 0.5),
            TEXT_COLOR,
        );
        self.cursor.y += WIDGET_HEIGHT + SPACING;
        clicked
    }

    /// A single-line text field. Returns true when the text changed.
    pub fn text_field(&mut self, label: &str, text: &mut String) -> bool {
        let id = fxhash::hash64(label);
        let rect = [
            self.cursor,
            self.cursor + vec2(self.content_width, WIDGET_HEIGHT),
        ];

        if self.frame.mouse_pressed {
            if Self::contains(rect, self.frame.mouse_pos) {
                self.focus = Some(id);
                let state = self.state.entry(id).or_default();
                state.cursor = text.len();
            } else if self.focus == Some(id) {
                self.focus = None;
            }
        }

        let focused = self.focus == Some(id);
        let mut changed = false;
        if focused {
            let state = self.state.entry(id).or_default();
            state.cursor = state.cursor.min(text.len());
            while !text.is_char_boundary(state.cursor) {
                state.cursor -= 1;
            }
            if !self.frame.text_input.is_empty() {
                text.insert_str(state.cursor, &self.frame.text_input);
                state.cursor += self.frame.text_input.len();
                changed = true;
            }
            if self.frame.backspace && state.cursor > 0 {
                let previous = Self::prev_char_boundary(text, state.cursor);
                text.remove(previous);
                state.cursor = previous;
                changed = true;
            }
            if self.frame.delete && state.cursor < text.len() {
                text.remove(state.cursor);
                changed = true;
            }
            if self.frame.left && state.cursor > 0 {
                state.cursor = Self::prev_char_boundary(text, state.cursor);
            }
            if self.frame.right && state.cursor < text.len() {
                state.cursor = Self::next_char_boundary(text, state.cursor);
            }
        }

        self.push_rect(rect, if focused { WIDGET_BG_HOVER } else { WIDGET_BG });

        // Trim the front of long text so the end stays visible.
        let inner_width = self.content_width - 2.0 * PADDING;
        let mut shown: &str = text;
        while self.font.text_metrics(shown, FONT_SIZE).x > inner_width && !shown.is_empty() {
            let mut chars = shown.chars();
            chars.next();
            shown = chars.as_str();
        }
        let trimmed = shown.len() < text.len();
        let shown = shown.to_string();

        let text_pos = self.cursor + vec2(PADDING, (WIDGET_HEIGHT - FONT_SIZE) * 0.5);
        if shown.is_empty() && !focused {
            self.draw_text(label, text_pos, PLACEHOLDER_COLOR);
        } else {
            self.draw_text(&shown, text_pos, TEXT_COLOR);
        }

        if focused {
            let state = self.state.get(&id).copied().unwrap_or_default();
            let mut visible_cursor = if trimmed {
                shown.len()
            } else {
                state.cursor.min(shown.len())
            };
            while !shown.is_char_boundary(visible_cursor) {
                visible_cursor -= 1;
            }
            let caret_x = text_pos.x + self.font.text_metrics(&shown[..visible_cursor], FONT_SIZE).x;
            self.push_rect(
                [
                    vec2(caret_x, text_pos.y),
                    vec2(caret_x + 2.0, text_pos.y + FONT_SIZE),
                ],
                TEXT_COLOR,
            );
        }

        self.cursor.y += WIDGET_HEIGHT + SPACING;
        changed
    }

    /// A float input with decrement/increment buttons. Returns true when the
    /// value changed.
    pub fn input_f32(&mut self, label: &str, value: &mut f32, step: f32) -> bool {
        let row_origin = self.cursor;
        let button_size = vec2(WIDGET_HEIGHT, WIDGET_HEIGHT);
        let mut changed = false;

        let mut square_button = |gui: &mut Self, text: &str, origin: Vec2| -> bool {
            let rect = [origin, origin + button_size];
            let hovered = Self::contains(rect, gui.frame.mouse_pos);
            gui.push_rect(rect, if hovered { WIDGET_BG_HOVER } else { WIDGET_BG });
            let metrics = gui.font.text_metrics(text, FONT_SIZE);
            gui.draw_text(
                text,
                origin + (button_size - metrics) * 0.5,
                TEXT_COLOR,
            );
            hovered && gui.frame.mouse_pressed
        };

        if square_button(self, "-", row_origin) {
            *value -= step;
            changed = true;
        }

        let value_text = format!("{:.2}", value);
        let value_width = self.font.text_metrics(&value_text, FONT_SIZE).x.max(60.0);
        self.draw_text(
            &value_text,
            row_origin
                + vec2(
                    button_size.x + PADDING,
                    (WIDGET_HEIGHT - FONT_SIZE) * 0.5,
                ),
            TEXT_COLOR,
        );

        let plus_x = row_origin.x + button_size.x + PADDING + value_width + PADDING;
        if square_button(self, "+", vec2(plus_x, row_origin.y)) {
            *value += step;
            changed = true;
        }

        self.draw_text(
            label,
            vec2(
                plus_x + button_size.x + PADDING,
                row_origin.y + (WIDGET_HEIGHT - FONT_SIZE) * 0.5,
            ),
            TEXT_COLOR,
        );

        self.cursor.y += WIDGET_HEIGHT + SPACING;
        changed
    }

    fn prev_char_boundary(text: &str, index: usize) -> usize {
        let mut i = index.saturating_sub(1);
        while i > 0 && !text.is_char_boundary(i) {
            i -= 1;
        }
        i
    }

    fn next_char_boundary(text: &str, index: usize) -> usize {
        let mut i = (index + 1).min(text.len());
        while i < text.len() && !text.is_char_boundary(i) {
            i += 1;
        }
        i
    }

    fn contains(rect: [Vec2; 2], point: Vec2) -> bool {
        point.x >= rect[0].x && point.x <= rect[1].x && point.y >= rect[0].y && point.y <= rect[1].y
    }

    fn push_rect(&mut self, rect: [Vec2; 2], color: Vec4) {
        self.renderer.add_command(DrawCommand {
            rect,
            uv_rect: [Vec2::ZERO, Vec2::ONE],
            mode: UiRenderMode::Solid(color),
        });
    }

    fn draw_text(&mut self, text: &str, position: Vec2, color: Vec4) {
        for (rect, uv_rect) in self.font.layout(text, position, FONT_SIZE) {
            self.renderer.add_command(DrawCommand {
                rect,
                uv_rect,
                mode: UiRenderMode::Glyph(color),
            });
        }
    }

    /// Releases the GPU resources owned by the overlay. Safe to call more
    /// than once.
    pub fn release(&mut self) {
        self.renderer.release();
        self.font_texture.release();
    }
}
