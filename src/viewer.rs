//! The sandbox host loop.
//!
//! [`run`] owns the steady-state frame loop: poll input, begin a GUI frame,
//! let the [`Sandbox`] implementation draw its GUI, handle input and render,
//! then draw the overlay and present. All per-frame state travels through
//! [`FrameContext`] instead of ambient globals.

use std::sync::Arc;
use std::time::Instant;

use glow::HasContext;

use crate::abs::App;
use crate::gui::Gui;
use crate::input::{KeyboardState, MouseState};

/// Per-frame state handed to every [`Sandbox`] hook.
pub struct FrameContext<'a> {
    pub gl: &'a Arc<glow::Context>,
    pub keyboard: &'a KeyboardState,
    pub mouse: &'a MouseState,
    pub delta_time: f32,
    pub width: u32,
    pub height: u32,
    /// True when the GUI has keyboard focus; camera-style key handling
    /// should be suspended then.
    pub gui_wants_keyboard: bool,
    quit: bool,
}

impl FrameContext<'_> {
    /// Requests that the host loop terminates after this frame.
    pub fn request_quit(&mut self) {
        self.quit = true;
    }
}

/// The hooks a concrete viewer implements. Called once per frame, in order.
pub trait Sandbox {
    /// Called once, after the context is up but before the first frame.
    fn before_render(&mut self, _ctx: &mut FrameContext) {}

    /// Builds the GUI for this frame.
    fn draw_gui(&mut self, _ctx: &mut FrameContext, _gui: &mut Gui) {}

    /// Reacts to the polled input state.
    fn handle_input(&mut self, _ctx: &mut FrameContext) {}

    /// Issues the draw calls for this frame.
    fn render(&mut self, ctx: &mut FrameContext);
}

/// Drives the frame loop until the window requests close or the sandbox
/// requests quit. Releases the GUI's GPU resources before returning; the
/// window, GL context and SDL state are torn down when `app` is dropped, in
/// reverse order of acquisition.
pub fn run(app: &mut App, gui: &mut Gui, sandbox: &mut impl Sandbox) {
    unsafe {
        app.gl.enable(glow::DEPTH_TEST);
        app.gl.enable(glow::BLEND);
        app.gl
            .blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
    }

    let (mut width, mut height) = app.window.size();
    unsafe {
        app.gl.viewport(0, 0, width as i32, height as i32);
    }

    let mut keyboard = KeyboardState::default();
    let mut mouse = MouseState::default();

    {
        let mut ctx = FrameContext {
            gl: &app.gl,
            keyboard: &keyboard,
            mouse: &mouse,
            delta_time: 0.0,
            width,
            height,
            gui_wants_keyboard: false,
            quit: false,
        };
        sandbox.before_render(&mut ctx);
    }

    let mut last_frame_time = Instant::now();

    'running: loop {
        let now = Instant::now();
        let delta_time = now.duration_since(last_frame_time).as_secs_f32().min(2.0);
        last_frame_time = now;

        keyboard.begin_frame();
        mouse.begin_frame();

        for event in app.event_pump.poll_iter() {
            match event {
                sdl2::event::Event::Quit { .. } => break 'running,
                sdl2::event::Event::Window {
                    win_event: sdl2::event::WindowEvent::Resized(w, h),
                    ..
                } => {
                    width = w as u32;
                    height = h as u32;
                    unsafe {
                        app.gl.viewport(0, 0, w, h);
                    }
                    gui.resize(width, height);
                }
                sdl2::event::Event::MouseMotion {
                    x, y, xrel, yrel, ..
                } => {
                    mouse.position = glam::vec2(x as f32, y as f32);
                    mouse.delta = glam::vec2(xrel as f32, yrel as f32);
                }
                sdl2::event::Event::MouseWheel { x, y, .. } => {
                    mouse.scroll_delta = glam::vec2(x as f32, y as f32);
                }
                sdl2::event::Event::MouseButtonDown { mouse_btn, .. } => {
                    mouse.down.insert(mouse_btn);
                    mouse.pressed.insert(mouse_btn);
                }
                sdl2::event::Event::MouseButtonUp { mouse_btn, .. } => {
                    mouse.down.remove(&mouse_btn);
                    mouse.released.insert(mouse_btn);
                }
                sdl2::event::Event::KeyDown {
                    keycode: Some(keycode),
                    repeat: false,
                    ..
                } => {
                    keyboard.down.insert(keycode);
                    keyboard.pressed.insert(keycode);
                }
                sdl2::event::Event::KeyUp {
                    keycode: Some(keycode),
                    repeat: false,
                    ..
                } => {
                    keyboard.down.remove(&keycode);
                    keyboard.released.insert(keycode);
                }
                sdl2::event::Event::TextInput { text, .. } => {
                    keyboard.text_input.push_str(&text);
                }
                _ => {}
            }
        }

        let mut ctx = FrameContext {
            gl: &app.gl,
            keyboard: &keyboard,
            mouse: &mouse,
            delta_time,
            width,
            height,
            gui_wants_keyboard: false,
            quit: false,
        };

        gui.begin_frame(ctx.keyboard, ctx.mouse);
        sandbox.draw_gui(&mut ctx, gui);
        ctx.gui_wants_keyboard = gui.wants_keyboard();
        sandbox.handle_input(&mut ctx);
        sandbox.render(&mut ctx);
        gui.end_frame(&app.gl);

        app.window.gl_swap_window();

        if ctx.quit {
            break 'running;
        }
    }

    gui.release();
}
