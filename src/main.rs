use std::path::{Path, PathBuf};

use glam::{Mat4, UVec2, Vec3, uvec2, vec2};
use glow::HasContext;
use sdl2::keyboard::Keycode;
use sdl2::mouse::MouseButton;

use meshview::abs::{App, Framebuffer, Shader, ShaderProgram};
use meshview::camera::{Camera, CameraMovement};
use meshview::config::ViewerConfig;
use meshview::gui::Gui;
use meshview::model;
use meshview::scene::{PointLight, Scene};
use meshview::viewer::{self, FrameContext, Sandbox};

macro_rules! shader_program {
    ($name:ident, $gl:expr) => {{
        let vert = Shader::new(
            &$gl,
            glow::VERTEX_SHADER,
            include_str!(concat!("shaders/", stringify!($name), "/vert.glsl")),
        )?;
        let frag = Shader::new(
            &$gl,
            glow::FRAGMENT_SHADER,
            include_str!(concat!("shaders/", stringify!($name), "/frag.glsl")),
        )?;
        ShaderProgram::new(&$gl, &[&vert, &frag])?
    }};
}

/// A model viewer with an orbiting point light and a (work in progress)
/// shadow map depth pass.
struct ShadowMapViewer {
    scene: Scene,
    mesh_shader: ShaderProgram,
    depth_fbo: Framebuffer,
    depth_map_size: UVec2,
    model_path: String,
    status: String,
}

impl Sandbox for ShadowMapViewer {
    fn before_render(&mut self, _ctx: &mut FrameContext) {
        log::info!("controls: WASD to move, right-drag to look, escape to quit");
    }

    fn draw_gui(&mut self, ctx: &mut FrameContext, gui: &mut Gui) {
        gui.begin_window("viewer", vec2(10.0, 10.0), vec2(380.0, 250.0));

        gui.text_field("model path", &mut self.model_path);
        if gui.button("Load Model") {
            match model::load_obj(Path::new(&self.model_path)) {
                Ok(model) => {
                    self.scene.set_model(ctx.gl, model);
                    self.status = format!("loaded {}", self.model_path);
                }
                Err(e) => {
                    log::error!("failed to load {}: {}", self.model_path, e);
                    self.status = format!("load failed: {}", e);
                }
            }
        }

        let camera = &mut self.scene.camera;
        if gui.input_f32("FOV", &mut camera.fov, 5.0) {
            camera.fov = camera.fov.clamp(10.0, 120.0);
        }
        gui.input_f32("Movement Speed", &mut camera.movement_speed, 1.0);
        gui.input_f32("Look Speed", &mut camera.look_speed, 0.025);
        if gui.button("Reset Camera") {
            camera.reset();
        }

        if !self.status.is_empty() {
            gui.label(&self.status);
        }
    }

    fn handle_input(&mut self, ctx: &mut FrameContext) {
        if ctx.keyboard.pressed.contains(&Keycode::Escape) {
            ctx.request_quit();
        }

        let camera = &mut self.scene.camera;
        if !ctx.gui_wants_keyboard {
            let dt = ctx.delta_time;
            let moves = [
                (Keycode::W, CameraMovement::Forward),
                (Keycode::S, CameraMovement::Backward),
                (Keycode::A, CameraMovement::Left),
                (Keycode::D, CameraMovement::Right),
                (Keycode::E, CameraMovement::Up),
                (Keycode::Q, CameraMovement::Down),
            ];
            for (key, movement) in moves {
                if ctx.keyboard.down.contains(&key) {
                    camera.advance(movement, dt);
                }
            }
        }

        if ctx.mouse.down.contains(&MouseButton::Right) {
            camera.look_around(ctx.mouse.delta.x, ctx.mouse.delta.y);
        }
    }

    fn render(&mut self, ctx: &mut FrameContext) {
        self.scene.update(ctx.delta_time);

        let gl = ctx.gl;

        // Depth pass into the shadow map target.
        // TODO: draw the scene into the depth map with a light-space
        // transform; the pass currently only clears the target, so the map
        // stays empty.
        unsafe {
            gl.viewport(0, 0, self.depth_map_size.x as i32, self.depth_map_size.y as i32);
        }
        self.depth_fbo.bind();
        unsafe {
            gl.clear(glow::DEPTH_BUFFER_BIT);
        }
        Framebuffer::unbind(gl);

        // Main color pass.
        unsafe {
            gl.viewport(0, 0, ctx.width as i32, ctx.height as i32);
            gl.clear_color(0.08, 0.08, 0.1, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }

        let camera = &self.scene.camera;
        self.mesh_shader.use_program();
        self.mesh_shader.set_uniform("model", Mat4::IDENTITY);
        self.mesh_shader.set_uniform("view", camera.view_matrix());
        self.mesh_shader.set_uniform(
            "projection",
            camera.projection_matrix(ctx.width, ctx.height),
        );
        self.mesh_shader.set_uniform("cam_pos", camera.position);

        self.scene.draw(&self.mesh_shader);
    }
}

fn run_viewer(config: &ViewerConfig) -> Result<(), String> {
    let mut app = App::new(
        "meshview",
        config.window_width,
        config.window_height,
        config.fullscreen,
    )?;
    if let Err(e) = app.set_vsync(config.vsync) {
        log::warn!("could not set swap interval: {}", e);
    }

    let (width, height) = app.window.size();
    let mut gui = Gui::new(&app.gl, width, height)?;

    let mesh_shader = shader_program!(mesh, app.gl);

    let depth_fbo = Framebuffer::depth_only(
        &app.gl,
        config.depth_map_width as i32,
        config.depth_map_height as i32,
    );

    let mut camera = Camera::new();
    camera.fov = config.fov;
    camera.movement_speed = config.movement_speed;
    camera.look_speed = config.look_speed;

    let mut scene = Scene::new(camera);
    scene.add_point_light(PointLight {
        position: Vec3::splat(10000.0),
        color: Vec3::ONE,
        intensity: 20000.0,
    });

    let mut sandbox = ShadowMapViewer {
        scene,
        mesh_shader,
        depth_fbo,
        depth_map_size: uvec2(config.depth_map_width, config.depth_map_height),
        model_path: config.model_path.clone(),
        status: String::new(),
    };

    viewer::run(&mut app, &mut gui, &mut sandbox);

    sandbox.scene.release();
    sandbox.depth_fbo.release();
    Ok(())
}

fn main() {
    if let Err(e) = meshview::init_logger() {
        eprintln!("failed to initialize logging: {}", e);
    }

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ViewerConfig::load(config_path.as_deref());

    if let Err(e) = run_viewer(&config) {
        log::error!("fatal: {}", e);
        std::process::exit(1);
    }
}
