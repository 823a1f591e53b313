//! Batched 2D rendering for the GUI overlay.
//!
//! Widgets queue [`DrawCommand`]s during the frame; the whole overlay is
//! drawn in one pass at frame end, batching consecutive commands with the
//! same mode into a single mesh.

use std::sync::Arc;

use glam::{Mat4, Vec2, Vec4};
use glow::HasContext;

use crate::abs::{Mesh, ShaderProgram, Texture, Vertex};

/// Vertex structure for UI rendering.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct UiVertex {
    pub position: Vec2,
    pub uv: Vec2,
}

impl Vertex for UiVertex {
    fn vertex_attribs(gl: &glow::Context) {
        let stride = std::mem::size_of::<UiVertex>() as i32;
        unsafe {
            gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(
                1,
                2,
                glow::FLOAT,
                false,
                stride,
                std::mem::size_of::<Vec2>() as i32,
            );
            gl.enable_vertex_attrib_array(1);
        }
    }
}

/// The rendering mode for a UI element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UiRenderMode {
    /// A textured quad sampling the glyph atlas, tinted by the color.
    Glyph(Vec4),
    /// A solid-colored quad.
    Solid(Vec4),
}

/// A draw command for rendering a UI element.
#[derive(Clone, Copy, Debug)]
pub struct DrawCommand {
    pub rect: [Vec2; 2],
    pub uv_rect: [Vec2; 2],
    pub mode: UiRenderMode,
}

/// The UI renderer for rendering 2D elements on the screen.
pub struct UiRenderer {
    gl: Arc<glow::Context>,
    shader_program: ShaderProgram,
    pub projection_matrix: Mat4,
    commands: Vec<DrawCommand>,
    mesh: Option<Mesh>,
    vertices: Vec<UiVertex>,
    indices: Vec<u32>,
}

impl UiRenderer {
    /// Creates a new UI renderer.
    pub fn new(
        gl: &Arc<glow::Context>,
        shader_program: ShaderProgram,
        projection_matrix: Mat4,
    ) -> Self {
        Self {
            gl: Arc::clone(gl),
            shader_program,
            projection_matrix,
            commands: Vec::new(),
            mesh: None,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Queues a draw command for this frame.
    pub fn add_command(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    /// Draws all queued commands and clears the queue. The glyph atlas must
    /// be passed in since glyph batches sample from it on unit 0.
    pub fn draw(&mut self, atlas: &Texture) {
        let commands = std::mem::take(&mut self.commands);
        let mut batch_start = 0;
        while batch_start < commands.len() {
            let mode = commands[batch_start].mode;
            let mut batch_end = batch_start + 1;
            while batch_end < commands.len() && commands[batch_end].mode == mode {
                batch_end += 1;
            }
            self.draw_batch(&commands[batch_start..batch_end], mode, atlas);
            batch_start = batch_end;
        }
    }

    fn draw_batch(&mut self, commands: &[DrawCommand], mode: UiRenderMode, atlas: &Texture) {
        self.vertices.clear();
        self.indices.clear();
        for command in commands {
            let base_index = self.vertices.len() as u32;
            let [min, max] = command.rect;
            let [uv_min, uv_max] = command.uv_rect;

            self.vertices.push(UiVertex {
                position: Vec2::new(max.x, min.y),
                uv: Vec2::new(uv_max.x, uv_min.y),
            });
            self.vertices.push(UiVertex {
                position: Vec2::new(min.x, min.y),
                uv: Vec2::new(uv_min.x, uv_min.y),
            });
            self.vertices.push(UiVertex {
                position: Vec2::new(min.x, max.y),
                uv: Vec2::new(uv_min.x, uv_max.y),
            });
            self.vertices.push(UiVertex {
                position: Vec2::new(max.x, max.y),
                uv: Vec2::new(uv_max.x, uv_max.y),
            });
            self.indices.extend_from_slice(&[
                base_index,
                base_index + 1,
                base_index + 2,
                base_index,
                base_index + 2,
                base_index + 3,
            ]);
        }

        if self.vertices.is_empty() {
            return;
        }

        match &mut self.mesh {
            Some(mesh) => mesh.update(&self.vertices, &self.indices),
            None => {
                self.mesh = Some(Mesh::new(
                    &self.gl,
                    &self.vertices,
                    &self.indices,
                    glow::TRIANGLES,
                ));
            }
        }

        self.shader_program.use_program();
        self.shader_program
            .set_uniform("u_projection", self.projection_matrix);
        match mode {
            UiRenderMode::Glyph(color) => {
                atlas.bind_to_unit(0);
                self.shader_program.set_uniform("u_tex", 0);
                self.shader_program.set_uniform("u_color", color);
                self.shader_program.set_uniform("u_solid", false);
            }
            UiRenderMode::Solid(color) => {
                self.shader_program.set_uniform("u_color", color);
                self.shader_program.set_uniform("u_solid", true);
            }
        }

        if let Some(mesh) = &self.mesh {
            mesh.draw();
        }
    }

    /// Releases the batch mesh. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(mut mesh) = self.mesh.take() {
            mesh.release();
        }
    }
}
