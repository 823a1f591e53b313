//! GPU resource lifecycle tests. These need a window and a real OpenGL
//! context, so they are gated behind the `integration-tests` feature:
//!
//! ```sh
//! cargo test --features integration-tests -- --test-threads=1
//! ```
#![cfg(feature = "integration-tests")]

use glam::uvec2;
use glow::HasContext;

use meshview::abs::{App, Framebuffer, Shader, ShaderProgram, Texture};
use meshview::model::{Material, MeshData};
use meshview::scene::Mesh;

fn assert_no_gl_error(gl: &glow::Context, stage: &str) {
    let error = unsafe { gl.get_error() };
    assert_eq!(error, glow::NO_ERROR, "GL error {:#x} after {}", error, stage);
}

// One test owns the whole context: SDL and GL contexts don't take kindly to
// being created from several test threads.
#[test]
fn gpu_resource_lifecycle() {
    let mut app = App::new("meshview-test", 320, 240, false).unwrap();
    let gl = app.gl.clone();
    app.event_pump.pump_events();

    // Texture: resize keeps the format triple, release is idempotent.
    let mut texture = Texture::with_size(
        &gl,
        uvec2(16, 16),
        glow::RGBA8 as i32,
        glow::RGBA,
        glow::UNSIGNED_BYTE,
    );
    assert_eq!(texture.resolution(), uvec2(16, 16));
    texture.resize(uvec2(32, 8));
    assert_eq!(texture.resolution(), uvec2(32, 8));
    assert_eq!(texture.internal_format(), glow::RGBA8 as i32);
    assert_eq!(texture.format(), glow::RGBA);
    assert_eq!(texture.ty(), glow::UNSIGNED_BYTE);
    texture.release();
    texture.release();
    assert_no_gl_error(&gl, "texture release");

    // Moving transfers the handle; the destination's old handle is released
    // exactly once, and binding a released texture is a harmless no-op.
    let source = Texture::new(&gl);
    let mut destination = Texture::new(&gl);
    destination.bind_to_unit(1);
    destination = source;
    destination.bind_to_unit(0);
    destination.release();
    destination.bind_to_unit(0);
    assert_no_gl_error(&gl, "texture move");

    // A texture constructed and immediately released must not fault.
    Texture::new(&gl).release();

    // A failed HDR decode is non-fatal and leaves the texture without image
    // data, format triple untouched.
    let mut hdr = Texture::new(&gl);
    hdr.load_hdr(std::path::Path::new("this-file-does-not-exist.hdr"));
    assert_eq!(hdr.resolution(), uvec2(0, 0));
    assert_eq!(hdr.ty(), glow::UNSIGNED_BYTE);
    hdr.release();
    assert_no_gl_error(&gl, "hdr failure path");

    // Mesh: counts reflect the input, release clears and is idempotent.
    let quad = MeshData::quad(2.0, Material::default());
    let mut mesh = Mesh::new(&gl, quad);
    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.index_count(), 6);
    assert_eq!(mesh.face_count(), 2);
    assert_no_gl_error(&gl, "mesh upload");

    // End to end: a flat-color quad draws its 6 indices with no texture
    // bound and no GL error.
    let vert = Shader::new(
        &gl,
        glow::VERTEX_SHADER,
        include_str!("../src/shaders/mesh/vert.glsl"),
    )
    .unwrap();
    let frag = Shader::new(
        &gl,
        glow::FRAGMENT_SHADER,
        include_str!("../src/shaders/mesh/frag.glsl"),
    )
    .unwrap();
    let shader = ShaderProgram::new(&gl, &[&vert, &frag]).unwrap();
    unsafe {
        gl.viewport(0, 0, 320, 240);
        gl.clear_color(0.0, 0.0, 0.0, 1.0);
        gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
    }
    shader.use_program();
    shader.set_uniform("model", glam::Mat4::IDENTITY);
    shader.set_uniform("view", glam::Mat4::IDENTITY);
    shader.set_uniform("projection", glam::Mat4::IDENTITY);
    shader.set_uniform("cam_pos", glam::Vec3::Z);
    shader.set_uniform("light_count", 0);
    mesh.draw(&shader, &[]);
    assert_no_gl_error(&gl, "quad draw");

    mesh.release();
    mesh.release();
    assert_eq!(mesh.vertex_count(), 0);
    // Drawing after release must not fault either.
    mesh.draw(&shader, &[]);
    assert_no_gl_error(&gl, "mesh release");

    // Framebuffers: color+depth and depth-only variants.
    let mut framebuffer = Framebuffer::new(&gl, 64, 64, true);
    assert!(framebuffer.texture().is_some());
    assert!(framebuffer.depth_texture().is_some());
    framebuffer.bind();
    Framebuffer::unbind(&gl);
    framebuffer.resize(128, 32);
    assert_eq!(
        framebuffer.texture().unwrap().resolution(),
        uvec2(128, 32)
    );
    framebuffer.release();
    framebuffer.release();

    let mut depth_fbo = Framebuffer::depth_only(&gl, 256, 256);
    assert!(depth_fbo.texture().is_none());
    assert!(depth_fbo.depth_texture().is_some());
    depth_fbo.bind();
    unsafe {
        gl.clear(glow::DEPTH_BUFFER_BIT);
    }
    Framebuffer::unbind(&gl);
    depth_fbo.release();
    assert_no_gl_error(&gl, "framebuffer lifecycle");
}
