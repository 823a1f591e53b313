//! Module to work with OpenGL framebuffers.
//!
//! This module provides functionality to create, bind, and manage OpenGL
//! framebuffers for off-screen rendering, including depth-only targets for
//! shadow mapping.

use std::sync::Arc;

use glam::uvec2;
use glow::HasContext;

use crate::abs::Texture;

/// Represents an OpenGL framebuffer with a color attachment and an optional
/// depth attachment, or a depth-only attachment for depth passes.
pub struct Framebuffer {
    gl: Arc<glow::Context>,
    fbo: Option<glow::Framebuffer>,
    color_tex: Option<Texture>,
    depth_tex: Option<Texture>,
}

impl Framebuffer {
    /// Creates a new framebuffer with an RGBA8 color attachment and,
    /// optionally, a 24-bit depth attachment.
    pub fn new(gl: &Arc<glow::Context>, width: i32, height: i32, use_depth: bool) -> Self {
        unsafe {
            let fbo = gl.create_framebuffer().unwrap();
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));

            let color_tex = {
                let tex = gl.create_texture().unwrap();
                gl.bind_texture(glow::TEXTURE_2D, Some(tex));

                gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    glow::RGBA8 as i32,
                    width,
                    height,
                    0,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    glow::PixelUnpackData::Slice(None),
                );

                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MIN_FILTER,
                    glow::LINEAR as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MAG_FILTER,
                    glow::LINEAR as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_S,
                    glow::CLAMP_TO_EDGE as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_T,
                    glow::CLAMP_TO_EDGE as i32,
                );

                gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    glow::COLOR_ATTACHMENT0,
                    glow::TEXTURE_2D,
                    Some(tex),
                    0,
                );

                gl.bind_texture(glow::TEXTURE_2D, None);
                Texture {
                    gl: gl.clone(),
                    id: Some(tex),
                    resolution: uvec2(width as u32, height as u32),
                    internal_format: glow::RGBA8 as i32,
                    format: glow::RGBA,
                    ty: glow::UNSIGNED_BYTE,
                }
            };

            let depth_tex = if use_depth {
                Some(Self::create_depth_texture(gl, width, height))
            } else {
                None
            };

            assert!(
                gl.check_framebuffer_status(glow::FRAMEBUFFER) == glow::FRAMEBUFFER_COMPLETE,
                "Framebuffer incomplete"
            );

            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            Self {
                gl: gl.clone(),
                fbo: Some(fbo),
                color_tex: Some(color_tex),
                depth_tex,
            }
        }
    }

    /// Creates a depth-only framebuffer, e.g. a shadow map target. The draw
    /// and read buffers are disabled since there is no color attachment.
    pub fn depth_only(gl: &Arc<glow::Context>, width: i32, height: i32) -> Self {
        unsafe {
            let fbo = gl.create_framebuffer().unwrap();
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));

            let depth_tex = Self::create_depth_texture(gl, width, height);

            gl.draw_buffers(&[glow::NONE]);
            gl.read_buffer(glow::NONE);

            assert!(
                gl.check_framebuffer_status(glow::FRAMEBUFFER) == glow::FRAMEBUFFER_COMPLETE,
                "Framebuffer incomplete"
            );

            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            Self {
                gl: gl.clone(),
                fbo: Some(fbo),
                color_tex: None,
                depth_tex: Some(depth_tex),
            }
        }
    }

    unsafe fn create_depth_texture(gl: &Arc<glow::Context>, width: i32, height: i32) -> Texture {
        unsafe {
            let tex = gl.create_texture().unwrap();
            gl.bind_texture(glow::TEXTURE_2D, Some(tex));

            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::DEPTH_COMPONENT24 as i32,
                width,
                height,
                0,
                glow::DEPTH_COMPONENT,
                glow::UNSIGNED_INT,
                glow::PixelUnpackData::Slice(None),
            );

            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::NEAREST as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::NEAREST as i32,
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);

            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::TEXTURE_2D,
                Some(tex),
                0,
            );

            gl.bind_texture(glow::TEXTURE_2D, None);
            Texture {
                gl: gl.clone(),
                id: Some(tex),
                resolution: uvec2(width as u32, height as u32),
                internal_format: glow::DEPTH_COMPONENT24 as i32,
                format: glow::DEPTH_COMPONENT,
                ty: glow::UNSIGNED_INT,
            }
        }
    }

    /// Binds the framebuffer for rendering.
    pub fn bind(&self) {
        let Some(fbo) = self.fbo else {
            log::warn!("bind called on a released framebuffer");
            return;
        };
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
        }
    }

    /// Unbinds the framebuffer, reverting to the default framebuffer.
    pub fn unbind(gl: &glow::Context) {
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    /// Resizes all attachments, keeping their formats.
    pub fn resize(&mut self, width: i32, height: i32) {
        let resolution = uvec2(width as u32, height as u32);
        if let Some(color_tex) = &mut self.color_tex {
            color_tex.resize(resolution);
        }
        if let Some(depth_tex) = &mut self.depth_tex {
            depth_tex.resize(resolution);
        }
    }

    /// Returns the color texture of the framebuffer, if it exists.
    pub fn texture(&self) -> Option<&Texture> {
        self.color_tex.as_ref()
    }

    /// Returns the depth texture of the framebuffer, if it exists.
    pub fn depth_texture(&self) -> Option<&Texture> {
        self.depth_tex.as_ref()
    }

    /// Deletes the framebuffer object and its attachments. Safe to call more
    /// than once.
    pub fn release(&mut self) {
        if let Some(fbo) = self.fbo.take() {
            unsafe {
                self.gl.delete_framebuffer(fbo);
            }
        }
        if let Some(mut color_tex) = self.color_tex.take() {
            color_tex.release();
        }
        if let Some(mut depth_tex) = self.depth_tex.take() {
            depth_tex.release();
        }
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        self.release();
    }
}
