//! Structs and functions for handling textures.
//!
//! The module provides the [`Texture`] struct which owns a GPU texture
//! together with its resolution and format triple (internal format, pixel
//! format, pixel type).

use std::path::Path;
use std::sync::Arc;

use glam::{UVec2, uvec2};
use glow::HasContext;
use image::{DynamicImage, GenericImageView};

/// Represents a texture stored on the GPU side.
///
/// The GPU handle has single-owner semantics: the struct is movable but not
/// clonable, and [`Texture::release`] is idempotent so dropping after an
/// explicit release is safe.
pub struct Texture {
    pub(super) gl: Arc<glow::Context>,
    pub(super) id: Option<glow::Texture>,
    pub(super) resolution: UVec2,
    pub(super) internal_format: i32,
    pub(super) format: u32,
    pub(super) ty: u32,
}

impl Texture {
    /// Creates a new texture handle with default wrap and filter parameters
    /// and no backing storage yet.
    pub fn new(gl: &Arc<glow::Context>) -> Self {
        unsafe {
            let texture = gl.create_texture().unwrap();
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::NEAREST_MIPMAP_LINEAR as i32,
            );
            gl.bind_texture(glow::TEXTURE_2D, None);

            log::debug!("created texture {:?}", texture);

            Self {
                gl: Arc::clone(gl),
                id: Some(texture),
                resolution: UVec2::ZERO,
                internal_format: glow::RGBA8 as i32,
                format: glow::RGBA,
                ty: glow::UNSIGNED_BYTE,
            }
        }
    }

    /// Creates a new texture with backing storage of the given size and
    /// format triple, but no image data.
    pub fn with_size(
        gl: &Arc<glow::Context>,
        resolution: UVec2,
        internal_format: i32,
        format: u32,
        ty: u32,
    ) -> Self {
        let mut texture = Self::new(gl);
        texture.init_image(resolution, internal_format, format, ty);
        texture
    }

    /// Creates a new texture from the given [`image::DynamicImage`],
    /// converted to RGBA8, with mipmaps.
    pub fn from_image(gl: &Arc<glow::Context>, image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let data = image.to_rgba8().into_raw();
        let mut texture = Self::new(gl);
        texture.resolution = uvec2(width, height);
        if let Some(id) = texture.id {
            unsafe {
                gl.bind_texture(glow::TEXTURE_2D, Some(id));
                gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    texture.internal_format,
                    width as i32,
                    height as i32,
                    0,
                    texture.format,
                    texture.ty,
                    glow::PixelUnpackData::Slice(Some(data.as_slice())),
                );
                gl.generate_mipmap(glow::TEXTURE_2D);
                gl.bind_texture(glow::TEXTURE_2D, None);
            }
        }
        texture
    }

    /// Allocates backing storage for the given resolution and format triple.
    /// Any previous image data is discarded.
    pub fn init_image(
        &mut self,
        resolution: UVec2,
        internal_format: i32,
        format: u32,
        ty: u32,
    ) {
        let Some(id) = self.id else {
            log::warn!("init_image called on a released texture");
            return;
        };

        self.resolution = resolution;
        self.internal_format = internal_format;
        self.format = format;
        self.ty = ty;

        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(id));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal_format,
                resolution.x as i32,
                resolution.y as i32,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(None),
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }

    /// Loads a floating point image file (e.g. Radiance HDR) into the
    /// texture, flipped vertically, as a 4-channel float image.
    ///
    /// A decode failure is logged and leaves the texture without valid image
    /// data; the caller must not bind it for sampling afterwards.
    pub fn load_hdr(&mut self, filepath: &Path) {
        let Some(id) = self.id else {
            log::warn!("load_hdr called on a released texture");
            return;
        };

        let image = match image::open(filepath) {
            Ok(image) => image,
            Err(e) => {
                log::error!("failed to load {}: {}", filepath.display(), e);
                return;
            }
        };

        let image = image.flipv().to_rgba32f();
        let (width, height) = image.dimensions();
        let data = image.into_raw();

        self.resolution = uvec2(width, height);
        self.internal_format = glow::RGBA32F as i32;
        self.format = glow::RGBA;
        self.ty = glow::FLOAT;

        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(id));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                self.internal_format,
                width as i32,
                height as i32,
                0,
                self.format,
                self.ty,
                glow::PixelUnpackData::Slice(Some(std::slice::from_raw_parts(
                    data.as_ptr() as *const u8,
                    data.len() * std::mem::size_of::<f32>(),
                ))),
            );
            self.gl.generate_mipmap(glow::TEXTURE_2D);
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }

        log::info!(
            "loaded {} ({}x{}, RGBA32F)",
            filepath.display(),
            width,
            height
        );
    }

    /// Reallocates the backing storage at the given resolution, keeping the
    /// format triple. The previous contents are discarded.
    pub fn resize(&mut self, resolution: UVec2) {
        self.init_image(resolution, self.internal_format, self.format, self.ty);
    }

    /// Binds the texture to the specified texture unit for sampling.
    pub fn bind_to_unit(&self, unit: u32) {
        let Some(id) = self.id else {
            log::warn!("bind_to_unit called on a released texture");
            return;
        };
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(id));
        }
    }

    /// Binds the texture to the specified image unit for read/write access
    /// from a shader.
    pub fn bind_to_image_unit(&self, unit: u32, access: u32) {
        let Some(id) = self.id else {
            log::warn!("bind_to_image_unit called on a released texture");
            return;
        };
        unsafe {
            self.gl.bind_image_texture(
                unit,
                Some(id),
                0,
                false,
                0,
                access,
                self.internal_format as u32,
            );
        }
    }

    /// Returns the resolution of the texture.
    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    /// Returns the internal format of the texture storage.
    pub fn internal_format(&self) -> i32 {
        self.internal_format
    }

    /// Returns the pixel format used for uploads.
    pub fn format(&self) -> u32 {
        self.format
    }

    /// Returns the pixel type used for uploads.
    pub fn ty(&self) -> u32 {
        self.ty
    }

    /// Deletes the GPU handle. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(id) = self.id.take() {
            log::debug!("released texture {:?}", id);
            unsafe {
                self.gl.delete_texture(id);
            }
        }
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.release();
    }
}
