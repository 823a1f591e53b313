//! Scene state: GPU meshes, the texture collection, point lights and the
//! active camera.

use std::sync::Arc;

use glam::{Vec3, vec3};

use crate::abs::{self, ShaderProgram, Texture};
use crate::camera::Camera;
use crate::model::{
    Material, MeshData, ModelData, TextureKind, texture_binding_plan,
};

/// The number of point light slots available in the mesh shader.
pub const MAX_POINT_LIGHTS: usize = 4;

/// Radius and height of the default light orbit.
const LIGHT_ORBIT_RADIUS: f32 = 100.0;
const LIGHT_ORBIT_HEIGHT: f32 = 100.0;

/// A point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

/// A mesh with its geometry uploaded to the GPU and a material describing
/// how to shade it.
///
/// GPU buffers are valid exactly between construction and [`Mesh::release`];
/// drawing after release is a logged no-op.
pub struct Mesh {
    raw: abs::Mesh,
    vertices: usize,
    indices: usize,
    material: Material,
    texture_indices: Vec<usize>,
}

impl Mesh {
    /// Uploads the given geometry once; the mesh can then be drawn many
    /// times.
    pub fn new(gl: &Arc<glow::Context>, data: MeshData) -> Self {
        let raw = abs::Mesh::new(gl, &data.vertices, &data.indices, glow::TRIANGLES);
        Self {
            raw,
            vertices: data.vertices.len(),
            indices: data.indices.len(),
            material: data.material,
            texture_indices: data.texture_indices,
        }
    }

    /// Draws the mesh with the given shader, binding material textures from
    /// the scene collection.
    ///
    /// Color coefficients are zeroed when the corresponding map is present,
    /// so shading uses the texture instead of the flat color.
    pub fn draw(&self, shader: &ShaderProgram, textures: &[(TextureKind, Texture)]) {
        let kinds: Vec<TextureKind> = textures.iter().map(|(kind, _)| *kind).collect();
        let plan = texture_binding_plan(&self.material, &self.texture_indices, &kinds);

        shader.use_program();
        for binding in &plan.bindings {
            let Some((_, texture)) = textures.get(binding.texture_index) else {
                log::warn!(
                    "material references texture {} outside the scene collection",
                    binding.texture_index
                );
                continue;
            };
            texture.bind_to_unit(binding.unit);
            shader.set_uniform(&binding.uniform, binding.unit as i32);
        }

        let kd = if plan.has_diffuse() {
            Vec3::ZERO
        } else {
            self.material.kd
        };
        let ks = if plan.has_specular() {
            Vec3::ZERO
        } else {
            self.material.ks
        };
        shader.set_uniform("kd", kd);
        shader.set_uniform("ks", ks);
        shader.set_uniform("ka", self.material.ka);
        shader.set_uniform("shininess", self.material.shininess);
        shader.set_uniform("diffuse_map_count", plan.diffuse_count);
        shader.set_uniform("specular_map_count", plan.specular_count);
        shader.set_uniform("has_diffuse_maps", plan.has_diffuse());
        shader.set_uniform("has_specular_maps", plan.has_specular());

        self.raw.draw();
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices
    }

    pub fn index_count(&self) -> usize {
        self.indices
    }

    pub fn face_count(&self) -> usize {
        self.indices / 3
    }

    /// Deletes the GPU buffers and clears the CPU-side counts. Safe to call
    /// more than once.
    pub fn release(&mut self) {
        self.raw.release();
        self.vertices = 0;
        self.indices = 0;
    }
}

/// A collection of meshes, their textures, point lights and the camera.
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub textures: Vec<(TextureKind, Texture)>,
    pub point_lights: Vec<PointLight>,
    pub camera: Camera,
    time: f32,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            meshes: Vec::new(),
            textures: Vec::new(),
            point_lights: Vec::new(),
            camera,
            time: 0.0,
        }
    }

    pub fn add_point_light(&mut self, light: PointLight) {
        if self.point_lights.len() >= MAX_POINT_LIGHTS {
            log::warn!("too many point lights, ignoring");
            return;
        }
        self.point_lights.push(light);
    }

    /// Replaces the scene contents with the given model, releasing the
    /// previous meshes and textures.
    pub fn set_model(&mut self, gl: &Arc<glow::Context>, model: ModelData) {
        for mesh in &mut self.meshes {
            mesh.release();
        }
        for (_, texture) in &mut self.textures {
            texture.release();
        }

        self.textures = model
            .textures
            .into_iter()
            .map(|t| (t.kind, Texture::from_image(gl, &t.image)))
            .collect();
        self.meshes = model
            .meshes
            .into_iter()
            .map(|data| Mesh::new(gl, data))
            .collect();
    }

    /// Advances scene animation: the first point light orbits the origin as
    /// a function of elapsed time.
    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        if let Some(light) = self.point_lights.first_mut() {
            light.position = vec3(
                LIGHT_ORBIT_RADIUS * self.time.cos(),
                LIGHT_ORBIT_HEIGHT,
                LIGHT_ORBIT_RADIUS * self.time.sin(),
            );
        }
    }

    /// Uploads light state to the shader and draws every mesh.
    pub fn draw(&self, shader: &ShaderProgram) {
        shader.use_program();

        let mut positions = [Vec3::ZERO; MAX_POINT_LIGHTS];
        let mut colors = [Vec3::ZERO; MAX_POINT_LIGHTS];
        let mut intensities = [0.0f32; MAX_POINT_LIGHTS];
        for (i, light) in self.point_lights.iter().take(MAX_POINT_LIGHTS).enumerate() {
            positions[i] = light.position;
            colors[i] = light.color;
            intensities[i] = light.intensity;
        }
        shader.set_uniform("light_positions", positions);
        shader.set_uniform("light_colors", colors);
        shader.set_uniform("light_intensities", intensities);
        shader.set_uniform(
            "light_count",
            self.point_lights.len().min(MAX_POINT_LIGHTS) as i32,
        );

        for mesh in &self.meshes {
            mesh.draw(shader, &self.textures);
        }
    }

    /// Releases all meshes, then all textures.
    pub fn release(&mut self) {
        for mesh in &mut self.meshes {
            mesh.release();
        }
        for (_, texture) in &mut self.textures {
            texture.release();
        }
        self.meshes.clear();
        self.textures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_light_orbits_at_fixed_radius_and_height() {
        let mut scene = Scene::new(Camera::new());
        scene.add_point_light(PointLight {
            position: Vec3::splat(10000.0),
            color: vec3(0.0, 1.0, 0.0),
            intensity: 1.0,
        });

        scene.update(0.5);
        let p1 = scene.point_lights[0].position;
        scene.update(0.7);
        let p2 = scene.point_lights[0].position;

        for p in [p1, p2] {
            assert!((p.y - LIGHT_ORBIT_HEIGHT).abs() < 1e-4);
            let radius = (p.x * p.x + p.z * p.z).sqrt();
            assert!((radius - LIGHT_ORBIT_RADIUS).abs() < 1e-3);
        }
        assert!(p1 != p2);
    }

    #[test]
    fn test_second_light_is_static() {
        let mut scene = Scene::new(Camera::new());
        let fixed = PointLight {
            position: vec3(1.0, 2.0, 3.0),
            color: Vec3::ONE,
            intensity: 2.0,
        };
        scene.add_point_light(PointLight {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 1.0,
        });
        scene.add_point_light(fixed);
        scene.update(1.0);
        assert_eq!(scene.point_lights[1], fixed);
    }

    #[test]
    fn test_light_slots_are_bounded() {
        let mut scene = Scene::new(Camera::new());
        for _ in 0..MAX_POINT_LIGHTS + 2 {
            scene.add_point_light(PointLight {
                position: Vec3::ZERO,
                color: Vec3::ONE,
                intensity: 1.0,
            });
        }
        assert_eq!(scene.point_lights.len(), MAX_POINT_LIGHTS);
    }
}
