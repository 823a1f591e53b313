//! CPU-side model data: vertex records, materials and OBJ loading.
//!
//! Everything in this module is plain data with no GPU handles, so model
//! loading is fully testable; [`crate::scene::Scene::set_model`] performs the
//! upload.

use std::path::{Path, PathBuf};

use fxhash::FxHashMap;
use glam::{Vec2, Vec3, vec2, vec3};
use image::DynamicImage;
use rayon::prelude::*;

/// The number of sampler array slots available per texture kind in the mesh
/// shader.
pub const MAX_MAPS_PER_KIND: usize = 4;

/// A single vertex as uploaded verbatim to the GPU.
///
/// `dndu`/`dndv` are the differentials of the normal with respect to the
/// texture coordinates, used for bump-mapping-style shading.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub texcoords: Vec2,
    pub tangent: Vec3,
    pub dndu: Vec3,
    pub dndv: Vec3,
}

impl Default for ModelVertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            texcoords: Vec2::ZERO,
            tangent: Vec3::ZERO,
            dndu: Vec3::ZERO,
            dndv: Vec3::ZERO,
        }
    }
}

impl crate::abs::Vertex for ModelVertex {
    fn vertex_attribs(gl: &glow::Context) {
        use glow::HasContext;

        let stride = std::mem::size_of::<ModelVertex>() as i32;
        let attribs = [
            (0, 3, std::mem::offset_of!(ModelVertex, position)),
            (1, 3, std::mem::offset_of!(ModelVertex, normal)),
            (2, 2, std::mem::offset_of!(ModelVertex, texcoords)),
            (3, 3, std::mem::offset_of!(ModelVertex, tangent)),
            (4, 3, std::mem::offset_of!(ModelVertex, dndu)),
            (5, 3, std::mem::offset_of!(ModelVertex, dndv)),
        ];
        unsafe {
            for (index, size, offset) in attribs {
                gl.vertex_attrib_pointer_f32(index, size, glow::FLOAT, false, stride, offset as i32);
                gl.enable_vertex_attrib_array(index);
            }
        }
    }
}

/// What a texture is used for during shading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Specular,
}

/// Per-mesh shading parameters. Immutable after construction.
///
/// The map fields are indices into the owning model's (and later the
/// scene's) texture collection, not owned textures.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub kd: Vec3,
    pub ks: Vec3,
    pub ka: Vec3,
    pub shininess: f32,
    pub diffuse_map: Option<usize>,
    pub specular_map: Option<usize>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            kd: vec3(0.8, 0.8, 0.8),
            ks: Vec3::ZERO,
            ka: Vec3::ZERO,
            shininess: 32.0,
            diffuse_map: None,
            specular_map: None,
        }
    }
}

/// A decoded texture waiting for upload, tagged with its shading role.
pub struct ModelTexture {
    pub kind: TextureKind,
    pub path: PathBuf,
    pub image: DynamicImage,
}

/// Geometry plus material for one mesh, ready for upload.
pub struct MeshData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub material: Material,
    /// Indices into the model texture collection for the multi-texture
    /// variant. Empty when the material's own map indices are authoritative.
    pub texture_indices: Vec<usize>,
}

impl MeshData {
    /// A unit quad in the XZ plane: 4 vertices, 2 triangles.
    pub fn quad(size: f32, material: Material) -> Self {
        let h = size * 0.5;
        let normal = Vec3::Y;
        let positions = [
            vec3(-h, 0.0, -h),
            vec3(h, 0.0, -h),
            vec3(h, 0.0, h),
            vec3(-h, 0.0, h),
        ];
        let texcoords = [
            vec2(0.0, 0.0),
            vec2(1.0, 0.0),
            vec2(1.0, 1.0),
            vec2(0.0, 1.0),
        ];
        let vertices = positions
            .iter()
            .zip(texcoords.iter())
            .map(|(&position, &texcoords)| ModelVertex {
                position,
                normal,
                texcoords,
                tangent: Vec3::X,
                ..Default::default()
            })
            .collect();
        Self {
            vertices,
            indices: vec![0, 1, 2, 0, 2, 3],
            material,
            texture_indices: Vec::new(),
        }
    }
}

/// A fully loaded model: meshes plus the texture collection their material
/// indices point into.
pub struct ModelData {
    pub meshes: Vec<MeshData>,
    pub textures: Vec<ModelTexture>,
}

/// One sampler binding a mesh draw has to perform.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureBinding {
    pub uniform: String,
    pub unit: u32,
    pub texture_index: usize,
}

/// The full set of sampler bindings and shader flags for one mesh draw.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BindingPlan {
    pub bindings: Vec<TextureBinding>,
    pub diffuse_count: i32,
    pub specular_count: i32,
}

impl BindingPlan {
    pub fn has_diffuse(&self) -> bool {
        self.diffuse_count > 0
    }

    pub fn has_specular(&self) -> bool {
        self.specular_count > 0
    }
}

/// Computes which texture goes to which sampler array slot for a mesh draw.
///
/// When `texture_indices` is non-empty the indices are partitioned by kind
/// (the multi-texture variant); otherwise the material's own map indices are
/// used. Diffuse maps occupy units `0..d`, specular maps the units after
/// them. Slots beyond [`MAX_MAPS_PER_KIND`] are dropped with a warning.
pub fn texture_binding_plan(
    material: &Material,
    texture_indices: &[usize],
    kinds: &[TextureKind],
) -> BindingPlan {
    let mut diffuse = Vec::new();
    let mut specular = Vec::new();

    if texture_indices.is_empty() {
        if let Some(index) = material.diffuse_map {
            diffuse.push(index);
        }
        if let Some(index) = material.specular_map {
            specular.push(index);
        }
    } else {
        for &index in texture_indices {
            match kinds.get(index) {
                Some(TextureKind::Diffuse) => diffuse.push(index),
                Some(TextureKind::Specular) => specular.push(index),
                None => {
                    log::warn!("texture index {} out of bounds, skipping", index);
                }
            }
        }
    }

    for maps in [&mut diffuse, &mut specular] {
        if maps.len() > MAX_MAPS_PER_KIND {
            log::warn!(
                "mesh references {} maps of one kind, only {} slots available",
                maps.len(),
                MAX_MAPS_PER_KIND
            );
            maps.truncate(MAX_MAPS_PER_KIND);
        }
    }

    let mut plan = BindingPlan {
        diffuse_count: diffuse.len() as i32,
        specular_count: specular.len() as i32,
        ..Default::default()
    };

    let mut unit = 0;
    for (slot, texture_index) in diffuse.into_iter().enumerate() {
        plan.bindings.push(TextureBinding {
            uniform: format!("diffuse_maps[{}]", slot),
            unit,
            texture_index,
        });
        unit += 1;
    }
    for (slot, texture_index) in specular.into_iter().enumerate() {
        plan.bindings.push(TextureBinding {
            uniform: format!("specular_maps[{}]", slot),
            unit,
            texture_index,
        });
        unit += 1;
    }

    plan
}

/// Loads an OBJ file and its MTL materials and textures from disk.
///
/// Parse failures are returned as an error; per-texture decode failures are
/// logged and replaced by a 1x1 white placeholder so material indices stay
/// valid.
pub fn load_obj(path: &Path) -> Result<ModelData, String> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| e.to_string())?;

    let obj_materials = match materials {
        Ok(materials) => materials,
        Err(e) => {
            log::warn!("no materials for {}: {}", path.display(), e);
            Vec::new()
        }
    };

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let model = assemble_model(&models, &obj_materials, base_dir);
    log::info!(
        "loaded {}: {} meshes, {} textures",
        path.display(),
        model.meshes.len(),
        model.textures.len()
    );
    Ok(model)
}

/// Builds a [`ModelData`] from parsed OBJ models and materials. Texture
/// images are decoded relative to `base_dir`.
pub fn assemble_model(
    models: &[tobj::Model],
    obj_materials: &[tobj::Material],
    base_dir: &Path,
) -> ModelData {
    let mut textures: Vec<ModelTexture> = Vec::new();
    let mut texture_lookup: FxHashMap<(TextureKind, String), usize> = FxHashMap::default();

    let mut resolve_texture = |kind: TextureKind, name: &Option<String>| -> Option<usize> {
        let name = name.as_deref()?;
        if let Some(&index) = texture_lookup.get(&(kind, name.to_string())) {
            return Some(index);
        }
        let path = base_dir.join(name);
        let image = match image::open(&path) {
            // Flipped so the first row of image data lines up with v = 0.
            Ok(image) => image.flipv(),
            Err(e) => {
                log::error!("failed to load {}: {}", path.display(), e);
                DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
                    1,
                    1,
                    image::Rgba([255, 255, 255, 255]),
                ))
            }
        };
        let index = textures.len();
        textures.push(ModelTexture { kind, path, image });
        texture_lookup.insert((kind, name.to_string()), index);
        Some(index)
    };

    let materials: Vec<Material> = obj_materials
        .iter()
        .map(|m| Material {
            kd: m.diffuse.map_or(Material::default().kd, Vec3::from),
            ks: m.specular.map_or(Vec3::ZERO, Vec3::from),
            ka: m.ambient.map_or(Vec3::ZERO, Vec3::from),
            shininess: m.shininess.unwrap_or(32.0),
            diffuse_map: resolve_texture(TextureKind::Diffuse, &m.diffuse_texture),
            specular_map: resolve_texture(TextureKind::Specular, &m.specular_texture),
        })
        .collect();

    let meshes = models
        .iter()
        .map(|m| {
            let material = m
                .mesh
                .material_id
                .and_then(|id| materials.get(id).cloned())
                .unwrap_or_default();
            let vertices = assemble_vertices(&m.mesh);
            MeshData {
                vertices,
                indices: m.mesh.indices.clone(),
                material,
                texture_indices: Vec::new(),
            }
        })
        .collect();

    ModelData { meshes, textures }
}

/// Builds the vertex records for one OBJ mesh and computes per-vertex
/// tangents and normal differentials from its triangles.
fn assemble_vertices(mesh: &tobj::Mesh) -> Vec<ModelVertex> {
    let mut vertices: Vec<ModelVertex> = (0..mesh.positions.len() / 3)
        .into_par_iter()
        .map(|i| ModelVertex {
            position: vec3(
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                mesh.positions[i * 3 + 2],
            ),
            normal: vec3(
                mesh.normals.get(i * 3).copied().unwrap_or(0.0),
                mesh.normals.get(i * 3 + 1).copied().unwrap_or(0.0),
                mesh.normals.get(i * 3 + 2).copied().unwrap_or(0.0),
            ),
            texcoords: vec2(
                mesh.texcoords.get(i * 2).copied().unwrap_or(0.0),
                mesh.texcoords.get(i * 2 + 1).copied().unwrap_or(0.0),
            ),
            ..Default::default()
        })
        .collect();

    // Tangents and normal differentials are accumulated per triangle and
    // averaged per vertex, solving
    //     dp1 = duv1.x * T + duv1.y * B
    //     dp2 = duv2.x * T + duv2.y * B
    // for T, and the same system with normal deltas for dn/du and dn/dv.
    let mut triangles_included = vec![0u32; vertices.len()];
    for c in mesh.indices.chunks(3) {
        if c.len() < 3 {
            continue;
        }
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        let (v0, v1, v2) = (vertices[i0], vertices[i1], vertices[i2]);

        let dp1 = v1.position - v0.position;
        let dp2 = v2.position - v0.position;
        let dn1 = v1.normal - v0.normal;
        let dn2 = v2.normal - v0.normal;
        let duv1 = v1.texcoords - v0.texcoords;
        let duv2 = v2.texcoords - v0.texcoords;

        let det = duv1.x * duv2.y - duv1.y * duv2.x;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (dp1 * duv2.y - dp2 * duv1.y) * r;
        let dndu = (dn1 * duv2.y - dn2 * duv1.y) * r;
        let dndv = (dn2 * duv1.x - dn1 * duv2.x) * r;

        for &i in &[i0, i1, i2] {
            vertices[i].tangent += tangent;
            vertices[i].dndu += dndu;
            vertices[i].dndv += dndv;
            triangles_included[i] += 1;
        }
    }

    for (vertex, &n) in vertices.iter_mut().zip(triangles_included.iter()) {
        if n > 0 {
            let denom = 1.0 / n as f32;
            vertex.tangent *= denom;
            vertex.dndu *= denom;
            vertex.dndv *= denom;
        }
    }

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    const TWO_TRIANGLE_QUAD_OBJ: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

    fn load_test_obj(source: &str) -> ModelData {
        let mut reader = BufReader::new(Cursor::new(source));
        let (models, materials) = tobj::load_obj_buf(
            &mut reader,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Err(tobj::LoadError::OpenFileFailed),
        )
        .unwrap();
        let obj_materials = materials.unwrap_or_default();
        assemble_model(&models, &obj_materials, Path::new("."))
    }

    #[test]
    fn test_vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<ModelVertex>(), 17 * 4);
        assert_eq!(std::mem::offset_of!(ModelVertex, position), 0);
        assert_eq!(std::mem::offset_of!(ModelVertex, normal), 12);
        assert_eq!(std::mem::offset_of!(ModelVertex, texcoords), 24);
        assert_eq!(std::mem::offset_of!(ModelVertex, tangent), 32);
        assert_eq!(std::mem::offset_of!(ModelVertex, dndu), 44);
        assert_eq!(std::mem::offset_of!(ModelVertex, dndv), 56);
    }

    #[test]
    fn test_quad_obj_has_expected_counts() {
        let model = load_test_obj(TWO_TRIANGLE_QUAD_OBJ);
        assert_eq!(model.meshes.len(), 1);
        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(model.textures.is_empty());
    }

    #[test]
    fn test_quad_tangents_follow_u_direction() {
        let model = load_test_obj(TWO_TRIANGLE_QUAD_OBJ);
        for vertex in &model.meshes[0].vertices {
            let tangent = vertex.tangent.normalize();
            assert!((tangent - Vec3::X).length() < 1e-4);
            // The tangent is orthogonal to the face normal.
            assert!(tangent.dot(vertex.normal).abs() < 1e-4);
        }
    }

    #[test]
    fn test_constant_normals_have_zero_differentials() {
        let model = load_test_obj(TWO_TRIANGLE_QUAD_OBJ);
        for vertex in &model.meshes[0].vertices {
            assert!(vertex.dndu.length() < 1e-6);
            assert!(vertex.dndv.length() < 1e-6);
        }
    }

    #[test]
    fn test_flat_material_has_empty_binding_plan() {
        let plan = texture_binding_plan(&Material::default(), &[], &[]);
        assert!(plan.bindings.is_empty());
        assert!(!plan.has_diffuse());
        assert!(!plan.has_specular());
    }

    #[test]
    fn test_material_maps_bind_one_slot_each() {
        let material = Material {
            diffuse_map: Some(0),
            specular_map: Some(1),
            ..Default::default()
        };
        let plan = texture_binding_plan(&material, &[], &[]);
        assert_eq!(plan.bindings.len(), 2);
        assert_eq!(plan.bindings[0].uniform, "diffuse_maps[0]");
        assert_eq!(plan.bindings[0].unit, 0);
        assert_eq!(plan.bindings[0].texture_index, 0);
        assert_eq!(plan.bindings[1].uniform, "specular_maps[0]");
        assert_eq!(plan.bindings[1].unit, 1);
        assert_eq!(plan.bindings[1].texture_index, 1);
        assert!(plan.has_diffuse() && plan.has_specular());
    }

    #[test]
    fn test_multi_texture_indices_partition_by_kind() {
        let kinds = [
            TextureKind::Specular,
            TextureKind::Diffuse,
            TextureKind::Diffuse,
        ];
        let plan = texture_binding_plan(&Material::default(), &[0, 1, 2], &kinds);
        // Diffuse maps come first, on sequential units, then specular.
        assert_eq!(plan.diffuse_count, 2);
        assert_eq!(plan.specular_count, 1);
        assert_eq!(plan.bindings[0].uniform, "diffuse_maps[0]");
        assert_eq!(plan.bindings[0].texture_index, 1);
        assert_eq!(plan.bindings[1].uniform, "diffuse_maps[1]");
        assert_eq!(plan.bindings[1].texture_index, 2);
        assert_eq!(plan.bindings[2].uniform, "specular_maps[0]");
        assert_eq!(plan.bindings[2].texture_index, 0);
        let units: Vec<u32> = plan.bindings.iter().map(|b| b.unit).collect();
        assert_eq!(units, vec![0, 1, 2]);
    }

    #[test]
    fn test_binding_plan_truncates_excess_maps() {
        let kinds = vec![TextureKind::Diffuse; MAX_MAPS_PER_KIND + 2];
        let indices: Vec<usize> = (0..kinds.len()).collect();
        let plan = texture_binding_plan(&Material::default(), &indices, &kinds);
        assert_eq!(plan.bindings.len(), MAX_MAPS_PER_KIND);
        assert_eq!(plan.diffuse_count, MAX_MAPS_PER_KIND as i32);
    }

    #[test]
    fn test_quad_helper_matches_draw_expectations() {
        let quad = MeshData::quad(2.0, Material::default());
        assert_eq!(quad.vertices.len(), 4);
        assert_eq!(quad.indices, vec![0, 1, 2, 0, 2, 3]);
        let plan = texture_binding_plan(&quad.material, &quad.texture_indices, &[]);
        assert!(plan.bindings.is_empty());
    }
}
