//! Triangle meshes and their per-frame world and screen caches.

use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::error::RenderError;
use crate::material::Material;
use crate::math::{Vec2, Vec3};
use crate::render::view::RasterView;
use crate::transform::Transform;
use crate::triangle::{Triangle, Vertex};

/// How lights are evaluated for a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightingMode {
    /// Unlit: flat white light.
    None,
    /// Lights evaluated at the three vertices and blended across the triangle.
    Vertex,
    /// Lights evaluated at every pixel.
    #[default]
    Pixel,
}

/// A triangle list with a world transform and a shared material.
///
/// World-space positions and normals are cached per triangle and rebuilt by
/// [`Mesh::retransform`] when the transform changes. Screen coordinates (normalized
/// device x, y and view depth) are rebuilt by every [`Mesh::update`], since each
/// pass may look at the mesh through a different camera.
#[derive(Debug, Clone)]
pub struct Mesh {
    name: String,
    triangles: Vec<Triangle>,
    transform: Transform,
    material: Arc<Material>,
    lighting_mode: LightingMode,

    screen_coords: Vec<[Vec3; 3]>,
    world_coords: Vec<[Vec3; 3]>,
    world_normals: Vec<[Vec3; 3]>,
    needs_retransform: bool,
}

impl Mesh {
    pub fn new(name: impl Into<String>, triangles: Vec<Triangle>, material: Arc<Material>) -> Self {
        let count = triangles.len();
        Self {
            name: name.into(),
            triangles,
            transform: Transform::default(),
            material,
            lighting_mode: LightingMode::default(),
            screen_coords: vec![[Vec3::ZERO; 3]; count],
            world_coords: vec![[Vec3::ZERO; 3]; count],
            world_normals: vec![[Vec3::ZERO; 3]; count],
            needs_retransform: true,
        }
    }

    /// Load the first object of an OBJ file.
    pub fn load_obj<P: AsRef<Path>>(path: P, material: Arc<Material>) -> Result<Self, RenderError> {
        Self::load_all_from_obj(path, material)?
            .into_iter()
            .next()
            .ok_or(RenderError::EmptyObj)
    }

    /// Load every object of an OBJ file as a separate mesh sharing `material`.
    ///
    /// Faces are triangulated. Missing normals fall back to face normals and missing
    /// texture coordinates to zero.
    pub fn load_all_from_obj<P: AsRef<Path>>(
        path: P,
        material: Arc<Material>,
    ) -> Result<Vec<Self>, RenderError> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)?;
        if models.is_empty() {
            return Err(RenderError::EmptyObj);
        }

        let meshes: Vec<Mesh> = models
            .into_iter()
            .map(|model| {
                let m = &model.mesh;
                let position = |i: usize| Vec3::new(m.positions[3 * i], m.positions[3 * i + 1], m.positions[3 * i + 2]);
                let normal = |i: usize| {
                    (m.normals.len() >= 3 * (i + 1))
                        .then(|| Vec3::new(m.normals[3 * i], m.normals[3 * i + 1], m.normals[3 * i + 2]))
                };
                let uv = |i: usize| {
                    if m.texcoords.len() >= 2 * (i + 1) {
                        Vec2::new(m.texcoords[2 * i], m.texcoords[2 * i + 1])
                    } else {
                        Vec2::ZERO
                    }
                };

                let triangles = m
                    .indices
                    .chunks_exact(3)
                    .map(|face| {
                        let [a, b, c] = [face[0], face[1], face[2]].map(|i| i as usize);
                        let flat = Triangle::flat(position(a), position(b), position(c), [uv(a), uv(b), uv(c)]);
                        let vertex = |slot: usize, i: usize| {
                            Vertex::new(position(i), normal(i).unwrap_or(flat.vertices[slot].normal), uv(i))
                        };
                        Triangle::new(vertex(0, a), vertex(1, b), vertex(2, c))
                    })
                    .collect();

                Mesh::new(model.name, triangles, Arc::clone(&material))
            })
            .collect();

        info!(
            "loaded {} mesh(es), {} triangles from {}",
            meshes.len(),
            meshes.iter().map(|m| m.triangles.len()).sum::<usize>(),
            path.display()
        );
        Ok(meshes)
    }

    /// A square in the XZ plane centered on the origin, facing up.
    pub fn plane(name: impl Into<String>, half_extent: f32, material: Arc<Material>) -> Self {
        let h = half_extent;
        let corners = [
            Vec3::new(-h, 0.0, -h),
            Vec3::new(h, 0.0, -h),
            Vec3::new(h, 0.0, h),
            Vec3::new(-h, 0.0, h),
        ];
        Self::new(name, quad(corners, Vec3::UP).to_vec(), material)
    }

    /// An axis-aligned cube centered on the origin with outward normals.
    pub fn cube(name: impl Into<String>, half_extent: f32, material: Arc<Material>) -> Self {
        // (normal, u, v) with u x v pointing along the normal.
        const FACES: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::RIGHT, Vec3::UP, Vec3::FORWARD),
            (Vec3::LEFT, Vec3::FORWARD, Vec3::UP),
            (Vec3::UP, Vec3::FORWARD, Vec3::RIGHT),
            (Vec3::DOWN, Vec3::RIGHT, Vec3::FORWARD),
            (Vec3::FORWARD, Vec3::RIGHT, Vec3::UP),
            (Vec3::BACK, Vec3::UP, Vec3::RIGHT),
        ];

        let h = half_extent;
        let triangles = FACES
            .iter()
            .flat_map(|&(n, u, v)| {
                let center = n * h;
                quad(
                    [
                        center - u * h - v * h,
                        center + u * h - v * h,
                        center + u * h + v * h,
                        center - u * h + v * h,
                    ],
                    n,
                )
            })
            .collect();
        Self::new(name, triangles, material)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Replaces the transform and tags the world caches for rebuilding.
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.needs_retransform = true;
    }

    /// Mutable transform access; tags the world caches for rebuilding.
    pub fn transform_mut(&mut self) -> &mut Transform {
        self.needs_retransform = true;
        &mut self.transform
    }

    pub fn needs_retransform(&self) -> bool {
        self.needs_retransform
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn set_material(&mut self, material: Arc<Material>) {
        self.material = material;
    }

    pub fn lighting_mode(&self) -> LightingMode {
        self.lighting_mode
    }

    pub fn set_lighting_mode(&mut self, mode: LightingMode) {
        self.lighting_mode = mode;
    }

    pub fn with_lighting_mode(mut self, mode: LightingMode) -> Self {
        self.lighting_mode = mode;
        self
    }

    /// Per-triangle normalized device x, y and view depth from the last update.
    pub fn screen_coords(&self) -> &[[Vec3; 3]] {
        &self.screen_coords
    }

    pub fn world_coords(&self) -> &[[Vec3; 3]] {
        &self.world_coords
    }

    pub fn world_normals(&self) -> &[[Vec3; 3]] {
        &self.world_normals
    }

    /// Rebuilds world positions and normals from the transform and clears the tag.
    pub fn retransform(&mut self) {
        let model = self.transform.to_matrix();
        let normal_matrix = self.transform.normal_matrix();

        for ((triangle, world), normals) in self
            .triangles
            .iter()
            .zip(self.world_coords.iter_mut())
            .zip(self.world_normals.iter_mut())
        {
            *world = triangle.vertices.map(|v| model.transform_point(v.position));
            *normals = triangle
                .vertices
                .map(|v| normal_matrix.transform_vector(v.normal).normalize_or_zero());
        }
        self.needs_retransform = false;
    }

    /// Projects the world cache through `view`, retransforming first if tagged.
    pub fn update(&mut self, view: &RasterView) {
        if self.needs_retransform {
            self.retransform();
        }
        for (screen, world) in self.screen_coords.iter_mut().zip(&self.world_coords) {
            *screen = world.map(|p| view.project(p));
        }
    }
}

fn quad(corners: [Vec3; 4], normal: Vec3) -> [Triangle; 2] {
    let uvs = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)];
    let vertex = |i: usize| Vertex::new(corners[i], normal, uvs[i]);
    [
        Triangle::new(vertex(0), vertex(1), vertex(2)),
        Triangle::new(vertex(0), vertex(2), vertex(3)),
    ]
}
