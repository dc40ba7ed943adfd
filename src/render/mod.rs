//! The rasterizer core.
//!
//! Every rasterizer owns a [`RasterView`] (camera plus viewport) and a set of
//! [`RenderTargets`]. A frame is produced in two stages:
//!
//! 1. every mesh reprojects its triangles through the view, in parallel across meshes;
//! 2. the frame is cut into horizontal bands and each band, on its own worker, fills
//!    every triangle that overlaps its rows through [`Rasterizer::triangle`].
//!
//! Strategies differ only in what `triangle` does with a covered pixel:
//! - [`ForwardRasterizer`]: shades it on the spot.
//! - [`DeferredRasterizer`]: records a G-buffer sample, shaded later in one pass.
//! - [`DepthRasterizer`]: keeps depth only, for shadow maps.

pub mod deferred;
pub mod depth;
pub mod draw;
pub mod edgefunction;
pub mod forward;
pub mod framebuffer;
pub mod view;

pub use deferred::{DeferredRasterizer, GSample};
pub use depth::DepthRasterizer;
pub use edgefunction::{Coverage, EdgeSetup};
pub use forward::ForwardRasterizer;
pub use framebuffer::{DepthBuffer, DepthMode, RenderTargets, Tile};
pub use view::RasterView;

use log::trace;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::colors::{self, Color};
use crate::light::{Light, Lighting};
use crate::material::Material;
use crate::math::{Vec2, Vec3};
use crate::mesh::Mesh;

/// Rows per band handed to one worker.
pub const DEFAULT_BAND_ROWS: usize = 16;

/// What a pass writes into the color buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Shaded surfaces.
    #[default]
    Color,
    /// Linearized depth as grayscale, near is bright.
    DepthOnly,
    Wireframe,
    Vertices,
    WireframeAndVertices,
}

impl RenderMode {
    /// Debug overlay modes draw lines and markers instead of filling triangles.
    pub fn draws_overlay(self) -> bool {
        matches!(
            self,
            RenderMode::Wireframe | RenderMode::Vertices | RenderMode::WireframeAndVertices
        )
    }
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderMode::Color => write!(f, "Color"),
            RenderMode::DepthOnly => write!(f, "Depth"),
            RenderMode::Wireframe => write!(f, "Wireframe"),
            RenderMode::Vertices => write!(f, "Vertices"),
            RenderMode::WireframeAndVertices => write!(f, "Wireframe + Vertices"),
        }
    }
}

/// Which G-buffer channel the deferred resolve shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BufferMode {
    /// Fully lit image.
    #[default]
    Lit,
    Normal,
    Color,
    Diffuse,
    Specular,
    Emission,
}

/// Available shading strategies.
///
/// Use this enum to select which rasterizer a scene renders with. Can be changed at
/// runtime via `Scene::set_rasterizer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RasterizerType {
    /// Shade each pixel as soon as it passes the depth test.
    /// Pays for every overdrawn pixel but needs no extra memory.
    #[default]
    Forward,
    /// Record surface attributes first, then light every visible pixel exactly once.
    Deferred,
}

impl std::fmt::Display for RasterizerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RasterizerType::Forward => write!(f, "Forward"),
            RasterizerType::Deferred => write!(f, "Deferred"),
        }
    }
}

/// A mesh triangle prepared for filling: its buffer-space edge setup plus access to
/// the mesh caches the shaders read.
#[derive(Debug, Clone)]
pub struct TriangleRef<'a> {
    mesh: &'a Mesh,
    index: usize,
    setup: EdgeSetup,
}

impl<'a> TriangleRef<'a> {
    /// Prepares triangle `index` of an updated mesh.
    ///
    /// Returns `None` when a vertex is at or behind the eye, or when the triangle is
    /// degenerate or entirely off screen.
    pub fn prepare(view: &RasterView, mesh: &'a Mesh, index: usize) -> Option<Self> {
        let screen = *mesh.screen_coords().get(index)?;
        if !screen.iter().all(|p| p.z > 0.0) {
            return None;
        }
        let points = screen.map(|p| view.to_buffer_coords(p));
        let setup = EdgeSetup::new(points, view.width(), view.height())?;
        Some(Self { mesh, index, setup })
    }

    pub fn mesh(&self) -> &'a Mesh {
        self.mesh
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn setup(&self) -> &EdgeSetup {
        &self.setup
    }

    /// Buffer-space vertices.
    pub fn points(&self) -> [Vec3; 3] {
        self.setup.points()
    }

    /// View depth of each vertex.
    pub fn depths(&self) -> [f32; 3] {
        self.setup.points().map(|p| p.z)
    }

    pub fn world(&self) -> [Vec3; 3] {
        self.mesh.world_coords()[self.index]
    }

    pub fn normals(&self) -> [Vec3; 3] {
        self.mesh.world_normals()[self.index]
    }

    pub fn uvs(&self) -> [Vec2; 3] {
        self.mesh.triangles()[self.index].uvs()
    }

    pub fn material(&self) -> &'a Material {
        self.mesh.material()
    }
}

/// Surface attributes interpolated at a covered pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub position: Vec3,
    /// Renormalized, normal-mapped world normal.
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Fragment {
    #[inline]
    pub fn interpolate(triangle: &TriangleRef<'_>, weights: [f32; 3]) -> Self {
        let uv = Vec2::blend(triangle.uvs(), weights);
        let normal = triangle
            .material()
            .perturb_normal(Vec3::blend(triangle.normals(), weights), uv);
        Self {
            position: Vec3::blend(triangle.world(), weights),
            normal,
            uv,
        }
    }
}

/// The final color of a lit pixel, shared by both shading strategies.
#[inline]
pub fn compose(light: Color, diffuse: Color, base: Color, emission: Color, shadow: f32) -> u32 {
    (light * diffuse * base + emission - Color::gray(shadow))
        .saturate()
        .to_argb()
}

/// Grayscale for the depth view: near is white, far is black.
#[inline]
pub fn depth_gray(view: &RasterView, depth: f32) -> u32 {
    Color::gray(1.0 - view.linear_depth(depth)).to_argb()
}

/// Draws the debug overlay of `mode` for one triangle.
pub fn draw_overlay<S>(tile: &mut Tile<'_, S>, points: [Vec3; 3], mode: RenderMode) {
    if matches!(mode, RenderMode::Wireframe | RenderMode::WireframeAndVertices) {
        draw::draw_triangle_wireframe(tile, points, colors::WIREFRAME);
    }
    if matches!(mode, RenderMode::Vertices | RenderMode::WireframeAndVertices) {
        draw::draw_triangle_vertices(tile, points, colors::VERTEX);
    }
}

/// The contract shared by every rasterizer.
pub trait Rasterizer {
    /// Per-pixel data recorded besides color and depth.
    type Sample: Clone + Default + Send + Sync;

    fn view(&self) -> &RasterView;

    fn view_mut(&mut self) -> &mut RasterView;

    fn targets(&self) -> &RenderTargets<Self::Sample>;

    /// The view and the targets borrowed together for a fill.
    fn split_mut(&mut self) -> (&RasterView, &mut RenderTargets<Self::Sample>);

    fn band_rows(&self) -> usize {
        DEFAULT_BAND_ROWS
    }

    /// Fills the part of one triangle that falls inside `tile`.
    fn triangle(
        view: &RasterView,
        lighting: &Lighting<'_>,
        tile: &mut Tile<'_, Self::Sample>,
        triangle: &TriangleRef<'_>,
        mode: RenderMode,
    );

    /// Maps normalized device coordinates to pixel coordinates, depth unchanged.
    fn to_buffer_coords(&self, ndc: Vec3) -> Vec3 {
        self.view().to_buffer_coords(ndc)
    }

    /// Projects a world point to pixel coordinates plus view depth.
    fn rasterize(&self, world: Vec3) -> Vec3 {
        self.view().rasterize(world)
    }

    /// Color to black, depth to +inf. Call once per frame before [`Rasterizer::render`].
    fn clear(&mut self) {
        self.split_mut().1.clear();
    }

    /// One full frame: updates every mesh, then fills every triangle.
    fn render(&mut self, meshes: &mut [Mesh], lights: &[Light], mode: RenderMode) {
        fill_meshes(self, meshes, lights, mode);
    }
}

/// Updates `meshes` through the rasterizer's view and fills all their triangles,
/// one band per worker.
pub fn fill_meshes<R: Rasterizer + ?Sized>(
    rasterizer: &mut R,
    meshes: &mut [Mesh],
    lights: &[Light],
    mode: RenderMode,
) {
    let band_rows = rasterizer.band_rows();
    let (view, targets) = rasterizer.split_mut();

    meshes.par_iter_mut().for_each(|mesh| mesh.update(view));

    let meshes: &[Mesh] = meshes;
    let triangles: Vec<TriangleRef<'_>> = meshes
        .par_iter()
        .flat_map_iter(|mesh| {
            (0..mesh.triangles().len()).filter_map(move |index| TriangleRef::prepare(view, mesh, index))
        })
        .collect();
    trace!(
        "filling {} triangles into {}x{} in bands of {band_rows} rows",
        triangles.len(),
        view.width(),
        view.height()
    );

    let lighting = Lighting::new(lights, view.camera().position());
    targets.for_each_band(band_rows, |tile| {
        for triangle in &triangles {
            R::triangle(view, &lighting, tile, triangle, mode);
        }
    });
}
