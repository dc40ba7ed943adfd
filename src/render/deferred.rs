//! Deferred shading through a G-buffer.
//!
//! Pass 1 fills triangles like the forward path but, instead of lighting a pixel,
//! stores the surface attributes of the nearest fragment. Pass 2 then lights every
//! pixel exactly once, so overdraw costs no lighting work.

use log::trace;

use super::framebuffer::{DepthMode, RenderTargets, Tile};
use super::view::RasterView;
use super::{compose, depth_gray, draw_overlay, fill_meshes, BufferMode, Fragment, Rasterizer, RenderMode, TriangleRef, DEFAULT_BAND_ROWS};
use crate::camera::Camera;
use crate::colors::{self, Color};
use crate::light::{Light, Lighting, Surface};
use crate::math::{Vec2, Vec3};
use crate::mesh::{LightingMode, Mesh};

/// Surface attributes of the nearest fragment of a pixel.
///
/// Only meaningful where the depth buffer holds an in-range depth.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GSample {
    pub normal: Vec3,
    pub diffuse: Color,
    pub specular: Color,
    pub emission: Color,
    /// Material base color.
    pub color: Color,
    pub position: Vec3,
    /// False for unlit meshes, which resolve against white light.
    pub lit: bool,
}

/// Two-pass rasterizer with linearly interpolated depth.
#[derive(Debug, Clone)]
pub struct DeferredRasterizer {
    view: RasterView,
    targets: RenderTargets<GSample>,
    buffer_mode: BufferMode,
    band_rows: usize,
}

impl DeferredRasterizer {
    pub fn new(view: RasterView) -> Self {
        let targets = RenderTargets::new(view.width(), view.height(), DepthMode::Linear);
        Self {
            view,
            targets,
            buffer_mode: BufferMode::default(),
            band_rows: DEFAULT_BAND_ROWS,
        }
    }

    pub fn set_camera(&mut self, camera: Camera) {
        *self.view.camera_mut() = camera;
    }

    /// Rows per worker band; clamped to at least one.
    pub fn set_band_rows(&mut self, rows: usize) {
        self.band_rows = rows.max(1);
    }

    pub fn set_view(&mut self, view: RasterView) {
        self.targets.resize(view.width(), view.height());
        self.view = view;
    }

    pub fn buffer_mode(&self) -> BufferMode {
        self.buffer_mode
    }

    pub fn set_buffer_mode(&mut self, mode: BufferMode) {
        self.buffer_mode = mode;
    }

    /// Pass 2: resolves every pixel from the G-buffer, in parallel.
    ///
    /// Pixels without an in-range depth become black.
    pub fn render_to_screen(&mut self, lights: &[Light], buffer_mode: BufferMode) {
        debug_assert_eq!(
            self.targets.depth().mode(),
            DepthMode::Linear,
            "deferred resolve expects a linear depth buffer"
        );
        trace!("resolving G-buffer as {buffer_mode:?}");

        let view = &self.view;
        let lighting = Lighting::new(lights, view.camera().position());
        self.targets.resolve(|depth, sample| {
            if !view.in_depth_range(depth) {
                return colors::BLACK;
            }
            match buffer_mode {
                BufferMode::Lit => {
                    let light = if sample.lit {
                        lighting.illuminate(&Surface {
                            position: sample.position,
                            normal: sample.normal,
                            specular: sample.specular,
                        })
                    } else {
                        Color::WHITE
                    };
                    compose(
                        light,
                        sample.diffuse,
                        sample.color,
                        sample.emission,
                        lighting.shadow(sample.position),
                    )
                }
                BufferMode::Normal => {
                    let n = sample.normal * 0.5 + Vec3::ONE * 0.5;
                    Color::rgb(n.x, n.y, n.z).to_argb()
                }
                BufferMode::Color => sample.color.saturate().to_argb(),
                BufferMode::Diffuse => sample.diffuse.saturate().to_argb(),
                BufferMode::Specular => sample.specular.saturate().to_argb(),
                BufferMode::Emission => sample.emission.saturate().to_argb(),
            }
        });
    }

    /// Stored G-buffer sample at (x, y).
    pub fn sample(&self, x: u32, y: u32) -> Option<&GSample> {
        (x < self.view.width() && y < self.view.height())
            .then(|| &self.targets.samples()[(y * self.view.width() + x) as usize])
    }
}

impl Rasterizer for DeferredRasterizer {
    type Sample = GSample;

    fn view(&self) -> &RasterView {
        &self.view
    }

    fn view_mut(&mut self) -> &mut RasterView {
        &mut self.view
    }

    fn targets(&self) -> &RenderTargets<GSample> {
        &self.targets
    }

    fn split_mut(&mut self) -> (&RasterView, &mut RenderTargets<GSample>) {
        (&self.view, &mut self.targets)
    }

    fn band_rows(&self) -> usize {
        self.band_rows
    }

    /// Pass 1: records the nearest fragment of each pixel.
    fn triangle(
        view: &RasterView,
        _lighting: &Lighting<'_>,
        tile: &mut Tile<'_, GSample>,
        triangle: &TriangleRef<'_>,
        mode: RenderMode,
    ) {
        if mode.draws_overlay() {
            draw_overlay(tile, triangle.points(), mode);
            return;
        }

        let setup = triangle.setup();
        let rows = setup.rows_within(tile.first_row(), tile.last_row());
        if rows.is_empty() {
            return;
        }

        let depths = triangle.depths();
        let material = triangle.material();
        let lit = triangle.mesh().lighting_mode() != LightingMode::None;

        for y in rows {
            for x in setup.columns() {
                let Some(coverage) = setup.coverage(x, y) else {
                    continue;
                };
                // The G-buffer keeps one fragment per pixel, so shared edges go to
                // their owner only.
                if !coverage.owned {
                    continue;
                }
                let Some(index) = tile.index(x, y) else {
                    continue;
                };

                let z = DepthMode::Linear.interpolate(coverage.weights, depths);
                if !(view.in_depth_range(z) && z < tile.depth(index)) {
                    continue;
                }

                let uv = Vec2::blend(triangle.uvs(), coverage.weights);
                if material.opacity(uv) <= 0.0 {
                    continue;
                }
                tile.set_depth(index, z);

                if mode == RenderMode::DepthOnly {
                    tile.set_color(index, depth_gray(view, z));
                    continue;
                }

                let fragment = Fragment::interpolate(triangle, coverage.weights);
                *tile.sample_mut(index) = GSample {
                    normal: fragment.normal,
                    diffuse: material.diffuse(uv),
                    specular: material.specular(uv),
                    emission: material.emissive(uv),
                    color: material.color,
                    position: fragment.position,
                    lit,
                };
            }
        }
    }

    /// Pass 1 over every mesh, then pass 2 for shaded frames.
    fn render(&mut self, meshes: &mut [Mesh], lights: &[Light], mode: RenderMode) {
        fill_meshes(self, meshes, lights, mode);
        if mode == RenderMode::Color {
            self.render_to_screen(lights, self.buffer_mode);
        }
    }
}
