//! Immediate shading: every pixel that wins the depth test is lit on the spot.

use super::framebuffer::{DepthMode, RenderTargets, Tile};
use super::view::RasterView;
use super::{compose, depth_gray, draw_overlay, Fragment, Rasterizer, RenderMode, TriangleRef, DEFAULT_BAND_ROWS};
use crate::camera::Camera;
use crate::colors::Color;
use crate::light::{Lighting, Surface};
use crate::math::Vec2;
use crate::mesh::LightingMode;

/// Single-pass rasterizer with perspective-correct depth.
#[derive(Debug, Clone)]
pub struct ForwardRasterizer {
    view: RasterView,
    targets: RenderTargets,
    band_rows: usize,
}

impl ForwardRasterizer {
    pub fn new(view: RasterView) -> Self {
        let targets = RenderTargets::new(view.width(), view.height(), DepthMode::PerspectiveCorrect);
        Self {
            view,
            targets,
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

    /// Replaces the viewport; buffers are reallocated.
    pub fn set_view(&mut self, view: RasterView) {
        self.targets.resize(view.width(), view.height());
        self.view = view;
    }
}

impl Rasterizer for ForwardRasterizer {
    type Sample = ();

    fn view(&self) -> &RasterView {
        &self.view
    }

    fn view_mut(&mut self) -> &mut RasterView {
        &mut self.view
    }

    fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    fn split_mut(&mut self) -> (&RasterView, &mut RenderTargets) {
        (&self.view, &mut self.targets)
    }

    fn band_rows(&self) -> usize {
        self.band_rows
    }

    fn triangle(
        view: &RasterView,
        lighting: &Lighting<'_>,
        tile: &mut Tile<'_>,
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
        let lighting_mode = triangle.mesh().lighting_mode();

        // Vertex lighting is evaluated once per triangle and band.
        let vertex_light = (mode == RenderMode::Color && lighting_mode == LightingMode::Vertex).then(|| {
            let world = triangle.world();
            let normals = triangle.normals();
            let uvs = triangle.uvs();
            [0, 1, 2].map(|i| {
                lighting.illuminate(&Surface {
                    position: world[i],
                    normal: normals[i],
                    specular: material.specular(uvs[i]),
                })
            })
        });

        for y in rows {
            for x in setup.columns() {
                let Some(coverage) = setup.coverage(x, y) else {
                    continue;
                };
                let Some(index) = tile.index(x, y) else {
                    continue;
                };

                let z = DepthMode::PerspectiveCorrect.interpolate(coverage.weights, depths);
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

                // Pixels on edges owned by a neighbour keep their depth but not a color.
                if !coverage.owned {
                    continue;
                }

                let fragment = Fragment::interpolate(triangle, coverage.weights);
                let light = match (lighting_mode, vertex_light) {
                    (LightingMode::None, _) => Color::WHITE,
                    (LightingMode::Vertex, Some(colors)) => Color::blend(colors, coverage.weights),
                    _ => lighting.illuminate(&Surface {
                        position: fragment.position,
                        normal: fragment.normal,
                        specular: material.specular(uv),
                    }),
                };

                let color = compose(
                    light,
                    material.diffuse(uv),
                    material.color,
                    material.emissive(uv),
                    lighting.shadow(fragment.position),
                );
                tile.set_color(index, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{facing_triangle, ortho_view, perspective_view};
    use super::*;
    use crate::colors::{self, Color};
    use crate::light::Light;
    use crate::material::Material;
    use crate::math::Vec3;
    use crate::mesh::Mesh;
    use approx::assert_relative_eq;

    fn frame(view: RasterView, meshes: &mut [Mesh], lights: &[Light], mode: RenderMode) -> ForwardRasterizer {
        let mut rasterizer = ForwardRasterizer::new(view);
        rasterizer.clear();
        rasterizer.render(meshes, lights, mode);
        rasterizer
    }

    #[test]
    fn four_by_four_coverage_and_owned_subset() {
        let mut meshes = [facing_triangle(
            [(-1.0, -1.0), (1.0, -1.0), (0.0, 1.0)],
            0.0,
            Material::default(),
            LightingMode::None,
        )];
        let r = frame(ortho_view(4, 4), &mut meshes, &[], RenderMode::Color);

        let covered = [(1, 1), (2, 1), (1, 2), (2, 2), (0, 3), (1, 3), (2, 3), (3, 3)];
        let shaded = [(1, 1), (1, 2), (2, 2)];
        for y in 0..4 {
            for x in 0..4 {
                let depth = r.targets().depth_at(x, y).unwrap();
                let color = r.targets().pixel(x, y).unwrap();
                if covered.contains(&(x, y)) {
                    assert_relative_eq!(depth, 5.0, epsilon = 1e-4);
                } else {
                    assert_eq!(depth, f32::INFINITY, "({x}, {y}) should be untouched");
                }
                let expected = if shaded.contains(&(x, y)) { colors::WHITE } else { colors::BLACK };
                assert_eq!(color, expected, "color at ({x}, {y})");
            }
        }
    }

    #[test]
    fn non_owned_edge_pixel_writes_depth_but_keeps_color() {
        // (0, 3) lies on the bottom edge, which the top-left rule does not own.
        let mut meshes = [facing_triangle(
            [(-1.0, -1.0), (1.0, -1.0), (0.0, 1.0)],
            0.0,
            Material::default(),
            LightingMode::None,
        )];
        let r = frame(ortho_view(4, 4), &mut meshes, &[], RenderMode::Color);
        assert!(r.targets().depth_at(0, 3).unwrap().is_finite());
        assert_eq!(r.targets().pixel(0, 3), Some(colors::BLACK));
    }

    #[test]
    fn emissive_surface_ignores_a_dark_light() {
        let emissive = Color::rgb(0.2, 0.6, 0.4);
        for direction in [Vec3::FORWARD, Vec3::DOWN, Vec3::new(1.0, 1.0, -1.0)] {
            let mut meshes = [facing_triangle(
                [(-0.9, -0.9), (0.9, -0.9), (0.0, 0.9)],
                0.0,
                Material::emitting(emissive),
                LightingMode::Pixel,
            )];
            let dark = Light::directional(direction).with_colors(Color::BLACK, Color::BLACK, Color::BLACK);
            let r = frame(ortho_view(16, 16), &mut meshes, &[dark], RenderMode::Color);
            assert_eq!(r.targets().pixel(8, 8), Some(emissive.to_argb()));
        }
    }

    #[test]
    fn nearer_triangle_wins_in_any_order() {
        let near = || {
            facing_triangle(
                [(-0.8, -0.8), (0.8, -0.8), (0.0, 0.8)],
                -1.0,
                Material::colored(Color::rgb(1.0, 0.0, 0.0)),
                LightingMode::None,
            )
        };
        let far = || {
            facing_triangle(
                [(-1.0, -1.0), (1.0, -1.0), (0.0, 1.0)],
                2.0,
                Material::colored(Color::rgb(0.0, 0.0, 1.0)),
                LightingMode::None,
            )
        };

        let a = frame(perspective_view(32, 32), &mut [near(), far()], &[], RenderMode::Color);
        let b = frame(perspective_view(32, 32), &mut [far(), near()], &[], RenderMode::Color);
        assert_eq!(a.targets().color(), b.targets().color());
        assert_eq!(a.targets().pixel(16, 16), Some(0xFFFF_0000));
        assert_relative_eq!(a.targets().depth_at(16, 16).unwrap(), 4.0, epsilon = 1e-4);
    }

    #[test]
    fn image_does_not_depend_on_thread_count() {
        let render = |threads: usize| {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
            pool.install(|| {
                let mut meshes = [
                    facing_triangle([(-1.0, -0.7), (0.9, -0.2), (0.1, 0.9)], 0.5, Material::default(), LightingMode::Pixel),
                    facing_triangle([(-0.6, 0.8), (0.8, 0.7), (0.0, -0.9)], 0.5, Material::default(), LightingMode::Pixel),
                ];
                let lights = [Light::point(Vec3::new(0.0, 0.0, -2.0))];
                let r = frame(perspective_view(64, 48), &mut meshes, &lights, RenderMode::Color);
                (r.targets().color().to_vec(), r.targets().depth().values().to_vec())
            })
        };
        assert_eq!(render(1), render(4));
    }

    #[test]
    fn covered_depth_is_perspective_correct() {
        // A triangle tilted away from the camera.
        let triangle = crate::triangle::Triangle::flat(
            Vec3::new(-1.5, -1.0, -1.0),
            Vec3::new(1.5, -1.0, 3.0),
            Vec3::new(0.0, 1.5, 1.0),
            [Vec2::ZERO; 3],
        );
        let mut mesh = Mesh::new("tilted", vec![triangle], std::sync::Arc::new(Material::default()));
        mesh.set_lighting_mode(LightingMode::None);
        let mut meshes = [mesh];
        let r = frame(perspective_view(48, 48), &mut meshes, &[], RenderMode::Color);

        let [a, b, c] = triangle.vertices.map(|v| v.position);
        let normal = (b - a).cross(c - a).normalize();
        let mut checked = 0;
        for y in 0..48 {
            for x in 0..48 {
                let depth = r.targets().depth_at(x, y).unwrap();
                if depth.is_infinite() {
                    continue;
                }
                let world = r.view().unrasterize(Vec3::new(x as f32, y as f32, depth));
                assert_relative_eq!((world - a).dot(normal), 0.0, epsilon = 1e-3);
                checked += 1;
            }
        }
        assert!(checked > 100);
    }

    #[test]
    fn empty_scene_depth_only_stays_cleared() {
        let r = frame(perspective_view(8, 6), &mut [], &[], RenderMode::DepthOnly);
        assert!(r.targets().color().iter().all(|&c| c == colors::BLACK));
        assert!(r.targets().depth().values().iter().all(|d| *d == f32::INFINITY));
    }

    #[test]
    fn depth_only_draws_near_brighter() {
        let mut meshes = [
            facing_triangle([(-1.0, -1.0), (0.0, -1.0), (-0.5, 1.0)], -2.0, Material::default(), LightingMode::None),
            facing_triangle([(0.0, -1.0), (1.0, -1.0), (0.5, 1.0)], 20.0, Material::default(), LightingMode::None),
        ];
        let r = frame(ortho_view(32, 32), &mut meshes, &[], RenderMode::DepthOnly);
        let near = Color::from_argb(r.targets().pixel(8, 20).unwrap());
        let far = Color::from_argb(r.targets().pixel(24, 20).unwrap());
        assert!(near.r > far.r);
    }

    #[test]
    fn wireframe_skips_the_fill() {
        let mut meshes = [facing_triangle(
            [(-0.8, -0.8), (0.8, -0.8), (0.0, 0.8)],
            0.0,
            Material::default(),
            LightingMode::None,
        )];
        let r = frame(ortho_view(32, 32), &mut meshes, &[], RenderMode::Wireframe);
        assert!(r.targets().color().contains(&colors::WIREFRAME));
        assert!(!r.targets().color().contains(&colors::WHITE));
        assert!(r.targets().depth().values().iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn diffuse_map_tints_the_base_color() {
        let material = Material::colored(Color::rgb(1.0, 1.0, 0.0))
            .with_diffuse_map(crate::texture::Texture::solid(Color::rgb(1.0, 0.0, 1.0)));
        let mut meshes = [facing_triangle([(-1.0, -1.0), (1.0, -1.0), (0.0, 1.0)], 0.0, material, LightingMode::None)];
        let r = frame(ortho_view(8, 8), &mut meshes, &[], RenderMode::Color);
        assert_eq!(r.targets().pixel(4, 4), Some(0xFFFF_0000));
    }

    #[test]
    fn zero_opacity_is_discarded() {
        let material = Material::default().with_opacity_map(crate::texture::Texture::solid(Color::TRANSPARENT));
        let mut meshes = [facing_triangle([(-1.0, -1.0), (1.0, -1.0), (0.0, 1.0)], 0.0, material, LightingMode::None)];
        let r = frame(ortho_view(8, 8), &mut meshes, &[], RenderMode::Color);
        assert!(r.targets().depth().values().iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn triangle_behind_the_eye_is_skipped() {
        let mut meshes = [facing_triangle([(-1.0, -1.0), (1.0, -1.0), (0.0, 1.0)], -6.0, Material::default(), LightingMode::None)];
        let r = frame(perspective_view(8, 8), &mut meshes, &[], RenderMode::Color);
        assert!(r.targets().color().iter().all(|&c| c == colors::BLACK));
    }

    #[test]
    fn vertex_lighting_matches_pixel_lighting_only_at_vertices() {
        // A close point light: bright in the middle, oblique at the corners.
        let light = Light::point(Vec3::new(-1.0 / 3.0, 1.0 / 3.0, -0.3))
            .with_colors(Color::BLACK, Color::WHITE, Color::BLACK);
        let render = |mode: LightingMode| {
            let mut meshes = [facing_triangle(
                [(-1.0, 1.0), (1.0, 1.0), (-1.0, -1.0)],
                0.0,
                Material::default(),
                mode,
            )];
            frame(ortho_view(32, 32), &mut meshes, std::slice::from_ref(&light), RenderMode::Color)
        };
        let vertex = render(LightingMode::Vertex);
        let pixel = render(LightingMode::Pixel);
        let brightness = |r: &ForwardRasterizer, x: u32, y: u32| Color::from_argb(r.targets().pixel(x, y).unwrap()).r;

        // (0, 0) is the top-left corner, on two owned edges.
        let corner = brightness(&pixel, 0, 0);
        assert!(corner > 0.2);
        assert_relative_eq!(brightness(&vertex, 0, 0), corner, epsilon = 2.0 / 255.0);

        let (centre_vertex, centre_pixel) = (brightness(&vertex, 10, 10), brightness(&pixel, 10, 10));
        assert!(centre_pixel > 0.9, "pixel lit centre is {centre_pixel}");
        assert!(centre_vertex < 0.5, "vertex lit centre is {centre_vertex}");
    }
}

