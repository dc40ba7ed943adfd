//! Depth-only rasterizer used to render shadow maps.

use super::framebuffer::{DepthMode, RenderTargets, Tile};
use super::view::RasterView;
use super::{Rasterizer, RenderMode, TriangleRef};
use crate::camera::Camera;
use crate::light::Lighting;
use crate::math::Vec2;

/// Writes nearest depth only; the color buffer is left untouched.
///
/// Depth is interpolated perspective-correctly under a perspective camera and
/// linearly under an orthographic one, where linear interpolation is exact.
#[derive(Debug, Clone)]
pub struct DepthRasterizer {
    view: RasterView,
    targets: RenderTargets,
}

fn depth_mode_for(camera: &Camera) -> DepthMode {
    if camera.projection().is_orthographic() {
        DepthMode::Linear
    } else {
        DepthMode::PerspectiveCorrect
    }
}

impl DepthRasterizer {
    pub fn new(view: RasterView) -> Self {
        let mode = depth_mode_for(view.camera());
        let targets = RenderTargets::new(view.width(), view.height(), mode);
        Self { view, targets }
    }

    /// Replaces the camera, switching depth interpolation if the projection kind changed.
    pub fn set_camera(&mut self, camera: Camera) {
        let mode = depth_mode_for(&camera);
        if mode != self.targets.depth().mode() {
            self.targets = RenderTargets::new(self.view.width(), self.view.height(), mode);
        }
        *self.view.camera_mut() = camera;
    }
}

impl Rasterizer for DepthRasterizer {
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

    fn triangle(
        view: &RasterView,
        _lighting: &Lighting<'_>,
        tile: &mut Tile<'_>,
        triangle: &TriangleRef<'_>,
        _mode: RenderMode,
    ) {
        let setup = triangle.setup();
        let depth_mode = depth_mode_for(view.camera());
        let depths = triangle.depths();
        let material = triangle.material();
        let cutout = material.opacity_map.is_some();

        for y in setup.rows_within(tile.first_row(), tile.last_row()) {
            for x in setup.columns() {
                let Some(coverage) = setup.coverage(x, y) else {
                    continue;
                };
                let Some(index) = tile.index(x, y) else {
                    continue;
                };

                let z = depth_mode.interpolate(coverage.weights, depths);
                if !(view.in_depth_range(z) && z < tile.depth(index)) {
                    continue;
                }
                if cutout && material.opacity(Vec2::blend(triangle.uvs(), coverage.weights)) <= 0.0 {
                    continue;
                }
                tile.set_depth(index, z);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{facing_triangle, ortho_view, perspective_view};
    use super::*;
    use crate::colors;
    use crate::material::Material;
    use crate::mesh::LightingMode;
    use approx::assert_relative_eq;

    #[test]
    fn mode_follows_projection() {
        let mut r = DepthRasterizer::new(perspective_view(4, 4));
        assert_eq!(r.targets().depth().mode(), DepthMode::PerspectiveCorrect);
        let ortho = ortho_view(4, 4).camera().clone();
        r.set_camera(ortho);
        assert_eq!(r.targets().depth().mode(), DepthMode::Linear);
        assert!(r.view().camera().projection().is_orthographic());
    }

    #[test]
    fn writes_depth_without_color() {
        let mut r = DepthRasterizer::new(ortho_view(8, 8));
        let mut meshes = [facing_triangle([(-1.0, -1.0), (1.0, -1.0), (0.0, 1.0)], 2.0, Material::default(), LightingMode::Pixel)];
        r.clear();
        r.render(&mut meshes, &[], RenderMode::DepthOnly);
        assert_relative_eq!(r.targets().depth_at(4, 5).unwrap(), 7.0, epsilon = 1e-5);
        assert!(r.targets().color().iter().all(|&c| c == colors::BLACK));
    }
}
