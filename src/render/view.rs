//! Camera plus viewport: every coordinate transform the rasterizers need.

use crate::camera::Camera;
use crate::error::RenderError;
use crate::math::Vec3;

/// A camera bound to a pixel grid.
///
/// Three spaces meet here:
/// - world space,
/// - screen space: normalized device x, y in [-1, 1] (y up) and view depth in z,
/// - buffer space: pixel x in [0, width-1], y in [0, height-1] (y down), view depth in z.
#[derive(Debug, Clone)]
pub struct RasterView {
    camera: Camera,
    width: u32,
    height: u32,
}

impl RasterView {
    /// Binds `camera` to a `width` x `height` grid; each side needs at least two pixels
    /// so both screen edges land on a pixel.
    pub fn new(camera: Camera, width: u32, height: u32) -> Result<Self, RenderError> {
        if width < 2 || height < 2 {
            return Err(RenderError::ViewportTooSmall { width, height });
        }
        Ok(Self {
            camera,
            width,
            height,
        })
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Maps screen space to buffer space. Depth passes through unchanged.
    #[inline]
    pub fn to_buffer_coords(&self, screen: Vec3) -> Vec3 {
        Vec3::new(
            (screen.x + 1.0) * 0.5 * (self.width - 1) as f32,
            (1.0 - screen.y) * 0.5 * (self.height - 1) as f32,
            screen.z,
        )
    }

    /// Inverse of [`RasterView::to_buffer_coords`].
    #[inline]
    pub fn to_screen_coords(&self, pixel: Vec3) -> Vec3 {
        let span = |extent: u32| (extent - 1) as f32;
        Vec3::new(
            pixel.x / span(self.width) * 2.0 - 1.0,
            1.0 - pixel.y / span(self.height) * 2.0,
            pixel.z,
        )
    }

    /// World to screen space, as cached per vertex by meshes.
    #[inline]
    pub fn project(&self, world: Vec3) -> Vec3 {
        self.camera.project(world)
    }

    /// World to buffer space: pixel position plus view depth.
    #[inline]
    pub fn rasterize(&self, world: Vec3) -> Vec3 {
        self.to_buffer_coords(self.camera.project(world))
    }

    /// Buffer space (pixel plus view depth) back to world space.
    pub fn unrasterize(&self, pixel: Vec3) -> Vec3 {
        let screen = self.to_screen_coords(pixel);
        self.camera.unproject(screen.x, screen.y, screen.z)
    }

    /// The depth-range test: only depths inside [near, far] are ever accepted.
    #[inline]
    pub fn in_depth_range(&self, depth: f32) -> bool {
        depth >= self.camera.near() && depth <= self.camera.far()
    }

    /// Maps view depth to [0, 1] across the near/far range.
    #[inline]
    pub fn linear_depth(&self, depth: f32) -> f32 {
        let (near, far) = (self.camera.near(), self.camera.far());
        ((depth - near) / (far - near)).clamp(0.0, 1.0)
    }

    /// Row-major index of the pixel nearest to a buffer-space point, if inside.
    #[inline]
    pub fn pixel_index(&self, pixel: Vec3) -> Option<usize> {
        let x = pixel.x.round();
        let y = pixel.y.round();
        if x < 0.0 || y < 0.0 || x >= self.width as f32 || y >= self.height as f32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::Projection;
    use approx::assert_relative_eq;

    fn view() -> RasterView {
        let camera = Camera::new(
            Vec3::new(0.0, 1.0, -4.0),
            Vec3::ZERO,
            Projection::from_degrees(70.0, 1.0, 0.1, 50.0),
        );
        RasterView::new(camera, 64, 48).unwrap()
    }

    #[test]
    fn buffer_coords_flip_y_and_keep_depth() {
        let v = view();
        let top_left = v.to_buffer_coords(Vec3::new(-1.0, 1.0, 3.5));
        assert_eq!(top_left, Vec3::new(0.0, 0.0, 3.5));
        let bottom_right = v.to_buffer_coords(Vec3::new(1.0, -1.0, 7.0));
        assert_eq!(bottom_right, Vec3::new(63.0, 47.0, 7.0));
    }

    #[test]
    fn rasterize_then_unrasterize_round_trips() {
        let v = view();
        for p in [Vec3::ZERO, Vec3::new(0.5, -0.25, 1.0), Vec3::new(-1.0, 0.3, 6.0)] {
            let pixel = v.rasterize(p);
            assert!(v.in_depth_range(pixel.z));
            let back = v.unrasterize(pixel);
            assert_relative_eq!(back.x, p.x, epsilon = 1e-3);
            assert_relative_eq!(back.y, p.y, epsilon = 1e-3);
            assert_relative_eq!(back.z, p.z, epsilon = 1e-3);
        }
    }

    #[test]
    fn viewport_narrower_than_two_pixels_is_rejected() {
        let camera = view().camera().clone();
        assert!(matches!(
            RasterView::new(camera.clone(), 0, 10),
            Err(RenderError::ViewportTooSmall { width: 0, height: 10 })
        ));
        assert!(matches!(
            RasterView::new(camera.clone(), 1, 10),
            Err(RenderError::ViewportTooSmall { width: 1, height: 10 })
        ));
        assert!(matches!(
            RasterView::new(camera.clone(), 10, 1),
            Err(RenderError::ViewportTooSmall { width: 10, height: 1 })
        ));

        let smallest = RasterView::new(camera, 2, 2).unwrap();
        let corner = smallest.to_buffer_coords(Vec3::new(1.0, -1.0, 3.0));
        assert_relative_eq!(corner.x, 1.0);
        assert_relative_eq!(corner.y, 1.0);
    }

    #[test]
    fn pixel_index_rejects_outside_points() {
        let v = view();
        assert_eq!(v.pixel_index(Vec3::new(-0.6, 0.0, 1.0)), None);
        assert_eq!(v.pixel_index(Vec3::new(63.4, 47.4, 1.0)), Some(47 * 64 + 63));
        assert_eq!(v.pixel_index(Vec3::new(63.6, 0.0, 1.0)), None);
    }
}
