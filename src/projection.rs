//! Projection parameters.
//!
//! The [`Projection`] struct is the single source of truth for a camera's projection
//! (perspective field of view or orthographic extent, near/far planes) and generates
//! the matching projection matrix.

use crate::math::mat4::Mat4;

/// Shape of the view volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionKind {
    /// Vertical field of view in radians.
    Perspective { fov_y: f32 },
    /// Width and height of the view box in world units.
    Orthographic { width: f32, height: f32 },
}

/// Projection parameters shared by scene and light-space cameras.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    kind: ProjectionKind,
    /// Aspect ratio (width / height), used by perspective projections.
    aspect_ratio: f32,
    /// Near plane distance; also the smallest accepted depth.
    z_near: f32,
    /// Far plane distance; also the largest accepted depth.
    z_far: f32,
}

impl Projection {
    /// Perspective projection. `fov_y` is in radians.
    pub fn perspective(fov_y: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        Self {
            kind: ProjectionKind::Perspective { fov_y },
            aspect_ratio,
            z_near,
            z_far,
        }
    }

    /// Creates a perspective projection from degrees instead of radians.
    pub fn from_degrees(fov_y_degrees: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        Self::perspective(fov_y_degrees.to_radians(), aspect_ratio, z_near, z_far)
    }

    /// Orthographic projection of a `width` x `height` box.
    pub fn orthographic(width: f32, height: f32, z_near: f32, z_far: f32) -> Self {
        Self {
            kind: ProjectionKind::Orthographic { width, height },
            aspect_ratio: width / height,
            z_near,
            z_far,
        }
    }

    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    pub fn is_orthographic(&self) -> bool {
        matches!(self.kind, ProjectionKind::Orthographic { .. })
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn z_near(&self) -> f32 {
        self.z_near
    }

    pub fn z_far(&self) -> f32 {
        self.z_far
    }

    /// Updates the aspect ratio (typically called on window resize).
    ///
    /// Orthographic boxes keep their height and widen to the new ratio.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        if let ProjectionKind::Orthographic { width, height } = &mut self.kind {
            *width = *height * aspect_ratio;
        }
    }

    /// Generates the left-handed projection matrix.
    pub fn matrix(&self) -> Mat4 {
        match self.kind {
            ProjectionKind::Perspective { fov_y } => {
                Mat4::perspective_lh(fov_y, self.aspect_ratio, self.z_near, self.z_far)
            }
            ProjectionKind::Orthographic { width, height } => {
                Mat4::orthographic_lh(width, height, self.z_near, self.z_far)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn from_degrees_converts_correctly() {
        let proj = Projection::from_degrees(45.0, 1.0, 0.1, 100.0);
        assert_eq!(proj.kind(), ProjectionKind::Perspective { fov_y: 45.0_f32.to_radians() });
        assert_relative_eq!(45.0_f32.to_radians(), FRAC_PI_4, epsilon = 1e-6);
    }

    #[test]
    fn orthographic_resize_keeps_height() {
        let mut proj = Projection::orthographic(4.0, 2.0, 0.1, 10.0);
        proj.set_aspect_ratio(3.0);
        assert_eq!(proj.kind(), ProjectionKind::Orthographic { width: 6.0, height: 2.0 });
        assert!(proj.is_orthographic());
    }
}
