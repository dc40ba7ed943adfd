//! Look-at camera holding view and projection matrices together with their inverses.
//!
//! # Coordinate System
//!
//! Uses a **left-handed** coordinate system, as the rest of the crate:
//! - X: positive right
//! - Y: positive up
//! - Z: positive forward (into screen)
//!
//! View depth is the view-space z of a point. It is what the depth buffers store and
//! what [`Camera::near`] / [`Camera::far`] bound.

use log::warn;

use crate::math::{Mat4, Vec3, Vec4};
use crate::projection::Projection;

/// Camera defined by a position, a look direction and a [`Projection`].
///
/// The four matrices are recomputed eagerly whenever the pose or projection changes,
/// so every accessor is a plain read.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    direction: Vec3,
    up: Vec3,
    projection: Projection,

    world_to_view: Mat4,
    view_to_world: Mat4,
    view_to_proj: Mat4,
    proj_to_view: Mat4,
}

impl Camera {
    /// Creates a camera at `position` looking toward `target`.
    pub fn new(position: Vec3, target: Vec3, projection: Projection) -> Self {
        let mut camera = Self {
            position,
            direction: Vec3::FORWARD,
            up: Vec3::UP,
            projection,
            world_to_view: Mat4::identity(),
            view_to_world: Mat4::identity(),
            view_to_proj: Mat4::identity(),
            proj_to_view: Mat4::identity(),
        };
        camera.set_look_at(position, target, Vec3::UP);
        camera.set_projection(projection);
        camera
    }

    /// Points the camera from `position` at `target`.
    ///
    /// If `up` is parallel to the look direction another world axis is substituted so
    /// cameras looking straight up or down still get a valid basis.
    pub fn set_look_at(&mut self, position: Vec3, target: Vec3, up: Vec3) {
        let mut direction = (target - position).normalize_or_zero();
        if direction == Vec3::ZERO {
            warn!("camera target coincides with its position, keeping previous direction");
            direction = self.direction;
        }
        let up = if direction.cross(up).magnitude() < 1e-4 {
            if direction.cross(Vec3::FORWARD).magnitude() < 1e-4 {
                Vec3::UP
            } else {
                Vec3::FORWARD
            }
        } else {
            up
        };

        self.position = position;
        self.direction = direction;
        self.up = up;
        self.world_to_view = Mat4::look_at_lh(position, position + direction, up);
        self.view_to_world = self.world_to_view.inverse().unwrap_or_else(|| {
            warn!("singular view matrix, falling back to identity");
            Mat4::identity()
        });
    }

    /// Replaces the projection and recomputes the projection matrices.
    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.view_to_proj = projection.matrix();
        self.proj_to_view = self.view_to_proj.inverse().unwrap_or_else(|| {
            warn!("singular projection matrix, falling back to identity");
            Mat4::identity()
        });
    }

    /// Resets the pose and projection in one call.
    pub fn reset(&mut self, position: Vec3, target: Vec3, projection: Projection) {
        self.set_look_at(position, target, Vec3::UP);
        self.set_projection(projection);
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        let mut projection = self.projection;
        projection.set_aspect_ratio(aspect_ratio);
        self.set_projection(projection);
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit look direction.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn near(&self) -> f32 {
        self.projection.z_near()
    }

    pub fn far(&self) -> f32 {
        self.projection.z_far()
    }

    /// World to view matrix.
    pub fn view_transform(&self) -> Mat4 {
        self.world_to_view
    }

    /// View to world matrix.
    pub fn inverse_view_transform(&self) -> Mat4 {
        self.view_to_world
    }

    /// View to clip matrix.
    pub fn project_transform(&self) -> Mat4 {
        self.view_to_proj
    }

    /// Clip to view matrix.
    pub fn inverse_project_transform(&self) -> Mat4 {
        self.proj_to_view
    }

    /// Projects a world point to normalized device x, y and view depth z.
    ///
    /// Points at or behind the eye of a perspective camera come back with a
    /// non-positive z; callers reject those before rasterizing.
    #[inline]
    pub fn project(&self, world: Vec3) -> Vec3 {
        let view = self.world_to_view.transform_point(world);
        let clip = self.view_to_proj * Vec4::point(view);
        let w = if clip.w.abs() > f32::EPSILON { clip.w } else { f32::EPSILON };
        Vec3::new(clip.x / w, clip.y / w, view.z)
    }

    /// Inverse of [`Camera::project`]: normalized device x, y plus view depth to world.
    pub fn unproject(&self, ndc_x: f32, ndc_y: f32, depth: f32) -> Vec3 {
        // Rebuild the clip vector: z and w depend on view depth only.
        let m = self.view_to_proj;
        let clip_z = m.get(2, 2) * depth + m.get(2, 3);
        let clip_w = m.get(3, 2) * depth + m.get(3, 3);
        let clip = Vec4::new(ndc_x * clip_w, ndc_y * clip_w, clip_z, clip_w);
        let view = (self.proj_to_view * clip).to_vec3_perspective();
        self.view_to_world.transform_point(view)
    }
}
