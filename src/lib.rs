//! A CPU software rasterizer with forward and deferred shading.
//!
//! Triangles are filled with barycentric edge functions under a top-left ownership
//! rule, depth-tested per pixel, and lit by Phong lights that may cast shadows through
//! directional, spot, or omnidirectional shadow maps. Rendering is split into bands of
//! rows that run in parallel on the rayon pool. Window output is optional (the
//! `window` feature); frames can always be written to image files.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use penumbra::prelude::*;
//!
//! # fn main() -> Result<(), RenderError> {
//! let camera = Camera::new(
//!     Vec3::new(0.0, 4.0, -6.0),
//!     Vec3::ZERO,
//!     Projection::from_degrees(60.0, 4.0 / 3.0, 0.1, 100.0),
//! );
//! let mut scene = Scene::new(camera, 800, 600)?;
//! scene.add_mesh(Mesh::cube("cube", 1.0, Arc::new(Material::default())));
//! scene.add_light(Light::directional(Vec3::new(0.3, -1.0, 0.5)));
//! scene.run();
//! scene.save_png("frame.png")?;
//! # Ok(())
//! # }
//! ```

pub mod camera;
pub mod colors;
pub mod config;
pub mod error;
pub mod light;
pub mod material;
pub mod math;
pub mod mesh;
pub mod projection;
pub mod render;
pub mod scene;
pub mod shadow;
pub mod texture;
pub mod transform;
pub mod triangle;
#[cfg(feature = "window")]
pub mod window;

pub use camera::Camera;
pub use config::RenderConfig;
pub use error::RenderError;
pub use light::{Light, LightKind};
pub use material::Material;
pub use mesh::{LightingMode, Mesh};
pub use projection::Projection;
pub use render::{BufferMode, RasterizerType, RenderMode};
pub use scene::Scene;
pub use shadow::ShadowSettings;
pub use transform::Transform;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::camera::Camera;
    pub use crate::colors::Color;
    pub use crate::config::RenderConfig;
    pub use crate::error::RenderError;
    pub use crate::light::{Light, LightKind};
    pub use crate::material::Material;
    pub use crate::math::{Mat4, Vec2, Vec3, Vec4};
    pub use crate::mesh::{LightingMode, Mesh};
    pub use crate::projection::Projection;
    pub use crate::render::{
        BufferMode, DeferredRasterizer, ForwardRasterizer, RasterView, Rasterizer,
        RasterizerType, RenderMode,
    };
    pub use crate::scene::Scene;
    pub use crate::shadow::ShadowSettings;
    pub use crate::texture::Texture;
    pub use crate::transform::Transform;

    #[cfg(feature = "window")]
    pub use crate::window::{FrameLimiter, Window, WindowEvent};
}

/// Module exposing internals for benchmarking. Not part of the stable API.
pub mod bench {
    pub use crate::render::{fill_meshes, EdgeSetup, RenderTargets, TriangleRef};
}
