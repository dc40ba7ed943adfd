//! Error type for fallible construction and asset loading.
//!
//! Rendering itself never fails: numerical edge cases are clamped silently. Only
//! structurally invalid setup and I/O surface as [`RenderError`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to load OBJ: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("OBJ file contains no meshes")]
    EmptyObj,

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("texture has no texels ({width}x{height})")]
    EmptyTexture { width: u32, height: u32 },

    #[error("viewport must be at least 2x2, got {width}x{height}")]
    ViewportTooSmall { width: u32, height: u32 },

    #[error("shadow map resolution must be non-zero")]
    ZeroShadowResolution,

    #[error("window error: {0}")]
    Window(String),

    #[error("spot light cone is invalid: inner {inner} rad, outer {outer} rad")]
    InvalidSpotCone { inner: f32, outer: f32 },
}

pub type Result<T> = std::result::Result<T, RenderError>;
