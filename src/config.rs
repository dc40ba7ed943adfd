//! Render configuration loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! width = 800
//! height = 600
//! rasterizer = "deferred"
//! render_mode = "color"
//!
//! [shadows]
//! resolution = 2048
//! pcf_radius = 2
//! ```

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::render::{BufferMode, RasterizerType, RenderMode, DEFAULT_BAND_ROWS};
use crate::shadow::ShadowSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub rasterizer: RasterizerType,
    pub render_mode: RenderMode,
    pub buffer_mode: BufferMode,
    /// Rows per worker band.
    pub band_rows: usize,
    /// Worker threads for the global pool; 0 lets rayon decide.
    pub threads: usize,
    pub shadows: ShadowSettings,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            rasterizer: RasterizerType::default(),
            render_mode: RenderMode::default(),
            buffer_mode: BufferMode::default(),
            band_rows: DEFAULT_BAND_ROWS,
            threads: 0,
            shadows: ShadowSettings::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, RenderError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RenderError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&contents)?;
        info!("loaded render config from {}", path.as_ref().display());
        Ok(config)
    }
}
