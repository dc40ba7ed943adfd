use std::path::Path;

use log::info;

use crate::colors::Color;
use crate::error::RenderError;

/// A 2D texture sampled by materials.
#[derive(Debug, Clone)]
pub struct Texture {
    data: Vec<u32>, // ARGB8888 texels, row-major, top row first.
    width: u32,
    height: u32,
}

impl Texture {
    /// Load a texture from an image file (PNG, JPG, etc.)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RenderError> {
        let img = image::open(path.as_ref())?.to_rgba8();
        info!(
            "loaded texture {} ({}x{})",
            path.as_ref().display(),
            img.width(),
            img.height()
        );
        Self::from_image(&img)
    }

    /// Converts a decoded RGBA image. Images without texels are rejected.
    pub fn from_image(img: &image::RgbaImage) -> Result<Self, RenderError> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyTexture { width, height });
        }
        let data = img
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
            })
            .collect();
        Ok(Self { data, width, height })
    }

    /// A 1x1 texture of a single color.
    pub fn solid(color: Color) -> Self {
        Self {
            data: vec![color.to_argb()],
            width: 1,
            height: 1,
        }
    }

    /// Sample the texture at UV coordinates using nearest-neighbor filtering.
    ///
    /// UVs follow the OBJ convention (v up), so v is flipped against the top-left
    /// storage order. Coordinates outside [0, 1] wrap.
    #[inline]
    pub fn sample(&self, u: f32, v: f32) -> Color {
        let u = u.rem_euclid(1.0);
        let v = (1.0 - v).rem_euclid(1.0);

        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);

        Color::from_argb(self.data[(y * self.width + x) as usize])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
