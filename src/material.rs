//! Surface description sampled by both rasterizers.

use crate::colors::Color;
use crate::math::{Vec2, Vec3};
use crate::texture::Texture;

/// Per-surface shading inputs.
///
/// Every map is optional; a missing map falls back to the matching constant, so a
/// default material is an opaque, white, non-emissive diffuse surface.
#[derive(Debug, Clone)]
pub struct Material {
    /// Base tint multiplied with the diffuse sample.
    pub color: Color,
    pub specular: Color,
    pub emissive: Color,
    pub diffuse_map: Option<Texture>,
    pub specular_map: Option<Texture>,
    pub emissive_map: Option<Texture>,
    /// Alpha-tested: texels with zero alpha are discarded.
    pub opacity_map: Option<Texture>,
    /// Tangent-free normal perturbation, texel channels mapped from [0, 1] to [-1, 1].
    pub normal_map: Option<Texture>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            specular: Color::WHITE,
            emissive: Color::BLACK,
            diffuse_map: None,
            specular_map: None,
            emissive_map: None,
            opacity_map: None,
            normal_map: None,
        }
    }
}

impl Material {
    /// Untextured material with the given base color.
    pub fn colored(color: Color) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// Untextured material that only emits light.
    pub fn emitting(emissive: Color) -> Self {
        Self {
            emissive,
            ..Self::default()
        }
    }

    pub fn with_diffuse_map(mut self, texture: Texture) -> Self {
        self.diffuse_map = Some(texture);
        self
    }

    pub fn with_opacity_map(mut self, texture: Texture) -> Self {
        self.opacity_map = Some(texture);
        self
    }

    pub fn with_normal_map(mut self, texture: Texture) -> Self {
        self.normal_map = Some(texture);
        self
    }

    #[inline]
    pub fn diffuse(&self, uv: Vec2) -> Color {
        sample_or(&self.diffuse_map, uv, Color::WHITE)
    }

    #[inline]
    pub fn specular(&self, uv: Vec2) -> Color {
        sample_or(&self.specular_map, uv, self.specular)
    }

    #[inline]
    pub fn emissive(&self, uv: Vec2) -> Color {
        sample_or(&self.emissive_map, uv, self.emissive)
    }

    /// Alpha of the opacity map, 1 when there is none.
    #[inline]
    pub fn opacity(&self, uv: Vec2) -> f32 {
        self.opacity_map
            .as_ref()
            .map_or(1.0, |map| map.sample(uv.x, uv.y).a)
    }

    /// Normal-map offset in [-1, 1]^3, if the material has a normal map.
    #[inline]
    pub fn normal(&self, uv: Vec2) -> Option<Vec3> {
        self.normal_map.as_ref().map(|map| {
            let c = map.sample(uv.x, uv.y);
            Vec3::new(c.r * 2.0 - 1.0, c.g * 2.0 - 1.0, c.b * 2.0 - 1.0)
        })
    }

    /// Applies the normal map to an interpolated surface normal and renormalizes.
    pub fn perturb_normal(&self, normal: Vec3, uv: Vec2) -> Vec3 {
        match self.normal(uv) {
            Some(offset) => (normal + offset).normalize_or_zero(),
            None => normal.normalize_or_zero(),
        }
    }
}

#[inline]
fn sample_or(map: &Option<Texture>, uv: Vec2, fallback: Color) -> Color {
    map.as_ref().map_or(fallback, |map| map.sample(uv.x, uv.y))
}
