//! Light sources and the Phong lighting model.

use crate::colors::Color;
use crate::error::RenderError;
use crate::math::Vec3;
use crate::mesh::Mesh;
use crate::shadow::{ShadowCaster, ShadowSettings};

/// Where a light is and how its rays travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Parallel rays, like the sun. `direction` is the way the light travels.
    Directional { direction: Vec3 },
    Point { position: Vec3 },
    /// A cone around `direction`; full intensity inside `inner`, none beyond `outer`
    /// (half-angles in radians).
    Spot {
        position: Vec3,
        direction: Vec3,
        inner: f32,
        outer: f32,
    },
}

/// The inputs a light needs from a surface point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub position: Vec3,
    /// Unit surface normal.
    pub normal: Vec3,
    /// Specular sample of the material; its intensity scales the exponent.
    pub specular: Color,
}

/// A light with Phong ambient, diffuse and specular terms and an optional shadow map.
#[derive(Debug, Clone)]
pub struct Light {
    kind: LightKind,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub shininess: f32,
    shadow: Option<ShadowCaster>,
}

impl Light {
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            ambient: Color::gray(0.1),
            diffuse: Color::WHITE,
            specular: Color::gray(0.5),
            shininess: 32.0,
            shadow: None,
        }
    }

    pub fn directional(direction: Vec3) -> Self {
        Self::new(LightKind::Directional {
            direction: direction.normalize_or_zero(),
        })
    }

    pub fn point(position: Vec3) -> Self {
        Self::new(LightKind::Point { position })
    }

    /// A spot light. The cone needs `0 <= inner < outer < pi / 2`.
    pub fn spot(position: Vec3, direction: Vec3, inner: f32, outer: f32) -> Result<Self, RenderError> {
        if !(inner >= 0.0 && inner < outer && outer < std::f32::consts::FRAC_PI_2) {
            return Err(RenderError::InvalidSpotCone { inner, outer });
        }
        Ok(Self::new(LightKind::Spot {
            position,
            direction: direction.normalize_or_zero(),
            inner,
            outer,
        }))
    }

    pub fn with_colors(mut self, ambient: Color, diffuse: Color, specular: Color) -> Self {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self.specular = specular;
        self
    }

    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    /// Attaches a shadow map (six for point lights).
    pub fn with_shadows(mut self, settings: ShadowSettings) -> Result<Self, RenderError> {
        self.shadow = Some(ShadowCaster::new(&self.kind, settings)?);
        Ok(self)
    }

    pub fn kind(&self) -> &LightKind {
        &self.kind
    }

    /// Moves or re-aims the light. Shadow cameras follow on the next frame.
    pub fn set_kind(&mut self, kind: LightKind) {
        self.kind = kind;
    }

    pub fn shadow(&self) -> Option<&ShadowCaster> {
        self.shadow.as_ref()
    }

    pub fn casts_shadows(&self) -> bool {
        self.shadow.is_some()
    }

    /// Rebuilds shadow cameras from the current light pose and renders scene depth.
    pub fn render_shadows(&mut self, meshes: &mut [Mesh]) {
        if let Some(shadow) = &mut self.shadow {
            shadow.update(&self.kind);
            shadow.render(meshes);
        }
    }

    /// Scaled occlusion of `world`, 0 when the light casts no shadows.
    #[inline]
    pub fn shadow_factor(&self, world: Vec3) -> f32 {
        self.shadow
            .as_ref()
            .map_or(0.0, |shadow| shadow.point_in_shadow(&self.kind, world) * shadow.strength())
    }

    /// Phong contribution of this light at `surface` seen from `eye`.
    pub fn calculate(&self, surface: &Surface, eye: Vec3) -> Color {
        let (to_light, cone) = match self.kind {
            LightKind::Directional { direction } => (-direction, 1.0),
            LightKind::Point { position } => ((position - surface.position).normalize_or_zero(), 1.0),
            LightKind::Spot {
                position,
                direction,
                inner,
                outer,
            } => {
                let to_light = (position - surface.position).normalize_or_zero();
                let cos_theta = (-to_light).dot(direction);
                let falloff = (cos_theta - outer.cos()) / (inner.cos() - outer.cos());
                (to_light, falloff.clamp(0.0, 1.0))
            }
        };

        let n = surface.normal;
        let diffuse = to_light.dot(n).clamp(0.0, 1.0);

        let reflected = (-to_light).reflect(n);
        let to_eye = (eye - surface.position).normalize_or_zero();
        let intensity = surface.specular.intensity();
        let specular = if intensity > f32::EPSILON {
            reflected
                .dot(to_eye)
                .clamp(0.0, 1.0)
                .powf(self.shininess / intensity)
        } else {
            0.0
        };

        (self.ambient + (self.diffuse * diffuse + self.specular * surface.specular * specular) * cone)
            .saturate()
    }
}

/// Every light of a frame and the eye they are evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct Lighting<'a> {
    lights: &'a [Light],
    eye: Vec3,
}

impl<'a> Lighting<'a> {
    pub fn new(lights: &'a [Light], eye: Vec3) -> Self {
        Self { lights, eye }
    }

    pub fn lights(&self) -> &'a [Light] {
        self.lights
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    /// Sum of every light's contribution, saturated.
    #[inline]
    pub fn illuminate(&self, surface: &Surface) -> Color {
        let mut total = Color::BLACK;
        for light in self.lights {
            total += light.calculate(surface, self.eye);
        }
        total.saturate()
    }

    /// Sum of the scaled shadow factors of every shadow-casting light.
    #[inline]
    pub fn shadow(&self, world: Vec3) -> f32 {
        self.lights.iter().map(|light| light.shadow_factor(world)).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::material::Material;
    use crate::transform::Transform;
    use approx::assert_relative_eq;

    fn surface(normal: Vec3) -> Surface {
        Surface {
            position: Vec3::ZERO,
            normal,
            specular: Color::BLACK,
        }
    }

    fn diffuse_only(kind: LightKind) -> Light {
        Light::new(kind).with_colors(Color::BLACK, Color::WHITE, Color::BLACK)
    }

    #[test]
    fn directional_light_facing_surface_is_full() {
        let light = diffuse_only(LightKind::Directional { direction: Vec3::DOWN });
        let c = light.calculate(&surface(Vec3::UP), Vec3::new(0.0, 5.0, 0.0));
        assert_relative_eq!(c.r, 1.0);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn surface_facing_away_gets_only_ambient() {
        let light = Light::directional(Vec3::DOWN);
        let c = light.calculate(&surface(Vec3::DOWN), Vec3::new(0.0, 5.0, 0.0));
        assert_relative_eq!(c.g, 0.1);
    }

    #[test]
    fn angled_light_follows_cosine() {
        let light = diffuse_only(LightKind::Directional { direction: Vec3::DOWN });
        let n = Vec3::new(0.0, 1.0, 1.0).normalize();
        let c = light.calculate(&surface(n), Vec3::UP);
        assert_relative_eq!(c.b, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-5);
    }

    #[test]
    fn specular_peaks_along_reflection() {
        let light = Light::point(Vec3::new(0.0, 2.0, 0.0))
            .with_colors(Color::BLACK, Color::BLACK, Color::WHITE)
            .with_shininess(8.0);
        let shiny = Surface {
            specular: Color::WHITE,
            ..surface(Vec3::UP)
        };
        let head_on = light.calculate(&shiny, Vec3::new(0.0, 3.0, 0.0));
        let grazing = light.calculate(&shiny, Vec3::new(3.0, 0.5, 0.0));
        assert_relative_eq!(head_on.r, 1.0, epsilon = 1e-5);
        assert!(grazing.r < 0.05);
    }

    #[test]
    fn spot_cone_falls_off_between_angles() {
        let light = Light::spot(Vec3::new(0.0, 1.0, 0.0), Vec3::DOWN, 0.2, 0.4)
            .unwrap()
            .with_colors(Color::BLACK, Color::WHITE, Color::BLACK);
        let at = |x: f32| {
            let s = Surface {
                position: Vec3::new(x, 0.0, 0.0),
                ..surface(Vec3::UP)
            };
            light.calculate(&s, Vec3::new(0.0, 3.0, 0.0)).r
        };
        assert!(at(0.0) > 0.99);
        assert!(at(0.3) > 0.0 && at(0.3) < at(0.1));
        assert_eq!(at(1.0), 0.0);
    }

    #[test]
    fn bad_cone_is_rejected() {
        assert!(matches!(
            Light::spot(Vec3::ZERO, Vec3::DOWN, 0.5, 0.3),
            Err(RenderError::InvalidSpotCone { .. })
        ));
    }

    #[test]
    fn lights_without_shadows_never_shadow() {
        let lights = [Light::directional(Vec3::DOWN), Light::point(Vec3::UP)];
        let lighting = Lighting::new(&lights, Vec3::ZERO);
        assert_eq!(lighting.shadow(Vec3::new(1.0, 2.0, 3.0)), 0.0);
    }

    fn shadow_settings() -> ShadowSettings {
        ShadowSettings {
            resolution: 256,
            hard_shadows: true,
            extent: 12.0,
            distance: 20.0,
            ..ShadowSettings::default()
        }
    }

    fn ground_and_box(height: f32, half_extent: f32) -> Vec<Mesh> {
        let material = Arc::new(Material::default());
        let ground = Mesh::plane("ground", 5.0, Arc::clone(&material));
        let mut block = Mesh::cube("box", half_extent, material);
        block.set_transform(Transform::at(Vec3::new(0.0, height, 0.0)));
        let mut meshes = vec![ground, block];
        meshes.iter_mut().for_each(Mesh::retransform);
        meshes
    }

    #[test]
    fn spot_light_shadows_inside_its_cone() {
        let mut light = Light::spot(Vec3::new(0.0, 6.0, 0.0), Vec3::DOWN, 0.3, 0.6)
            .unwrap()
            .with_shadows(shadow_settings())
            .unwrap();
        assert!(matches!(light.shadow(), Some(ShadowCaster::Single(_))));

        let mut meshes = ground_and_box(3.0, 0.5);
        light.render_shadows(&mut meshes);
        assert_relative_eq!(light.shadow_factor(Vec3::ZERO), 0.5);
        assert_eq!(light.shadow_factor(Vec3::new(2.0, 0.0, 0.0)), 0.0);
        assert_eq!(light.shadow_factor(Vec3::new(0.0, 0.0, -2.0)), 0.0);
    }

    #[test]
    fn shadow_follows_a_moved_light() {
        let mut light = Light::directional(Vec3::DOWN)
            .with_shadows(shadow_settings())
            .unwrap();
        let mut meshes = ground_and_box(2.0, 1.0);
        let under = Vec3::new(-0.5, 0.0, 0.0);
        let beside = Vec3::new(2.5, 0.0, 0.0);

        light.render_shadows(&mut meshes);
        assert_relative_eq!(light.shadow_factor(under), 0.5);
        assert_eq!(light.shadow_factor(beside), 0.0);

        light.set_kind(LightKind::Directional {
            direction: Vec3::new(1.0, -1.0, 0.0).normalize(),
        });
        light.render_shadows(&mut meshes);
        assert_eq!(light.shadow_factor(under), 0.0);
        assert_relative_eq!(light.shadow_factor(beside), 0.5);
    }
}
