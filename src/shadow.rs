//! Shadow maps: depth rendered from a light's point of view and queried per fragment.
//!
//! A [`ShadowMap`] owns a depth-only rasterizer whose camera sits at the light. After
//! [`ShadowMap::render`] its depth buffer holds, per texel, the view depth of the
//! nearest surface seen by the light. A world point is in shadow when it lies farther
//! from the light than that stored depth plus a small bias.
//!
//! Point lights see in every direction, so [`PointShadowMap`] keeps six maps with 90
//! degree frusta along the axes and picks one per lookup.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::error::RenderError;
use crate::light::LightKind;
use crate::math::Vec3;
use crate::mesh::Mesh;
use crate::projection::Projection;
use crate::render::depth::DepthRasterizer;
use crate::render::view::RasterView;
use crate::render::{Rasterizer, RenderMode};

/// Default depth comparison bias, as a fraction of the light camera's near/far range.
pub const DEFAULT_BIAS: f32 = 0.0015;

const SHADOW_NEAR: f32 = 0.1;

/// Shadow map parameters.
///
/// `extent` is the side of the orthographic frustum of directional lights, which sit
/// `distance` units behind `focus`. Point and spot maps see up to `distance` units
/// from the light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    pub resolution: u32,
    /// Single-texel comparison instead of percentage-closer filtering.
    pub hard_shadows: bool,
    /// Fraction of the near/far range a point must lie behind the stored depth.
    pub bias: f32,
    /// PCF window is `(2r + 1)^2` texels.
    pub pcf_radius: u32,
    /// How much of the light a fully occluded fragment loses.
    pub strength: f32,
    pub extent: f32,
    pub distance: f32,
    pub focus: [f32; 3],
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            resolution: 1024,
            hard_shadows: false,
            bias: DEFAULT_BIAS,
            pcf_radius: 1,
            strength: 0.5,
            extent: 20.0,
            distance: 30.0,
            focus: [0.0; 3],
        }
    }
}

impl ShadowSettings {
    fn focus(&self) -> Vec3 {
        Vec3::new(self.focus[0], self.focus[1], self.focus[2])
    }
}

/// Depth of the scene from a single light-space camera.
#[derive(Debug, Clone)]
pub struct ShadowMap {
    rasterizer: DepthRasterizer,
    settings: ShadowSettings,
}

impl ShadowMap {
    /// Creates a map over an explicit light-space camera.
    pub fn new(camera: Camera, settings: ShadowSettings) -> Result<Self, RenderError> {
        if settings.resolution == 0 {
            return Err(RenderError::ZeroShadowResolution);
        }
        let view = RasterView::new(camera, settings.resolution, settings.resolution)?;
        Ok(Self {
            rasterizer: DepthRasterizer::new(view),
            settings,
        })
    }

    /// Creates the map matching a directional or spot light.
    pub fn for_light(kind: &LightKind, settings: ShadowSettings) -> Result<Self, RenderError> {
        Self::new(light_camera(kind, &settings), settings)
    }

    /// Rebuilds the light-space camera after the light moved.
    pub fn update(&mut self, kind: &LightKind) {
        let camera = light_camera(kind, &self.settings);
        self.rasterizer.set_camera(camera);
    }

    /// Renders scene depth from the light.
    pub fn render(&mut self, meshes: &mut [Mesh]) {
        self.rasterizer.clear();
        self.rasterizer.render(meshes, &[], RenderMode::DepthOnly);
    }

    pub fn view(&self) -> &RasterView {
        self.rasterizer.view()
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    /// Stored light-space depth of texel (x, y).
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        self.rasterizer.targets().depth_at(x, y)
    }

    /// How much `world` is shadowed: 0 for lit, 1 for fully occluded, fractions under PCF.
    ///
    /// Points outside the light frustum are lit.
    pub fn point_in_shadow(&self, world: Vec3) -> f32 {
        let view = self.view();
        let pixel = view.rasterize(world);
        if !view.in_depth_range(pixel.z) {
            return 0.0;
        }
        let (cx, cy) = (pixel.x.round(), pixel.y.round());
        let (width, height) = (view.width() as f32, view.height() as f32);
        if !(cx >= 0.0 && cy >= 0.0 && cx < width && cy < height) {
            return 0.0;
        }

        // Bias is relative to the near/far range, so compare normalized depths.
        let depth = view.linear_depth(pixel.z);
        let occluded = |x: i64, y: i64| -> bool {
            if x < 0 || y < 0 {
                return false;
            }
            self.depth_at(x as u32, y as u32)
                .is_some_and(|stored| depth > view.linear_depth(stored) + self.settings.bias)
        };

        let (cx, cy) = (cx as i64, cy as i64);
        if self.settings.hard_shadows {
            return if occluded(cx, cy) { 1.0 } else { 0.0 };
        }

        let r = self.settings.pcf_radius as i64;
        let mut hits = 0u32;
        for dy in -r..=r {
            for dx in -r..=r {
                if occluded(cx + dx, cy + dy) {
                    hits += 1;
                }
            }
        }
        let taps = (2 * r + 1) * (2 * r + 1);
        hits as f32 / taps as f32
    }
}

/// Axes of the six point-light faces.
pub const CUBE_FACE_DIRECTIONS: [Vec3; 6] = [
    Vec3::RIGHT,
    Vec3::LEFT,
    Vec3::UP,
    Vec3::DOWN,
    Vec3::FORWARD,
    Vec3::BACK,
];

/// Six shadow maps around a point light.
#[derive(Debug, Clone)]
pub struct PointShadowMap {
    faces: [(Vec3, ShadowMap); 6],
}

impl PointShadowMap {
    pub fn new(position: Vec3, settings: ShadowSettings) -> Result<Self, RenderError> {
        let face = |direction: Vec3| -> Result<(Vec3, ShadowMap), RenderError> {
            let camera = face_camera(position, direction, &settings);
            Ok((direction, ShadowMap::new(camera, settings.clone())?))
        };
        let [a, b, c, d, e, f] = CUBE_FACE_DIRECTIONS;
        Ok(Self {
            faces: [face(a)?, face(b)?, face(c)?, face(d)?, face(e)?, face(f)?],
        })
    }

    pub fn update(&mut self, position: Vec3) {
        for (direction, map) in &mut self.faces {
            let camera = face_camera(position, *direction, &map.settings);
            map.rasterizer.set_camera(camera);
        }
    }

    pub fn render(&mut self, meshes: &mut [Mesh]) {
        for (_, map) in &mut self.faces {
            map.render(meshes);
        }
    }

    /// Face whose axis is closest to `direction` (light to point).
    pub fn map_chooser(&self, direction: Vec3) -> &ShadowMap {
        let mut best = &self.faces[0];
        for face in &self.faces[1..] {
            if face.0.dot(direction) > best.0.dot(direction) {
                best = face;
            }
        }
        &best.1
    }

    pub fn faces(&self) -> &[(Vec3, ShadowMap); 6] {
        &self.faces
    }

    pub fn point_in_shadow(&self, light_position: Vec3, world: Vec3) -> f32 {
        self.map_chooser(world - light_position).point_in_shadow(world)
    }
}

/// The shadow caster owned by a light.
#[derive(Debug, Clone)]
pub enum ShadowCaster {
    Single(ShadowMap),
    Omni(Box<PointShadowMap>),
}

impl ShadowCaster {
    pub fn new(kind: &LightKind, settings: ShadowSettings) -> Result<Self, RenderError> {
        match kind {
            LightKind::Point { position } => {
                Ok(ShadowCaster::Omni(Box::new(PointShadowMap::new(*position, settings)?)))
            }
            _ => Ok(ShadowCaster::Single(ShadowMap::for_light(kind, settings)?)),
        }
    }

    pub fn update(&mut self, kind: &LightKind) {
        debug!("rebuilding shadow cameras for {kind:?}");
        match (self, kind) {
            (ShadowCaster::Omni(map), LightKind::Point { position }) => map.update(*position),
            (ShadowCaster::Single(map), _) => map.update(kind),
            (ShadowCaster::Omni(_), _) => {}
        }
    }

    pub fn render(&mut self, meshes: &mut [Mesh]) {
        match self {
            ShadowCaster::Single(map) => map.render(meshes),
            ShadowCaster::Omni(map) => map.render(meshes),
        }
    }

    pub fn strength(&self) -> f32 {
        match self {
            ShadowCaster::Single(map) => map.settings.strength,
            ShadowCaster::Omni(map) => map.faces[0].1.settings.strength,
        }
    }

    /// Raw occlusion in [0, 1] of `world` as seen from a light of `kind`.
    pub fn point_in_shadow(&self, kind: &LightKind, world: Vec3) -> f32 {
        match (self, kind) {
            (ShadowCaster::Omni(map), LightKind::Point { position }) => {
                map.point_in_shadow(*position, world)
            }
            (ShadowCaster::Single(map), _) => map.point_in_shadow(world),
            (ShadowCaster::Omni(_), _) => 0.0,
        }
    }
}

fn light_camera(kind: &LightKind, settings: &ShadowSettings) -> Camera {
    match *kind {
        LightKind::Directional { direction } => {
            let focus = settings.focus();
            let direction = direction.normalize_or_zero();
            Camera::new(
                focus - direction * settings.distance,
                focus,
                Projection::orthographic(
                    settings.extent,
                    settings.extent,
                    SHADOW_NEAR,
                    settings.distance * 2.0,
                ),
            )
        }
        LightKind::Spot {
            position,
            direction,
            outer,
            ..
        } => Camera::new(
            position,
            position + direction,
            Projection::perspective(outer * 2.0, 1.0, SHADOW_NEAR, settings.distance),
        ),
        LightKind::Point { position } => face_camera(position, Vec3::FORWARD, settings),
    }
}

fn face_camera(position: Vec3, direction: Vec3, settings: &ShadowSettings) -> Camera {
    Camera::new(
        position,
        position + direction,
        Projection::perspective(std::f32::consts::FRAC_PI_2, 1.0, SHADOW_NEAR, settings.distance),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use std::sync::Arc;

    fn settings(hard: bool) -> ShadowSettings {
        ShadowSettings {
            resolution: 128,
            hard_shadows: hard,
            extent: 12.0,
            distance: 20.0,
            ..ShadowSettings::default()
        }
    }

    fn ground() -> Vec<Mesh> {
        let mut plane = Mesh::plane("ground", 5.0, Arc::new(Material::default()));
        plane.retransform();
        vec![plane]
    }

    fn sun() -> LightKind {
        LightKind::Directional {
            direction: Vec3::new(0.2, -1.0, 0.1).normalize(),
        }
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let settings = ShadowSettings {
            resolution: 0,
            ..ShadowSettings::default()
        };
        assert!(matches!(
            ShadowMap::for_light(&sun(), settings),
            Err(RenderError::ZeroShadowResolution)
        ));
    }

    #[test]
    fn recorded_depth_is_lit_and_farther_is_shadowed() {
        for hard in [true, false] {
            let mut map = ShadowMap::for_light(&sun(), settings(hard)).unwrap();
            let mut meshes = ground();
            map.render(&mut meshes);

            let (x, y) = (64, 64);
            let depth = map.depth_at(x, y).unwrap();
            assert!(depth.is_finite());

            let camera = map.view().camera();
            let bias = map.settings().bias * (camera.far() - camera.near());
            let at = |d: f32| map.view().unrasterize(Vec3::new(x as f32, y as f32, d));
            assert_eq!(map.point_in_shadow(at(depth)), 0.0);
            assert_eq!(map.point_in_shadow(at(depth + 0.25 * bias)), 0.0);
            assert!(map.point_in_shadow(at(depth + 10.0 * bias)) > 0.0);
        }
    }

    #[test]
    fn tilted_sun_leaves_open_ground_lit() {
        let sun = LightKind::Directional {
            direction: Vec3::new(0.4, -1.0, 0.6).normalize(),
        };
        for hard in [true, false] {
            let settings = ShadowSettings {
                hard_shadows: hard,
                ..ShadowSettings::default()
            };
            let mut map = ShadowMap::for_light(&sun, settings).unwrap();
            let mut plane = Mesh::plane("ground", 8.0, Arc::new(Material::default()));
            plane.retransform();
            map.render(std::slice::from_mut(&mut plane));

            for i in 0..=30 {
                for j in 0..=30 {
                    let point = Vec3::new(-6.0 + 0.4 * i as f32, 0.0, -6.0 + 0.4 * j as f32);
                    assert_eq!(map.point_in_shadow(point), 0.0, "hard={hard} at {point:?}");
                }
            }
        }
    }

    #[test]
    fn outside_the_frustum_is_lit() {
        let mut map = ShadowMap::for_light(&sun(), settings(true)).unwrap();
        let mut meshes = ground();
        map.render(&mut meshes);
        assert_eq!(map.point_in_shadow(Vec3::new(500.0, -3.0, 0.0)), 0.0);
    }

    #[test]
    fn occluder_shadows_the_ground_below_it() {
        let mut map = ShadowMap::for_light(
            &LightKind::Directional { direction: Vec3::DOWN },
            settings(true),
        )
        .unwrap();
        let mut meshes = ground();
        let mut cube = Mesh::cube("box", 1.0, Arc::new(Material::default()));
        cube.set_transform(crate::transform::Transform::at(Vec3::new(0.0, 2.0, 0.0)));
        cube.retransform();
        meshes.push(cube);
        map.render(&mut meshes);

        assert_eq!(map.point_in_shadow(Vec3::ZERO), 1.0);
        assert_eq!(map.point_in_shadow(Vec3::new(3.5, 0.0, 3.5)), 0.0);
    }

    #[test]
    fn chooser_picks_the_face_along_the_direction() {
        let maps = PointShadowMap::new(Vec3::new(0.0, 3.0, 0.0), settings(true)).unwrap();
        let chosen = maps.map_chooser(Vec3::new(0.1, -2.0, 0.3));
        let direction = chosen.view().camera().direction();
        assert!((direction.y + 1.0).abs() < 1e-5);
        let chosen = maps.map_chooser(Vec3::new(-4.0, 1.0, 0.5));
        assert!((chosen.view().camera().direction().x + 1.0).abs() < 1e-5);
    }

    #[test]
    fn point_light_shadows_in_every_direction() {
        let mut caster = ShadowCaster::new(
            &LightKind::Point {
                position: Vec3::new(0.0, 4.0, 0.0),
            },
            settings(true),
        )
        .unwrap();
        let kind = LightKind::Point {
            position: Vec3::new(0.0, 4.0, 0.0),
        };
        let mut meshes = ground();
        let mut cube = Mesh::cube("box", 0.5, Arc::new(Material::default()));
        cube.set_transform(crate::transform::Transform::at(Vec3::new(0.0, 2.0, 0.0)));
        cube.retransform();
        meshes.push(cube);
        caster.render(&mut meshes);

        assert_eq!(caster.point_in_shadow(&kind, Vec3::ZERO), 1.0);
        assert_eq!(caster.point_in_shadow(&kind, Vec3::new(3.0, 2.0, 0.0)), 0.0);
    }
}
