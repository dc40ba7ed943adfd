//! A scene: meshes, lights, and the rasterizers that turn them into a frame.

use std::path::Path;
use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;

use crate::camera::Camera;
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::light::Light;
use crate::mesh::Mesh;
use crate::render::{
    BufferMode, DeferredRasterizer, DepthBuffer, ForwardRasterizer, RasterView, Rasterizer,
    RasterizerType, RenderMode,
};

/// Everything needed to render a frame.
///
/// Both shading strategies are kept alive so the active one can be switched at runtime
/// without reallocating buffers.
pub struct Scene {
    renderables: Vec<Mesh>,
    lights: Vec<Light>,
    forward: ForwardRasterizer,
    deferred: DeferredRasterizer,
    active: RasterizerType,
    render_mode: RenderMode,
}

impl Scene {
    pub fn new(camera: Camera, width: u32, height: u32) -> Result<Self, RenderError> {
        let view = RasterView::new(camera, width, height)?;
        Ok(Self {
            renderables: Vec::new(),
            lights: Vec::new(),
            forward: ForwardRasterizer::new(view.clone()),
            deferred: DeferredRasterizer::new(view),
            active: RasterizerType::default(),
            render_mode: RenderMode::default(),
        })
    }

    pub fn from_config(config: &RenderConfig, camera: Camera) -> Result<Self, RenderError> {
        let mut scene = Self::new(camera, config.width, config.height)?;
        scene.forward.set_band_rows(config.band_rows);
        scene.deferred.set_band_rows(config.band_rows);
        scene.set_rasterizer(config.rasterizer);
        scene.set_render_mode(config.render_mode);
        scene.set_buffer_mode(config.buffer_mode);
        info!(
            "scene {}x{}, {} rasterizer, {} mode",
            config.width, config.height, config.rasterizer, config.render_mode
        );
        Ok(scene)
    }

    pub fn renderables(&self) -> &[Mesh] {
        &self.renderables
    }

    pub fn renderables_mut(&mut self) -> &mut [Mesh] {
        &mut self.renderables
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    /// Adds a mesh and returns its index.
    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.renderables.push(mesh);
        self.renderables.len() - 1
    }

    /// Adds a light and returns its index.
    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    pub fn camera(&self) -> &Camera {
        self.forward.view().camera()
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.forward.set_camera(camera.clone());
        self.deferred.set_camera(camera);
    }

    pub fn set_rasterizer(&mut self, rasterizer_type: RasterizerType) {
        self.active = rasterizer_type;
    }

    pub fn rasterizer(&self) -> RasterizerType {
        self.active
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.render_mode = mode;
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    /// G-buffer channel shown by the deferred rasterizer.
    pub fn set_buffer_mode(&mut self, mode: BufferMode) {
        self.deferred.set_buffer_mode(mode);
    }

    pub fn buffer_mode(&self) -> BufferMode {
        self.deferred.buffer_mode()
    }

    pub fn width(&self) -> u32 {
        self.forward.view().width()
    }

    pub fn height(&self) -> u32 {
        self.forward.view().height()
    }

    /// Reallocates every buffer and adapts a perspective camera's aspect ratio.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let mut camera = self.camera().clone();
        if !camera.projection().is_orthographic() {
            camera.set_aspect_ratio(width as f32 / height.max(1) as f32);
        }
        let view = RasterView::new(camera, width, height)?;
        self.forward.set_view(view.clone());
        self.deferred.set_view(view);
        Ok(())
    }

    /// Renders one frame with the active rasterizer.
    ///
    /// Tagged meshes are retransformed first, then every shadow map is refreshed, then
    /// the frame is cleared and rendered.
    pub fn run(&mut self) {
        let start = Instant::now();

        self.renderables
            .par_iter_mut()
            .filter(|mesh| mesh.needs_retransform())
            .for_each(Mesh::retransform);

        for light in &mut self.lights {
            light.render_shadows(&mut self.renderables);
        }

        match self.active {
            RasterizerType::Forward => {
                self.forward.clear();
                self.forward
                    .render(&mut self.renderables, &self.lights, self.render_mode);
            }
            RasterizerType::Deferred => {
                self.deferred.clear();
                self.deferred
                    .render(&mut self.renderables, &self.lights, self.render_mode);
            }
        }

        debug!(
            "{} frame ({}) of {} meshes in {:.2?}",
            self.active,
            self.render_mode,
            self.renderables.len(),
            start.elapsed()
        );
    }

    /// Packed ARGB8888 pixels of the last frame.
    pub fn color(&self) -> &[u32] {
        match self.active {
            RasterizerType::Forward => self.forward.targets().color(),
            RasterizerType::Deferred => self.deferred.targets().color(),
        }
    }

    pub fn depth(&self) -> &DepthBuffer {
        match self.active {
            RasterizerType::Forward => self.forward.targets().depth(),
            RasterizerType::Deferred => self.deferred.targets().depth(),
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        match self.active {
            RasterizerType::Forward => self.forward.targets().pixel(x, y),
            RasterizerType::Deferred => self.deferred.targets().pixel(x, y),
        }
    }

    /// The last frame as bytes, ready for an ARGB8888 streaming texture.
    pub fn buffer_bytes(&self) -> Vec<u8> {
        match self.active {
            RasterizerType::Forward => self.forward.targets().to_bytes(),
            RasterizerType::Deferred => self.deferred.targets().to_bytes(),
        }
    }

    /// Writes the last frame to an image file; the format follows the extension.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), RenderError> {
        let (width, height) = (self.width(), self.height());
        let color = self.color();
        let image = image::RgbaImage::from_fn(width, height, |x, y| {
            let [_, r, g, b] = color[(y * width + x) as usize].to_be_bytes();
            image::Rgba([r, g, b, 255])
        });
        image.save(path.as_ref())?;
        info!("saved frame to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::colors::{self, Color};
    use crate::material::Material;
    use crate::math::Vec3;
    use crate::projection::Projection;
    use crate::shadow::ShadowSettings;
    use crate::transform::Transform;

    fn camera() -> Camera {
        Camera::new(
            Vec3::new(0.0, 6.0, -8.0),
            Vec3::ZERO,
            Projection::from_degrees(60.0, 4.0 / 3.0, 0.1, 100.0),
        )
    }

    fn shadowed_scene() -> Scene {
        let mut scene = Scene::new(camera(), 128, 96).unwrap();
        let material = Arc::new(Material::default());
        scene.add_mesh(Mesh::plane("ground", 5.0, Arc::clone(&material)));
        let mut block = Mesh::cube("block", 1.0, material);
        block.set_transform(Transform::at(Vec3::new(0.0, 3.0, 0.0)));
        scene.add_mesh(block);

        let settings = ShadowSettings {
            resolution: 256,
            hard_shadows: true,
            extent: 12.0,
            ..ShadowSettings::default()
        };
        let sun = Light::directional(Vec3::DOWN)
            .with_colors(Color::gray(0.1), Color::WHITE, Color::BLACK)
            .with_shadows(settings)
            .unwrap();
        scene.add_light(sun);
        scene
    }

    fn brightness_at(scene: &Scene, world: Vec3) -> f32 {
        let pixel = scene.forward.view().rasterize(world);
        let (x, y) = (pixel.x.round() as u32, pixel.y.round() as u32);
        Color::from_argb(scene.pixel(x, y).unwrap()).r
    }

    #[test]
    fn ground_under_the_block_is_darker() {
        for rasterizer in [RasterizerType::Forward, RasterizerType::Deferred] {
            let mut scene = shadowed_scene();
            scene.set_rasterizer(rasterizer);
            scene.run();

            let shadowed = brightness_at(&scene, Vec3::new(0.4, 0.0, 0.1));
            let lit = brightness_at(&scene, Vec3::new(3.0, 0.0, 0.5));
            assert!(lit > 0.95, "{rasterizer}: lit ground is {lit}");
            assert!((shadowed - 0.5).abs() < 0.02, "{rasterizer}: shadowed ground is {shadowed}");
        }
    }

    #[test]
    fn run_consumes_retransform_tags() {
        let mut scene = shadowed_scene();
        assert!(scene.renderables().iter().all(Mesh::needs_retransform));
        scene.run();
        assert!(!scene.renderables().iter().any(Mesh::needs_retransform));
    }

    #[test]
    fn empty_scene_renders_black() {
        let mut scene = Scene::new(camera(), 16, 12).unwrap();
        scene.set_render_mode(RenderMode::DepthOnly);
        scene.run();
        assert!(scene.color().iter().all(|&c| c == colors::BLACK));
        assert!(scene.depth().values().iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn resize_reallocates_buffers() {
        let mut scene = Scene::new(camera(), 16, 12).unwrap();
        scene.resize(40, 20).unwrap();
        assert_eq!(scene.color().len(), 800);
        assert_eq!(scene.buffer_bytes().len(), 3200);
        assert!((scene.camera().projection().aspect_ratio() - 2.0).abs() < 1e-6);
        assert!(matches!(scene.resize(0, 20), Err(RenderError::ViewportTooSmall { .. })));
        assert!(matches!(scene.resize(1, 20), Err(RenderError::ViewportTooSmall { .. })));
    }

    #[test]
    fn saves_the_frame_as_png() {
        let mut scene = shadowed_scene();
        scene.run();
        let path = std::env::temp_dir().join(format!("penumbra-scene-{}.png", std::process::id()));
        scene.save_png(&path).unwrap();
        let saved = image::open(&path).unwrap().to_rgba8();
        assert_eq!(saved.dimensions(), (128, 96));
        std::fs::remove_file(&path).unwrap();
    }
}
