//! Command line front end: renders a demo scene or an OBJ file to a PNG, or to a window.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use log::info;

use penumbra::prelude::*;

#[derive(Debug, Parser)]
#[command(version, about = "CPU software rasterizer with shadow mapping")]
struct Cli {
    /// TOML render configuration; defaults apply for missing fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// OBJ file to render instead of the demo cube.
    #[arg(long)]
    obj: Option<PathBuf>,

    /// Where to write the last frame.
    #[arg(short, long, default_value = "frame.png")]
    output: PathBuf,

    /// Frames to render; the cube turns a little each frame.
    #[arg(short, long, default_value_t = 1)]
    frames: u32,

    #[arg(long, value_enum)]
    rasterizer: Option<RasterizerType>,

    #[arg(long, value_enum)]
    mode: Option<RenderMode>,

    #[arg(long, value_enum)]
    buffer: Option<BufferMode>,

    /// Present frames in a window until it is closed.
    #[cfg(feature = "window")]
    #[arg(long)]
    window: bool,
}

const SPIN_PER_FRAME: f32 = 0.02;

fn demo_camera(width: u32, height: u32) -> Camera {
    Camera::new(
        Vec3::new(0.0, 5.0, -9.0),
        Vec3::new(0.0, 0.5, 0.0),
        Projection::from_degrees(60.0, width as f32 / height.max(1) as f32, 0.1, 100.0),
    )
}

fn build_scene(cli: &Cli, config: &RenderConfig) -> Result<Scene, RenderError> {
    let mut scene = Scene::from_config(config, demo_camera(config.width, config.height))?;

    let ground = Arc::new(Material::colored(Color::gray(0.8)));
    scene.add_mesh(Mesh::plane("ground", 6.0, ground));

    let subject = Arc::new(Material::colored(Color::rgb(0.9, 0.45, 0.2)));
    match &cli.obj {
        Some(path) => {
            for mut mesh in Mesh::load_all_from_obj(path, subject)? {
                mesh.transform_mut().set_position(Vec3::new(0.0, 1.0, 0.0));
                scene.add_mesh(mesh);
            }
        }
        None => {
            let mut cube = Mesh::cube("cube", 1.0, subject);
            cube.set_transform(Transform::at(Vec3::new(0.0, 1.0, 0.0)));
            scene.add_mesh(cube);
        }
    }

    let sun = Light::directional(Vec3::new(0.4, -1.0, 0.6)).with_shadows(config.shadows.clone())?;
    scene.add_light(sun);
    scene.add_light(
        Light::point(Vec3::new(-3.0, 3.0, -3.0))
            .with_colors(Color::BLACK, Color::gray(0.3), Color::gray(0.3)),
    );
    Ok(scene)
}

fn spin(scene: &mut Scene) {
    for mesh in scene.renderables_mut().iter_mut().skip(1) {
        mesh.transform_mut().rotate_y(SPIN_PER_FRAME);
    }
}

fn render_frames(scene: &mut Scene, frames: u32) {
    let start = Instant::now();
    for frame in 0..frames.max(1) {
        if frame > 0 {
            spin(scene);
        }
        scene.run();
    }
    info!("rendered {} frame(s) in {:.2?}", frames.max(1), start.elapsed());
}

#[cfg(feature = "window")]
fn run_window(scene: &mut Scene) -> Result<(), RenderError> {
    let mut window = Window::new("penumbra", scene.width(), scene.height())?;
    let mut limiter = FrameLimiter::new(&window);
    loop {
        match window.poll_events() {
            WindowEvent::Quit => return Ok(()),
            WindowEvent::Resize(width, height) => {
                scene.resize(width, height)?;
                window.resize(width, height)?;
            }
            WindowEvent::None => {}
        }
        spin(scene);
        scene.run();
        window.present(&scene.buffer_bytes())?;
        limiter.wait_and_get_delta(&window);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RenderConfig::from_file(path)?,
        None => RenderConfig::default(),
    };
    if let Some(rasterizer) = cli.rasterizer {
        config.rasterizer = rasterizer;
    }
    if let Some(mode) = cli.mode {
        config.render_mode = mode;
    }
    if let Some(buffer) = cli.buffer {
        config.buffer_mode = buffer;
    }

    if config.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build_global()?;
    }
    info!("rendering on {} worker thread(s)", rayon::current_num_threads());

    let mut scene = build_scene(&cli, &config)?;

    #[cfg(feature = "window")]
    if cli.window {
        run_window(&mut scene)?;
        return Ok(());
    }

    render_frames(&mut scene, cli.frames);
    scene.save_png(&cli.output)?;
    Ok(())
}
