//! SDL2 window that presents ARGB8888 frames.

use std::time::Duration;

use log::info;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::rect::Rect;
use sdl2::render::{Canvas, Texture, TextureCreator};
use sdl2::video::WindowContext;

use crate::error::RenderError;

pub const FPS: u64 = 60;
pub const FRAME_TARGET_MILLIS: u64 = 1000 / FPS;

fn sdl_error(err: impl ToString) -> RenderError {
    RenderError::Window(err.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    None,
    Quit,
    Resize(u32, u32),
}

/// Caps the frame rate at [`FPS`].
pub struct FrameLimiter {
    previous_ticks: u64,
}

impl FrameLimiter {
    pub fn new(window: &Window) -> Self {
        Self {
            previous_ticks: window.timer.ticks64(),
        }
    }

    /// Sleeps out the rest of the frame budget and returns the elapsed milliseconds.
    pub fn wait_and_get_delta(&mut self, window: &Window) -> u64 {
        let mut now = window.timer.ticks64();
        let elapsed = now - self.previous_ticks;
        if elapsed < FRAME_TARGET_MILLIS {
            std::thread::sleep(Duration::from_millis(FRAME_TARGET_MILLIS - elapsed));
            now = window.timer.ticks64();
        }
        let delta = now - self.previous_ticks;
        self.previous_ticks = now;
        delta
    }
}

pub struct Window {
    canvas: Canvas<sdl2::video::Window>,
    // Field order matters: `texture` borrows from `texture_creator` and must drop first.
    texture: Texture<'static>,
    texture_creator: Box<TextureCreator<WindowContext>>,
    event_pump: sdl2::EventPump,
    timer: sdl2::TimerSubsystem,
    width: u32,
    height: u32,
}

impl Window {
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self, RenderError> {
        let sdl = sdl2::init().map_err(sdl_error)?;
        let video = sdl.video().map_err(sdl_error)?;
        let timer = sdl.timer().map_err(sdl_error)?;

        let window = video
            .window(title, width, height)
            .position_centered()
            .resizable()
            .build()
            .map_err(sdl_error)?;
        let canvas = window.into_canvas().build().map_err(sdl_error)?;
        let texture_creator = Box::new(canvas.texture_creator());
        let texture = Self::streaming_texture(&texture_creator, width, height)?;
        let event_pump = sdl.event_pump().map_err(sdl_error)?;

        info!("opened {width}x{height} window \"{title}\"");
        Ok(Self {
            canvas,
            texture,
            texture_creator,
            event_pump,
            timer,
            width,
            height,
        })
    }

    fn streaming_texture(
        creator: &TextureCreator<WindowContext>,
        width: u32,
        height: u32,
    ) -> Result<Texture<'static>, RenderError> {
        // SAFETY: the creator is boxed and owned by the same `Window` as the texture,
        // which is declared first and therefore dropped first.
        let creator: &'static TextureCreator<WindowContext> = unsafe { &*(creator as *const _) };
        creator
            .create_texture_streaming(PixelFormatEnum::ARGB8888, width, height)
            .map_err(sdl_error)
    }

    /// Drains pending events; quit wins over resize.
    pub fn poll_events(&mut self) -> WindowEvent {
        let mut result = WindowEvent::None;
        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => return WindowEvent::Quit,
                Event::Window {
                    win_event: sdl2::event::WindowEvent::Resized(w, h),
                    ..
                } => result = WindowEvent::Resize(w.max(1) as u32, h.max(1) as u32),
                _ => {}
            }
        }
        result
    }

    /// Uploads an ARGB8888 frame of the window's size and shows it.
    pub fn present(&mut self, frame: &[u8]) -> Result<(), RenderError> {
        self.texture
            .update(None, frame, (self.width * 4) as usize)
            .map_err(sdl_error)?;
        self.canvas.clear();
        self.canvas
            .copy(&self.texture, None, Some(Rect::new(0, 0, self.width, self.height)))
            .map_err(sdl_error)?;
        self.canvas.present();
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.texture = Self::streaming_texture(&self.texture_creator, width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
