//! Color, depth and per-pixel sample storage, and the banded views workers fill.
//!
//! [`RenderTargets`] owns the buffers of one rasterizer. During a pass it is split
//! into horizontal bands; each band is handed to one worker as a [`Tile`], a borrowed
//! view with bounds-checked pixel access. Bands never overlap, so the depth test and
//! the color write that follows it need no synchronization and "nearest wins" holds
//! for any number of threads.

use rayon::prelude::*;

use crate::colors;

/// How a depth buffer interpolates depth across a triangle.
///
/// Both variants store view depth (smaller is nearer). Carrying the mode with the
/// buffer lets the consumers of a buffer check which semantics they are reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMode {
    /// Blend `1/z` by the barycentric weights and invert. Exact under perspective.
    PerspectiveCorrect,
    /// Blend z directly. Exact under orthographic projection.
    Linear,
}

impl DepthMode {
    #[inline]
    pub fn interpolate(self, weights: [f32; 3], depths: [f32; 3]) -> f32 {
        match self {
            DepthMode::PerspectiveCorrect => {
                1.0 / (weights[0] / depths[0] + weights[1] / depths[1] + weights[2] / depths[2])
            }
            DepthMode::Linear => {
                weights[0] * depths[0] + weights[1] * depths[1] + weights[2] * depths[2]
            }
        }
    }
}

/// One `f32` per pixel holding the nearest accepted view depth of the frame.
#[derive(Debug, Clone)]
pub struct DepthBuffer {
    values: Vec<f32>,
    mode: DepthMode,
}

impl DepthBuffer {
    pub fn new(len: usize, mode: DepthMode) -> Self {
        Self {
            values: vec![f32::INFINITY; len],
            mode,
        }
    }

    pub fn clear(&mut self) {
        self.values.fill(f32::INFINITY);
    }

    pub fn mode(&self) -> DepthMode {
        self.mode
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }
}

/// Buffers owned by a rasterizer: packed color, depth, and an optional per-pixel
/// sample (`S = ()` for forward and depth-only rasterizers, the G-buffer for deferred).
#[derive(Debug, Clone)]
pub struct RenderTargets<S = ()> {
    color: Vec<u32>,
    depth: DepthBuffer,
    samples: Vec<S>,
    width: u32,
    height: u32,
}

impl<S: Clone + Default + Send + Sync> RenderTargets<S> {
    pub fn new(width: u32, height: u32, mode: DepthMode) -> Self {
        let size = width as usize * height as usize;
        Self {
            color: vec![colors::BLACK; size],
            depth: DepthBuffer::new(size, mode),
            samples: vec![S::default(); size],
            width,
            height,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height, self.depth.mode);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resets color to black and depth to +inf. Samples are left stale: they are only
    /// meaningful where this frame's depth test passed.
    pub fn clear(&mut self) {
        self.color.fill(colors::BLACK);
        self.depth.clear();
    }

    pub fn color(&self) -> &[u32] {
        &self.color
    }

    pub fn depth(&self) -> &DepthBuffer {
        &self.depth
    }

    pub fn samples(&self) -> &[S] {
        &self.samples
    }

    /// Color at (x, y), or None if out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        (x < self.width && y < self.height)
            .then(|| self.color[(y * self.width + x) as usize])
    }

    /// Depth at (x, y), or None if out of bounds.
    #[inline]
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        (x < self.width && y < self.height)
            .then(|| self.depth.values[(y * self.width + x) as usize])
    }

    /// Color buffer as bytes in native-endian ARGB8888, the layout SDL textures expect.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.color.iter().flat_map(|px| px.to_ne_bytes()).collect()
    }

    /// Splits the frame into bands of `band_rows` rows and runs `fill` on each band in
    /// parallel.
    pub fn for_each_band<F>(&mut self, band_rows: usize, fill: F)
    where
        F: Fn(&mut Tile<'_, S>) + Sync + Send,
    {
        let width = self.width as usize;
        let band_rows = band_rows.max(1);
        let band_len = band_rows * width;
        if band_len == 0 {
            return;
        }

        self.color
            .par_chunks_mut(band_len)
            .zip(self.depth.values.par_chunks_mut(band_len))
            .zip(self.samples.par_chunks_mut(band_len))
            .enumerate()
            .for_each(|(band, ((color, depth), samples))| {
                let rows = color.len() / width;
                let mut tile = Tile {
                    color,
                    depth,
                    samples,
                    width: width as u32,
                    y0: (band * band_rows) as u32,
                    rows: rows as u32,
                };
                fill(&mut tile);
            });
    }

    /// Rewrites every pixel from its depth and sample, in parallel.
    pub fn resolve<F>(&mut self, shade: F)
    where
        F: Fn(f32, &S) -> u32 + Sync + Send,
    {
        self.color
            .par_iter_mut()
            .zip(self.depth.values.par_iter())
            .zip(self.samples.par_iter())
            .for_each(|((color, &depth), sample)| *color = shade(depth, sample));
    }
}

/// A band of rows of the frame, lent to one worker.
///
/// Coordinates passed in are frame coordinates; writes outside the band are ignored.
pub struct Tile<'a, S = ()> {
    color: &'a mut [u32],
    depth: &'a mut [f32],
    samples: &'a mut [S],
    width: u32,
    y0: u32,
    rows: u32,
}

impl<'a, S> Tile<'a, S> {
    /// Builds a tile over a whole frame of caller-provided slices.
    pub fn new(color: &'a mut [u32], depth: &'a mut [f32], samples: &'a mut [S], width: u32, height: u32) -> Self {
        debug_assert_eq!(color.len(), (width * height) as usize, "Color buffer size doesn't match dimensions");
        debug_assert_eq!(depth.len(), (width * height) as usize, "Depth buffer size doesn't match dimensions");
        debug_assert_eq!(samples.len(), (width * height) as usize, "Sample buffer size doesn't match dimensions");
        Self {
            color,
            depth,
            samples,
            width,
            y0: 0,
            rows: height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// First frame row covered by this tile.
    pub fn first_row(&self) -> i32 {
        self.y0 as i32
    }

    /// Last frame row covered by this tile (inclusive).
    pub fn last_row(&self) -> i32 {
        (self.y0 + self.rows) as i32 - 1
    }

    /// Local index of frame pixel (x, y), or None if outside this tile.
    #[inline]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || x >= self.width as i32 || y < self.first_row() || y > self.last_row() {
            return None;
        }
        Some((y as u32 - self.y0) as usize * self.width as usize + x as usize)
    }

    #[inline]
    pub fn depth(&self, index: usize) -> f32 {
        self.depth[index]
    }

    #[inline]
    pub fn set_depth(&mut self, index: usize, depth: f32) {
        self.depth[index] = depth;
    }

    #[inline]
    pub fn set_color(&mut self, index: usize, color: u32) {
        self.color[index] = color;
    }

    #[inline]
    pub fn color(&self, index: usize) -> u32 {
        self.color[index]
    }

    #[inline]
    pub fn sample_mut(&mut self, index: usize) -> &mut S {
        &mut self.samples[index]
    }

    /// Set a pixel without depth testing (for debug overlays).
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if let Some(index) = self.index(x, y) {
            self.color[index] = color;
        }
    }
}
