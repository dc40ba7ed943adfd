//! Floating point colors and the packed ARGB8888 pixel format.
//!
//! Shading math runs on [`Color`] with channels in [0, 1]; pixels are stored packed
//! as `0xAARRGGBB` so the buffer can be blitted straight into an ARGB8888 texture.

use std::ops::{Add, AddAssign, Mul, Sub};

/// Packed black, the cleared state of every color buffer.
pub const BLACK: u32 = 0xFF00_0000;
pub const WHITE: u32 = 0xFFFF_FFFF;
/// Debug overlay colors.
pub const WIREFRAME: u32 = 0xFF00_FF00;
pub const VERTEX: u32 = 0xFFFF_0000;

/// Linear RGBA color, one `f32` per channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub const fn gray(v: f32) -> Self {
        Self::rgb(v, v, v)
    }

    /// Clamps every color channel to [0, 1] and forces alpha to 1.
    pub fn saturate(self) -> Self {
        Self::rgb(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }

    /// Mean of the color channels.
    pub fn intensity(&self) -> f32 {
        (self.r + self.g + self.b) / 3.0
    }

    /// Weighted sum of three colors, used for barycentric interpolation.
    #[inline]
    pub fn blend(values: [Color; 3], weights: [f32; 3]) -> Self {
        values[0] * weights[0] + values[1] * weights[1] + values[2] * weights[2]
    }

    /// Packs into `0xAARRGGBB`, clamping each channel.
    #[inline]
    pub fn to_argb(self) -> u32 {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.a) << 24) | (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    #[inline]
    pub fn from_argb(packed: u32) -> Self {
        let channel = |shift: u32| ((packed >> shift) & 0xFF) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0), channel(24))
    }
}

impl Add<Color> for Color {
    type Output = Color;

    fn add(self, rhs: Color) -> Self::Output {
        Self::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b, self.a + rhs.a)
    }
}

impl AddAssign<Color> for Color {
    fn add_assign(&mut self, rhs: Color) {
        *self = *self + rhs;
    }
}

impl Sub<Color> for Color {
    type Output = Color;

    fn sub(self, rhs: Color) -> Self::Output {
        Self::new(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b, self.a - rhs.a)
    }
}

/// Channel-wise modulation.
impl Mul<Color> for Color {
    type Output = Color;

    fn mul(self, rhs: Color) -> Self::Output {
        Self::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b, self.a * rhs.a)
    }
}

impl Mul<f32> for Color {
    type Output = Color;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.r * rhs, self.g * rhs, self.b * rhs, self.a * rhs)
    }
}
