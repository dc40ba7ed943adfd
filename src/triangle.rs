use crate::math::{Vec2, Vec3};

/// Object-space vertex attributes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub const fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self { position, normal, uv }
    }
}

/// Three vertices held by value, the unit the rasterizers consume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub const fn new(a: Vertex, b: Vertex, c: Vertex) -> Self {
        Self { vertices: [a, b, c] }
    }

    /// Builds a triangle from positions alone; every vertex gets the face normal
    /// `(b - a) x (c - a)`.
    pub fn flat(a: Vec3, b: Vec3, c: Vec3, uvs: [Vec2; 3]) -> Self {
        let normal = (b - a).cross(c - a).normalize_or_zero();
        Self::new(
            Vertex::new(a, normal, uvs[0]),
            Vertex::new(b, normal, uvs[1]),
            Vertex::new(c, normal, uvs[2]),
        )
    }

    pub fn uvs(&self) -> [Vec2; 3] {
        self.vertices.map(|v| v.uv)
    }
}
