//! Debug overlay primitives: Bresenham lines and midpoint ellipses.
//!
//! Overlays ignore the depth buffer; they are drawn in the wireframe and vertex
//! render modes, which skip the triangle fill.

use super::framebuffer::Tile;
use crate::math::Vec3;

/// Radius of the ellipse drawn at each vertex in the vertex render modes.
pub const VERTEX_MARKER_RADIUS: i32 = 2;

/// Draws the three edges of a buffer-space triangle.
pub fn draw_triangle_wireframe<S>(tile: &mut Tile<'_, S>, points: [Vec3; 3], color: u32) {
    let [p0, p1, p2] = points.map(|p| (p.x.round() as i32, p.y.round() as i32));
    draw_line_bresenham(tile, p0, p1, color);
    draw_line_bresenham(tile, p1, p2, color);
    draw_line_bresenham(tile, p2, p0, color);
}

/// Draws a small ellipse marker on each vertex of a buffer-space triangle.
pub fn draw_triangle_vertices<S>(tile: &mut Tile<'_, S>, points: [Vec3; 3], color: u32) {
    for p in points {
        draw_ellipse(
            tile,
            (p.x.round() as i32, p.y.round() as i32),
            VERTEX_MARKER_RADIUS,
            VERTEX_MARKER_RADIUS,
            color,
        );
    }
}

/// Draws a line between two pixels using Bresenham's line algorithm.
///
/// For each step along the major axis the accumulated error decides whether to also
/// step along the minor axis; when both conditions hold the step is diagonal.
pub fn draw_line_bresenham<S>(tile: &mut Tile<'_, S>, from: (i32, i32), to: (i32, i32), color: u32) {
    let (mut x, mut y) = from;
    let (x1, y1) = to;

    let dx = (x1 - x).abs();
    let dy = (y1 - y).abs();
    let step_x = if x < x1 { 1 } else { -1 };
    let step_y = if y < y1 { 1 } else { -1 };

    // Positive error favors x movement, negative favors y.
    let mut err = dx - dy;

    loop {
        tile.set_pixel(x, y, color);
        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += step_x;
        }
        if e2 < dx {
            err += dx;
            y += step_y;
        }
    }
}

/// Outlines an axis-aligned ellipse with the midpoint algorithm.
///
/// Region 1 walks x while the curve's slope is shallower than -1, region 2 walks y
/// for the rest of the quadrant; the other three quadrants are mirrored.
pub fn draw_ellipse<S>(tile: &mut Tile<'_, S>, center: (i32, i32), rx: i32, ry: i32, color: u32) {
    let (cx, cy) = center;
    if rx <= 0 || ry <= 0 {
        tile.set_pixel(cx, cy, color);
        return;
    }

    let mut plot = |x: i32, y: i32| {
        tile.set_pixel(cx + x, cy + y, color);
        tile.set_pixel(cx - x, cy + y, color);
        tile.set_pixel(cx + x, cy - y, color);
        tile.set_pixel(cx - x, cy - y, color);
    };

    let rx2 = (rx * rx) as i64;
    let ry2 = (ry * ry) as i64;
    let (mut x, mut y) = (0i64, ry as i64);
    let mut px = 0i64;
    let mut py = 2 * rx2 * y;

    // Region 1
    let mut p = ry2 - rx2 * ry as i64 + rx2 / 4;
    while px < py {
        plot(x as i32, y as i32);
        x += 1;
        px += 2 * ry2;
        if p < 0 {
            p += ry2 + px;
        } else {
            y -= 1;
            py -= 2 * rx2;
            p += ry2 + px - py;
        }
    }

    // Region 2
    let mut p = ry2 * (2 * x + 1) * (2 * x + 1) / 4 + rx2 * (y - 1) * (y - 1) - rx2 * ry2;
    while y >= 0 {
        plot(x as i32, y as i32);
        y -= 1;
        py -= 2 * rx2;
        if p > 0 {
            p += rx2 - py;
        } else {
            x += 1;
            px += 2 * ry2;
            p += rx2 - py + px;
        }
    }
}
