//! Raw axis → surface pixel mapping.

use serde::{Deserialize, Serialize};

/// Destination surface supplied by the host.
///
/// `margin` is subtracted from both extents so a marker of that size drawn at the mapped
/// top-left corner stays on the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            margin: 30,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CoordinateMapper {
    surface: Surface,
}

impl CoordinateMapper {
    pub fn new(surface: Surface) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    /// Map a raw `(x, y)` pair. The y axis is flipped: raw `y = 0` is the bottom edge.
    pub fn map(&self, x: u16, y: u16) -> (i32, i32) {
        map(
            x,
            y,
            self.surface.width,
            self.surface.height,
            self.surface.margin,
        )
    }
}

/// `px = floor(x / 65535 * (width - margin))`, `py = floor((1 - y / 65535) * (height - margin))`.
///
/// A margin larger than an extent collapses that axis to 0.
pub fn map(x: u16, y: u16, width: u32, height: u32, margin: u32) -> (i32, i32) {
    let span_x = f64::from(width.saturating_sub(margin));
    let span_y = f64::from(height.saturating_sub(margin));
    let fx = f64::from(x) / f64::from(u16::MAX);
    let fy = f64::from(y) / f64::from(u16::MAX);
    let px = (fx * span_x).floor() as i32;
    let py = ((1.0 - fy) * span_y).floor() as i32;
    (px, py)
}
