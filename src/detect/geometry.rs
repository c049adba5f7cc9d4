use serde::Serialize;

// Slack for f32 sums such as 0.3 + 0.7.
const EDGE_TOLERANCE: f32 = 1e-6;

/// Normalised rectangle in image coordinates.
///
/// Origin and size are fractions of the image dimensions. A valid box stays
/// inside the unit square: `x + width <= 1` and `y + height <= 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl BoundingBox {
    /// Returns `None` unless every component is finite and the box fits the unit square.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Option<Self> {
        let components = [x, y, width, height];
        if components.iter().any(|v| !v.is_finite() || *v < 0.0 || *v > 1.0) {
            return None;
        }
        if x + width > 1.0 + EDGE_TOLERANCE || y + height > 1.0 + EDGE_TOLERANCE {
            return None;
        }
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Clamps an arbitrary rectangle into the unit square.
    ///
    /// Non-finite components become zero.
    pub fn clamped(x: f32, y: f32, width: f32, height: f32) -> Self {
        let unit = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        let x = unit(x);
        let y = unit(y);
        Self {
            x,
            y,
            width: unit(width).min(1.0 - x),
            height: unit(height).min(1.0 - y),
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }
}
