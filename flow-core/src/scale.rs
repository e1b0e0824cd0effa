//! Mapping from the logical design canvas to device pixels.
//!
//! X positions and every size-like quantity use the width ratio so shapes keep
//! their proportions; Y positions use the height ratio so content fills the
//! viewport vertically.

use serde::{Deserialize, Serialize};

use crate::block::Position;

/// Size of a logical canvas in design units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    /// Width in logical units.
    pub width: f32,
    /// Height in logical units.
    pub height: f32,
}

impl CanvasSize {
    /// Create a canvas size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Canvas all current flows are authored against.
pub const DESIGN_CANVAS: CanvasSize = CanvasSize::new(393.0, 852.0);

/// Canvas used by flows authored before the canvas grew.
pub const LEGACY_CANVAS: CanvasSize = CanvasSize::new(320.0, 693.0);

/// Size of the device viewport in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in device pixels.
    pub width: f32,
    /// Height in device pixels.
    pub height: f32,
}

impl Viewport {
    /// Create a viewport.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DESIGN_CANVAS.width, DESIGN_CANVAS.height)
    }
}

/// A point in device pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DevicePoint {
    /// X in device pixels.
    pub x: f32,
    /// Y in device pixels.
    pub y: f32,
}

/// Converts logical canvas units to device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateScaler {
    canvas: CanvasSize,
    viewport: Viewport,
    uniform_scale: f32,
    y_scale: f32,
}

/// Ratio that degrades to 1.0 for a zero, negative or non-finite canvas dimension.
fn ratio(device: f32, logical: f32) -> f32 {
    let r = device / logical;
    if logical > 0.0 && r.is_finite() {
        r
    } else {
        1.0
    }
}

impl CoordinateScaler {
    /// Create a scaler for an arbitrary canvas.
    #[must_use]
    pub fn new(canvas: CanvasSize, viewport: Viewport) -> Self {
        Self {
            canvas,
            viewport,
            uniform_scale: ratio(viewport.width, canvas.width),
            y_scale: ratio(viewport.height, canvas.height),
        }
    }

    /// Create a scaler for the design canvas.
    #[must_use]
    pub fn for_viewport(viewport: Viewport) -> Self {
        Self::new(DESIGN_CANVAS, viewport)
    }

    /// Logical canvas.
    #[must_use]
    pub const fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// Device viewport.
    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Width-based scale, used for X positions and all sizes.
    #[must_use]
    pub const fn uniform_scale(&self) -> f32 {
        self.uniform_scale
    }

    /// Height-based scale, used for Y positions only.
    #[must_use]
    pub const fn y_scale(&self) -> f32 {
        self.y_scale
    }

    /// Scale a length (size, padding, font size, stroke width).
    #[must_use]
    pub fn scale(&self, value: f32) -> f32 {
        value * self.uniform_scale
    }

    /// Scale an X coordinate.
    #[must_use]
    pub fn scale_x(&self, x: f32) -> f32 {
        x * self.uniform_scale
    }

    /// Scale a Y coordinate.
    #[must_use]
    pub fn scale_y(&self, y: f32) -> f32 {
        y * self.y_scale
    }

    /// Scale a logical position to device pixels.
    #[must_use]
    pub fn scale_position(&self, position: Position) -> DevicePoint {
        DevicePoint {
            x: self.scale_x(position.x),
            y: self.scale_y(position.y),
        }
    }
}
