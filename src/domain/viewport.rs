// Visible time range of a plot
use serde::{Deserialize, Serialize};

/// Pixels of drag that double (or halve) the visible width.
const ZOOM_PIXELS_PER_OCTAVE: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub min: f64,
    pub max: f64,
}

impl Viewport {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// The live window ending at `now`.
    pub fn ending_at(now_ms: f64, width_ms: f64) -> Self {
        Self::new(now_ms - width_ms, now_ms)
    }

    /// Range of `width` centred on `center`.
    pub fn centered(center: f64, width: f64) -> Self {
        Self::new(center - width / 2.0, center + width / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn union(&self, other: &Viewport) -> Viewport {
        Viewport::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Linear pan: dragging right by `pixel_delta` moves the range back in time.
    pub fn panned(&self, pixel_delta: f64, pixel_span: f64) -> Viewport {
        if pixel_span <= 0.0 {
            return *self;
        }
        let motion = -pixel_delta * self.width() / pixel_span;
        Viewport::new(self.min + motion, self.max + motion)
    }

    /// Zoom about the center by `2^(-pixel_delta / 30)`.
    pub fn zoomed(&self, pixel_delta: f64) -> Viewport {
        self.zoomed_within(pixel_delta, 0.0, f64::INFINITY)
    }

    /// Zoom like `zoomed`, keeping the new width within `[min_width, max_width]`.
    pub fn zoomed_within(&self, pixel_delta: f64, min_width: f64, max_width: f64) -> Viewport {
        let factor = 2f64.powf(-pixel_delta / ZOOM_PIXELS_PER_OCTAVE);
        let width = self.width() * factor;
        let width = if width.is_nan() {
            min_width
        } else {
            width.min(max_width).max(min_width)
        };
        Viewport::centered(self.center(), width)
    }
}
