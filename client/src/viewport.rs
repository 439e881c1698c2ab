use planmark_shared::Point;

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;

/// Session-local zoom/pan transform; never persisted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub zoom_scale: f64,
    /// Screen pixels. Not bounded by the image extent.
    pub pan_offset: Point,
    /// Set while a finger is down; only the UI reads it.
    pub is_zooming: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom_scale: 1.0,
            pan_offset: Point::ORIGIN,
            is_zooming: false,
        }
    }
}

/// Inclusive zoom range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: MIN_ZOOM,
            max: MAX_ZOOM,
        }
    }
}

impl ZoomLimits {
    pub fn clamp(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.min;
        }
        zoom.clamp(self.min, self.max)
    }
}

impl Viewport {
    pub fn set(&mut self, zoom_scale: f64, pan_offset: Point, limits: &ZoomLimits) {
        self.zoom_scale = limits.clamp(zoom_scale);
        self.pan_offset = pan_offset;
    }

    pub fn reset(&mut self) {
        self.zoom_scale = 1.0;
        self.pan_offset = Point::ORIGIN;
    }

    pub fn is_zoomed_in(&self) -> bool {
        self.zoom_scale > 1.0
    }
}
