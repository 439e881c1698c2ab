use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

pub mod annotation_file;

pub use annotation_file::{
    decode_annotation_file, encode_annotation_file, AnnotationFileData, AnnotationFileDecodeError,
    AnnotationFileEncodeError,
};

/// Colour given to annotations that arrive without one.
pub const DEFAULT_COLOR: &str = "#8B0000";

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum AnnotationKind {
    Marker,
    Square,
    Link,
    Text,
    Toolbox,
    Compass,
    Ruler,
}

impl AnnotationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationKind::Marker => "marker",
            AnnotationKind::Square => "square",
            AnnotationKind::Link => "link",
            AnnotationKind::Text => "text",
            AnnotationKind::Toolbox => "toolbox",
            AnnotationKind::Compass => "compass",
            AnnotationKind::Ruler => "ruler",
        }
    }
}

/// Axis-aligned box with non-negative extent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One markup primitive on a floor plan, in image-space coordinates.
///
/// `width`/`height` keep the sign of the drag that produced a square; use
/// [`Annotation::bounds`] for the box a renderer should draw.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl Annotation {
    /// A single-point annotation (marker, link, toolbox, compass, ...).
    pub fn point(kind: AnnotationKind, at: Point, color: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            x: at.x,
            y: at.y,
            width: None,
            height: None,
            end_x: None,
            end_y: None,
            distance: None,
            text: None,
            color: color.into(),
        }
    }

    pub fn square(start: Point, end: Point, color: impl Into<String>) -> Self {
        Self {
            width: Some(end.x - start.x),
            height: Some(end.y - start.y),
            ..Self::point(AnnotationKind::Square, start, color)
        }
    }

    /// Ruler from `start` to `end`; the length is rounded once, here.
    pub fn ruler(start: Point, end: Point, color: impl Into<String>) -> Self {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        Self {
            end_x: Some(end.x),
            end_y: Some(end.y),
            distance: Some((dx * dx + dy * dy).sqrt().round()),
            ..Self::point(AnnotationKind::Ruler, start, color)
        }
    }

    pub fn text(at: Point, content: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            text: Some(content.into()),
            ..Self::point(AnnotationKind::Text, at, color)
        }
    }

    pub fn anchor(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn end_point(&self) -> Option<Point> {
        Some(Point::new(self.end_x?, self.end_y?))
    }

    /// Normalized box covered by a square or ruler; `None` for point kinds.
    pub fn bounds(&self) -> Option<Bounds> {
        let (far_x, far_y) = match self.kind {
            AnnotationKind::Square => (self.x + self.width?, self.y + self.height?),
            AnnotationKind::Ruler => (self.end_x?, self.end_y?),
            _ => return None,
        };
        Some(Bounds {
            x: self.x.min(far_x),
            y: self.y.min(far_y),
            width: (far_x - self.x).abs(),
            height: (far_y - self.y).abs(),
        })
    }

    pub fn is_finite(&self) -> bool {
        let optional = [
            self.width,
            self.height,
            self.end_x,
            self.end_y,
            self.distance,
        ];
        self.anchor().is_finite() && optional.iter().flatten().all(|value| value.is_finite())
    }
}

pub const MAX_FLOOR_PLAN_ID_LEN: usize = 64;

/// Floor plan ids are 1-64 characters of `[A-Za-z0-9_-]`, so they are safe
/// as a URL path segment and as a file name.
pub fn is_valid_floor_plan_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_FLOOR_PLAN_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AnnotationsResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<Annotation>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SaveAnnotationsRequest {
    pub annotations: Vec<Annotation>,
}

/// `{success, message}` body of the health check and of a save.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
