use planmark_shared::Point;

use crate::viewport::Viewport;

/// Size of a drawing surface or image, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// The screen area the floor plan is rendered into and the nominal size of
/// the image shown there.
///
/// Under the identity viewport the image centre sits on the screen centre.
/// When the image size is unknown the screen size stands in for it, which
/// makes screen and image space coincide at zoom 1 with no pan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surface {
    pub screen: Size,
    pub image: Size,
}

impl Surface {
    pub fn new(screen: Size) -> Self {
        Self {
            screen,
            image: screen,
        }
    }

    pub fn with_image(screen: Size, image: Size) -> Self {
        Self { screen, image }
    }

    pub fn screen_center(&self) -> Point {
        self.screen.center()
    }

    /// Image-space point drawn at the screen centre under the identity viewport.
    pub fn image_origin(&self) -> Point {
        self.image.center()
    }
}

pub fn screen_to_image(point: Point, viewport: &Viewport, surface: &Surface) -> Point {
    let shifted = point - surface.screen_center() - viewport.pan_offset;
    Point::new(
        shifted.x / viewport.zoom_scale,
        shifted.y / viewport.zoom_scale,
    ) + surface.image_origin()
}

pub fn image_to_screen(point: Point, viewport: &Viewport, surface: &Surface) -> Point {
    let relative = point - surface.image_origin();
    Point::new(
        relative.x * viewport.zoom_scale,
        relative.y * viewport.zoom_scale,
    ) + surface.screen_center()
        + viewport.pan_offset
}

pub fn euclidean_distance(a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

pub fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}
