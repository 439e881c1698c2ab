use planmark_shared::Point;

use crate::geometry::{euclidean_distance, midpoint, Surface};
use crate::state::Tool;
use crate::viewport::{Viewport, ZoomLimits};

pub const DOUBLE_TAP_WINDOW_MS: u64 = 300;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchPhase {
    /// First finger down.
    Begin,
    Move,
    /// Last finger up.
    End,
    /// The platform took the gesture away; nothing is committed.
    Cancel,
}

/// One sample of the raw touch stream, in screen coordinates.
///
/// `touches` lists the active contacts, primary first. On `End` it holds the
/// release positions; it may be empty, in which case the last seen position
/// is used.
#[derive(Clone, Debug, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub touches: Vec<Point>,
    pub timestamp_ms: u64,
}

impl TouchEvent {
    pub fn new(phase: TouchPhase, touches: Vec<Point>, timestamp_ms: u64) -> Self {
        Self {
            phase,
            touches,
            timestamp_ms,
        }
    }

    pub fn begin(at: Point, timestamp_ms: u64) -> Self {
        Self::new(TouchPhase::Begin, vec![at], timestamp_ms)
    }

    pub fn moved(touches: Vec<Point>, timestamp_ms: u64) -> Self {
        Self::new(TouchPhase::Move, touches, timestamp_ms)
    }

    pub fn end(at: Point, timestamp_ms: u64) -> Self {
        Self::new(TouchPhase::End, vec![at], timestamp_ms)
    }

    pub fn cancel(timestamp_ms: u64) -> Self {
        Self::new(TouchPhase::Cancel, Vec::new(), timestamp_ms)
    }
}

/// Snapshot of the viewer state the interpreter reads for one event.
#[derive(Clone, Copy, Debug)]
pub struct GestureContext {
    pub tool: Option<Tool>,
    pub viewport: Viewport,
    pub surface: Surface,
}

/// What a gesture asks the viewer to do. Points are in screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Intent {
    ZoomingChanged(bool),
    SetViewport { zoom_scale: f64, pan_offset: Point },
    ResetViewport,
    BeginShape(Point),
    UpdateShape(Point),
    FinishShape(Point),
    CancelShape,
    Place { tool: Tool, at: Point },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureConfig {
    pub double_tap_window_ms: u64,
    /// Largest start-to-release movement that still counts as a tap.
    pub tap_slop: f64,
    pub zoom_limits: ZoomLimits,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            double_tap_window_ms: DOUBLE_TAP_WINDOW_MS,
            tap_slop: 0.0,
            zoom_limits: ZoomLimits::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Route {
    Navigate,
    Draw,
    Place(Tool),
    Inert,
}

impl Route {
    fn for_tool(tool: Option<Tool>) -> Self {
        match tool {
            None => Route::Navigate,
            Some(tool) if tool.is_draw_capable() => Route::Draw,
            Some(Tool::Pencil) => Route::Inert,
            Some(tool) => Route::Place(tool),
        }
    }
}

#[derive(Debug)]
struct ActiveGesture {
    route: Route,
    start: Point,
    last: Point,
    max_touches: usize,
    pinch_distance: Option<f64>,
}

/// Turns the touch stream into [`Intent`]s.
///
/// The route (navigate, draw, place) is fixed when the gesture begins. A
/// selected tool always wins over zoom and pan.
#[derive(Debug, Default)]
pub struct GestureInterpreter {
    config: GestureConfig,
    active: Option<ActiveGesture>,
    last_tap_ms: Option<u64>,
}

impl GestureInterpreter {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            active: None,
            last_tap_ms: None,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn handle(&mut self, event: &TouchEvent, context: &GestureContext) -> Vec<Intent> {
        match event.phase {
            TouchPhase::Begin => self.begin(event, context),
            TouchPhase::Move => self.move_to(event, context),
            TouchPhase::End => self.end(event),
            TouchPhase::Cancel => self.cancel(),
        }
    }

    /// Abandons the current gesture without committing anything.
    pub fn cancel(&mut self) -> Vec<Intent> {
        let Some(active) = self.active.take() else {
            return Vec::new();
        };
        let mut intents = Vec::with_capacity(2);
        if active.route == Route::Draw {
            intents.push(Intent::CancelShape);
        }
        intents.push(Intent::ZoomingChanged(false));
        intents
    }

    fn begin(&mut self, event: &TouchEvent, context: &GestureContext) -> Vec<Intent> {
        let mut intents = Vec::new();
        if let Some(stale) = &self.active {
            tracing::warn!(route = ?stale.route, "gesture began before previous one released");
            intents.extend(self.cancel());
        }
        let Some(&start) = event.touches.first() else {
            return intents;
        };
        let route = Route::for_tool(context.tool);
        tracing::trace!(?route, ?start, "gesture begin");

        intents.push(Intent::ZoomingChanged(true));
        if route == Route::Draw {
            intents.push(Intent::BeginShape(start));
        }
        self.active = Some(ActiveGesture {
            route,
            start,
            last: start,
            max_touches: event.touches.len(),
            pinch_distance: None,
        });
        intents
    }

    fn move_to(&mut self, event: &TouchEvent, context: &GestureContext) -> Vec<Intent> {
        let limits = self.config.zoom_limits;
        let Some(active) = self.active.as_mut() else {
            return Vec::new();
        };
        let Some(&primary) = event.touches.first() else {
            return Vec::new();
        };
        active.max_touches = active.max_touches.max(event.touches.len());

        let mut intents = Vec::new();
        match active.route {
            Route::Navigate => {
                if let &[first, second, ..] = event.touches.as_slice() {
                    let distance = euclidean_distance(first, second);
                    if let Some(previous) = active.pinch_distance.filter(|d| *d > f64::EPSILON) {
                        let zoom_scale =
                            limits.clamp(context.viewport.zoom_scale * distance / previous);
                        let pan_offset = midpoint(first, second) - context.surface.screen_center();
                        intents.push(Intent::SetViewport {
                            zoom_scale,
                            pan_offset,
                        });
                    }
                    active.pinch_distance = Some(distance);
                } else if active.pinch_distance.take().is_some() {
                    // Back to one finger after a pinch: re-anchor so the pan does not jump.
                } else if context.viewport.is_zoomed_in() {
                    let delta = primary - active.last;
                    if delta != Point::ORIGIN {
                        intents.push(Intent::SetViewport {
                            zoom_scale: context.viewport.zoom_scale,
                            pan_offset: context.viewport.pan_offset + delta,
                        });
                    }
                }
            }
            Route::Draw => intents.push(Intent::UpdateShape(primary)),
            Route::Place(_) | Route::Inert => {}
        }
        active.last = primary;
        intents
    }

    fn end(&mut self, event: &TouchEvent) -> Vec<Intent> {
        let Some(active) = self.active.take() else {
            return Vec::new();
        };
        let release = event.touches.first().copied().unwrap_or(active.last);
        let is_tap = active.max_touches == 1
            && euclidean_distance(active.start, release) <= self.config.tap_slop;

        let mut intents = vec![Intent::ZoomingChanged(false)];
        match active.route {
            Route::Draw => intents.push(Intent::FinishShape(release)),
            Route::Place(tool) if is_tap => intents.push(Intent::Place { tool, at: release }),
            Route::Navigate if is_tap => {
                let now = event.timestamp_ms;
                let is_double = self.last_tap_ms.is_some_and(|last| {
                    now.saturating_sub(last) < self.config.double_tap_window_ms
                });
                if is_double {
                    intents.push(Intent::ResetViewport);
                }
                self.last_tap_ms = Some(now);
            }
            _ => {}
        }
        intents
    }
}
