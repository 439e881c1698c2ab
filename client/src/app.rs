use std::sync::Arc;

use planmark_shared::{Annotation, Point};

use crate::config::ViewerConfig;
use crate::geometry::{screen_to_image, Surface};
use crate::gesture::{GestureContext, GestureInterpreter, Intent, TouchEvent};
use crate::net::HttpBackend;
use crate::palette::Palette;
use crate::persistence::{connect, AnnotationBackend, SyncEvent, SyncHandle};
use crate::state::{InProgressShape, Tool, ToolMachine, ToolState};
use crate::store::AnnotationStore;
use crate::viewport::{Viewport, ZoomLimits};

/// One floor plan on screen: viewport, tools, annotations and, when the
/// viewer knows who is editing which plan, a background synchronizer.
///
/// Input handling never waits on storage. Sync events are applied when the
/// host pumps them.
#[derive(Debug)]
pub struct FloorPlanViewer {
    surface: Surface,
    viewport: Viewport,
    zoom_limits: ZoomLimits,
    tools: ToolMachine,
    store: AnnotationStore,
    palette: Palette,
    gestures: GestureInterpreter,
    pending_text_anchor: Option<Point>,
    sync: Option<SyncHandle>,
    loads_applied: u64,
}

impl FloorPlanViewer {
    /// A viewer whose annotations stay local to the session.
    pub fn new(surface: Surface, config: &ViewerConfig) -> Self {
        let gesture_config = config.gesture_config();
        Self {
            surface,
            viewport: Viewport::default(),
            zoom_limits: gesture_config.zoom_limits,
            tools: ToolMachine::new(),
            store: AnnotationStore::new(),
            palette: Palette::new(config.palette.clone()),
            gestures: GestureInterpreter::new(gesture_config),
            pending_text_anchor: None,
            sync: None,
            loads_applied: 0,
        }
    }

    /// Opens a viewer synchronized with the configured HTTP API. Without a
    /// user or floor plan id (or outside a tokio runtime) it stays local.
    pub fn mount(
        surface: Surface,
        config: &ViewerConfig,
        user_id: Option<&str>,
        floor_plan_id: Option<&str>,
    ) -> Self {
        let backend = Arc::new(HttpBackend::new(
            config.api_url.clone(),
            config.request_timeout(),
        ));
        Self::mount_with_backend(surface, config, backend, user_id, floor_plan_id)
    }

    pub fn mount_with_backend(
        surface: Surface,
        config: &ViewerConfig,
        backend: Arc<dyn AnnotationBackend>,
        user_id: Option<&str>,
        floor_plan_id: Option<&str>,
    ) -> Self {
        let mut viewer = Self::new(surface, config);
        viewer.sync = connect(
            backend,
            user_id,
            floor_plan_id,
            config.save_quiet_period(),
        );
        viewer
    }

    pub fn attach_sync(&mut self, handle: SyncHandle) {
        if self.sync.is_some() {
            tracing::warn!(floor_plan = %handle.target().floor_plan_id, "replacing existing synchronizer");
        }
        self.loads_applied = 0;
        self.sync = Some(handle);
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn set_surface(&mut self, surface: Surface) {
        self.surface = surface;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport(&mut self, zoom_scale: f64, pan_offset: Point) {
        self.viewport.set(zoom_scale, pan_offset, &self.zoom_limits);
    }

    pub fn reset_viewport(&mut self) {
        self.viewport.reset();
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.store.annotations()
    }

    pub fn current_tool(&self) -> Option<Tool> {
        self.tools.current_tool()
    }

    pub fn tool_state(&self) -> ToolState {
        self.tools.state()
    }

    pub fn in_progress_shape(&self) -> Option<InProgressShape> {
        self.tools.in_progress_shape()
    }

    pub fn pending_text_anchor(&self) -> Option<Point> {
        self.pending_text_anchor
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn selected_color(&self) -> &str {
        self.palette.selected()
    }

    pub fn is_synchronized(&self) -> bool {
        self.sync.is_some()
    }

    pub fn handle_touch(&mut self, event: &TouchEvent) {
        let context = GestureContext {
            tool: self.tools.current_tool(),
            viewport: self.viewport,
            surface: self.surface,
        };
        for intent in self.gestures.handle(event, &context) {
            self.apply_intent(intent);
        }
    }

    /// Toggles `tool`; see [`ToolMachine::select`]. A gesture in progress
    /// is abandoned, so its release commits nothing.
    pub fn select_tool(&mut self, tool: Tool) -> Option<Tool> {
        self.abandon_gesture();
        self.pending_text_anchor = None;
        self.tools.select(tool)
    }

    pub fn deselect_tool(&mut self) {
        self.abandon_gesture();
        self.pending_text_anchor = None;
        self.tools.deselect();
    }

    pub fn cycle_color(&mut self) -> &str {
        self.palette.cycle()
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.palette.set(color);
    }

    pub fn undo(&mut self) -> Option<Annotation> {
        let removed = self.store.undo_last()?;
        self.annotations_changed();
        Some(removed)
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.store.clear_all();
        if removed > 0 {
            self.annotations_changed();
        }
        removed
    }

    /// Commits a text annotation at the anchor the text tool last tapped.
    pub fn submit_text(&mut self, content: &str) -> bool {
        let content = content.trim();
        if content.is_empty() {
            return false;
        }
        let Some(anchor) = self.pending_text_anchor.take() else {
            return false;
        };
        let color = self.palette.selected().to_string();
        self.commit(Annotation::text(anchor, content, color));
        true
    }

    /// Applies every sync event already delivered; returns how many.
    pub fn pump_sync_events(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.sync.as_mut().and_then(SyncHandle::try_next_event) {
            self.apply_sync_event(&event);
            applied += 1;
        }
        applied
    }

    /// Waits for the next sync event and applies it. `None` when the viewer
    /// is not synchronized or the synchronizer has stopped.
    pub async fn next_sync_event(&mut self) -> Option<SyncEvent> {
        let event = self.sync.as_mut()?.next_event().await?;
        self.apply_sync_event(&event);
        Some(event)
    }

    /// Saves any pending change and stops synchronizing.
    pub async fn close(mut self) {
        if let Some(sync) = self.sync.take() {
            sync.shutdown(true).await;
        }
    }

    fn abandon_gesture(&mut self) {
        for intent in self.gestures.cancel() {
            self.apply_intent(intent);
        }
    }

    fn apply_intent(&mut self, intent: Intent) {
        match intent {
            Intent::ZoomingChanged(active) => self.viewport.is_zooming = active,
            Intent::SetViewport {
                zoom_scale,
                pan_offset,
            } => self.viewport.set(zoom_scale, pan_offset, &self.zoom_limits),
            Intent::ResetViewport => self.viewport.reset(),
            Intent::BeginShape(at) => {
                let start = self.to_image(at);
                if let Err(err) = self.tools.begin_shape(start) {
                    tracing::debug!(%err, "ignoring shape start");
                }
            }
            Intent::UpdateShape(at) => {
                let end = self.to_image(at);
                if let Err(err) = self.tools.update_shape(end) {
                    tracing::trace!(%err, "ignoring shape update");
                }
            }
            Intent::FinishShape(at) => {
                let end = self.to_image(at);
                match self.tools.finish_shape(end) {
                    Ok((tool, shape)) => self.commit_shape(tool, shape),
                    Err(err) => tracing::debug!(%err, "ignoring shape finish"),
                }
            }
            Intent::CancelShape => {
                if let Some(shape) = self.tools.discard_shape() {
                    tracing::debug!(?shape, "gesture cancelled; shape discarded");
                }
            }
            Intent::Place { tool, at } => self.place(tool, self.to_image(at)),
        }
    }

    fn place(&mut self, tool: Tool, at: Point) {
        if tool == Tool::Text {
            self.pending_text_anchor = Some(at);
            return;
        }
        if let Some(kind) = tool.placed_kind() {
            let color = self.palette.selected().to_string();
            self.commit(Annotation::point(kind, at, color));
        }
    }

    fn commit_shape(&mut self, tool: Tool, shape: InProgressShape) {
        let color = self.palette.selected().to_string();
        let annotation = match tool {
            Tool::Square => Annotation::square(shape.start, shape.end, color),
            Tool::Ruler => Annotation::ruler(shape.start, shape.end, color),
            other => {
                tracing::warn!(tool = other.name(), "no shape annotation for tool");
                return;
            }
        };
        self.commit(annotation);
    }

    fn commit(&mut self, annotation: Annotation) {
        self.store.append(annotation);
        self.annotations_changed();
    }

    fn annotations_changed(&self) {
        if let Some(sync) = &self.sync {
            sync.annotations_changed(self.loads_applied, self.store.snapshot());
        }
    }

    fn apply_sync_event(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::Loaded(annotations) => {
                self.store.replace_all(annotations.clone());
                self.loads_applied += 1;
            }
            SyncEvent::LoadFailed(err) => {
                tracing::debug!(%err, "continuing without stored annotations");
            }
            SyncEvent::Saved { count } => tracing::trace!(count, "annotations saved"),
            SyncEvent::SaveFailed(err) => tracing::debug!(%err, "annotations not saved"),
        }
    }

    fn to_image(&self, point: Point) -> Point {
        screen_to_image(point, &self.viewport, &self.surface)
    }
}
