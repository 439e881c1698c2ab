use planmark_shared::{AnnotationKind, Point};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tool {
    Marker,
    Link,
    Pencil,
    Square,
    Toolbox,
    Text,
    Ruler,
    Compass,
}

impl Tool {
    pub const ALL: [Tool; 8] = [
        Tool::Marker,
        Tool::Link,
        Tool::Pencil,
        Tool::Square,
        Tool::Toolbox,
        Tool::Text,
        Tool::Ruler,
        Tool::Compass,
    ];

    /// Tools that span two points via a drag.
    pub fn is_draw_capable(self) -> bool {
        matches!(self, Tool::Square | Tool::Ruler)
    }

    /// Kind committed directly by a tap, for the point-placing tools.
    pub fn placed_kind(self) -> Option<AnnotationKind> {
        match self {
            Tool::Marker => Some(AnnotationKind::Marker),
            Tool::Link => Some(AnnotationKind::Link),
            Tool::Toolbox => Some(AnnotationKind::Toolbox),
            Tool::Compass => Some(AnnotationKind::Compass),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tool::Marker => "marker",
            Tool::Link => "link",
            Tool::Pencil => "pencil",
            Tool::Square => "square",
            Tool::Toolbox => "toolbox",
            Tool::Text => "text",
            Tool::Ruler => "ruler",
            Tool::Compass => "compass",
        }
    }
}

/// Two-point shape under construction, in image space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InProgressShape {
    pub start: Point,
    pub end: Point,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToolState {
    Idle,
    ToolSelected(Tool),
    Drawing { tool: Tool, shape: InProgressShape },
}

#[derive(Debug, Error, PartialEq)]
pub enum ToolError {
    #[error("no tool is selected")]
    NoToolSelected,
    #[error("{} does not draw shapes", .0.name())]
    NotDrawCapable(Tool),
    #[error("a {} shape is already being drawn", .0.name())]
    AlreadyDrawing(Tool),
    #[error("no shape is being drawn")]
    NotDrawing,
}

pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Selected tool plus the shape being dragged out, if any.
///
/// At most one shape exists, and only while a draw-capable tool is selected.
#[derive(Debug, Default)]
pub struct ToolMachine {
    state: ToolState,
}

impl Default for ToolState {
    fn default() -> Self {
        ToolState::Idle
    }
}

impl ToolMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ToolState {
        self.state
    }

    pub fn current_tool(&self) -> Option<Tool> {
        match self.state {
            ToolState::Idle => None,
            ToolState::ToolSelected(tool) | ToolState::Drawing { tool, .. } => Some(tool),
        }
    }

    pub fn in_progress_shape(&self) -> Option<InProgressShape> {
        match self.state {
            ToolState::Drawing { shape, .. } => Some(shape),
            _ => None,
        }
    }

    /// Toggle: picking the active tool again deselects it. Any shape in
    /// progress is dropped.
    pub fn select(&mut self, tool: Tool) -> Option<Tool> {
        let next = match self.current_tool() {
            Some(current) if current == tool => ToolState::Idle,
            _ => ToolState::ToolSelected(tool),
        };
        self.discard_shape_with_log("tool changed");
        tracing::debug!(from = ?self.state, to = ?next, "select tool");
        self.state = next;
        self.current_tool()
    }

    pub fn deselect(&mut self) {
        self.discard_shape_with_log("tool deselected");
        self.state = ToolState::Idle;
    }

    pub fn begin_shape(&mut self, start: Point) -> ToolResult<()> {
        match self.state {
            ToolState::Idle => Err(ToolError::NoToolSelected),
            ToolState::Drawing { tool, .. } => Err(ToolError::AlreadyDrawing(tool)),
            ToolState::ToolSelected(tool) if !tool.is_draw_capable() => {
                Err(ToolError::NotDrawCapable(tool))
            }
            ToolState::ToolSelected(tool) => {
                self.state = ToolState::Drawing {
                    tool,
                    shape: InProgressShape { start, end: start },
                };
                Ok(())
            }
        }
    }

    pub fn update_shape(&mut self, end: Point) -> ToolResult<()> {
        match &mut self.state {
            ToolState::Drawing { shape, .. } => {
                shape.end = end;
                Ok(())
            }
            _ => Err(ToolError::NotDrawing),
        }
    }

    /// Ends the drag, returning the tool and its final shape for committing.
    pub fn finish_shape(&mut self, end: Point) -> ToolResult<(Tool, InProgressShape)> {
        match self.state {
            ToolState::Drawing { tool, mut shape } => {
                shape.end = end;
                self.state = ToolState::ToolSelected(tool);
                Ok((tool, shape))
            }
            _ => Err(ToolError::NotDrawing),
        }
    }

    pub fn discard_shape(&mut self) -> Option<InProgressShape> {
        match self.state {
            ToolState::Drawing { tool, shape } => {
                self.state = ToolState::ToolSelected(tool);
                Some(shape)
            }
            _ => None,
        }
    }

    fn discard_shape_with_log(&mut self, reason: &str) {
        if let Some(shape) = self.discard_shape() {
            tracing::debug!(?shape, reason, "discarded in-progress shape");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selecting_the_active_tool_toggles_back_to_idle() {
        let mut machine = ToolMachine::new();
        assert_eq!(machine.select(Tool::Marker), Some(Tool::Marker));
        assert_eq!(machine.state(), ToolState::ToolSelected(Tool::Marker));
        assert_eq!(machine.select(Tool::Marker), None);
        assert_eq!(machine.state(), ToolState::Idle);
    }

    #[test]
    fn selecting_another_tool_switches_directly() {
        let mut machine = ToolMachine::new();
        machine.select(Tool::Ruler);
        assert_eq!(machine.select(Tool::Compass), Some(Tool::Compass));
    }

    #[test]
    fn draw_cycle_returns_to_tool_selected() {
        let mut machine = ToolMachine::new();
        machine.select(Tool::Square);
        machine.begin_shape(Point::new(50.0, 50.0)).expect("begin");
        machine.update_shape(Point::new(30.0, 40.0)).expect("update");
        assert_eq!(
            machine.in_progress_shape(),
            Some(InProgressShape {
                start: Point::new(50.0, 50.0),
                end: Point::new(30.0, 40.0),
            })
        );

        let (tool, shape) = machine.finish_shape(Point::new(10.0, 20.0)).expect("finish");
        assert_eq!(tool, Tool::Square);
        assert_eq!(shape.end, Point::new(10.0, 20.0));
        assert_eq!(machine.state(), ToolState::ToolSelected(Tool::Square));
        assert_eq!(machine.in_progress_shape(), None);
    }

    #[test]
    fn point_tools_never_enter_drawing() {
        let mut machine = ToolMachine::new();
        for tool in [Tool::Marker, Tool::Link, Tool::Toolbox, Tool::Compass] {
            machine.select(tool);
            assert_eq!(
                machine.begin_shape(Point::ORIGIN),
                Err(ToolError::NotDrawCapable(tool))
            );
            assert!(tool.placed_kind().is_some());
        }
    }

    #[test]
    fn invalid_transitions_leave_state_untouched() {
        let mut machine = ToolMachine::new();
        assert_eq!(
            machine.begin_shape(Point::ORIGIN),
            Err(ToolError::NoToolSelected)
        );
        assert_eq!(machine.update_shape(Point::ORIGIN), Err(ToolError::NotDrawing));
        assert_eq!(
            machine.finish_shape(Point::ORIGIN),
            Err(ToolError::NotDrawing)
        );

        machine.select(Tool::Ruler);
        machine.begin_shape(Point::ORIGIN).expect("begin");
        assert_eq!(
            machine.begin_shape(Point::new(1.0, 1.0)),
            Err(ToolError::AlreadyDrawing(Tool::Ruler))
        );
        assert_eq!(
            machine.in_progress_shape().map(|shape| shape.start),
            Some(Point::ORIGIN)
        );
    }

    #[test]
    fn changing_tool_mid_draw_drops_the_shape() {
        let mut machine = ToolMachine::new();
        machine.select(Tool::Ruler);
        machine.begin_shape(Point::ORIGIN).expect("begin");
        machine.select(Tool::Square);
        assert_eq!(machine.state(), ToolState::ToolSelected(Tool::Square));

        machine.begin_shape(Point::ORIGIN).expect("begin");
        machine.deselect();
        assert_eq!(machine.state(), ToolState::Idle);
    }

    #[test]
    fn error_messages_name_the_tool() {
        assert_eq!(
            ToolError::NotDrawCapable(Tool::Compass).to_string(),
            "compass does not draw shapes"
        );
    }
}
