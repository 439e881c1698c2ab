mod app;
pub mod config;
mod error;
pub mod geometry;
pub mod gesture;
pub mod net;
pub mod palette;
pub mod persistence;
pub mod state;
pub mod store;
pub mod viewport;

pub use app::FloorPlanViewer;
pub use config::{load_viewer_config, ViewerConfig};
pub use error::{SyncError, SyncResult};
pub use geometry::{Size, Surface};
pub use gesture::{TouchEvent, TouchPhase};
pub use persistence::{AnnotationBackend, SyncEvent, SyncHandle, SyncTarget};
pub use state::{Tool, ToolState};
pub use planmark_shared::{Annotation, AnnotationKind, Point};
