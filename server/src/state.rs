use std::collections::HashMap;
use std::sync::Arc;

use planmark_shared::Annotation;
use tokio::sync::RwLock;

use crate::storage::Storage;

pub const MAX_ANNOTATIONS: usize = 2000;
pub const MAX_TEXT_CHARS: usize = 2000;
pub const MAX_COLOR_BYTES: usize = 32;
pub const MAX_ID_LEN: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub plans: Arc<RwLock<HashMap<String, Arc<RwLock<FloorPlan>>>>>,
    pub storage: Arc<dyn Storage>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            plans: Arc::new(RwLock::new(HashMap::new())),
            storage,
        }
    }
}

/// Cached annotation list of one floor plan, in creation order.
#[derive(Debug, Default)]
pub struct FloorPlan {
    pub annotations: Vec<Annotation>,
}

impl FloorPlan {
    pub fn new(annotations: Vec<Annotation>) -> Self {
        Self { annotations }
    }
}
