use std::sync::Arc;

use planmark_shared::{is_valid_floor_plan_id, Annotation};
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::logic::sanitize_annotations;
use crate::state::{AppState, FloorPlan};

pub fn normalize_floor_plan_id(value: &str) -> Option<String> {
    is_valid_floor_plan_id(value).then(|| value.to_string())
}

pub async fn get_or_load_plan(
    state: &AppState,
    floor_plan_id: &str,
) -> Result<Arc<RwLock<FloorPlan>>, StorageError> {
    if let Some(plan) = state.plans.read().await.get(floor_plan_id).cloned() {
        return Ok(plan);
    }
    let stored = state.storage.load_annotations(floor_plan_id).await?;
    tracing::debug!(
        floor_plan = floor_plan_id,
        stored = stored.as_ref().map(Vec::len),
        "loading floor plan"
    );
    let plan = Arc::new(RwLock::new(FloorPlan::new(sanitize_annotations(
        stored.unwrap_or_default(),
    ))));
    let mut plans = state.plans.write().await;
    let entry = plans
        .entry(floor_plan_id.to_string())
        .or_insert_with(|| plan.clone());
    Ok(entry.clone())
}

/// Sanitizes and stores `annotations` as the plan's whole list, returning
/// how many were kept.
///
/// The previous list is never read, so a damaged file is simply replaced.
/// Storage is written first; the cache changes only once the write succeeded.
pub async fn save_plan(
    state: &AppState,
    floor_plan_id: &str,
    annotations: Vec<Annotation>,
) -> Result<usize, StorageError> {
    let annotations = sanitize_annotations(annotations);
    let count = annotations.len();

    let cached = state.plans.read().await.get(floor_plan_id).cloned();
    if let Some(plan) = cached {
        let mut plan = plan.write().await;
        state
            .storage
            .save_annotations(floor_plan_id, &annotations)
            .await?;
        plan.annotations = annotations;
        return Ok(count);
    }

    let mut plans = state.plans.write().await;
    state
        .storage
        .save_annotations(floor_plan_id, &annotations)
        .await?;
    match plans.get(floor_plan_id) {
        Some(plan) => plan.write().await.annotations = annotations,
        None => {
            plans.insert(
                floor_plan_id.to_string(),
                Arc::new(RwLock::new(FloorPlan::new(annotations))),
            );
        }
    }
    Ok(count)
}
