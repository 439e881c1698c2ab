use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use planmark_shared::{AnnotationsResponse, MessageResponse};
use serde_json::Value;

use crate::error::ApiError;
use crate::logic::parse_annotations;
use crate::plans::{get_or_load_plan, normalize_floor_plan_id, save_plan};
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

pub async fn health_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: "Server is running".to_string(),
    })
}

pub async fn get_annotations_handler(
    Path(floor_plan_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AnnotationsResponse>, ApiError> {
    let floor_plan_id =
        normalize_floor_plan_id(&floor_plan_id).ok_or(ApiError::InvalidFloorPlanId)?;
    let plan = get_or_load_plan(&state, &floor_plan_id).await?;
    let data = plan.read().await.annotations.clone();
    Ok(Json(AnnotationsResponse {
        success: true,
        data,
    }))
}

pub async fn save_annotations_handler(
    Path(floor_plan_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let floor_plan_id =
        normalize_floor_plan_id(&floor_plan_id).ok_or(ApiError::InvalidFloorPlanId)?;
    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let values = match body {
        Value::Object(mut fields) => match fields.remove("annotations") {
            Some(Value::Array(values)) => values,
            _ => {
                return Err(ApiError::BadRequest(
                    "annotations must be a list".to_string(),
                ))
            }
        },
        _ => return Err(ApiError::BadRequest("expected a JSON object".to_string())),
    };
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("anonymous");

    let submitted = values.len();
    let saved = save_plan(&state, &floor_plan_id, parse_annotations(values)).await?;
    tracing::info!(
        floor_plan = %floor_plan_id,
        user = user_id,
        submitted,
        saved,
        "annotations saved"
    );
    Ok(Json(MessageResponse {
        success: true,
        message: "Annotations saved".to_string(),
    }))
}
