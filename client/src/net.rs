use std::time::Duration;

use async_trait::async_trait;
use planmark_shared::{is_valid_floor_plan_id, Annotation, SaveAnnotationsRequest};
use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use crate::persistence::{AnnotationBackend, SyncTarget};

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Annotation storage behind the floor plan API.
///
/// `ureq` blocks, so every request runs on tokio's blocking pool.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.into(),
            agent,
        }
    }

    /// Ids the service would reject are refused here, before they can
    /// change the shape of the URL.
    pub fn annotations_url(&self, floor_plan_id: &str) -> SyncResult<String> {
        if !is_valid_floor_plan_id(floor_plan_id) {
            return Err(SyncError::InvalidFloorPlanId(floor_plan_id.to_string()));
        }
        Ok(format!(
            "{}/floor-plans/{}/annotations",
            self.base_url.trim_end_matches('/'),
            floor_plan_id
        ))
    }
}

#[async_trait]
impl AnnotationBackend for HttpBackend {
    async fn load(&self, target: &SyncTarget) -> SyncResult<Vec<Annotation>> {
        let agent = self.agent.clone();
        let url = self.annotations_url(&target.floor_plan_id)?;
        let user_id = target.user_id.clone();
        let body = tokio::task::spawn_blocking(move || -> SyncResult<Value> {
            let response = agent
                .get(&url)
                .set(USER_ID_HEADER, &user_id)
                .call()
                .map_err(rejection_or_transport)?;
            Ok(response.into_json::<Value>()?)
        })
        .await??;
        parse_annotations_response(body)
    }

    async fn save(&self, target: &SyncTarget, annotations: &[Annotation]) -> SyncResult<()> {
        let agent = self.agent.clone();
        let url = self.annotations_url(&target.floor_plan_id)?;
        let user_id = target.user_id.clone();
        let payload = serde_json::to_value(SaveAnnotationsRequest {
            annotations: annotations.to_vec(),
        })?;
        let body = tokio::task::spawn_blocking(move || -> SyncResult<Value> {
            let response = agent
                .post(&url)
                .set(USER_ID_HEADER, &user_id)
                .send_json(payload)
                .map_err(rejection_or_transport)?;
            Ok(response.into_json::<Value>()?)
        })
        .await??;
        parse_save_response(&body)
    }
}

/// Status errors carry the server's `{success:false, error}` body; surface
/// its message instead of the bare status line when there is one.
fn rejection_or_transport(err: ureq::Error) -> SyncError {
    match err {
        ureq::Error::Status(status, response) => {
            let message = response
                .into_json::<Value>()
                .ok()
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| format!("status {status}"));
            SyncError::Rejected(message)
        }
        other => SyncError::Http(Box::new(other)),
    }
}

fn error_message(body: &Value) -> Option<String> {
    body.get("error")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn is_success(body: &Value) -> bool {
    body.get("success").and_then(Value::as_bool).unwrap_or(false)
}

/// Reads a load response item by item; records that do not parse (for
/// instance kinds this build does not know) are skipped.
pub fn parse_annotations_response(body: Value) -> SyncResult<Vec<Annotation>> {
    if !is_success(&body) {
        let message = error_message(&body).unwrap_or_else(|| "load failed".to_string());
        return Err(SyncError::Rejected(message));
    }
    let items = match body.get("data") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(SyncError::Rejected("data is not a list".to_string())),
    };
    let mut annotations = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match serde_json::from_value::<Annotation>(item.clone()) {
            Ok(annotation) if annotation.is_finite() => annotations.push(annotation),
            Ok(_) => tracing::warn!(index, "skipping annotation with non-finite coordinates"),
            Err(err) => tracing::warn!(index, %err, "skipping unreadable annotation"),
        }
    }
    Ok(annotations)
}

pub fn parse_save_response(body: &Value) -> SyncResult<()> {
    if is_success(body) {
        Ok(())
    } else {
        let message = error_message(body).unwrap_or_else(|| "save failed".to_string());
        Err(SyncError::Rejected(message))
    }
}

#[cfg(test)]
mod tests {
    use planmark_shared::AnnotationKind;
    use serde_json::json;

    use super::*;

    #[test]
    fn annotations_url_joins_base_and_plan() {
        let backend = HttpBackend::new("http://localhost:3000/api/", Duration::from_secs(1));
        assert_eq!(
            backend.annotations_url("plan-7").expect("valid id"),
            "http://localhost:3000/api/floor-plans/plan-7/annotations"
        );
    }

    #[test]
    fn ids_that_would_reshape_the_url_are_refused() {
        let backend = HttpBackend::new("http://localhost:3000/api", Duration::from_secs(1));
        for id in ["a/b", "plan?user=2", "plan#frag", "plan%2F", ".."] {
            assert!(
                matches!(
                    backend.annotations_url(id),
                    Err(SyncError::InvalidFloorPlanId(_))
                ),
                "{id}"
            );
        }
    }

    #[tokio::test]
    async fn invalid_id_fails_without_a_request() {
        let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_millis(50));
        let target = SyncTarget::new(Some("user-1"), Some("a/b")).expect("target");
        assert!(matches!(
            backend.load(&target).await,
            Err(SyncError::InvalidFloorPlanId(_))
        ));
    }

    #[test]
    fn load_response_skips_unknown_kinds() {
        let body = json!({
            "success": true,
            "data": [
                {"id": "a", "type": "marker", "x": 1.0, "y": 2.0, "color": "#0000FF"},
                {"id": "b", "type": "hologram", "x": 1.0, "y": 2.0},
                {"id": "c", "type": "ruler", "x": 0.0, "y": 0.0, "endX": 3.0, "endY": 4.0, "distance": 5.0},
                "not an object"
            ]
        });
        let annotations = parse_annotations_response(body).expect("parse");
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].kind, AnnotationKind::Marker);
        assert_eq!(annotations[1].kind, AnnotationKind::Ruler);
        assert_eq!(annotations[1].distance, Some(5.0));
    }

    #[test]
    fn load_response_without_data_is_empty() {
        let annotations = parse_annotations_response(json!({"success": true})).expect("parse");
        assert!(annotations.is_empty());
    }

    #[test]
    fn unsuccessful_responses_are_rejected() {
        let err = parse_annotations_response(json!({"success": false, "error": "Invalid floor plan ID"}))
            .expect_err("rejected");
        assert_eq!(
            err.to_string(),
            "storage rejected the request: Invalid floor plan ID"
        );
        assert!(parse_save_response(&json!({"success": false})).is_err());
        assert!(parse_save_response(&json!({"message": "saved"})).is_err());
        assert!(parse_save_response(&json!({"success": true, "message": "saved"})).is_ok());
    }
}
