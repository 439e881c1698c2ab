use planmark_shared::{Annotation, DEFAULT_COLOR};
use serde_json::Value;
use uuid::Uuid;

use crate::state::{MAX_ANNOTATIONS, MAX_COLOR_BYTES, MAX_ID_LEN, MAX_TEXT_CHARS};

/// Parses a submitted list item by item. Items that are not annotations of a
/// known type are dropped.
pub fn parse_annotations(values: Vec<Value>) -> Vec<Annotation> {
    let total = values.len();
    let annotations: Vec<Annotation> = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Annotation>(value) {
            Ok(annotation) => Some(annotation),
            Err(err) => {
                tracing::debug!(%err, "dropping unreadable annotation");
                None
            }
        })
        .collect();
    if annotations.len() < total {
        tracing::warn!(
            dropped = total - annotations.len(),
            total,
            "dropped unreadable annotations"
        );
    }
    annotations
}

pub fn sanitize_annotations(annotations: Vec<Annotation>) -> Vec<Annotation> {
    let mut annotations: Vec<Annotation> = annotations
        .into_iter()
        .filter_map(sanitize_annotation)
        .collect();
    let overflow = annotations.len().saturating_sub(MAX_ANNOTATIONS);
    if overflow > 0 {
        tracing::warn!(overflow, "annotation limit reached; dropping oldest");
        annotations.drain(0..overflow);
    }
    annotations
}

fn sanitize_color(mut color: String) -> String {
    if color.is_empty() {
        return DEFAULT_COLOR.to_string();
    }
    if color.len() > MAX_COLOR_BYTES {
        let mut end = MAX_COLOR_BYTES;
        while !color.is_char_boundary(end) {
            end -= 1;
        }
        color.truncate(end);
    }
    color
}

fn sanitize_text(text: String) -> String {
    if text.chars().count() <= MAX_TEXT_CHARS {
        return text;
    }
    text.chars().take(MAX_TEXT_CHARS).collect()
}

fn sanitize_id(id: Option<String>) -> String {
    match id {
        Some(id) if !id.is_empty() && id.len() <= MAX_ID_LEN => id,
        _ => Uuid::now_v7().to_string(),
    }
}

fn sanitize_annotation(mut annotation: Annotation) -> Option<Annotation> {
    if !annotation.is_finite() {
        return None;
    }
    annotation.id = Some(sanitize_id(annotation.id.take()));
    annotation.color = sanitize_color(std::mem::take(&mut annotation.color));
    annotation.text = annotation.text.take().map(sanitize_text);
    Some(annotation)
}

#[cfg(test)]
mod tests {
    use planmark_shared::{AnnotationKind, Point};
    use serde_json::json;

    use super::*;

    fn marker(x: f64) -> Annotation {
        Annotation::point(AnnotationKind::Marker, Point::new(x, 0.0), "#0000FF")
    }

    #[test]
    fn unknown_types_and_junk_are_dropped() {
        let parsed = parse_annotations(vec![
            json!({"type": "square", "x": 1.0, "y": 2.0, "width": -4.0, "height": 3.0}),
            json!({"type": "laser", "x": 1.0, "y": 2.0}),
            json!({"type": "marker"}),
            json!(42),
        ]);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].kind, AnnotationKind::Square);
        assert_eq!(parsed[0].width, Some(-4.0));
    }

    #[test]
    fn non_finite_annotations_are_dropped() {
        let mut broken = marker(0.0);
        broken.y = f64::INFINITY;
        let mut ruler = Annotation::ruler(Point::ORIGIN, Point::new(3.0, 4.0), "#FFA500");
        ruler.end_x = Some(f64::NAN);
        let sanitized = sanitize_annotations(vec![broken, marker(1.0), ruler]);
        assert_eq!(sanitized.len(), 1);
        assert_eq!(sanitized[0].x, 1.0);
    }

    #[test]
    fn missing_ids_get_v7_uuids() {
        let mut kept = marker(0.0);
        kept.id = Some("cl0abc".to_string());
        let sanitized = sanitize_annotations(vec![kept, marker(1.0), marker(2.0)]);

        assert_eq!(sanitized[0].id.as_deref(), Some("cl0abc"));
        let first = sanitized[1].id.clone().expect("assigned id");
        let second = sanitized[2].id.clone().expect("assigned id");
        let first = Uuid::parse_str(&first).expect("uuid");
        let second = Uuid::parse_str(&second).expect("uuid");
        assert_eq!(first.get_version_num(), 7);
        assert_ne!(first, second);
    }

    #[test]
    fn color_and_text_are_bounded() {
        let mut empty_color = marker(0.0);
        empty_color.color = String::new();
        let mut long_color = marker(1.0);
        long_color.color = "#".repeat(100);
        let long_text = Annotation::text(Point::ORIGIN, "é".repeat(2500), "#008000");

        let sanitized = sanitize_annotations(vec![empty_color, long_color, long_text]);
        assert_eq!(sanitized[0].color, DEFAULT_COLOR);
        assert_eq!(sanitized[1].color.len(), MAX_COLOR_BYTES);
        let text = sanitized[2].text.as_deref().expect("text");
        assert_eq!(text.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn oldest_annotations_are_dropped_past_limit() {
        let annotations = (0..MAX_ANNOTATIONS + 5).map(|i| marker(i as f64)).collect();
        let sanitized = sanitize_annotations(annotations);
        assert_eq!(sanitized.len(), MAX_ANNOTATIONS);
        assert_eq!(sanitized[0].x, 5.0);
    }
}
