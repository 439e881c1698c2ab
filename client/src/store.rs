use planmark_shared::Annotation;

/// Authoritative annotation list for the open floor plan.
///
/// Order is creation order and records are never edited after they are
/// appended.
#[derive(Debug, Default, Clone)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Annotation> {
        self.annotations.clone()
    }

    pub fn append(&mut self, annotation: Annotation) {
        tracing::debug!(
            kind = annotation.kind.as_str(),
            index = self.annotations.len(),
            "append annotation"
        );
        self.annotations.push(annotation);
    }

    /// Removes the most recent annotation; nothing happens on an empty list.
    pub fn undo_last(&mut self) -> Option<Annotation> {
        self.annotations.pop()
    }

    /// Empties the list. There is no undo for this.
    pub fn clear_all(&mut self) -> usize {
        let removed = self.annotations.len();
        self.annotations.clear();
        removed
    }

    /// Wholesale replacement with a freshly loaded list. Local annotations
    /// that were never saved are lost.
    pub fn replace_all(&mut self, annotations: Vec<Annotation>) {
        if !self.annotations.is_empty() {
            tracing::debug!(
                discarded = self.annotations.len(),
                loaded = annotations.len(),
                "replacing local annotations with stored list"
            );
        }
        self.annotations = annotations;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planmark_shared::{AnnotationKind, Point};

    fn marker(x: f64) -> Annotation {
        Annotation::point(AnnotationKind::Marker, Point::new(x, x), "#8B0000")
    }

    #[test]
    fn append_preserves_creation_order() {
        let mut store = AnnotationStore::new();
        store.append(marker(1.0));
        store.append(marker(2.0));
        store.append(marker(3.0));
        let xs = store.annotations().iter().map(|a| a.x).collect::<Vec<_>>();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn undo_pops_newest_and_is_safe_on_empty() {
        let mut store = AnnotationStore::new();
        for index in 0..4 {
            store.append(marker(index as f64));
        }
        for expected in (0..4).rev() {
            assert_eq!(store.undo_last().map(|a| a.x), Some(expected as f64));
        }
        assert!(store.is_empty());
        assert_eq!(store.undo_last(), None);
        assert_eq!(store.undo_last(), None);
    }

    #[test]
    fn clear_reports_removed_count() {
        let mut store = AnnotationStore::new();
        store.append(marker(1.0));
        store.append(marker(2.0));
        assert_eq!(store.clear_all(), 2);
        assert_eq!(store.clear_all(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn replace_discards_local_annotations() {
        let mut store = AnnotationStore::new();
        store.append(marker(9.0));
        store.replace_all(vec![marker(1.0), marker(2.0)]);
        let xs = store.annotations().iter().map(|a| a.x).collect::<Vec<_>>();
        assert_eq!(xs, vec![1.0, 2.0]);
    }
}
