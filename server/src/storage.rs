use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use planmark_shared::{
    decode_annotation_file, encode_annotation_file, Annotation, AnnotationFileData,
};
use tokio::sync::RwLock;

use crate::error::StorageError;

/// Durable home of each floor plan's annotation list.
#[async_trait]
pub trait Storage: Send + Sync {
    /// `Ok(None)` when nothing was ever saved for the plan.
    async fn load_annotations(
        &self,
        floor_plan_id: &str,
    ) -> Result<Option<Vec<Annotation>>, StorageError>;
    async fn save_annotations(
        &self,
        floor_plan_id: &str,
        annotations: &[Annotation],
    ) -> Result<(), StorageError>;
}

/// One annotation file per floor plan in a data directory.
pub struct FileStorage {
    data_dir: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn plan_path(&self, floor_plan_id: &str) -> PathBuf {
        self.data_dir.join(format!("{floor_plan_id}.pman"))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load_annotations(
        &self,
        floor_plan_id: &str,
    ) -> Result<Option<Vec<Annotation>>, StorageError> {
        let payload = match tokio::fs::read(self.plan_path(floor_plan_id)).await {
            Ok(payload) => payload,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let data = decode_annotation_file(&payload)?;
        Ok(Some(data.annotations))
    }

    async fn save_annotations(
        &self,
        floor_plan_id: &str,
        annotations: &[Annotation],
    ) -> Result<(), StorageError> {
        let payload = encode_annotation_file(&AnnotationFileData {
            annotations: annotations.to_vec(),
        })?;
        let path = self.plan_path(floor_plan_id);
        let partial = path.with_extension("pman.tmp");
        tokio::fs::write(&partial, payload).await?;
        tokio::fs::rename(&partial, &path).await?;
        Ok(())
    }
}

/// Keeps plans for the lifetime of the process.
#[derive(Default)]
pub struct MemoryStorage {
    plans: RwLock<HashMap<String, Vec<Annotation>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load_annotations(
        &self,
        floor_plan_id: &str,
    ) -> Result<Option<Vec<Annotation>>, StorageError> {
        Ok(self.plans.read().await.get(floor_plan_id).cloned())
    }

    async fn save_annotations(
        &self,
        floor_plan_id: &str,
        annotations: &[Annotation],
    ) -> Result<(), StorageError> {
        self.plans
            .write()
            .await
            .insert(floor_plan_id.to_string(), annotations.to_vec());
        Ok(())
    }
}
