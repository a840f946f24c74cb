use std::sync::Arc;

use serde_yaml_ng::Value;

use crate::backend::Backend;
use crate::error::Result;
use crate::record_file::{RecordFile, RecordFileOptions, UpdateStrategy};

/// Field definitions in `schema.yaml`.
///
/// The schema has no identity field: updates replace the whole file and
/// deleting elements is refused.
#[derive(Debug, Clone)]
pub struct Schema {
    file: RecordFile,
}

impl Schema {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let options = RecordFileOptions::new("schema.yaml")
            .commit_message("Edit schema using gitshelf")
            .strategy(UpdateStrategy::Replace);

        Self {
            file: RecordFile::new(backend, options),
        }
    }

    pub fn file(&self) -> &RecordFile {
        &self.file
    }

    pub async fn load(&self, reference: &str) -> Result<Value> {
        self.file.load(reference).await
    }

    pub async fn update(&self, reference: &str, schema: Value) -> Result<String> {
        self.file.update(reference, schema).await
    }

    /// Always fails: the schema has no elements to address.
    pub async fn delete(&self, reference: &str, id: &str) -> Result<String> {
        self.file
            .delete_element(reference, &Value::String(id.to_string()))
            .await
    }
}
