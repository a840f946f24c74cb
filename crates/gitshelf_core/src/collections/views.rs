use std::sync::Arc;

use serde_yaml_ng::Value;

use crate::backend::Backend;
use crate::error::Result;
use crate::record_file::{Fragment, Identity, RecordFile, RecordFileOptions};

/// Identity field of a view.
pub const VIEW_KEY_FIELD: &str = "key";

/// Saved views in `views.yaml`, keyed by `key`.
#[derive(Debug, Clone)]
pub struct Views {
    file: RecordFile,
}

impl Views {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let options = RecordFileOptions::new("views.yaml")
            .commit_message("Edit views using gitshelf")
            .identity(Identity::keyed(VIEW_KEY_FIELD));

        Self {
            file: RecordFile::new(backend, options),
        }
    }

    pub fn file(&self) -> &RecordFile {
        &self.file
    }

    pub async fn load(&self, reference: &str) -> Result<Vec<Fragment>> {
        self.file.load_fragments(reference).await
    }

    pub async fn update(&self, reference: &str, views: Vec<Fragment>) -> Result<String> {
        self.file
            .update(reference, Value::Sequence(views.into_iter().map(Value::Mapping).collect()))
            .await
    }

    pub async fn delete(&self, reference: &str, key: &str) -> Result<String> {
        self.file
            .delete_element(reference, &Value::String(key.to_string()))
            .await
    }
}
