use std::sync::Arc;

use serde_yaml_ng::Value;

use crate::backend::Backend;
use crate::error::Result;
use crate::lens::ContentPath;
use crate::record_file::{Fragment, Identity, RecordFile, RecordFileOptions};

/// Reserved field holding a document fragment's generated identity.
pub const DOCUMENT_ID_FIELD: &str = "PS_UUID";

/// A user document stored as `{name}.yaml`, its fragments under a content path.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    file: RecordFile,
}

impl Document {
    /// Document `name` whose fragments live at `content_path` inside the file.
    pub fn new(backend: Arc<dyn Backend>, name: &str, content_path: impl Into<ContentPath>) -> Self {
        let options = RecordFileOptions::new(format!("{}.yaml", name))
            .commit_message(format!("Edit {} using gitshelf", name))
            .content_path(content_path)
            .identity(Identity::generated(DOCUMENT_ID_FIELD));

        Self {
            name: name.to_string(),
            file: RecordFile::new(backend, options),
        }
    }

    /// Document name (file stem).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying record file.
    pub fn file(&self) -> &RecordFile {
        &self.file
    }

    /// All fragments, with identities generated where missing.
    pub async fn load(&self, reference: &str) -> Result<Vec<Fragment>> {
        self.file.load_fragments(reference).await
    }

    /// Union `fragments` into the document by identity.
    pub async fn update(&self, reference: &str, fragments: Vec<Fragment>) -> Result<String> {
        self.file
            .update(reference, Value::Sequence(fragments.into_iter().map(Value::Mapping).collect()))
            .await
    }

    /// Remove the fragment with identity `id`.
    pub async fn delete(&self, reference: &str, id: &str) -> Result<String> {
        self.file
            .delete_element(reference, &Value::String(id.to_string()))
            .await
    }
}
