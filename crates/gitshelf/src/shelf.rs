use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use gitshelf_core::{
    Backend, ContentPath, Document, Fragment, Profile, RecordFile, RecordFileOptions, Result,
    Schema, ShelfError, Value, Views,
};

use crate::config::ShelfConfig;
use crate::locator::RepositoryLocator;

/// One document, its views and schema, and any extra collections, all bound
/// to a single revision reference of one repository.
///
/// Every operation authenticates first. Backends cache the session, so this
/// is free after the first call and no separate setup step is needed.
pub struct Shelf {
    backend: Arc<dyn Backend>,
    reference: String,
    document: Document,
    views: Views,
    schema: Schema,
    collections: IndexMap<String, RecordFile>,
}

impl std::fmt::Debug for Shelf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shelf")
            .field("backend", &self.backend.describe())
            .field("reference", &self.reference)
            .field("document", &self.document.name())
            .field("collections", &self.collections.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Shelf {
    /// Shelf over an existing backend. Nothing is contacted until the first
    /// operation.
    pub fn new(
        backend: Arc<dyn Backend>,
        reference: impl Into<String>,
        document: &str,
        content_path: impl Into<ContentPath>,
    ) -> Self {
        Self {
            document: Document::new(backend.clone(), document, content_path),
            views: Views::new(backend.clone()),
            schema: Schema::new(backend.clone()),
            backend,
            reference: reference.into(),
            collections: IndexMap::new(),
        }
    }

    /// Connect to the repository at `locator` and authenticate once.
    pub async fn open(
        locator: &RepositoryLocator,
        reference: impl Into<String>,
        document: &str,
        content_path: impl Into<ContentPath>,
    ) -> Result<Self> {
        let shelf = Self::new(locator.connect()?, reference, document, content_path);
        shelf.ready().await?;
        Ok(shelf)
    }

    /// [`open`](Self::open) with everything taken from `config`.
    pub async fn from_config(config: &ShelfConfig) -> Result<Self> {
        Self::open(
            &config.locator()?,
            config.reference.clone(),
            &config.document,
            config.content_path.as_str(),
        )
        .await
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Authenticate against the backend and return the user's profile.
    pub async fn ready(&self) -> Result<Profile> {
        self.backend.authenticate().await
    }

    pub async fn get_fragments(&self) -> Result<Vec<Fragment>> {
        self.ready().await?;
        self.document.load(&self.reference).await
    }

    /// Insert or replace one fragment, matched by its `PS_UUID`.
    ///
    /// A fragment without one gets a fresh identity. The fragment moves to the
    /// front of the document.
    pub async fn update_fragment(&self, fragment: Fragment) -> Result<String> {
        self.ready().await?;
        self.document.update(&self.reference, vec![fragment]).await
    }

    pub async fn delete_fragment(&self, id: &str) -> Result<String> {
        self.ready().await?;
        self.document.delete(&self.reference, id).await
    }

    pub async fn get_views(&self) -> Result<Vec<Fragment>> {
        self.ready().await?;
        self.views.load(&self.reference).await
    }

    pub async fn update_view(&self, view: Fragment) -> Result<String> {
        self.ready().await?;
        self.views.update(&self.reference, vec![view]).await
    }

    pub async fn delete_view(&self, key: &str) -> Result<String> {
        self.ready().await?;
        self.views.delete(&self.reference, key).await
    }

    pub async fn get_schema(&self) -> Result<Value> {
        self.ready().await?;
        self.schema.load(&self.reference).await
    }

    /// Replace the whole schema.
    pub async fn update_schema(&self, schema: Value) -> Result<String> {
        self.ready().await?;
        self.schema.update(&self.reference, schema).await
    }

    /// Hash of the tip of the bound reference.
    pub async fn commit_hash(&self) -> Result<String> {
        self.ready().await?;
        self.backend.get_commit(&self.reference).await
    }

    /// Add (or replace) a named collection backed by this shelf's repository.
    pub fn register_collection(&mut self, name: impl Into<String>, options: RecordFileOptions) -> &RecordFile {
        let name = name.into();
        debug!("Registering collection {}", name);
        let file = RecordFile::new(self.backend.clone(), options);
        self.collections.insert(name.clone(), file);
        &self.collections[&name]
    }

    pub fn collection(&self, name: &str) -> Option<&RecordFile> {
        self.collections.get(name)
    }

    /// Names of the registered collections, in registration order.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    fn require(&self, name: &str) -> Result<&RecordFile> {
        self.collection(name)
            .ok_or_else(|| ShelfError::not_found(format!("collection {}", name)))
    }

    pub async fn get_collection(&self, name: &str) -> Result<Value> {
        let file = self.require(name)?;
        self.ready().await?;
        file.load(&self.reference).await
    }

    /// Update one element of a named collection.
    ///
    /// With an identity field the element is wrapped in a one-element sequence
    /// and merged by identity; without one `element` is handed to `update`
    /// as-is.
    pub async fn update_collection(&self, name: &str, element: Value) -> Result<String> {
        let file = self.require(name)?;
        self.ready().await?;
        let contents = match file.identity() {
            Some(_) => Value::Sequence(vec![element]),
            None => element,
        };
        file.update(&self.reference, contents).await
    }

    pub async fn delete_from_collection(&self, name: &str, id: &Value) -> Result<String> {
        let file = self.require(name)?;
        self.ready().await?;
        file.delete_element(&self.reference, id).await
    }
}
