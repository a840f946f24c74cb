//! The record engine: load, merge, and delete fragments in one YAML file.
//!
//! A [`RecordFile`] is configured with a file path, a commit message, an
//! optional [`ContentPath`] locating the collection inside the decoded file,
//! and an optional [`Identity`] naming the field that identifies fragments.
//!
//! # Update semantics
//!
//! - [`UpdateStrategy::Replace`]: `update` is `set`.
//! - [`UpdateStrategy::Merge`] without identity: the incoming value is deep
//!   merged into the stored one (mappings by key, sequences by index).
//! - [`UpdateStrategy::Merge`] with identity: union by identity. Incoming
//!   fragments replace stored fragments with the same identity and move to the
//!   front; the remaining stored fragments keep their order.
//!
//! Identities generated on load are not persisted until the next write.

use std::collections::HashSet;
use std::sync::Arc;

use serde_yaml_ng::{Mapping, Value};
use tracing::{debug, info};

use crate::backend::{Backend, FileCommit};
use crate::codec::Codec;
use crate::error::{Result, ShelfError};
use crate::lens::ContentPath;

/// One record within a collection.
pub type Fragment = Mapping;

/// Placeholder expanded to the file path in commit message templates.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// The field that identifies fragments within a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Field name, e.g. `key`.
    pub field: String,
    /// Whether fragments lacking the field get a generated identity.
    pub generate: bool,
}

impl Identity {
    /// Caller-supplied identities.
    pub fn keyed(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            generate: false,
        }
    }

    /// Identities generated when missing.
    pub fn generated(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            generate: true,
        }
    }

    /// Identity value of `fragment`, if it has a usable one.
    pub fn of<'a>(&self, fragment: &'a Value) -> Option<&'a Value> {
        fragment
            .as_mapping()
            .and_then(|map| map.get(self.field.as_str()))
            .filter(|id| !is_blank(id))
    }

    /// Give `fragment` a fresh identity if it lacks one and generation is on.
    pub fn ensure(&self, mut fragment: Value) -> Value {
        if self.generate && self.of(&fragment).is_none() {
            if let Value::Mapping(map) = &mut fragment {
                map.insert(Value::String(self.field.clone()), generate_id());
            }
        }
        fragment
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// A fresh, time-ordered unique identity.
pub fn generate_id() -> Value {
    Value::String(uuid::Uuid::now_v7().to_string())
}

/// How `update` combines incoming contents with the stored ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// Union by identity, or deep merge when there is no identity.
    #[default]
    Merge,
    /// Overwrite the stored contents.
    Replace,
}

/// Configuration for a [`RecordFile`].
#[derive(Debug, Clone)]
pub struct RecordFileOptions {
    path: String,
    commit_message: String,
    content_path: ContentPath,
    identity: Option<Identity>,
    strategy: UpdateStrategy,
}

impl RecordFileOptions {
    /// Options for `path` with a default commit message and no identity.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            commit_message: format!("Edit {} using gitshelf", FILE_PLACEHOLDER),
            content_path: ContentPath::default(),
            identity: None,
            strategy: UpdateStrategy::Merge,
        }
    }

    /// Commit message template; `{file}` expands to the file path.
    pub fn commit_message(mut self, template: impl Into<String>) -> Self {
        self.commit_message = template.into();
        self
    }

    /// Locate the collection inside the decoded file.
    pub fn content_path(mut self, path: impl Into<ContentPath>) -> Self {
        self.content_path = path.into();
        self
    }

    /// Field identifying fragments.
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// How `update` combines values.
    pub fn strategy(mut self, strategy: UpdateStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Load/merge/delete engine over one file in a backend.
#[derive(Clone)]
pub struct RecordFile {
    backend: Arc<dyn Backend>,
    options: RecordFileOptions,
}

impl std::fmt::Debug for RecordFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordFile")
            .field("backend", &self.backend.describe())
            .field("options", &self.options)
            .finish()
    }
}

impl RecordFile {
    /// Create a record file. The backend should already be authenticated.
    pub fn new(backend: Arc<dyn Backend>, options: RecordFileOptions) -> Self {
        Self { backend, options }
    }

    /// Repository-relative file path.
    pub fn path(&self) -> &str {
        &self.options.path
    }

    /// Identity configuration, if any.
    pub fn identity(&self) -> Option<&Identity> {
        self.options.identity.as_ref()
    }

    /// Where the collection lives inside the file.
    pub fn content_path(&self) -> &ContentPath {
        &self.options.content_path
    }

    /// Update strategy.
    pub fn strategy(&self) -> UpdateStrategy {
        self.options.strategy
    }

    /// Commit message with the template expanded.
    pub fn commit_message(&self) -> String {
        self.options
            .commit_message
            .replace(FILE_PLACEHOLDER, &self.options.path)
    }

    fn codec(&self) -> Result<Codec> {
        Codec::for_path(&self.options.path)
    }

    /// Read and decode the collection at `reference`.
    ///
    /// A content path that doesn't exist in the file yields `Null`. Fragments
    /// without an identity get a generated one when the identity is configured
    /// to generate.
    pub async fn load(&self, reference: &str) -> Result<Value> {
        let codec = self.codec()?;
        debug!("Loading {} at {}", self.options.path, reference);

        let text = self.backend.read_file(reference, &self.options.path).await?;
        let value = self.options.content_path.get(codec.decode(&text)?);

        Ok(match (&self.options.identity, value) {
            (Some(identity), Value::Sequence(items)) if identity.generate => {
                Value::Sequence(items.into_iter().map(|item| identity.ensure(item)).collect())
            }
            (_, value) => value,
        })
    }

    /// [`load`](Self::load), requiring a sequence of mappings.
    pub async fn load_fragments(&self, reference: &str) -> Result<Vec<Fragment>> {
        let items = self.load_sequence(reference).await?;
        items
            .into_iter()
            .map(|item| match item {
                Value::Mapping(map) => Ok(map),
                _ => Err(self.malformed("a sequence of mappings")),
            })
            .collect()
    }

    async fn load_sequence(&self, reference: &str) -> Result<Vec<Value>> {
        let value = self.load(reference).await?;
        self.sequence_of(value)
    }

    fn sequence_of(&self, value: Value) -> Result<Vec<Value>> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Sequence(items) => Ok(items),
            Value::Mapping(map) => Ok(vec![Value::Mapping(map)]),
            _ => Err(self.malformed("a sequence")),
        }
    }

    fn malformed(&self, expected: &'static str) -> ShelfError {
        ShelfError::Malformed {
            path: self.options.path.clone(),
            expected,
        }
    }

    /// Overwrite the collection at `reference` with `contents`.
    ///
    /// Returns the hash of the new commit.
    pub async fn set(&self, reference: &str, contents: Value) -> Result<String> {
        let codec = self.codec()?;
        let document = self.options.content_path.wrap(contents);
        let content = codec.encode(&document)?;

        let hash = self
            .backend
            .write_file(
                reference,
                FileCommit::new(&self.options.path, content, self.commit_message()),
            )
            .await?;

        info!(
            "Committed {} to {} on {} ({})",
            self.options.path,
            reference,
            self.backend.describe(),
            hash
        );
        Ok(hash)
    }

    /// Merge `contents` into the stored collection and write the result.
    pub async fn update(&self, reference: &str, contents: Value) -> Result<String> {
        self.codec()?;

        let merged = match (self.options.strategy, &self.options.identity) {
            (UpdateStrategy::Replace, _) => contents,
            (UpdateStrategy::Merge, None) => {
                let mut stored = self.load(reference).await?;
                // A null root merges nothing; nested nulls still overwrite.
                if !contents.is_null() {
                    deep_merge(&mut stored, contents);
                }
                stored
            }
            (UpdateStrategy::Merge, Some(identity)) => {
                let incoming = self.sequence_of(contents)?;
                let stored = self.load_sequence(reference).await?;
                debug!(
                    "Merging {} incoming fragment(s) into {} stored in {}",
                    incoming.len(),
                    stored.len(),
                    self.options.path
                );
                Value::Sequence(union_by_identity(identity, incoming, stored))
            }
        };

        self.set(reference, merged).await
    }

    /// Remove every fragment whose identity equals `id` and write the rest.
    ///
    /// Fails with [`ShelfError::UnsupportedOperation`] when the collection has
    /// no identity field. Deleting an absent identity rewrites the unchanged
    /// collection.
    pub async fn delete_element(&self, reference: &str, id: &Value) -> Result<String> {
        let Some(identity) = &self.options.identity else {
            return Err(ShelfError::UnsupportedOperation {
                path: self.options.path.clone(),
            });
        };
        self.codec()?;

        let remaining: Vec<Value> = self
            .load_sequence(reference)
            .await?
            .into_iter()
            .filter(|fragment| identity.of(fragment) != Some(id))
            .collect();

        self.set(reference, Value::Sequence(remaining)).await
    }
}

/// Incoming fragments first, then stored fragments whose identity wasn't seen.
///
/// Fragments without an identity are always kept.
pub fn union_by_identity(identity: &Identity, incoming: Vec<Value>, stored: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    incoming
        .into_iter()
        .map(|fragment| identity.ensure(fragment))
        .chain(stored)
        .filter(|fragment| match identity.of(fragment) {
            Some(id) => seen.insert(id.clone()),
            None => true,
        })
        .collect()
}

/// Recursively merge `source` into `target`.
///
/// Mappings merge key by key, sequences merge index by index (extra source
/// items are appended), anything else is replaced by `source`.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Mapping(target), Value::Mapping(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (Value::Sequence(target), Value::Sequence(source)) => {
            for (index, value) in source.into_iter().enumerate() {
                match target.get_mut(index) {
                    Some(existing) => deep_merge(existing, value),
                    None => target.push(value),
                }
            }
        }
        (slot, source) => *slot = source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml_ng::from_str(text).unwrap()
    }

    #[test]
    fn test_deep_merge_disjoint_keys() {
        let mut target = yaml("a: 1");
        deep_merge(&mut target, yaml("b: 2"));
        assert_eq!(target, yaml("a: 1\nb: 2"));
    }

    #[test]
    fn test_deep_merge_nested() {
        let mut target = yaml("outer:\n  keep: true\n  change: 1\nlist: [1, 2, 3]");
        deep_merge(&mut target, yaml("outer:\n  change: 2\n  add: x\nlist: [9]"));
        assert_eq!(
            target,
            yaml("outer:\n  keep: true\n  change: 2\n  add: x\nlist: [9, 2, 3]")
        );
    }

    #[test]
    fn test_deep_merge_sequence_of_mappings_by_index() {
        let mut target = yaml("- name: Title\n  type: Text\n");
        deep_merge(&mut target, yaml("- type: Short Text\n- name: Height\n"));
        assert_eq!(
            target,
            yaml("- name: Title\n  type: Short Text\n- name: Height\n")
        );
    }

    #[test]
    fn test_deep_merge_scalar_replaced() {
        let mut target = yaml("a: [1]");
        deep_merge(&mut target, yaml("a: plain"));
        assert_eq!(target, yaml("a: plain"));
    }

    #[test]
    fn test_union_moves_updated_to_front() {
        let identity = Identity::keyed("id");
        let stored = yaml("- {Title: Foo, id: X}\n- {Title: Bar, id: Y}")
            .as_sequence()
            .cloned()
            .unwrap();
        let incoming = vec![yaml("{Title: Baz, id: Y}")];

        let merged = union_by_identity(&identity, incoming, stored);
        assert_eq!(
            Value::Sequence(merged),
            yaml("- {Title: Baz, id: Y}\n- {Title: Foo, id: X}")
        );
    }

    #[test]
    fn test_union_keeps_first_incoming_duplicate() {
        let identity = Identity::keyed("key");
        let incoming = vec![yaml("{key: a, v: 1}"), yaml("{key: a, v: 2}")];
        let merged = union_by_identity(&identity, incoming, vec![yaml("{key: a, v: 0}")]);
        assert_eq!(merged, vec![yaml("{key: a, v: 1}")]);
    }

    #[test]
    fn test_union_never_collapses_missing_identities() {
        let identity = Identity::keyed("key");
        let incoming = vec![yaml("{title: one}"), yaml("{title: two}")];
        let merged = union_by_identity(&identity, incoming, vec![yaml("{title: three}")]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_union_generates_missing_identities() {
        let identity = Identity::generated("PS_UUID");
        let merged = union_by_identity(&identity, vec![yaml("{title: new}")], vec![]);
        let id = identity.of(&merged[0]).unwrap();
        assert!(id.as_str().is_some_and(|s| !s.is_empty()));
    }

    #[test]
    fn test_identity_treats_blank_as_missing() {
        let identity = Identity::generated("PS_UUID");
        let fragment = identity.ensure(yaml("{PS_UUID: '', title: x}"));
        assert!(identity.of(&fragment).is_some());

        let keyed = Identity::keyed("key");
        assert!(keyed.of(&yaml("{key: null}")).is_none());
        assert!(keyed.of(&yaml("plain")).is_none());
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let ids: HashSet<Value> = (0..64).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn test_commit_message_template() {
        let options = RecordFileOptions::new("views.yaml");
        assert_eq!(
            options.commit_message.replace(FILE_PLACEHOLDER, &options.path),
            "Edit views.yaml using gitshelf"
        );
    }
}
