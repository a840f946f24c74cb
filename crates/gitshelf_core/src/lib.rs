//! # `gitshelf_core`
//!
//! Record-merge and file-encoding engine for git-backed structured documents.
//!
//! Collections of records ("fragments") live in YAML files inside a git
//! repository. This crate loads a collection, merges changes into it by
//! identity, re-encodes it, and hands the result to a [`Backend`] which turns
//! it into exactly one commit. Backends live in their own crates
//! (`gitshelf_git`, `gitshelf_github`).

pub mod backend;
pub mod codec;
pub mod collections;
pub mod error;
pub mod lens;
pub mod record_file;

#[cfg(any(test, feature = "testing"))]
pub mod memory_backend;

pub use backend::{Backend, BranchInfo, FileCommit, Profile};
pub use codec::Codec;
pub use collections::{Document, Schema, Views};
pub use error::{Result, ShelfError};
pub use lens::ContentPath;
pub use record_file::{Fragment, Identity, RecordFile, RecordFileOptions, UpdateStrategy};

#[cfg(any(test, feature = "testing"))]
pub use memory_backend::InMemoryBackend;

/// YAML value type used for collection contents.
pub use serde_yaml_ng::{Mapping, Value};
