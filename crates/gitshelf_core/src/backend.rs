//! Storage backend contract.
//!
//! A backend knows how to authenticate, resolve a revision reference to a
//! branch, read one file at a reference, and write one file as a single commit
//! on a branch. The record engine only ever talks to this trait, so a local
//! working copy and a hosted repository are interchangeable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Authenticated identity returned by [`Backend::authenticate`].
///
/// Backends without a notion of users (a local repository) return the
/// default, empty profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Account login.
    #[serde(default)]
    pub login: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Public email.
    #[serde(default)]
    pub email: Option<String>,
}

impl Profile {
    /// Whether nothing is known about the user.
    pub fn is_empty(&self) -> bool {
        self.login.is_none() && self.name.is_none() && self.email.is_none()
    }
}

/// A branch and the hash of its tip commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    /// Branch name without the `refs/heads/` prefix.
    pub name: String,
    /// Full hex hash of the tip commit.
    pub hash: String,
}

/// One file change to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCommit {
    /// Repository-relative path, `/`-separated.
    pub path: String,
    /// New file contents.
    pub content: String,
    /// Commit message.
    pub message: String,
}

impl FileCommit {
    /// Convenience constructor.
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            message: message.into(),
        }
    }
}

/// Uniform contract for a versioned file store.
///
/// Every method is scoped to a revision `reference` (branch name or commit-ish).
#[async_trait]
pub trait Backend: Send + Sync {
    /// Establish credentials. Repeated calls after a success return the cached
    /// profile without contacting the remote again.
    async fn authenticate(&self) -> Result<Profile>;

    /// Resolve `reference` to a branch and its tip.
    ///
    /// A branch name resolves to itself. Any other commit-ish resolves to a
    /// branch that contains it.
    async fn resolve_branch(&self, reference: &str) -> Result<BranchInfo>;

    /// Raw text of `path` at `reference`.
    async fn read_file(&self, reference: &str, path: &str) -> Result<String>;

    /// Write one file as one commit on branch `reference`, creating the branch
    /// from the current checkout if needed. Returns the new commit hash.
    async fn write_file(&self, reference: &str, commit: FileCommit) -> Result<String>;

    /// Hash of the tip of the branch `reference` resolves to.
    async fn get_commit(&self, reference: &str) -> Result<String> {
        Ok(self.resolve_branch(reference).await?.hash)
    }

    /// Human readable locator, used in log lines.
    fn describe(&self) -> String;
}
