//! In-memory backend for tests.
//!
//! Keeps a tiny branch/commit model behind a mutex: every branch is a list of
//! snapshots, each snapshot holding the full file map at that commit. Clones
//! share the same state, so a test can keep a handle for assertions while the
//! engine owns another.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::backend::{Backend, BranchInfo, FileCommit, Profile};
use crate::error::{Result, ShelfError};

#[derive(Debug, Clone)]
struct Snapshot {
    hash: String,
    message: String,
    files: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct State {
    head: String,
    branches: HashMap<String, Vec<Snapshot>>,
    next_commit: u64,
}

/// A backend that never leaves the process.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
    authentications: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Empty repository with `master` checked out.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                head: "master".to_string(),
                ..State::default()
            })),
            authentications: Arc::new(AtomicUsize::new(0)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Commit a file to the checked-out branch (builder pattern).
    pub fn with_file(self, path: &str, content: &str) -> Self {
        {
            let mut state = self.lock();
            let head = state.head.clone();
            state.commit(&head, FileCommit::new(path, content, format!("Update {}", path)));
        }
        self
    }

    /// Number of times `authenticate` actually ran.
    pub fn authentications(&self) -> usize {
        self.authentications.load(Ordering::SeqCst)
    }

    /// Make every subsequent `write_file` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of commits on `branch`.
    pub fn commit_count(&self, branch: &str) -> usize {
        self.lock().branches.get(branch).map_or(0, Vec::len)
    }

    /// Message of the tip commit of `branch`.
    pub fn last_message(&self, branch: &str) -> Option<String> {
        self.lock()
            .branches
            .get(branch)
            .and_then(|commits| commits.last())
            .map(|snapshot| snapshot.message.clone())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl State {
    fn commit(&mut self, branch: &str, commit: FileCommit) -> String {
        self.next_commit += 1;
        let hash = format!("{:040x}", self.next_commit);

        if !self.branches.contains_key(branch) {
            let base = self
                .branches
                .get(&self.head)
                .cloned()
                .unwrap_or_default();
            self.branches.insert(branch.to_string(), base);
        }

        let commits = self.branches.entry(branch.to_string()).or_default();
        let mut files = commits
            .last()
            .map(|snapshot| snapshot.files.clone())
            .unwrap_or_default();
        files.insert(commit.path, commit.content);
        commits.push(Snapshot {
            hash: hash.clone(),
            message: commit.message,
            files,
        });

        hash
    }

    fn resolve(&self, reference: &str) -> Option<BranchInfo> {
        if let Some(tip) = self.branches.get(reference).and_then(|c| c.last()) {
            return Some(BranchInfo {
                name: reference.to_string(),
                hash: tip.hash.clone(),
            });
        }

        let mut names: Vec<&String> = self.branches.keys().collect();
        names.sort_by_key(|name| (**name != self.head, (*name).clone()));
        names.into_iter().find_map(|name| {
            let commits = &self.branches[name];
            if commits.iter().any(|snapshot| snapshot.hash == reference) {
                commits.last().map(|tip| BranchInfo {
                    name: name.clone(),
                    hash: tip.hash.clone(),
                })
            } else {
                None
            }
        })
    }

    fn snapshot(&self, reference: &str) -> Option<&Snapshot> {
        if let Some(tip) = self.branches.get(reference).and_then(|c| c.last()) {
            return Some(tip);
        }
        self.branches
            .values()
            .flatten()
            .find(|snapshot| snapshot.hash == reference)
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    /// Counts every call and caches nothing, so tests can assert how often
    /// callers authenticate.
    async fn authenticate(&self) -> Result<Profile> {
        self.authentications.fetch_add(1, Ordering::SeqCst);
        Ok(Profile::default())
    }

    async fn resolve_branch(&self, reference: &str) -> Result<BranchInfo> {
        self.lock()
            .resolve(reference)
            .ok_or_else(|| ShelfError::not_found(format!("branch containing {}", reference)))
    }

    async fn read_file(&self, reference: &str, path: &str) -> Result<String> {
        self.lock()
            .snapshot(reference)
            .and_then(|snapshot| snapshot.files.get(path).cloned())
            .ok_or_else(|| ShelfError::not_found(format!("{}:{}", reference, path)))
    }

    async fn write_file(&self, reference: &str, commit: FileCommit) -> Result<String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ShelfError::backend("write rejected"));
        }
        Ok(self.lock().commit(reference, commit))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
