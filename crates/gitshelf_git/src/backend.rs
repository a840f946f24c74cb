use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{BranchType, Commit, ErrorCode, Oid, Repository, Signature};
use tracing::{debug, info};

use gitshelf_core::{Backend, BranchInfo, FileCommit, Profile, Result, ShelfError};

use crate::tree;

const DEFAULT_NAME: &str = "gitshelf";
const DEFAULT_EMAIL: &str = "gitshelf@localhost";

/// A repository on local storage.
///
/// The repository is reopened for every call, so the backend itself holds no
/// libgit2 handles and can be shared across tasks.
#[derive(Debug, Clone)]
pub struct LocalGitBackend {
    path: PathBuf,
    signature: Option<(String, String)>,
}

impl LocalGitBackend {
    /// Use the existing repository at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        Repository::open(&path).map_err(git_error)?;
        Ok(Self {
            path,
            signature: None,
        })
    }

    /// Create a repository at `path` (or reuse one that is already there).
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        Repository::init(&path).map_err(git_error)?;
        Ok(Self {
            path,
            signature: None,
        })
    }

    /// Commit as `name <email>` instead of the repository's configured user.
    pub fn with_signature(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.signature = Some((name.into(), email.into()));
        self
    }

    /// Repository directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn repo(&self) -> Result<Repository> {
        Repository::open(&self.path).map_err(git_error)
    }

    fn signature(&self, repo: &Repository) -> Result<Signature<'static>> {
        match &self.signature {
            Some((name, email)) => Signature::now(name, email).map_err(git_error),
            None => repo
                .signature()
                .or_else(|_| Signature::now(DEFAULT_NAME, DEFAULT_EMAIL))
                .map_err(git_error),
        }
    }
}

fn git_error(err: git2::Error) -> ShelfError {
    ShelfError::backend(err.message())
}

fn lookup_error(what: impl Into<String>) -> impl FnOnce(git2::Error) -> ShelfError {
    let what = what.into();
    move |err| match err.code() {
        ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::UnbornBranch => {
            ShelfError::not_found(what)
        }
        _ => git_error(err),
    }
}

fn commit_at<'r>(repo: &'r Repository, reference: &str) -> Result<Commit<'r>> {
    repo.revparse_single(reference)
        .and_then(|object| object.peel_to_commit())
        .map_err(lookup_error(reference))
}

/// Name of the checked-out branch, if HEAD points at one.
fn head_branch(repo: &Repository) -> Option<String> {
    let head = repo.find_reference("HEAD").ok()?;
    head.symbolic_target()
        .and_then(|target| target.strip_prefix("refs/heads/"))
        .map(str::to_string)
}

fn local_branches(repo: &Repository) -> Result<Vec<(String, Oid)>> {
    let mut branches = Vec::new();
    for entry in repo.branches(Some(BranchType::Local)).map_err(git_error)? {
        let (branch, _) = entry.map_err(git_error)?;
        let Some(name) = branch.name().map_err(git_error)?.map(str::to_string) else {
            continue;
        };
        let tip = branch.get().peel_to_commit().map_err(git_error)?.id();
        branches.push((name, tip));
    }
    Ok(branches)
}

#[async_trait]
impl Backend for LocalGitBackend {
    async fn authenticate(&self) -> Result<Profile> {
        self.repo()?;
        debug!("Using local repository {}", self.path.display());
        Ok(Profile::default())
    }

    async fn resolve_branch(&self, reference: &str) -> Result<BranchInfo> {
        let repo = self.repo()?;

        if let Ok(branch) = repo.find_branch(reference, BranchType::Local) {
            let tip = branch.get().peel_to_commit().map_err(git_error)?;
            return Ok(BranchInfo {
                name: reference.to_string(),
                hash: tip.id().to_string(),
            });
        }

        let target = commit_at(&repo, reference)?.id();
        let head = head_branch(&repo);
        let mut branches = local_branches(&repo)?;
        branches.sort_by(|(a, _), (b, _)| {
            let a_head = head.as_deref() == Some(a.as_str());
            let b_head = head.as_deref() == Some(b.as_str());
            b_head.cmp(&a_head).then_with(|| a.cmp(b))
        });

        for (name, tip) in branches {
            if tip == target || repo.graph_descendant_of(tip, target).map_err(git_error)? {
                debug!("{} is contained in branch {}", reference, name);
                return Ok(BranchInfo {
                    name,
                    hash: tip.to_string(),
                });
            }
        }

        Err(ShelfError::not_found(format!("branch containing {}", reference)))
    }

    async fn read_file(&self, reference: &str, path: &str) -> Result<String> {
        let repo = self.repo()?;
        let commit = commit_at(&repo, reference)?;
        let tree = commit.tree().map_err(git_error)?;

        let location = format!("{}:{}", reference, path);
        let entry = tree
            .get_path(Path::new(path))
            .map_err(lookup_error(location.clone()))?;
        let blob = entry
            .to_object(&repo)
            .and_then(|object| object.peel_to_blob())
            .map_err(lookup_error(location.clone()))?;

        debug!("Read {} ({} bytes)", location, blob.content().len());
        String::from_utf8(blob.content().to_vec())
            .map_err(|_| ShelfError::backend(format!("{} is not valid UTF-8", location)))
    }

    async fn write_file(&self, reference: &str, commit: FileCommit) -> Result<String> {
        let repo = self.repo()?;
        let refname = format!("refs/heads/{}", reference);

        let parent = match repo.find_reference(&refname) {
            Ok(existing) => Some(existing.peel_to_commit().map_err(git_error)?),
            Err(err) if err.code() == ErrorCode::NotFound => {
                debug!("Creating branch {} from HEAD", reference);
                match repo.head() {
                    Ok(head) => Some(head.peel_to_commit().map_err(git_error)?),
                    Err(err) if err.code() == ErrorCode::UnbornBranch => None,
                    Err(err) => return Err(git_error(err)),
                }
            }
            Err(err) => return Err(git_error(err)),
        };

        let base_tree = parent
            .as_ref()
            .map(|parent| parent.tree())
            .transpose()
            .map_err(git_error)?;
        let blob = repo.blob(commit.content.as_bytes()).map_err(git_error)?;
        let tree_oid = tree::insert_blob(
            &repo,
            base_tree.as_ref(),
            &tree::components(&commit.path),
            blob,
        )
        .map_err(git_error)?;
        let tree = repo.find_tree(tree_oid).map_err(git_error)?;

        let signature = self.signature(&repo)?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        let oid = repo
            .commit(
                Some(refname.as_str()),
                &signature,
                &signature,
                &commit.message,
                &tree,
                &parents,
            )
            .map_err(git_error)?;

        if !repo.is_bare() && head_branch(&repo).as_deref() == Some(reference) {
            let mut checkout = git2::build::CheckoutBuilder::new();
            checkout.force().path(commit.path.as_str());
            repo.checkout_head(Some(&mut checkout)).map_err(git_error)?;
        }

        info!("Committed {} to {} ({})", commit.path, reference, oid);
        Ok(oid.to_string())
    }

    fn describe(&self) -> String {
        format!("git:{}", self.path.display())
    }
}
