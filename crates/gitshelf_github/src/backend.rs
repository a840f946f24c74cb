use std::fmt;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use gitshelf_core::{Backend, BranchInfo, FileCommit, Profile, Result, ShelfError};

use crate::api;

/// Public GitHub API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const AGENT: &str = concat!("gitshelf/", env!("CARGO_PKG_VERSION"));
const MEDIA_TYPE: &str = "application/vnd.github+json";
const PAGE_SIZE: usize = 100;

/// Percent-encode each segment of `path`, keeping the `/` separators.
fn escape(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// An abbreviated or full commit sha.
fn looks_like_sha(reference: &str) -> bool {
    (7..=40).contains(&reference.len()) && reference.chars().all(|c| c.is_ascii_hexdigit())
}

/// How requests are authorized.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal access token, sent as a bearer token.
    Token(String),
    /// Username and password, sent as basic auth.
    Basic { username: String, password: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(..)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug)]
struct Session {
    profile: Profile,
    default_branch: String,
}

/// A repository hosted on GitHub, driven through the REST API.
///
/// Reads go through the contents API. Writes go through the git data API:
/// blob, tree, and commit are created first and the branch ref moves last
/// with a non-forced update.
pub struct GitHubBackend {
    owner: String,
    repo: String,
    credentials: Credentials,
    base_url: String,
    client: reqwest::Client,
    session: OnceCell<Session>,
}

impl fmt::Debug for GitHubBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubBackend")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GitHubBackend {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            credentials,
            base_url: DEFAULT_API_URL.to_string(),
            client: reqwest::Client::new(),
            session: OnceCell::new(),
        }
    }

    /// Talk to a different API root (GitHub Enterprise, a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn repo_path(&self, rest: &str) -> String {
        format!("/repos/{}/{}{}", self.owner, self.repo, rest)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(ACCEPT, MEDIA_TYPE)
            .header(USER_AGENT, AGENT);

        match &self.credentials {
            Credentials::Token(token) => builder.bearer_auth(token),
            Credentials::Basic { username, password } => builder.basic_auth(username, Some(password)),
        }
    }

    /// Send `builder` and decode a JSON body. 404 becomes `NotFound(what)`.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let resp = builder
            .send()
            .await
            .map_err(|e| ShelfError::backend(format!("{} request failed: {}", what, e)))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ShelfError::not_found(what));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("GitHub {} failed: {} {}", what, status, body);
            return Err(ShelfError::backend(format!("{} failed: {} {}", what, status, body)));
        }

        resp.json::<T>()
            .await
            .map_err(|e| ShelfError::backend(format!("{} returned an unexpected body: {}", what, e)))
    }

    async fn session(&self) -> Result<&Session> {
        self.session
            .get_or_try_init(|| async {
                let user: api::User = self
                    .send(self.request(Method::GET, "/user"), "user profile")
                    .await?;
                let repository: api::Repository = self
                    .send(
                        self.request(Method::GET, &self.repo_path("")),
                        &format!("repository {}/{}", self.owner, self.repo),
                    )
                    .await?;

                info!(
                    "Authenticated to {}/{} as {}",
                    self.owner, self.repo, user.login
                );
                Ok::<_, ShelfError>(Session {
                    profile: Profile {
                        login: Some(user.login),
                        name: user.name,
                        email: user.email,
                    },
                    default_branch: repository.default_branch,
                })
            })
            .await
    }

    async fn branch(&self, name: &str) -> Result<api::Branch> {
        self.send(
            self.request(Method::GET, &self.repo_path(&format!("/branches/{}", escape(name)))),
            &format!("branch {}", name),
        )
        .await
    }

    async fn ref_tip(&self, branch: &str) -> Result<String> {
        let git_ref: api::GitRef = self
            .send(
                self.request(Method::GET, &self.repo_path(&format!("/git/ref/heads/{}", escape(branch)))),
                &format!("ref heads/{}", branch),
            )
            .await?;
        Ok(git_ref.object.sha)
    }

    async fn create(&self, path: &str, body: &impl serde::Serialize, what: &str) -> Result<String> {
        let created: api::ShaRef = self
            .send(self.request(Method::POST, &self.repo_path(path)).json(body), what)
            .await?;
        Ok(created.sha)
    }

    /// Every branch, reading pages until one comes back short.
    async fn list_branches(&self) -> Result<Vec<api::Branch>> {
        let per_page = PAGE_SIZE.to_string();
        let mut branches = Vec::new();
        for page in 1u32.. {
            let page = page.to_string();
            let batch: Vec<api::Branch> = self
                .send(
                    self.request(Method::GET, &self.repo_path("/branches"))
                        .query(&[("per_page", per_page.as_str()), ("page", page.as_str())]),
                    "branch list",
                )
                .await?;
            let last = batch.len() < PAGE_SIZE;
            branches.extend(batch);
            if last {
                break;
            }
        }
        debug!("Listed {} branches of {}/{}", branches.len(), self.owner, self.repo);
        Ok(branches)
    }

    /// Whether `branch` contains the commit `reference`.
    async fn branch_contains(&self, branch: &api::Branch, reference: &str) -> Result<bool> {
        if looks_like_sha(reference) && branch.commit.sha.starts_with(reference) {
            return Ok(true);
        }
        let comparison: api::Comparison = self
            .send(
                self.request(
                    Method::GET,
                    &self.repo_path(&format!("/compare/{}...{}", escape(reference), escape(&branch.name))),
                ),
                &format!("commit {}", reference),
            )
            .await?;
        Ok(comparison.head_contains_base())
    }
}

#[async_trait]
impl Backend for GitHubBackend {
    async fn authenticate(&self) -> Result<Profile> {
        Ok(self.session().await?.profile.clone())
    }

    async fn resolve_branch(&self, reference: &str) -> Result<BranchInfo> {
        match self.branch(reference).await {
            Ok(branch) => {
                return Ok(BranchInfo {
                    name: branch.name,
                    hash: branch.commit.sha,
                });
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        let default_branch = self.session().await?.default_branch.as_str();
        let mut branches = self.list_branches().await?;
        branches.sort_by(|a, b| {
            (b.name == default_branch)
                .cmp(&(a.name == default_branch))
                .then_with(|| a.name.cmp(&b.name))
        });

        for branch in branches {
            if self.branch_contains(&branch, reference).await? {
                debug!("{} is contained in branch {}", reference, branch.name);
                return Ok(BranchInfo {
                    name: branch.name,
                    hash: branch.commit.sha,
                });
            }
        }

        Err(ShelfError::not_found(format!("branch containing {}", reference)))
    }

    async fn read_file(&self, reference: &str, path: &str) -> Result<String> {
        let location = format!("{}:{}", reference, path);
        let contents: api::Contents = self
            .send(
                self.request(Method::GET, &self.repo_path(&format!("/contents/{}", escape(path))))
                    .query(&[("ref", reference)]),
                &location,
            )
            .await?;

        if contents.encoding != "base64" {
            return Err(ShelfError::backend(format!(
                "{} has unsupported encoding {}",
                location, contents.encoding
            )));
        }

        let packed: String = contents
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = STANDARD
            .decode(packed)
            .map_err(|e| ShelfError::backend(format!("{} is not valid base64: {}", location, e)))?;

        debug!("Read {} ({} bytes)", location, bytes.len());
        String::from_utf8(bytes)
            .map_err(|_| ShelfError::backend(format!("{} is not valid UTF-8", location)))
    }

    async fn write_file(&self, reference: &str, commit: FileCommit) -> Result<String> {
        let session = self.session().await?;

        let (parent, branch_exists) = match self.ref_tip(reference).await {
            Ok(sha) => (sha, true),
            Err(err) if err.is_not_found() => {
                debug!(
                    "Creating branch {} from {}",
                    reference, session.default_branch
                );
                (self.ref_tip(&session.default_branch).await?, false)
            }
            Err(err) => return Err(err),
        };

        let parent_commit: api::GitCommit = self
            .send(
                self.request(Method::GET, &self.repo_path(&format!("/git/commits/{}", parent))),
                &format!("commit {}", parent),
            )
            .await?;

        let encoded = STANDARD.encode(commit.content.as_bytes());
        let blob = self
            .create(
                "/git/blobs",
                &api::NewBlob {
                    content: &encoded,
                    encoding: "base64",
                },
                "blob",
            )
            .await?;

        let tree = self
            .create(
                "/git/trees",
                &api::NewTree {
                    base_tree: &parent_commit.tree.sha,
                    tree: vec![api::TreeEntry {
                        path: &commit.path,
                        mode: "100644",
                        kind: "blob",
                        sha: &blob,
                    }],
                },
                "tree",
            )
            .await?;

        let sha = self
            .create(
                "/git/commits",
                &api::NewCommit {
                    message: &commit.message,
                    tree: &tree,
                    parents: vec![&parent],
                },
                "commit",
            )
            .await?;

        if branch_exists {
            let _: serde_json::Value = self
                .send(
                    self.request(
                        Method::PATCH,
                        &self.repo_path(&format!("/git/refs/heads/{}", escape(reference))),
                    )
                    .json(&api::RefUpdate {
                        sha: &sha,
                        force: false,
                    }),
                    &format!("ref heads/{}", reference),
                )
                .await?;
        } else {
            let _: serde_json::Value = self
                .send(
                    self.request(Method::POST, &self.repo_path("/git/refs"))
                        .json(&api::NewRef {
                            name: format!("refs/heads/{}", reference),
                            sha: &sha,
                        }),
                    &format!("ref heads/{}", reference),
                )
                .await?;
        }

        info!(
            "Committed {} to {}/{}@{} ({})",
            commit.path, self.owner, self.repo, reference, sha
        );
        Ok(sha)
    }

    fn describe(&self) -> String {
        format!("github:{}/{}", self.owner, self.repo)
    }
}
