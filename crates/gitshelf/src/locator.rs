use std::path::PathBuf;
use std::sync::Arc;

use gitshelf_core::{Backend, Result};
use gitshelf_git::LocalGitBackend;
use gitshelf_github::{Credentials, DEFAULT_API_URL, GitHubBackend};

/// Where a shelf's repository lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryLocator {
    /// A repository on local storage.
    Local { path: PathBuf },
    /// A repository hosted on GitHub.
    GitHub {
        owner: String,
        name: String,
        credentials: Credentials,
        /// API root, [`DEFAULT_API_URL`] unless overridden.
        api_url: String,
    },
}

impl RepositoryLocator {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    /// A repository on github.com.
    pub fn github(owner: impl Into<String>, name: impl Into<String>, credentials: Credentials) -> Self {
        Self::GitHub {
            owner: owner.into(),
            name: name.into(),
            credentials,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Build the backend this locator points at. Nothing is contacted yet.
    pub fn connect(&self) -> Result<Arc<dyn Backend>> {
        Ok(match self {
            Self::Local { path } => Arc::new(LocalGitBackend::open(path)?),
            Self::GitHub {
                owner,
                name,
                credentials,
                api_url,
            } => Arc::new(
                GitHubBackend::new(owner.clone(), name.clone(), credentials.clone())
                    .with_base_url(api_url.clone()),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_locator_needs_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RepositoryLocator::local(dir.path()).connect().is_err());

        git2::Repository::init(dir.path()).unwrap();
        let backend = RepositoryLocator::local(dir.path()).connect().unwrap();
        assert!(backend.describe().starts_with("git:"));
    }

    #[test]
    fn test_github_locator() {
        let locator =
            RepositoryLocator::github("ash", "pokedex", Credentials::Token("token".to_string()));
        assert!(matches!(
            &locator,
            RepositoryLocator::GitHub { api_url, .. } if api_url == DEFAULT_API_URL
        ));
        assert_eq!(locator.connect().unwrap().describe(), "github:ash/pokedex");
    }
}
