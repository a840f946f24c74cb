use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use gitshelf_core::{Result, ShelfError};
use gitshelf_github::{Credentials, DEFAULT_API_URL};

use crate::locator::RepositoryLocator;

/// Which backend a configuration selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Local repository (`git`).
    Git,
    /// GitHub repository (`github`).
    GitHub,
}

impl FromStr for BackendKind {
    type Err = ShelfError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "git" | "local" => Ok(Self::Git),
            "github" => Ok(Self::GitHub),
            other => Err(ShelfError::Config(format!("unknown backend {:?}", other))),
        }
    }
}

/// Shelf configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ShelfConfig {
    /// GITSHELF_BACKEND (default: git)
    pub backend: BackendKind,
    /// GITSHELF_REPOSITORY_PATH (default: .)
    pub repository_path: PathBuf,
    /// GITSHELF_GITHUB_OWNER
    pub github_owner: Option<String>,
    /// GITSHELF_GITHUB_REPO
    pub github_repo: Option<String>,
    /// GITSHELF_GITHUB_TOKEN, or GITSHELF_GITHUB_USERNAME + GITSHELF_GITHUB_PASSWORD
    pub github_credentials: Option<Credentials>,
    /// GITSHELF_GITHUB_API_URL (default: https://api.github.com)
    pub github_api_url: String,
    /// GITSHELF_REFERENCE (default: master)
    pub reference: String,
    /// GITSHELF_DOCUMENT, required
    pub document: String,
    /// GITSHELF_CONTENT_PATH (default: file root)
    pub content_path: String,
}

impl ShelfConfig {
    /// Load configuration from environment variables, reading `.env` first.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let backend = var("GITSHELF_BACKEND")
            .map(|value| value.parse::<BackendKind>())
            .transpose()?
            .unwrap_or(BackendKind::Git);

        let github_credentials = match (
            var("GITSHELF_GITHUB_TOKEN"),
            var("GITSHELF_GITHUB_USERNAME"),
            var("GITSHELF_GITHUB_PASSWORD"),
        ) {
            (Some(token), _, _) => Some(Credentials::Token(token)),
            (None, Some(username), Some(password)) => {
                Some(Credentials::Basic { username, password })
            }
            (None, Some(_), None) => {
                return Err(ShelfError::Config(
                    "GITSHELF_GITHUB_USERNAME is set without GITSHELF_GITHUB_PASSWORD".to_string(),
                ));
            }
            _ => None,
        };

        let document = var("GITSHELF_DOCUMENT")
            .ok_or_else(|| ShelfError::Config("GITSHELF_DOCUMENT is not set".to_string()))?;

        Ok(ShelfConfig {
            backend,
            repository_path: PathBuf::from(
                var("GITSHELF_REPOSITORY_PATH").unwrap_or_else(|| ".".to_string()),
            ),
            github_owner: var("GITSHELF_GITHUB_OWNER"),
            github_repo: var("GITSHELF_GITHUB_REPO"),
            github_credentials,
            github_api_url: var("GITSHELF_GITHUB_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            reference: var("GITSHELF_REFERENCE").unwrap_or_else(|| "master".to_string()),
            document,
            content_path: var("GITSHELF_CONTENT_PATH").unwrap_or_default(),
        })
    }

    /// The repository this configuration points at.
    pub fn locator(&self) -> Result<RepositoryLocator> {
        match self.backend {
            BackendKind::Git => Ok(RepositoryLocator::local(self.repository_path.clone())),
            BackendKind::GitHub => {
                let missing = |name: &str| ShelfError::Config(format!("{} is not set", name));
                Ok(RepositoryLocator::GitHub {
                    owner: self
                        .github_owner
                        .clone()
                        .ok_or_else(|| missing("GITSHELF_GITHUB_OWNER"))?,
                    name: self
                        .github_repo
                        .clone()
                        .ok_or_else(|| missing("GITSHELF_GITHUB_REPO"))?,
                    credentials: self
                        .github_credentials
                        .clone()
                        .ok_or_else(|| missing("GITSHELF_GITHUB_TOKEN"))?,
                    api_url: self.github_api_url.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ShelfConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ShelfConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("GITSHELF_DOCUMENT", "pokedex")]).unwrap();
        assert_eq!(config.backend, BackendKind::Git);
        assert_eq!(config.repository_path, PathBuf::from("."));
        assert_eq!(config.reference, "master");
        assert_eq!(config.content_path, "");
        assert_eq!(config.github_api_url, DEFAULT_API_URL);
        assert_eq!(config.locator().unwrap(), RepositoryLocator::local("."));
    }

    #[test]
    fn test_document_is_required() {
        let err = config(&[]).unwrap_err();
        assert!(matches!(err, ShelfError::Config(_)));
    }

    #[test]
    fn test_github_with_token() {
        let config = config(&[
            ("GITSHELF_BACKEND", "GitHub"),
            ("GITSHELF_GITHUB_OWNER", "ash"),
            ("GITSHELF_GITHUB_REPO", "pokedex"),
            ("GITSHELF_GITHUB_TOKEN", "ghp_x"),
            ("GITSHELF_GITHUB_USERNAME", "ignored"),
            ("GITSHELF_DOCUMENT", "pokedex"),
            ("GITSHELF_CONTENT_PATH", "Pokedex"),
            ("GITSHELF_REFERENCE", "draft"),
        ])
        .unwrap();

        assert_eq!(config.reference, "draft");
        assert_eq!(config.content_path, "Pokedex");
        assert_eq!(
            config.locator().unwrap(),
            RepositoryLocator::GitHub {
                owner: "ash".to_string(),
                name: "pokedex".to_string(),
                credentials: Credentials::Token("ghp_x".to_string()),
                api_url: DEFAULT_API_URL.to_string(),
            }
        );
    }

    #[test]
    fn test_github_with_password() {
        let config = config(&[
            ("GITSHELF_BACKEND", "github"),
            ("GITSHELF_GITHUB_USERNAME", "ash"),
            ("GITSHELF_GITHUB_PASSWORD", "pikachu"),
            ("GITSHELF_DOCUMENT", "pokedex"),
        ])
        .unwrap();
        assert_eq!(
            config.github_credentials,
            Some(Credentials::Basic {
                username: "ash".to_string(),
                password: "pikachu".to_string(),
            })
        );
        // Owner and repository are still missing.
        assert!(matches!(config.locator(), Err(ShelfError::Config(_))));
    }

    #[test]
    fn test_username_without_password() {
        let err = config(&[
            ("GITSHELF_GITHUB_USERNAME", "ash"),
            ("GITSHELF_DOCUMENT", "pokedex"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("GITSHELF_GITHUB_PASSWORD"));
    }

    #[test]
    fn test_unknown_backend() {
        let err = config(&[("GITSHELF_BACKEND", "svn"), ("GITSHELF_DOCUMENT", "x")]).unwrap_err();
        assert!(err.to_string().contains("svn"));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = config(&[("GITSHELF_DOCUMENT", "x"), ("GITSHELF_REFERENCE", "  ")]).unwrap();
        assert_eq!(config.reference, "master");
    }
}
