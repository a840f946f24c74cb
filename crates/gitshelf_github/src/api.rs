//! Request and response bodies for the parts of the GitHub REST API we use.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct User {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Repository {
    pub default_branch: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Branch {
    pub name: String,
    pub commit: ShaRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShaRef {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitRef {
    pub object: ShaRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitCommit {
    pub tree: ShaRef,
}

/// `GET /repos/{owner}/{repo}/compare/{base}...{head}`
#[derive(Debug, Deserialize)]
pub(crate) struct Comparison {
    /// `ahead`, `behind`, `identical`, or `diverged` (head relative to base).
    pub status: String,
}

impl Comparison {
    /// Whether head contains base.
    pub fn head_contains_base(&self) -> bool {
        matches!(self.status.as_str(), "ahead" | "identical")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Contents {
    pub content: String,
    pub encoding: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewBlob<'a> {
    pub content: &'a str,
    pub encoding: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewTree<'a> {
    pub base_tree: &'a str,
    pub tree: Vec<TreeEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TreeEntry<'a> {
    pub path: &'a str,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sha: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewCommit<'a> {
    pub message: &'a str,
    pub tree: &'a str,
    pub parents: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewRef<'a> {
    #[serde(rename = "ref")]
    pub name: String,
    pub sha: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefUpdate<'a> {
    pub sha: &'a str,
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_entry_uses_type_key() {
        let entry = TreeEntry {
            path: "views.yaml",
            mode: "100644",
            kind: "blob",
            sha: "abc",
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "blob");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_comparison_status() {
        let ahead: Comparison = serde_json::from_str(r#"{"status":"ahead"}"#).unwrap();
        let behind: Comparison = serde_json::from_str(r#"{"status":"behind"}"#).unwrap();
        assert!(ahead.head_contains_base());
        assert!(!behind.head_contains_base());
    }

    #[test]
    fn test_user_without_optional_fields() {
        let user: User = serde_json::from_str(r#"{"login":"ash","id":1}"#).unwrap();
        assert_eq!(user.login, "ash");
        assert!(user.name.is_none());
    }
}
