//! `LocalGitBackend` against scratch repositories.

use std::path::Path;
use std::sync::Arc;

use git2::{Repository, RepositoryInitOptions};
use gitshelf_core::{Backend, BranchInfo, Document, FileCommit};
use gitshelf_git::LocalGitBackend;
use tempfile::TempDir;

/// Empty repository with `master` as the unborn HEAD, whatever the host's
/// `init.defaultBranch` says.
fn scratch_repo() -> (TempDir, LocalGitBackend) {
    let dir = tempfile::tempdir().unwrap();
    let mut options = RepositoryInitOptions::new();
    options.initial_head("master");
    Repository::init_opts(dir.path(), &options).unwrap();

    let backend = LocalGitBackend::open(dir.path())
        .unwrap()
        .with_signature("Test", "test@example.com");
    (dir, backend)
}

async fn seeded_repo() -> (TempDir, LocalGitBackend, String) {
    let (dir, backend) = scratch_repo();
    let hash = backend
        .write_file("master", FileCommit::new("TEST", "Initial", "Initial commit"))
        .await
        .unwrap();
    (dir, backend, hash)
}

fn head_branch(path: &Path) -> String {
    let repo = Repository::open(path).unwrap();
    repo.head().unwrap().shorthand().unwrap().to_string()
}

#[tokio::test]
async fn test_authenticate_returns_empty_profile() {
    let (_dir, backend) = scratch_repo();
    let profile = backend.authenticate().await.unwrap();
    assert!(profile.is_empty());
}

#[tokio::test]
async fn test_commit_file_to_master() {
    let (dir, backend, _) = seeded_repo().await;

    backend
        .write_file("master", FileCommit::new("TEST", "Hello World", "Edit TEST"))
        .await
        .unwrap();

    assert_eq!(backend.read_file("master", "TEST").await.unwrap(), "Hello World");
    // Checked-out branch: the working copy follows.
    assert_eq!(
        std::fs::read_to_string(dir.path().join("TEST")).unwrap(),
        "Hello World"
    );
}

#[tokio::test]
async fn test_commit_file_to_other_branch() {
    let (dir, backend, _) = seeded_repo().await;

    backend
        .write_file("test", FileCommit::new("TEST", "Hello World", "Edit TEST"))
        .await
        .unwrap();

    assert_eq!(backend.read_file("test", "TEST").await.unwrap(), "Hello World");
    assert_eq!(backend.read_file("master", "TEST").await.unwrap(), "Initial");
    assert_eq!(head_branch(dir.path()), "master");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("TEST")).unwrap(),
        "Initial"
    );
}

#[tokio::test]
async fn test_new_branch_starts_from_head() {
    let (dir, backend, initial) = seeded_repo().await;

    let hash = backend
        .write_file("test", FileCommit::new("OTHER", "x", "Add OTHER"))
        .await
        .unwrap();

    // Files from HEAD are carried into the new branch.
    assert_eq!(backend.read_file("test", "TEST").await.unwrap(), "Initial");

    let repo = Repository::open(dir.path()).unwrap();
    let commit = repo.find_commit(git2::Oid::from_str(&hash).unwrap()).unwrap();
    assert_eq!(commit.parent_count(), 1);
    assert_eq!(commit.parent_id(0).unwrap().to_string(), initial);
    assert_eq!(commit.message(), Some("Add OTHER"));
    assert_eq!(commit.author().name(), Some("Test"));
}

#[tokio::test]
async fn test_branch_info_from_hash() {
    let (_dir, backend, _) = seeded_repo().await;

    let hash = backend
        .write_file("test", FileCommit::new("TEST", "Hello World", "Edit TEST"))
        .await
        .unwrap();

    assert_eq!(
        backend.resolve_branch(&hash).await.unwrap(),
        BranchInfo {
            name: "test".to_string(),
            hash: hash.clone(),
        }
    );
    // Abbreviated hashes resolve too.
    assert_eq!(backend.resolve_branch(&hash[..10]).await.unwrap().name, "test");
}

#[tokio::test]
async fn test_shared_commit_prefers_checked_out_branch() {
    let (_dir, backend, initial) = seeded_repo().await;
    backend
        .write_file("another", FileCommit::new("TEST", "elsewhere", "Edit TEST"))
        .await
        .unwrap();

    let branch = backend.resolve_branch(&initial).await.unwrap();
    assert_eq!(branch.name, "master");
    assert_eq!(branch.hash, initial);
}

#[tokio::test]
async fn test_branch_info_from_name() {
    let (_dir, backend, _) = seeded_repo().await;

    let hash = backend
        .write_file("test", FileCommit::new("TEST", "Hello World", "Edit TEST"))
        .await
        .unwrap();

    assert_eq!(
        backend.resolve_branch("test").await.unwrap(),
        BranchInfo {
            name: "test".to_string(),
            hash,
        }
    );
}

#[tokio::test]
async fn test_last_commit_of_branch() {
    let (_dir, backend, _) = seeded_repo().await;

    let hash = backend
        .write_file("test", FileCommit::new("TEST", "Hello World", "Edit TEST"))
        .await
        .unwrap();

    assert_eq!(backend.get_commit("test").await.unwrap(), hash);
}

#[tokio::test]
async fn test_nested_path() {
    let (_dir, backend, _) = seeded_repo().await;

    backend
        .write_file("master", FileCommit::new("data/pokedex.yaml", "- a\n", "Add pokedex"))
        .await
        .unwrap();
    backend
        .write_file("master", FileCommit::new("data/views.yaml", "- b\n", "Add views"))
        .await
        .unwrap();

    assert_eq!(backend.read_file("master", "data/pokedex.yaml").await.unwrap(), "- a\n");
    assert_eq!(backend.read_file("master", "data/views.yaml").await.unwrap(), "- b\n");
    assert_eq!(backend.read_file("master", "TEST").await.unwrap(), "Initial");
}

#[tokio::test]
async fn test_missing_things_are_not_found() {
    let (_dir, backend, _) = seeded_repo().await;

    assert!(backend.read_file("master", "absent.yaml").await.unwrap_err().is_not_found());
    assert!(backend.read_file("nope", "TEST").await.unwrap_err().is_not_found());
    assert!(backend.resolve_branch("nope").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_unborn_repository_reads_not_found() {
    let (_dir, backend) = scratch_repo();
    assert!(backend.read_file("master", "TEST").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_document_round_trip_through_git() {
    let (_dir, backend, _) = seeded_repo().await;
    backend
        .write_file(
            "master",
            FileCommit::new(
                "pokedex.yaml",
                "Document:\n  - Title: Bulbasaur\n    PS_UUID: one\n",
                "Seed",
            ),
        )
        .await
        .unwrap();

    let backend = Arc::new(backend);
    let document = Document::new(backend.clone(), "pokedex", "Document");

    let mut fragments = document.load("master").await.unwrap();
    fragments[0].insert("Title".into(), "Ivysaur".into());
    let hash = document.update("master", fragments).await.unwrap();

    assert_eq!(backend.get_commit("master").await.unwrap(), hash);
    let reloaded = document.load("master").await.unwrap();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded[0]["Title"], gitshelf_core::Value::from("Ivysaur"));
    assert_eq!(reloaded[0]["PS_UUID"], gitshelf_core::Value::from("one"));
}
