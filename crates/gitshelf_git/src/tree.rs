//! In-memory tree editing.

use git2::{ObjectType, Oid, Repository, Tree};

const FILE_MODE: i32 = 0o100644;
const TREE_MODE: i32 = 0o040000;

/// Write a new tree equal to `base` with `blob` placed at `components`.
///
/// Intermediate directories are created as needed; sibling entries at every
/// level are carried over from `base`. A non-directory entry standing where a
/// directory is needed is replaced.
pub(crate) fn insert_blob(
    repo: &Repository,
    base: Option<&Tree<'_>>,
    components: &[&str],
    blob: Oid,
) -> Result<Oid, git2::Error> {
    let mut builder = repo.treebuilder(base)?;

    match components {
        [] => return Err(git2::Error::from_str("empty file path")),
        [name] => {
            builder.insert(*name, blob, FILE_MODE)?;
        }
        [dir, rest @ ..] => {
            let subtree = match base.and_then(|tree| tree.get_name(dir)) {
                Some(entry) if entry.kind() == Some(ObjectType::Tree) => {
                    Some(repo.find_tree(entry.id())?)
                }
                _ => None,
            };
            let subtree_oid = insert_blob(repo, subtree.as_ref(), rest, blob)?;
            builder.insert(*dir, subtree_oid, TREE_MODE)?;
        }
    }

    builder.write()
}

/// Split a repository-relative path into its components.
pub(crate) fn components(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect()
}
