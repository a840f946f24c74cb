//! # `gitshelf_git`
//!
//! [`Backend`](gitshelf_core::Backend) over a repository on local storage.
//!
//! Writes never touch the index or working copy first: the blob, the updated
//! trees, and the commit are created in the object database and the branch ref
//! moves last. When the branch is the checked-out one, the written path is then
//! checked out so the working copy matches.

mod backend;
mod tree;

pub use backend::LocalGitBackend;
