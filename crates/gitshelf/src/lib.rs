//! # `gitshelf`
//!
//! Versioned collections of YAML records ("fragments") stored in a git
//! repository, either on local storage or hosted on GitHub.
//!
//! Every change is one commit on the bound reference:
//!
//! ```no_run
//! # async fn demo() -> gitshelf::Result<()> {
//! use gitshelf::{RepositoryLocator, Shelf};
//!
//! let shelf = Shelf::open(&RepositoryLocator::local("."), "master", "pokedex", "Pokedex").await?;
//! for fragment in shelf.get_fragments().await? {
//!     println!("{:?}", fragment);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
mod locator;
mod shelf;

pub use config::{BackendKind, ShelfConfig};
pub use locator::RepositoryLocator;
pub use shelf::Shelf;

pub use gitshelf_core::{
    Backend, BranchInfo, ContentPath, Document, FileCommit, Fragment, Identity, Mapping, Profile,
    RecordFile, RecordFileOptions, Result, Schema, ShelfError, UpdateStrategy, Value, Views,
};
pub use gitshelf_git::LocalGitBackend;
pub use gitshelf_github::{Credentials, GitHubBackend};
