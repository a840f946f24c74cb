//! # `gitshelf_github`
//!
//! [`Backend`](gitshelf_core::Backend) over a repository hosted on GitHub.
//!
//! `authenticate` fetches the user profile and the repository's default
//! branch once and caches both; later calls are free. Branches that don't
//! exist yet are created from the default branch on first write.

mod api;
mod backend;

pub use backend::{Credentials, DEFAULT_API_URL, GitHubBackend};
