//! Preconfigured collections.
//!
//! - [`Document`]: the user's fragments, nested under a content path, with
//!   generated identities.
//! - [`Views`]: saved views keyed by `key`.
//! - [`Schema`]: field definitions, replaced wholesale on update.

mod document;
mod schema;
mod views;

pub use document::{DOCUMENT_ID_FIELD, Document};
pub use schema::Schema;
pub use views::{VIEW_KEY_FIELD, Views};
