//! # secondserve-store
//!
//! SQLite-backed storage for Second Serve.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for every table, the
//! [`LocalBackend`] that serves the whole data-store contract (including the
//! nearby-NGO matching procedure) from that database, a filesystem
//! [`BlobStore`] for listing images, and the persisted auth session.

pub mod blob_store;
pub mod claims;
pub mod database;
pub mod listings;
pub mod local;
pub mod messages;
pub mod migrations;
pub mod profiles;
pub mod session;

mod error;

pub use blob_store::BlobStore;
pub use database::Database;
pub use error::StoreError;
pub use local::LocalBackend;
