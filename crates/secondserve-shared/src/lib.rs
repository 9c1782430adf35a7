//! # secondserve-shared
//!
//! Domain types shared by every Second Serve crate: typed identifiers, the
//! entity DTOs exchanged with the backend, the collaborator traits the
//! client composes, and the small pieces of pure logic (expiry display,
//! conversation grouping, listing search, distances) that several
//! workflows need.

pub mod backend;
pub mod constants;
pub mod conversations;
pub mod error;
pub mod expiry;
pub mod geo;
pub mod models;
pub mod push;
pub mod search;
pub mod types;

pub use error::BackendError;
