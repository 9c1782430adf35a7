//! Command handlers invoked by the UI layer.
//!
//! Each sub-module groups related commands by workflow. Every public
//! command takes the [`App`](crate::state::App) context and returns a
//! [`ClientResult`](crate::error::ClientResult); the UI turns errors into
//! dialogs with [`ClientError::alert`](crate::error::ClientError::alert).

pub mod auth;
pub mod bookmarks;
pub mod contact;
pub mod listings;
pub mod messaging;
pub mod profile;
pub mod settings;
