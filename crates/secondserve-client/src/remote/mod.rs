//! HTTP implementations of the collaborator traits.
//!
//! The backend project exposes PostgREST under `/rest/v1`, auth under
//! `/auth/v1` and object storage under `/storage/v1`; every request carries
//! the anon key as `apikey` and a bearer token (the session's access token
//! once signed in, the anon key before).

pub mod auth;
pub mod places;
pub mod push;
pub mod rest;
pub mod storage;

use serde::de::DeserializeOwned;
use tokio::sync::watch;

use secondserve_shared::backend::BackendResult;
use secondserve_shared::models::Session;
use secondserve_shared::BackendError;

pub use auth::RemoteAuth;
pub use places::GooglePlaces;
pub use push::ExpoPushRelay;
pub use rest::RestStore;
pub use storage::RemoteStorage;

pub(crate) fn transport(e: reqwest::Error) -> BackendError {
    BackendError::Transport(e.to_string())
}

pub(crate) fn decode(e: serde_json::Error) -> BackendError {
    BackendError::Decode(e.to_string())
}

/// Pick the human-readable message out of an error body. The backend
/// services disagree on the key.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "msg", "error_description", "error_message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    body.trim().to_string()
}

/// Turn a non-2xx response into [`BackendError::Api`].
pub(crate) async fn check(resp: reqwest::Response) -> BackendResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::debug!(status = %status, body = %body, "backend request failed");
    Err(BackendError::api(status.as_u16(), error_message(&body)))
}

pub(crate) async fn json<T: DeserializeOwned>(resp: reqwest::Response) -> BackendResult<T> {
    let resp = check(resp).await?;
    let bytes = resp.bytes().await.map_err(transport)?;
    serde_json::from_slice(&bytes).map_err(decode)
}

/// Connection details shared by the REST, auth and storage clients.
#[derive(Clone)]
pub struct Project {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: watch::Receiver<Option<Session>>,
}

impl Project {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        session: watch::Receiver<Option<Session>>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session,
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    fn bearer(&self) -> String {
        self.session
            .borrow()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    /// Request with `apikey` and the current bearer token.
    pub(crate) fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) fn project(
        uri: &str,
        session: Option<Session>,
    ) -> (Project, watch::Sender<Option<Session>>) {
        let (tx, rx) = watch::channel(session);
        (Project::new(reqwest::Client::new(), uri, "anon-key", rx), tx)
    }
}
