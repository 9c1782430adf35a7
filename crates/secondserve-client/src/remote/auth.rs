//! GoTrue-backed [`AuthProvider`].
//!
//! The current session lives in a `watch` channel so every subscriber sees
//! sign-in, refresh and sign-out. When a [`Database`] is attached the
//! session is also persisted there and restored on construction.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use secondserve_shared::backend::{AuthProvider, BackendResult};
use secondserve_shared::models::{AuthUser, Session, SignUpOutcome};
use secondserve_shared::BackendError;
use secondserve_store::Database;

use super::{json, Project};

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)));
        Session {
            user: self.user,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// Sign-up answers with a session when confirmation is off, otherwise with
/// the bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

pub struct RemoteAuth {
    project: Project,
    tx: watch::Sender<Option<Session>>,
    cache: Option<Arc<Mutex<Database>>>,
}

impl RemoteAuth {
    /// Session channel seeded from the cache. The receiver goes to
    /// [`Project::new`], the sender to [`RemoteAuth::new`].
    #[allow(clippy::type_complexity)]
    pub fn channel(
        cache: Option<&Arc<Mutex<Database>>>,
    ) -> (watch::Sender<Option<Session>>, watch::Receiver<Option<Session>>) {
        let restored = cache.and_then(|db| match db.lock() {
            Ok(db) => db.load_session().unwrap_or_else(|e| {
                warn!(error = %e, "Discarding unreadable cached session");
                None
            }),
            Err(_) => None,
        });
        if restored.is_some() {
            info!("Restored cached session");
        }
        watch::channel(restored)
    }

    pub fn new(
        project: Project,
        tx: watch::Sender<Option<Session>>,
        cache: Option<Arc<Mutex<Database>>>,
    ) -> Self {
        Self { project, tx, cache }
    }

    fn set_session(&self, session: Option<Session>) {
        if let Some(db) = &self.cache {
            let result = match (db.lock(), &session) {
                (Ok(db), Some(s)) => db.save_session(s),
                (Ok(db), None) => db.clear_session(),
                (Err(_), _) => {
                    warn!("Session cache lock poisoned");
                    Ok(())
                }
            };
            if let Err(e) = result {
                warn!(error = %e, "Failed to persist session");
            }
        }
        self.tx.send_replace(session);
    }

    async fn token(&self, grant: &str, body: serde_json::Value) -> BackendResult<Session> {
        let resp = self
            .project
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", grant)])
            .json(&body)
            .send()
            .await
            .map_err(super::transport)?;
        let token: TokenResponse = json(resp).await?;
        Ok(token.into_session(Utc::now()))
    }

    async fn refresh(&self, refresh_token: &str) -> BackendResult<Option<Session>> {
        match self
            .token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(session) => {
                debug!(user = %session.user.id, "Session refreshed");
                self.set_session(Some(session.clone()));
                Ok(Some(session))
            }
            Err(BackendError::Api { status, message }) if (400..500).contains(&status) => {
                warn!(status, message = %message, "Refresh rejected, signing out");
                self.set_session(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl AuthProvider for RemoteAuth {
    async fn current_session(&self) -> BackendResult<Option<Session>> {
        let current = self.tx.borrow().clone();
        match current {
            Some(session) if session.is_expired(Utc::now()) => match &session.refresh_token {
                Some(token) => self.refresh(token).await,
                None => {
                    self.set_session(None);
                    Ok(None)
                }
            },
            other => Ok(other),
        }
    }

    async fn current_user(&self) -> BackendResult<Option<AuthUser>> {
        if self.current_session().await?.is_none() {
            return Ok(None);
        }

        let resp = self
            .project
            .request(Method::GET, "/auth/v1/user")
            .send()
            .await
            .map_err(super::transport)?;

        match json::<AuthUser>(resp).await {
            Ok(user) => Ok(Some(user)),
            Err(BackendError::Api { status: 401 | 403, .. }) => {
                warn!("Access token rejected, clearing session");
                self.set_session(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session> {
        let session = self
            .token("password", json!({ "email": email, "password": password }))
            .await?;
        info!(user = %session.user.id, "Signed in");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpOutcome> {
        let resp = self
            .project
            .request(Method::POST, "/auth/v1/signup")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(super::transport)?;

        let outcome = match json::<SignUpResponse>(resp).await? {
            SignUpResponse::Session(token) => {
                let session = token.into_session(Utc::now());
                self.set_session(Some(session.clone()));
                SignUpOutcome {
                    user: session.user.clone(),
                    session: Some(session),
                }
            }
            SignUpResponse::User(user) => SignUpOutcome {
                user,
                session: None,
            },
        };
        info!(user = %outcome.user.id, confirmed = outcome.session.is_some(), "Signed up");
        Ok(outcome)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let signed_in = self.tx.borrow().is_some();
        if signed_in {
            let result = self
                .project
                .request(Method::POST, "/auth/v1/logout")
                .send()
                .await
                .map_err(super::transport);
            match result {
                Ok(resp) => {
                    if let Err(e) = super::check(resp).await {
                        warn!(error = %e, "Remote logout failed");
                    }
                }
                Err(e) => warn!(error = %e, "Remote logout failed"),
            }
        }
        self.set_session(None);
        info!("Signed out");
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secondserve_shared::types::UserId;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn auth_for(server: &MockServer, cache: Option<Arc<Mutex<Database>>>) -> RemoteAuth {
        let (tx, rx) = RemoteAuth::channel(cache.as_ref());
        let project = Project::new(reqwest::Client::new(), server.uri(), "anon-key", rx);
        RemoteAuth::new(project, tx, cache)
    }

    fn token_body(user: UserId, access: &str) -> serde_json::Value {
        json!({
            "access_token": access,
            "refresh_token": "r1",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": user, "email": "kitchen@hotelblue.in" }
        })
    }

    #[tokio::test]
    async fn sign_in_publishes_and_caches_session() {
        let server = MockServer::start().await;
        let user = UserId::new();
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon-key"))
            .and(body_json(json!({ "email": "kitchen@hotelblue.in", "password": "pw" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(user, "a1")))
            .mount(&server)
            .await;

        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let auth = auth_for(&server, Some(db.clone()));
        let mut rx = auth.subscribe();

        let session = auth.sign_in("kitchen@hotelblue.in", "pw").await.unwrap();
        assert_eq!(session.user_id(), user);
        assert!(session.expires_at.is_some());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().map(|s| s.user_id()), Some(user));

        let cached = db.lock().unwrap().load_session().unwrap();
        assert_eq!(cached.map(|s| s.access_token), Some("a1".to_string()));

        // a fresh client resumes from the cache
        let resumed = auth_for(&server, Some(db));
        assert_eq!(
            resumed.current_session().await.unwrap().map(|s| s.user_id()),
            Some(user)
        );
    }

    #[tokio::test]
    async fn bad_credentials_surface_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let auth = auth_for(&server, None);
        let err = auth.sign_in("a@b.c", "wrong").await.unwrap_err();
        assert_eq!(err.remote_message(), Some("Invalid login credentials"));
        assert!(auth.subscribe().borrow().is_none());
    }

    #[tokio::test]
    async fn expired_session_is_refreshed() {
        let server = MockServer::start().await;
        let user = UserId::new();
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_json(json!({ "refresh_token": "old-refresh" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(user, "a2")))
            .expect(1)
            .mount(&server)
            .await;

        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        db.lock()
            .unwrap()
            .save_session(&Session {
                user: AuthUser { id: user, email: None },
                access_token: "a1".into(),
                refresh_token: Some("old-refresh".into()),
                expires_at: Some(Utc::now() - Duration::minutes(5)),
            })
            .unwrap();

        let auth = auth_for(&server, Some(db));
        let session = auth.current_session().await.unwrap().unwrap();
        assert_eq!(session.access_token, "a2");
    }

    #[tokio::test]
    async fn sign_up_pending_confirmation_has_no_session() {
        let server = MockServer::start().await;
        let user = UserId::new();
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": user,
                "email": "new@ngo.org",
                "confirmation_sent_at": "2025-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let auth = auth_for(&server, None);
        let outcome = auth.sign_up("new@ngo.org", "pw").await.unwrap();
        assert_eq!(outcome.user.id, user);
        assert!(outcome.session.is_none());
        assert!(auth.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_token_clears_user() {
        let server = MockServer::start().await;
        let user = UserId::new();
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(user, "a1")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer a1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "invalid JWT" })))
            .mount(&server)
            .await;

        let auth = auth_for(&server, None);
        auth.sign_in("a@b.c", "pw").await.unwrap();
        assert!(auth.current_user().await.unwrap().is_none());
        assert!(auth.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sign_out_clears_even_when_remote_fails() {
        let server = MockServer::start().await;
        let user = UserId::new();
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(user, "a1")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let auth = auth_for(&server, None);
        auth.sign_in("a@b.c", "pw").await.unwrap();
        auth.sign_out().await.unwrap();
        assert!(auth.subscribe().borrow().is_none());
    }
}
