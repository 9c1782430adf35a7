//! The [`App`] context every command receives.
//!
//! It owns the configuration and one handle per collaborator. Commands never
//! reach for global state; they get the session, the data store and the
//! rest through this struct.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use secondserve_shared::backend::{
    AuthProvider, BackendResult, DataStore, ObjectStorage, PlacesProvider, PushRelay,
    PushTokenSource,
};
use secondserve_shared::models::{Profile, Role};
use secondserve_shared::types::UserId;
use secondserve_store::{Database, StoreError};

use crate::config::ClientConfig;
use crate::error::{Action, ClientError, ClientResult};
use crate::remote::{
    ExpoPushRelay, GooglePlaces, Project, RemoteAuth, RemoteStorage, RestStore,
};

/// Failure while assembling the remote collaborators.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("{0} is not set")]
    MissingVar(&'static str),

    #[error("Session cache: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Push-token source for hosts without a device token (desktop, CI,
/// simulators). Yields the configured token, if any.
pub struct FixedPushToken(pub Option<String>);

#[async_trait]
impl PushTokenSource for FixedPushToken {
    async fn fresh_token(&self) -> BackendResult<Option<String>> {
        Ok(self.0.clone())
    }
}

/// One handle per collaborator.
pub struct Collaborators {
    pub store: Arc<dyn DataStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub storage: Arc<dyn ObjectStorage>,
    pub push: Arc<dyn PushRelay>,
    pub places: Arc<dyn PlacesProvider>,
    pub push_tokens: Arc<dyn PushTokenSource>,
}

/// Central application context.
pub struct App {
    pub config: ClientConfig,
    pub store: Arc<dyn DataStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub storage: Arc<dyn ObjectStorage>,
    pub push: Arc<dyn PushRelay>,
    pub places: Arc<dyn PlacesProvider>,
    pub push_tokens: Arc<dyn PushTokenSource>,
}

impl App {
    pub fn new(config: ClientConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            store,
            auth,
            storage,
            push,
            places,
            push_tokens,
        } = collaborators;
        Self {
            config,
            store,
            auth,
            storage,
            push,
            places,
            push_tokens,
        }
    }

    /// Build the HTTP collaborators from `config`. The session is cached in
    /// the SQLite file at `session_db_path` (or the platform data dir).
    pub fn connect(
        config: ClientConfig,
        push_tokens: Arc<dyn PushTokenSource>,
    ) -> Result<Self, ConnectError> {
        let url = config
            .supabase_url
            .clone()
            .ok_or(ConnectError::MissingVar("SUPABASE_URL"))?;
        let anon_key = config
            .supabase_anon_key
            .clone()
            .ok_or(ConnectError::MissingVar("SUPABASE_ANON_KEY"))?;
        let maps_key = config.google_maps_api_key.clone().unwrap_or_else(|| {
            warn!("GOOGLE_MAPS_API_KEY is not set; place search will fail");
            String::new()
        });

        let db = match &config.session_db_path {
            Some(path) => Database::open_at(path)?,
            None => Database::new()?,
        };
        let cache = Arc::new(Mutex::new(db));

        let http = reqwest::Client::builder().build()?;
        let (tx, rx) = RemoteAuth::channel(Some(&cache));
        let project = Project::new(http.clone(), url, anon_key, rx);

        info!(backend = %project.base_url(), "Connecting to remote backend");

        Ok(Self::new(
            config.clone(),
            Collaborators {
                store: Arc::new(RestStore::new(project.clone())),
                auth: Arc::new(RemoteAuth::new(project.clone(), tx, Some(cache))),
                storage: Arc::new(RemoteStorage::new(project)),
                push: Arc::new(ExpoPushRelay::new(http.clone(), config.push_endpoint.clone())),
                places: Arc::new(GooglePlaces::new(http, config.maps_base_url.clone(), maps_key)),
                push_tokens,
            },
        ))
    }

    /// The signed-in user's id.
    pub async fn user_id(&self, action: Action) -> ClientResult<UserId> {
        self.auth
            .current_user()
            .await
            .map_err(ClientError::remote(action))?
            .map(|u| u.id)
            .ok_or(ClientError::NotSignedIn(action))
    }

    /// The signed-in user's profile.
    pub async fn profile(&self, action: Action) -> ClientResult<Profile> {
        let id = self.user_id(action).await?;
        self.store
            .profile(id)
            .await
            .map_err(ClientError::remote(action))?
            .ok_or(ClientError::ProfileMissing)
    }

    /// The signed-in user's profile, which must have `role`.
    pub async fn profile_with_role(&self, role: Role, action: Action) -> ClientResult<Profile> {
        let profile = self.profile(action).await?;
        if profile.role != role {
            return Err(ClientError::WrongRole(role));
        }
        Ok(profile)
    }
}
