//! In-process collaborators for command tests: the SQLite `LocalBackend`
//! behind a recording wrapper, plus fakes for auth, storage, push, places
//! and device tokens.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use secondserve_shared::backend::{
    AuthProvider, BackendResult, DataStore, ObjectStorage, PlacesProvider, PushRelay,
    PushTokenSource,
};
use secondserve_shared::models::{
    AuthUser, ClaimedListing, Conversation, FoodListing, ListingClaim, ListingQuery,
    ListingWithOwner, Message, MessageWithContext, NearbyNgo, NewListing, NewMessage, NewProfile,
    PlaceSuggestion, Profile, ProfilePatch, Role, Session, SignUpOutcome,
};
use secondserve_shared::push::PushMessage;
use secondserve_shared::types::{Coordinates, ListingId, UserId};
use secondserve_shared::BackendError;
use secondserve_store::LocalBackend;

use crate::config::ClientConfig;
use crate::state::{App, Collaborators};

/// `LocalBackend` that records matching calls and can be told to fail them.
pub(crate) struct TestStore {
    pub inner: LocalBackend,
    pub nearby_calls: Mutex<Vec<Coordinates>>,
    pub nearby_error: Mutex<Option<BackendError>>,
    pub insert_listing_calls: AtomicUsize,
}

#[async_trait]
impl DataStore for TestStore {
    async fn profile(&self, id: UserId) -> BackendResult<Option<Profile>> {
        self.inner.profile(id).await
    }
    async fn insert_profile(&self, profile: &NewProfile) -> BackendResult<Profile> {
        self.inner.insert_profile(profile).await
    }
    async fn update_profile(&self, id: UserId, patch: &ProfilePatch) -> BackendResult<()> {
        self.inner.update_profile(id, patch).await
    }
    async fn insert_listing(&self, listing: &NewListing) -> BackendResult<FoodListing> {
        self.insert_listing_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_listing(listing).await
    }
    async fn listing(&self, id: ListingId) -> BackendResult<Option<ListingWithOwner>> {
        self.inner.listing(id).await
    }
    async fn delete_listing(&self, id: ListingId) -> BackendResult<bool> {
        self.inner.delete_listing(id).await
    }
    async fn listings_for_hotel(&self, hotel: UserId) -> BackendResult<Vec<FoodListing>> {
        self.inner.listings_for_hotel(hotel).await
    }
    async fn available_listings(
        &self,
        query: &ListingQuery,
    ) -> BackendResult<Vec<ListingWithOwner>> {
        self.inner.available_listings(query).await
    }
    async fn find_claim(
        &self,
        ngo: UserId,
        listing: ListingId,
    ) -> BackendResult<Option<ListingClaim>> {
        self.inner.find_claim(ngo, listing).await
    }
    async fn insert_claim(&self, ngo: UserId, listing: ListingId) -> BackendResult<ListingClaim> {
        self.inner.insert_claim(ngo, listing).await
    }
    async fn delete_claim(&self, ngo: UserId, listing: ListingId) -> BackendResult<bool> {
        self.inner.delete_claim(ngo, listing).await
    }
    async fn claims_for_ngo(&self, ngo: UserId) -> BackendResult<Vec<ClaimedListing>> {
        self.inner.claims_for_ngo(ngo).await
    }
    async fn insert_message(&self, message: &NewMessage) -> BackendResult<Message> {
        self.inner.insert_message(message).await
    }
    async fn messages_for_user(&self, user: UserId) -> BackendResult<Vec<MessageWithContext>> {
        self.inner.messages_for_user(user).await
    }
    async fn thread(
        &self,
        user: UserId,
        other: UserId,
        listing: ListingId,
    ) -> BackendResult<Vec<Message>> {
        self.inner.thread(user, other, listing).await
    }
    async fn mark_read(
        &self,
        receiver: UserId,
        sender: UserId,
        listing: ListingId,
    ) -> BackendResult<usize> {
        self.inner.mark_read(receiver, sender, listing).await
    }
    async fn conversations(&self, user: UserId) -> BackendResult<Vec<Conversation>> {
        self.inner.conversations(user).await
    }
    async fn nearby_ngos(&self, at: Coordinates) -> BackendResult<Vec<NearbyNgo>> {
        self.nearby_calls.lock().unwrap().push(at);
        let failure = self.nearby_error.lock().unwrap().clone();
        if let Some(err) = failure {
            return Err(err);
        }
        self.inner.nearby_ngos(at).await
    }
}

pub(crate) struct FakeAuth {
    tx: watch::Sender<Option<Session>>,
}

impl FakeAuth {
    fn new() -> Self {
        Self {
            tx: watch::channel(None).0,
        }
    }

    pub fn sign_in_user(&self, id: UserId) -> Session {
        let session = Session {
            user: AuthUser {
                id,
                email: Some(format!("{}@example.org", id.short())),
            },
            access_token: format!("token-{}", id.short()),
            refresh_token: None,
            expires_at: None,
        };
        self.tx.send_replace(Some(session.clone()));
        session
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn current_session(&self) -> BackendResult<Option<Session>> {
        Ok(self.tx.borrow().clone())
    }

    async fn current_user(&self) -> BackendResult<Option<AuthUser>> {
        Ok(self.tx.borrow().as_ref().map(|s| s.user.clone()))
    }

    async fn sign_in(&self, _email: &str, password: &str) -> BackendResult<Session> {
        if password == "wrong" {
            return Err(BackendError::api(400, "Invalid login credentials"));
        }
        Ok(self.sign_in_user(UserId::new()))
    }

    async fn sign_up(&self, email: &str, _password: &str) -> BackendResult<SignUpOutcome> {
        Ok(SignUpOutcome {
            user: AuthUser {
                id: UserId::new(),
                email: Some(email.to_string()),
            },
            session: None,
        })
    }

    async fn sign_out(&self) -> BackendResult<()> {
        self.tx.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Upload {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Default)]
pub(crate) struct FakeStorage {
    pub uploads: Mutex<Vec<Upload>>,
    /// Fail the upload with this index (0-based).
    pub fail_at: Mutex<Option<usize>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> BackendResult<()> {
        let mut uploads = self.uploads.lock().unwrap();
        if *self.fail_at.lock().unwrap() == Some(uploads.len()) {
            return Err(BackendError::api(413, "Payload too large"));
        }
        uploads.push(Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
        });
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("https://cdn.test/{bucket}/{key}")
    }
}

#[derive(Default)]
pub(crate) struct RecordingPush {
    pub batches: Mutex<Vec<Vec<PushMessage>>>,
    pub fail: Mutex<Option<BackendError>>,
}

impl RecordingPush {
    pub fn sent(&self) -> Vec<PushMessage> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl PushRelay for RecordingPush {
    async fn send_batch(&self, messages: &[PushMessage]) -> BackendResult<()> {
        let failure = self.fail.lock().unwrap().clone();
        if let Some(err) = failure {
            return Err(err);
        }
        self.batches.lock().unwrap().push(messages.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakePlaces {
    pub autocomplete_calls: Mutex<Vec<String>>,
    /// Simulated round-trip time for autocomplete.
    pub latency: Mutex<Option<Duration>>,
    pub details: Mutex<HashMap<String, Coordinates>>,
    pub address: Mutex<Option<String>>,
    pub fail_geocode: Mutex<bool>,
    /// Autocomplete for this exact query errors after the latency.
    pub fail_query: Mutex<Option<String>>,
}

#[async_trait]
impl PlacesProvider for FakePlaces {
    async fn autocomplete(
        &self,
        query: &str,
        _country: &str,
    ) -> BackendResult<Vec<PlaceSuggestion>> {
        self.autocomplete_calls.lock().unwrap().push(query.to_string());
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_query.lock().unwrap().as_deref() == Some(query) {
            return Err(BackendError::Transport("timeout".into()));
        }
        Ok(vec![PlaceSuggestion {
            place_id: format!("place-{query}"),
            description: format!("{query}, India"),
        }])
    }

    async fn place_details(&self, place_id: &str) -> BackendResult<Option<Coordinates>> {
        Ok(self.details.lock().unwrap().get(place_id).copied())
    }

    async fn reverse_geocode(&self, _at: Coordinates) -> BackendResult<Option<String>> {
        if *self.fail_geocode.lock().unwrap() {
            return Err(BackendError::Transport("offline".into()));
        }
        Ok(self.address.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub(crate) struct FakeTokens {
    pub token: Mutex<Option<String>>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl PushTokenSource for FakeTokens {
    async fn fresh_token(&self) -> BackendResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.lock().unwrap().clone())
    }
}

pub(crate) struct TestApp {
    pub app: App,
    pub store: Arc<TestStore>,
    pub auth: Arc<FakeAuth>,
    pub storage: Arc<FakeStorage>,
    pub push: Arc<RecordingPush>,
    pub places: Arc<FakePlaces>,
    pub tokens: Arc<FakeTokens>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(TestStore {
            inner: LocalBackend::in_memory().unwrap(),
            nearby_calls: Mutex::new(Vec::new()),
            nearby_error: Mutex::new(None),
            insert_listing_calls: AtomicUsize::new(0),
        });
        let auth = Arc::new(FakeAuth::new());
        let storage = Arc::new(FakeStorage::default());
        let push = Arc::new(RecordingPush::default());
        let places = Arc::new(FakePlaces::default());
        let tokens = Arc::new(FakeTokens::default());

        let app = App::new(
            ClientConfig::default(),
            Collaborators {
                store: store.clone(),
                auth: auth.clone(),
                storage: storage.clone(),
                push: push.clone(),
                places: places.clone(),
                push_tokens: tokens.clone(),
            },
        );

        Self {
            app,
            store,
            auth,
            storage,
            push,
            places,
            tokens,
        }
    }

    /// Insert a profile without signing in as it.
    pub async fn add_profile(&self, role: Role, name: &str) -> Profile {
        let phone = match role {
            Role::Hotel => Some("+91 98765 43210".to_string()),
            Role::Ngo => None,
        };
        self.store
            .insert_profile(&NewProfile {
                id: UserId::new(),
                name: name.to_string(),
                role,
                phone,
            })
            .await
            .unwrap()
    }

    pub async fn sign_in_as(&self, role: Role, name: &str) -> Profile {
        let profile = self.add_profile(role, name).await;
        self.auth.sign_in_user(profile.id);
        profile
    }

    /// Give `id` a location, token and radius so it is matched by the
    /// nearby procedure.
    pub async fn make_reachable(&self, id: UserId, at: Coordinates, token: &str, radius: u32) {
        self.store
            .update_profile(
                id,
                &ProfilePatch {
                    latitude: Some(at.latitude),
                    longitude: Some(at.longitude),
                    notification_radius_km: Some(radius),
                    push_token: Some(Some(token.to_string())),
                    ..ProfilePatch::default()
                },
            )
            .await
            .unwrap();
    }
}
