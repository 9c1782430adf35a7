//! [`DataStore`] served from the local SQLite database.
//!
//! Used for offline development and by every workflow test. The nearby-NGO
//! procedure runs here in Rust: NGOs with a push token and a stored location
//! are kept when the listing lies within their notification radius.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use secondserve_shared::backend::{BackendResult, DataStore};
use secondserve_shared::constants::DEFAULT_NOTIFICATION_RADIUS_KM;
use secondserve_shared::geo::distance_km;
use secondserve_shared::models::{
    ClaimedListing, Conversation, FoodListing, ListingClaim, ListingQuery, ListingWithOwner,
    Message, MessageWithContext, NearbyNgo, NewListing, NewMessage, NewProfile, Profile,
    ProfilePatch,
};
use secondserve_shared::types::{Coordinates, ListingId, UserId};
use secondserve_shared::BackendError;

use crate::database::Database;
use crate::error::{Result, StoreError};

#[derive(Clone)]
pub struct LocalBackend {
    db: Arc<Mutex<Database>>,
}

impl LocalBackend {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Run `f` against the database under the connection lock.
    pub fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let db = self.db.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&db)
    }

    fn call<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> BackendResult<T> {
        self.with_db(f).map_err(BackendError::from)
    }
}

#[async_trait]
impl DataStore for LocalBackend {
    async fn profile(&self, id: UserId) -> BackendResult<Option<Profile>> {
        self.call(|db| db.find_profile(id))
    }

    async fn insert_profile(&self, profile: &NewProfile) -> BackendResult<Profile> {
        self.call(|db| db.insert_profile(profile))
    }

    async fn update_profile(&self, id: UserId, patch: &ProfilePatch) -> BackendResult<()> {
        if self.call(|db| db.update_profile(id, patch))? {
            Ok(())
        } else {
            Err(BackendError::NotFound)
        }
    }

    async fn insert_listing(&self, listing: &NewListing) -> BackendResult<FoodListing> {
        self.call(|db| db.insert_listing(listing))
    }

    async fn listing(&self, id: ListingId) -> BackendResult<Option<ListingWithOwner>> {
        self.call(|db| db.find_listing(id))
    }

    async fn delete_listing(&self, id: ListingId) -> BackendResult<bool> {
        self.call(|db| db.delete_listing(id))
    }

    async fn listings_for_hotel(&self, hotel: UserId) -> BackendResult<Vec<FoodListing>> {
        self.call(|db| db.listings_for_hotel(hotel))
    }

    async fn available_listings(
        &self,
        query: &ListingQuery,
    ) -> BackendResult<Vec<ListingWithOwner>> {
        self.call(|db| db.available_listings(query))
    }

    async fn find_claim(
        &self,
        ngo: UserId,
        listing: ListingId,
    ) -> BackendResult<Option<ListingClaim>> {
        self.call(|db| db.find_claim(ngo, listing))
    }

    async fn insert_claim(&self, ngo: UserId, listing: ListingId) -> BackendResult<ListingClaim> {
        self.call(|db| db.insert_claim(ngo, listing))
    }

    async fn delete_claim(&self, ngo: UserId, listing: ListingId) -> BackendResult<bool> {
        self.call(|db| db.delete_claim(ngo, listing))
    }

    async fn claims_for_ngo(&self, ngo: UserId) -> BackendResult<Vec<ClaimedListing>> {
        self.call(|db| db.claims_for_ngo(ngo))
    }

    async fn insert_message(&self, message: &NewMessage) -> BackendResult<Message> {
        self.call(|db| db.insert_message(message))
    }

    async fn messages_for_user(&self, user: UserId) -> BackendResult<Vec<MessageWithContext>> {
        self.call(|db| db.messages_for_user(user))
    }

    async fn thread(
        &self,
        user: UserId,
        other: UserId,
        listing: ListingId,
    ) -> BackendResult<Vec<Message>> {
        self.call(|db| db.thread(user, other, listing))
    }

    async fn mark_read(
        &self,
        receiver: UserId,
        sender: UserId,
        listing: ListingId,
    ) -> BackendResult<usize> {
        self.call(|db| db.mark_read(receiver, sender, listing))
    }

    async fn conversations(&self, user: UserId) -> BackendResult<Vec<Conversation>> {
        self.call(|db| db.conversations(user))
    }

    async fn nearby_ngos(&self, at: Coordinates) -> BackendResult<Vec<NearbyNgo>> {
        let targets = self.call(|db| db.alert_targets())?;
        let candidates = targets.len();

        let mut nearby: Vec<NearbyNgo> = targets
            .into_iter()
            .filter_map(|t| {
                let distance = distance_km(at, t.location);
                let radius = f64::from(t.radius_km.unwrap_or(DEFAULT_NOTIFICATION_RADIUS_KM));
                (distance <= radius).then(|| NearbyNgo {
                    id: Some(t.id),
                    push_token: Some(t.push_token),
                    distance,
                })
            })
            .collect();
        nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        debug!(candidates, matched = nearby.len(), "nearby NGO match");
        Ok(nearby)
    }
}
