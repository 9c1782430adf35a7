//! Collaborator traits.
//!
//! Every workflow reaches the outside world through these seams: the remote
//! data store, auth, object storage, the push relay, the places/geocoding
//! service and the device push-token source. The client crate provides HTTP
//! implementations; the store crate provides SQLite and filesystem ones.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use crate::conversations::group_conversations;
use crate::error::BackendError;
use crate::models::{
    AuthUser, ClaimedListing, Conversation, FoodListing, ListingClaim, ListingQuery,
    ListingWithOwner, Message, MessageWithContext, NearbyNgo, NewListing, NewMessage,
    NewProfile, PlaceSuggestion, Profile, ProfilePatch, Session, SignUpOutcome,
};
use crate::push::PushMessage;
use crate::types::{Coordinates, ListingId, UserId};

pub type BackendResult<T> = Result<T, BackendError>;

/// Table-scoped queries and mutations against the relational store, plus the
/// nearby-NGO matching procedure.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn profile(&self, id: UserId) -> BackendResult<Option<Profile>>;

    async fn insert_profile(&self, profile: &NewProfile) -> BackendResult<Profile>;

    async fn update_profile(&self, id: UserId, patch: &ProfilePatch) -> BackendResult<()>;

    async fn insert_listing(&self, listing: &NewListing) -> BackendResult<FoodListing>;

    async fn listing(&self, id: ListingId) -> BackendResult<Option<ListingWithOwner>>;

    /// Returns whether a row was removed.
    async fn delete_listing(&self, id: ListingId) -> BackendResult<bool>;

    /// All listings owned by `hotel`, newest first.
    async fn listings_for_hotel(&self, hotel: UserId) -> BackendResult<Vec<FoodListing>>;

    /// Listings with status "available" matching `query`, newest first.
    async fn available_listings(&self, query: &ListingQuery)
        -> BackendResult<Vec<ListingWithOwner>>;

    async fn find_claim(&self, ngo: UserId, listing: ListingId)
        -> BackendResult<Option<ListingClaim>>;

    async fn insert_claim(&self, ngo: UserId, listing: ListingId) -> BackendResult<ListingClaim>;

    /// Returns whether a row was removed.
    async fn delete_claim(&self, ngo: UserId, listing: ListingId) -> BackendResult<bool>;

    /// Claims made by `ngo`, most recent first.
    async fn claims_for_ngo(&self, ngo: UserId) -> BackendResult<Vec<ClaimedListing>>;

    async fn insert_message(&self, message: &NewMessage) -> BackendResult<Message>;

    /// Every message `user` sent or received, newest first.
    async fn messages_for_user(&self, user: UserId) -> BackendResult<Vec<MessageWithContext>>;

    /// Messages between `user` and `other` about `listing`, oldest first.
    async fn thread(
        &self,
        user: UserId,
        other: UserId,
        listing: ListingId,
    ) -> BackendResult<Vec<Message>>;

    /// Mark messages from `sender` to `receiver` about `listing` as read.
    /// Returns how many rows changed.
    async fn mark_read(
        &self,
        receiver: UserId,
        sender: UserId,
        listing: ListingId,
    ) -> BackendResult<usize>;

    /// Conversation summaries for `user`. Stores that can aggregate on their
    /// side override this; the default folds the full history.
    async fn conversations(&self, user: UserId) -> BackendResult<Vec<Conversation>> {
        let messages = self.messages_for_user(user).await?;
        Ok(group_conversations(user, &messages))
    }

    /// The `get_nearby_ngos` matching call.
    async fn nearby_ngos(&self, at: Coordinates) -> BackendResult<Vec<NearbyNgo>>;
}

/// Session issuance and lookup.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_session(&self) -> BackendResult<Option<Session>>;

    async fn current_user(&self) -> BackendResult<Option<AuthUser>>;

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session>;

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpOutcome>;

    async fn sign_out(&self) -> BackendResult<()>;

    /// Receiver that observes every session change.
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;
}

/// Bucketed object storage for listing images.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> BackendResult<()>;

    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// Delivers push messages to devices. Callers keep batches within the relay
/// limit.
#[async_trait]
pub trait PushRelay: Send + Sync {
    async fn send_batch(&self, messages: &[PushMessage]) -> BackendResult<()>;
}

/// Place autocomplete, place details and reverse geocoding.
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn autocomplete(&self, query: &str, country: &str)
        -> BackendResult<Vec<PlaceSuggestion>>;

    async fn place_details(&self, place_id: &str) -> BackendResult<Option<Coordinates>>;

    async fn reverse_geocode(&self, at: Coordinates) -> BackendResult<Option<String>>;
}

/// Source of this device's push token. Yields `None` where push is not
/// available (simulators, web, permission denied).
#[async_trait]
pub trait PushTokenSource: Send + Sync {
    async fn fresh_token(&self) -> BackendResult<Option<String>>;
}
