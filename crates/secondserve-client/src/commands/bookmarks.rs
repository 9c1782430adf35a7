//! NGO saves ("claims") of listings.
//!
//! Saving and claiming are the same row in the claims table. A save is
//! idempotent and unsaving something that was never saved is a no-op.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use secondserve_shared::models::{ClaimStatus, ListingWithOwner};
use secondserve_shared::types::ListingId;

use crate::error::{Action, ClientError, ClientResult};
use crate::notify::notify_hotel_of_claim;
use crate::state::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved,
    AlreadySaved,
}

pub async fn is_saved(app: &App, listing: ListingId) -> ClientResult<bool> {
    let user = app.user_id(Action::LoadClaims).await?;
    let claim = app
        .store
        .find_claim(user, listing)
        .await
        .map_err(ClientError::remote(Action::LoadClaims))?;
    Ok(claim.is_some())
}

/// Bookmark `listing` for the signed-in user. A first save lets the hotel
/// know, when it has a push token.
pub async fn save_listing(app: &App, listing: ListingId) -> ClientResult<SaveOutcome> {
    let me = app.profile(Action::SaveListing).await?;

    let existing = app
        .store
        .find_claim(me.id, listing)
        .await
        .map_err(ClientError::remote(Action::SaveListing))?;
    if existing.is_some() {
        return Ok(SaveOutcome::AlreadySaved);
    }

    let found = app
        .store
        .listing(listing)
        .await
        .map_err(ClientError::remote(Action::SaveListing))?
        .ok_or(ClientError::ListingNotFound)?;

    app.store
        .insert_claim(me.id, listing)
        .await
        .map_err(ClientError::remote(Action::SaveListing))?;
    info!(listing = %listing, ngo = %me.id, "Listing saved");

    let hotel = match app.store.profile(found.listing.hotel_id).await {
        Ok(hotel) => hotel,
        Err(e) => {
            warn!(listing = %listing, error = %e, "Hotel lookup for claim notice failed");
            None
        }
    };
    let token = hotel.and_then(|h| h.push_token);
    if let Err(e) = notify_hotel_of_claim(app, token.as_deref(), &found.listing, &me.name).await {
        warn!(listing = %listing, error = %e, "Failed to notify hotel of claim");
    }

    Ok(SaveOutcome::Saved)
}

/// Returns whether a saved row was removed.
pub async fn unsave_listing(app: &App, listing: ListingId) -> ClientResult<bool> {
    let user = app.user_id(Action::SaveListing).await?;
    let removed = app
        .store
        .delete_claim(user, listing)
        .await
        .map_err(ClientError::remote(Action::SaveListing))?;
    if removed {
        info!(listing = %listing, ngo = %user, "Listing unsaved");
    }
    Ok(removed)
}

/// Flip the saved state; returns the new state.
pub async fn toggle_save(app: &App, listing: ListingId) -> ClientResult<bool> {
    if is_saved(app, listing).await? {
        unsave_listing(app, listing).await?;
        Ok(false)
    } else {
        save_listing(app, listing).await?;
        Ok(true)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimedItem {
    pub listing: ListingWithOwner,
    pub claimed_at: DateTime<Utc>,
    pub status: ClaimStatus,
    pub claimed_label: String,
}

pub fn claimed_label(claimed_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (now - claimed_at).num_hours();
    match hours {
        h if h < 1 => "Claimed just now".to_string(),
        h if h < 24 => format!("Claimed {h}h ago"),
        h => format!("Claimed {} days ago", h / 24),
    }
}

/// The signed-in NGO's saved listings, most recent first. Saves whose
/// listing has since been deleted are left out.
pub async fn claimed_listings(app: &App) -> ClientResult<Vec<ClaimedItem>> {
    let user = app.user_id(Action::LoadClaims).await?;
    let claims = app
        .store
        .claims_for_ngo(user)
        .await
        .map_err(ClientError::remote(Action::LoadClaims))?;

    let now = Utc::now();
    Ok(claims
        .into_iter()
        .filter_map(|c| {
            let listing = c.listing?;
            Some(ClaimedItem {
                listing,
                claimed_at: c.claim.claimed_at,
                status: c.claim.status,
                claimed_label: claimed_label(c.claim.claimed_at, now),
            })
        })
        .collect())
}
