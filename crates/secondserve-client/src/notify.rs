//! Push notification fan-out.
//!
//! New listings alert the NGOs the matching procedure returns; a new claim
//! alerts the owning hotel. Both are best-effort: callers log the error and
//! carry on.

use tracing::{debug, info};

use secondserve_shared::backend::BackendResult;
use secondserve_shared::constants::PUSH_BATCH_SIZE;
use secondserve_shared::models::{FoodListing, NearbyNgo};
use secondserve_shared::push::{PushData, PushMessage};

use crate::state::App;

pub const NEW_LISTING_TITLE: &str = "🍎 Fresh Food Nearby!";
pub const CLAIMED_TITLE: &str = "✅ Food Claimed!";

pub fn new_listing_body(listing: &FoodListing, distance_km: f64) -> String {
    format!(
        "{}kg food available at {}. Approx {:.1} km away.",
        listing.quantity_kg, listing.title, distance_km
    )
}

pub fn claimed_body(ngo_name: &str, listing_title: &str) -> String {
    format!("{ngo_name} has claimed \"{listing_title}\". They will contact you shortly.")
}

/// One message per recipient with a token.
pub fn new_listing_messages(listing: &FoodListing, recipients: &[NearbyNgo]) -> Vec<PushMessage> {
    recipients
        .iter()
        .filter_map(|ngo| {
            let token = ngo.push_token.as_deref().filter(|t| !t.is_empty())?;
            Some(PushMessage::new(
                token,
                NEW_LISTING_TITLE,
                new_listing_body(listing, ngo.distance),
                PushData::NewFoodListing {
                    listing_id: listing.id,
                    distance: ngo.distance,
                },
            ))
        })
        .collect()
}

/// Send `messages` in relay-sized chunks, one after another. Stops at the
/// first failed chunk. Returns how many messages were handed to the relay.
pub async fn send_in_batches(app: &App, messages: &[PushMessage]) -> BackendResult<usize> {
    let mut sent = 0;
    for (index, batch) in messages.chunks(PUSH_BATCH_SIZE).enumerate() {
        app.push.send_batch(batch).await?;
        sent += batch.len();
        debug!(batch = index, size = batch.len(), "Push batch sent");
    }
    Ok(sent)
}

/// Alert nearby NGOs about `listing`. Listings without coordinates are
/// skipped. Returns the number of messages sent.
pub async fn notify_nearby_ngos(app: &App, listing: &FoodListing) -> BackendResult<usize> {
    let Some(at) = listing.coordinates() else {
        debug!(listing = %listing.id, "Listing has no coordinates, skipping fan-out");
        return Ok(0);
    };

    let nearby = app.store.nearby_ngos(at).await?;
    if nearby.is_empty() {
        info!(listing = %listing.id, "No NGOs found nearby");
        return Ok(0);
    }

    let messages = new_listing_messages(listing, &nearby);
    let sent = send_in_batches(app, &messages).await?;
    info!(listing = %listing.id, matched = nearby.len(), sent, "Nearby NGOs notified");
    Ok(sent)
}

/// Alert the hotel that `ngo_name` claimed `listing`. No-op without a token.
pub async fn notify_hotel_of_claim(
    app: &App,
    hotel_token: Option<&str>,
    listing: &FoodListing,
    ngo_name: &str,
) -> BackendResult<bool> {
    let Some(token) = hotel_token.filter(|t| !t.is_empty()) else {
        return Ok(false);
    };

    let message = PushMessage::new(
        token,
        CLAIMED_TITLE,
        claimed_body(ngo_name, &listing.title),
        PushData::FoodClaimed {
            listing_id: Some(listing.id),
        },
    );
    app.push.send_batch(std::slice::from_ref(&message)).await?;
    info!(listing = %listing.id, "Hotel notified of claim");
    Ok(true)
}
