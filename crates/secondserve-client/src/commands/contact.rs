//! Listing detail actions and reaching the hotel behind a listing.

use serde::Serialize;
use tracing::{debug, warn};

use secondserve_shared::conversations::FALLBACK_RECEIVER_NAME;
use secondserve_shared::models::{FoodListing, ListingWithOwner};
use secondserve_shared::types::{ListingId, UserId};

use crate::error::{Action, Alert, ClientResult};
use crate::state::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingAction {
    Edit,
    Delete,
    Save,
    Unsave,
    Call,
    Message,
}

/// Buttons on the listing detail sheet. Owners manage; everyone else saves
/// and gets in touch.
pub fn listing_actions(
    listing: &FoodListing,
    viewer: Option<UserId>,
    saved: bool,
) -> Vec<ListingAction> {
    if viewer == Some(listing.hotel_id) {
        return vec![ListingAction::Edit, ListingAction::Delete];
    }
    let save = if saved {
        ListingAction::Unsave
    } else {
        ListingAction::Save
    };
    vec![save, ListingAction::Call, ListingAction::Message]
}

/// Where the chat screen opens: the hotel, about this listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTarget {
    pub other_user_id: UserId,
    pub other_user_name: String,
    pub listing_id: ListingId,
    pub listing_title: String,
}

impl ConversationTarget {
    pub fn for_listing(listing: &ListingWithOwner) -> Self {
        Self {
            other_user_id: listing.listing.hotel_id,
            other_user_name: listing
                .owner_name()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(FALLBACK_RECEIVER_NAME)
                .to_string(),
            listing_id: listing.listing.id,
            listing_title: listing.listing.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContactRoute {
    Dial { tel_url: String },
    /// No phone on file; suggest messaging instead.
    OfferChat { alert: Alert, target: ConversationTarget },
}

pub fn tel_url(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    format!("tel:{digits}")
}

/// Pick how to reach the hotel. The joined owner phone wins; otherwise the
/// hotel profile is looked up. A failed lookup counts as no phone.
pub async fn resolve_contact(
    app: &App,
    listing: &ListingWithOwner,
) -> ClientResult<ContactRoute> {
    let mut phone = listing.owner_phone().map(str::to_string);

    if phone.is_none() {
        match app.store.profile(listing.listing.hotel_id).await {
            Ok(profile) => {
                phone = profile
                    .and_then(|p| p.phone)
                    .filter(|p| !p.trim().is_empty());
            }
            Err(e) => {
                warn!(hotel = %listing.listing.hotel_id, error = %e, "Hotel phone lookup failed")
            }
        }
    }

    Ok(match phone {
        Some(phone) => ContactRoute::Dial {
            tel_url: tel_url(&phone),
        },
        None => {
            debug!(listing = %listing.listing.id, "No phone for hotel, offering chat");
            ContactRoute::OfferChat {
                alert: Alert::new(
                    "No Phone Number",
                    "The hotel has not provided a contact number. Try sending a message.",
                ),
                target: ConversationTarget::for_listing(listing),
            }
        }
    })
}

/// Open a chat about `listing`. Requires a signed-in user.
pub async fn conversation_target(
    app: &App,
    listing: &ListingWithOwner,
) -> ClientResult<ConversationTarget> {
    app.user_id(Action::StartConversation).await?;
    Ok(ConversationTarget::for_listing(listing))
}
