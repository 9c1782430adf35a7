//! Push relay payloads.

use serde::{Deserialize, Serialize};

use crate::types::ListingId;

pub const SOUND_DEFAULT: &str = "default";

/// One message addressed to a device push token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushMessage {
    pub to: String,
    pub sound: String,
    pub title: String,
    pub body: String,
    pub data: PushData,
}

impl PushMessage {
    pub fn new(
        to: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        data: PushData,
    ) -> Self {
        Self {
            to: to.into(),
            sound: SOUND_DEFAULT.to_string(),
            title: title.into(),
            body: body.into(),
            data,
        }
    }
}

/// Structured payload delivered alongside the notification. The app uses it
/// to route a tapped notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushData {
    NewFoodListing {
        #[serde(rename = "listingId")]
        listing_id: ListingId,
        distance: f64,
    },
    FoodClaimed {
        #[serde(rename = "listingId", default, skip_serializing_if = "Option::is_none")]
        listing_id: Option<ListingId>,
    },
}

impl PushData {
    /// Listing a tapped notification should open, if any.
    pub fn listing_id(&self) -> Option<ListingId> {
        match self {
            Self::NewFoodListing { listing_id, .. } => Some(*listing_id),
            Self::FoodClaimed { listing_id } => *listing_id,
        }
    }
}
