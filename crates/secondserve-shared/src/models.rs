//! Entity DTOs exchanged with the data store.
//!
//! Field names follow the backend column names so the same structs decode
//! PostgREST rows and can be handed to the UI layer unchanged. Joined shapes
//! (a listing with its owner, a message with participant names) are explicit
//! structs rather than loose JSON.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_NOTIFICATION_RADIUS_KM;
use crate::types::{Coordinates, ListingId, MessageId, UserId};

/// Error returned when a stored enum column holds an unknown value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Which side of a donation a profile is on. Fixed at profile completion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Hotel,
    Ngo,
}

string_enum!(Role, "role", { Hotel => "hotel", Ngo => "ngo" });

/// A user's profile row. The primary key is the auth user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub push_token: Option<String>,
    #[serde(default)]
    pub notification_radius_km: Option<u32>,
}

impl Profile {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }

    pub fn radius_km(&self) -> u32 {
        self.notification_radius_km
            .unwrap_or(DEFAULT_NOTIFICATION_RADIUS_KM)
    }

    /// Notifications count as enabled while a push token is stored.
    pub fn notifications_enabled(&self) -> bool {
        self.push_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Row inserted at the profile-completion step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewProfile {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
}

/// Partial profile update. `None` fields are left untouched; `push_token`
/// distinguishes "leave alone" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_radius_km: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_token: Option<Option<String>>,
}

// ---------------------------------------------------------------------------
// Food listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FoodType {
    Veg,
    NonVeg,
    Both,
}

string_enum!(FoodType, "food type", { Veg => "veg", NonVeg => "non_veg", Both => "both" });

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Available,
    Collected,
    Expired,
}

string_enum!(ListingStatus, "listing status", {
    Available => "available",
    Collected => "collected",
    Expired => "expired",
});

/// A hotel-posted record of surplus food.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodListing {
    pub id: ListingId,
    pub hotel_id: UserId,
    pub title: String,
    pub description: String,
    pub quantity_kg: f64,
    pub food_type: FoodType,
    pub expiry_time: DateTime<Utc>,
    pub address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub status: ListingStatus,
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl FoodListing {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_time <= now
    }

    /// Stored status with "expired" derived from the expiry time.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ListingStatus {
        match self.status {
            ListingStatus::Available if self.is_expired(now) => ListingStatus::Expired,
            other => other,
        }
    }
}

/// Row inserted by the create-listing flow; the store assigns id and
/// created_at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewListing {
    pub hotel_id: UserId,
    pub title: String,
    pub description: String,
    pub quantity_kg: f64,
    pub food_type: FoodType,
    pub expiry_time: DateTime<Utc>,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: ListingStatus,
    pub images: Vec<String>,
}

/// Contact details joined from the owning hotel's profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OwnerContact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A listing together with its owner's contact details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingWithOwner {
    #[serde(flatten)]
    pub listing: FoodListing,
    #[serde(rename = "hotel", default)]
    pub owner: Option<OwnerContact>,
}

impl ListingWithOwner {
    pub fn owner_name(&self) -> Option<&str> {
        self.owner.as_ref().and_then(|o| o.name.as_deref())
    }

    pub fn owner_phone(&self) -> Option<&str> {
        self.owner
            .as_ref()
            .and_then(|o| o.phone.as_deref())
            .filter(|p| !p.trim().is_empty())
    }
}

/// Filter for the available-listings query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingQuery {
    /// Only listings whose expiry is after this instant.
    pub active_at: Option<DateTime<Utc>>,
    /// Only listings with both coordinates set.
    pub require_coordinates: bool,
    pub limit: Option<usize>,
}

impl ListingQuery {
    pub fn browse(now: DateTime<Utc>) -> Self {
        Self {
            active_at: Some(now),
            ..Self::default()
        }
    }

    pub fn map(now: DateTime<Utc>) -> Self {
        Self {
            active_at: Some(now),
            require_coordinates: true,
            limit: None,
        }
    }

    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Claim (bookmark)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Collected,
}

string_enum!(ClaimStatus, "claim status", { Pending => "pending", Collected => "collected" });

/// An NGO's intent to collect a listing. One row per (ngo, listing).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingClaim {
    pub ngo_id: UserId,
    pub food_listing_id: ListingId,
    pub claimed_at: DateTime<Utc>,
    pub status: ClaimStatus,
}

/// A claim with the claimed listing joined in. `listing` is `None` when the
/// listing has been removed since.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimedListing {
    #[serde(flatten)]
    pub claim: ListingClaim,
    #[serde(default)]
    pub listing: Option<ListingWithOwner>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub listing_id: ListingId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub listing_id: ListingId,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileName {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingTitle {
    #[serde(default)]
    pub title: Option<String>,
}

/// A message with participant names and the listing title joined in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageWithContext {
    #[serde(flatten)]
    pub message: Message,
    #[serde(default)]
    pub sender: Option<ProfileName>,
    #[serde(default)]
    pub receiver: Option<ProfileName>,
    #[serde(default)]
    pub listing: Option<ListingTitle>,
}

impl MessageWithContext {
    pub fn bare(message: Message) -> Self {
        Self {
            message,
            sender: None,
            receiver: None,
            listing: None,
        }
    }

    pub fn sender_name(&self) -> Option<&str> {
        self.sender.as_ref().and_then(|p| p.name.as_deref())
    }

    pub fn receiver_name(&self) -> Option<&str> {
        self.receiver.as_ref().and_then(|p| p.name.as_deref())
    }

    pub fn listing_title(&self) -> Option<&str> {
        self.listing.as_ref().and_then(|l| l.title.as_deref())
    }
}

/// One chat thread, keyed by (other participant, listing).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub other_user_id: UserId,
    pub other_user_name: String,
    pub listing_id: ListingId,
    pub listing_title: String,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    pub unread_count: usize,
}

// ---------------------------------------------------------------------------
// Matching RPC
// ---------------------------------------------------------------------------

/// Row returned by `get_nearby_ngos`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NearbyNgo {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub push_token: Option<String>,
    /// Distance to the listing in km.
    pub distance: f64,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session issued by the auth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user: AuthUser,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Result of a sign-up. `session` is `None` while email confirmation is
/// pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<Session>,
}

// ---------------------------------------------------------------------------
// Places
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaceSuggestion {
    pub place_id: String,
    pub description: String,
}
