use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use secondserve_shared::expiry::ExpiryLabel;
use secondserve_shared::models::{
    FoodListing, ListingStatus, NewProfile, Profile, ProfilePatch, Role,
};
use secondserve_shared::types::Coordinates;

use crate::error::{Action, ClientError, ClientResult, ValidationError};
use crate::state::App;

/// Create the profile row for the signed-in user. The role is fixed from
/// here on.
pub async fn complete_profile(
    app: &App,
    name: &str,
    role: Option<Role>,
    phone: &str,
) -> ClientResult<Profile> {
    let name = name.trim();
    let phone = phone.trim();
    let Some(role) = role.filter(|_| !name.is_empty()) else {
        return Err(ValidationError::MissingFields.into());
    };
    if role == Role::Hotel && phone.is_empty() {
        return Err(ValidationError::PhoneRequired.into());
    }

    let id = app.user_id(Action::SaveProfile).await?;
    let profile = app
        .store
        .insert_profile(&NewProfile {
            id,
            name: name.to_string(),
            role,
            phone: (!phone.is_empty()).then(|| phone.to_string()),
        })
        .await
        .map_err(ClientError::remote(Action::SaveProfile))?;

    info!(user = %id, role = %role, "Profile completed");
    Ok(profile)
}

/// Store the address and map position used for nearby matching.
pub async fn update_location(
    app: &App,
    address: &str,
    at: Option<Coordinates>,
) -> ClientResult<()> {
    let address = address.trim();
    let Some(at) = at.filter(|_| !address.is_empty()) else {
        return Err(ValidationError::MissingLocation.into());
    };

    let id = app.user_id(Action::UpdateLocation).await?;
    app.store
        .update_profile(
            id,
            &ProfilePatch {
                address: Some(address.to_string()),
                latitude: Some(at.latitude),
                longitude: Some(at.longitude),
                ..ProfilePatch::default()
            },
        )
        .await
        .map_err(ClientError::remote(Action::UpdateLocation))?;

    info!(user = %id, "Location updated");
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardListing {
    pub listing: FoodListing,
    pub status: ListingStatus,
    pub expiry: String,
}

/// The hotel home screen: own listings newest first plus totals.
#[derive(Debug, Clone, Serialize)]
pub struct HotelDashboard {
    pub profile: Profile,
    pub listings: Vec<DashboardListing>,
    pub total_kg: f64,
    pub active_count: usize,
}

pub async fn hotel_dashboard(app: &App) -> ClientResult<HotelDashboard> {
    hotel_dashboard_at(app, Utc::now()).await
}

async fn hotel_dashboard_at(app: &App, now: DateTime<Utc>) -> ClientResult<HotelDashboard> {
    let profile = app.profile_with_role(Role::Hotel, Action::LoadListings).await?;
    let own = app
        .store
        .listings_for_hotel(profile.id)
        .await
        .map_err(ClientError::remote(Action::LoadListings))?;

    let total_kg = own.iter().map(|l| l.quantity_kg).sum();
    // counts the stored status, expired-but-unmarked rows included
    let active_count = own
        .iter()
        .filter(|l| l.status == ListingStatus::Available)
        .count();

    let listings = own
        .into_iter()
        .map(|listing| DashboardListing {
            status: listing.effective_status(now),
            expiry: ExpiryLabel::hours_left(listing.expiry_time, now).to_string(),
            listing,
        })
        .collect();

    Ok(HotelDashboard {
        profile,
        listings,
        total_kg,
        active_count,
    })
}
