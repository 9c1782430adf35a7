//! Listing creation, deletion and the NGO browse views.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use secondserve_shared::constants::{
    MARKER_COLOR_NON_VEG, MARKER_COLOR_VEG, MAX_LISTING_IMAGES, RECENT_LISTINGS_LIMIT,
};
use secondserve_shared::expiry::ExpiryLabel;
use secondserve_shared::models::{
    FoodListing, FoodType, ListingQuery, ListingStatus, ListingWithOwner, NewListing, Role,
};
use secondserve_shared::search::filter_listings;
use secondserve_shared::types::{Coordinates, ListingId, UserId};
use secondserve_shared::BackendError;

use crate::error::{Action, ClientError, ClientResult, ValidationError};
use crate::notify::notify_nearby_ngos;
use crate::state::App;

const KEY_SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const KEY_SUFFIX_LEN: usize = 6;

/// The "post donation" form as typed by the hotel.
#[derive(Debug, Clone)]
pub struct ListingForm {
    pub title: String,
    pub description: String,
    /// Kilograms, as entered.
    pub quantity_kg: String,
    /// Hours until expiry, as entered.
    pub expiry_hours: String,
    pub food_type: FoodType,
    pub address: String,
    pub location: Option<Coordinates>,
    /// Local photo files, uploaded in order.
    pub images: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Validated {
    quantity_kg: f64,
    expiry_hours: i64,
}

impl ListingForm {
    fn validate(&self) -> Result<Validated, ValidationError> {
        let required = [
            &self.title,
            &self.description,
            &self.quantity_kg,
            &self.expiry_hours,
            &self.address,
        ];
        if required.iter().any(|f| f.trim().is_empty()) {
            return Err(ValidationError::MissingFields);
        }
        if self.images.is_empty() {
            return Err(ValidationError::ImageRequired);
        }
        if self.images.len() > MAX_LISTING_IMAGES {
            return Err(ValidationError::TooManyImages);
        }

        let quantity_kg = self
            .quantity_kg
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|q| q.is_finite() && *q > 0.0)
            .ok_or(ValidationError::InvalidQuantity)?;
        let expiry_hours = self
            .expiry_hours
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|h| *h > 0)
            .ok_or(ValidationError::InvalidExpiry)?;

        Ok(Validated {
            quantity_kg,
            expiry_hours: i64::from(expiry_hours),
        })
    }
}

/// Lowercased file extension, `jpg` when there is none.
fn image_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_else(|| "jpg".to_string())
}

fn content_type(ext: &str) -> String {
    match ext {
        "jpg" => "image/jpeg".to_string(),
        other => format!("image/{other}"),
    }
}

/// `{user}/{epoch_millis}-{random6}.{ext}`
fn storage_key(user: UserId, now: DateTime<Utc>, ext: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..KEY_SUFFIX_LEN)
        .map(|_| KEY_SUFFIX_CHARS[rng.gen_range(0..KEY_SUFFIX_CHARS.len())] as char)
        .collect();
    format!("{user}/{}-{suffix}.{ext}", now.timestamp_millis())
}

/// Upload each photo in turn and collect the public URLs. Stops at the first
/// failure; objects already uploaded stay in the bucket.
async fn upload_images(app: &App, user: UserId, images: &[PathBuf]) -> ClientResult<Vec<String>> {
    let bucket = &app.config.listing_image_bucket;
    let mut urls = Vec::with_capacity(images.len());

    for path in images {
        let ext = image_extension(path);
        let key = storage_key(user, Utc::now(), &ext);

        let data = tokio::fs::read(path).await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "Cannot read image");
            ClientError::remote(Action::UploadImage)(BackendError::Storage(e.to_string()))
        })?;

        app.storage
            .upload(bucket, &key, Bytes::from(data), &content_type(&ext))
            .await
            .map_err(|e| {
                warn!(key = %key, error = %e, "Image upload failed");
                ClientError::remote(Action::UploadImage)(e)
            })?;

        debug!(key = %key, "Image uploaded");
        urls.push(app.storage.public_url(bucket, &key));
    }
    Ok(urls)
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedListing {
    pub listing: FoodListing,
    /// Push messages handed to the relay; `None` when the fan-out failed.
    pub notified: Option<usize>,
}

/// Validate, upload the photos, insert the listing and alert nearby NGOs.
pub async fn create_listing(app: &App, form: &ListingForm) -> ClientResult<CreatedListing> {
    let valid = form.validate()?;
    let hotel = app.profile_with_role(Role::Hotel, Action::CreateListing).await?;

    let images = upload_images(app, hotel.id, &form.images).await?;

    let expiry_time = Utc::now()
        .checked_add_signed(Duration::hours(valid.expiry_hours))
        .ok_or(ValidationError::InvalidExpiry)?;
    let new = NewListing {
        hotel_id: hotel.id,
        title: form.title.trim().to_string(),
        description: form.description.trim().to_string(),
        quantity_kg: valid.quantity_kg,
        food_type: form.food_type,
        expiry_time,
        address: form.address.trim().to_string(),
        latitude: form.location.map(|c| c.latitude),
        longitude: form.location.map(|c| c.longitude),
        status: ListingStatus::Available,
        images,
    };
    let listing = app
        .store
        .insert_listing(&new)
        .await
        .map_err(ClientError::remote(Action::CreateListing))?;

    info!(listing = %listing.id, hotel = %hotel.id, "Listing created");

    let notified = match notify_nearby_ngos(app, &listing).await {
        Ok(sent) => Some(sent),
        Err(e) => {
            warn!(listing = %listing.id, error = %e, "Failed to notify nearby NGOs");
            None
        }
    };

    Ok(CreatedListing { listing, notified })
}

/// Delete one of the signed-in hotel's listings. Chat history about it is
/// kept.
pub async fn delete_listing(app: &App, id: ListingId) -> ClientResult<()> {
    let user = app.user_id(Action::DeleteListing).await?;
    let found = app
        .store
        .listing(id)
        .await
        .map_err(ClientError::remote(Action::DeleteListing))?
        .ok_or(ClientError::ListingNotFound)?;
    if found.listing.hotel_id != user {
        return Err(ClientError::NotOwner);
    }

    let removed = app
        .store
        .delete_listing(id)
        .await
        .map_err(ClientError::remote(Action::DeleteListing))?;
    if !removed {
        return Err(ClientError::ListingNotFound);
    }

    info!(listing = %id, "Listing deleted");
    Ok(())
}

pub async fn edit_listing(_app: &App, _id: ListingId) -> ClientResult<()> {
    Err(ClientError::Unsupported {
        title: "Edit Listing",
        message: "Edit functionality coming soon!",
    })
}

/// Unexpired available listings matching `query`, newest first.
pub async fn browse_listings(app: &App, query: &str) -> ClientResult<Vec<ListingWithOwner>> {
    let all = app
        .store
        .available_listings(&ListingQuery::browse(Utc::now()))
        .await
        .map_err(ClientError::remote(Action::LoadListings))?;
    Ok(filter_listings(all, query))
}

/// The NGO home feed.
pub async fn recent_listings(app: &App) -> ClientResult<Vec<ListingWithOwner>> {
    app.store
        .available_listings(&ListingQuery::recent(RECENT_LISTINGS_LIMIT))
        .await
        .map_err(ClientError::remote(Action::LoadListings))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub listing_id: ListingId,
    pub title: String,
    pub coordinates: Coordinates,
    pub food_type: FoodType,
    pub color: &'static str,
}

pub fn marker_color(food_type: FoodType) -> &'static str {
    match food_type {
        FoodType::NonVeg => MARKER_COLOR_NON_VEG,
        FoodType::Veg | FoodType::Both => MARKER_COLOR_VEG,
    }
}

pub async fn map_markers(app: &App) -> ClientResult<Vec<MapMarker>> {
    let listings = app
        .store
        .available_listings(&ListingQuery::map(Utc::now()))
        .await
        .map_err(ClientError::remote(Action::LoadListings))?;

    Ok(listings
        .into_iter()
        .filter_map(|l| {
            let coordinates = l.listing.coordinates()?;
            Some(MapMarker {
                listing_id: l.listing.id,
                color: marker_color(l.listing.food_type),
                food_type: l.listing.food_type,
                title: l.listing.title,
                coordinates,
            })
        })
        .collect())
}

/// Display string for a listing card.
pub fn expiry_label(expiry: DateTime<Utc>, now: DateTime<Utc>) -> String {
    ExpiryLabel::for_listing(expiry, now).to_string()
}
