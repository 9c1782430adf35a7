//! Command errors and the alerts they turn into.
//!
//! Validation failures are raised before any collaborator is called. Remote
//! failures carry the [`Action`] that was being attempted so the alert can
//! show the collaborator's message or the action's fallback text.

use secondserve_shared::models::Role;
use secondserve_shared::BackendError;
use serde::Serialize;
use thiserror::Error;

/// Input rejected before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill all required fields")]
    MissingFields,

    #[error("Please add at least one photo of the food.")]
    ImageRequired,

    #[error("You can only add up to 3 images.")]
    TooManyImages,

    #[error("Quantity must be a number greater than 0")]
    InvalidQuantity,

    #[error("Expiry must be a whole number of hours greater than 0")]
    InvalidExpiry,

    #[error("Please enter both email and password")]
    MissingCredentials,

    #[error("Hotels/Restaurants must add a contact number")]
    PhoneRequired,

    #[error("Radius must be between 5 and 50 km, in steps of 5")]
    InvalidRadius,

    #[error("Please type a message")]
    EmptyMessage,

    #[error("Please choose a location on the map")]
    MissingLocation,
}

impl ValidationError {
    fn title(&self) -> &'static str {
        match self {
            Self::MissingFields | Self::MissingLocation => "Missing info",
            Self::ImageRequired => "Image Required",
            Self::TooManyImages => "Limit Reached",
            Self::InvalidQuantity => "Invalid quantity",
            Self::InvalidExpiry => "Invalid expiry",
            Self::MissingCredentials => "Missing Fields",
            Self::PhoneRequired => "Phone required",
            Self::InvalidRadius => "Invalid radius",
            Self::EmptyMessage => "Empty message",
        }
    }
}

/// The workflow step a remote failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SignIn,
    SignUp,
    SignOut,
    LoadProfile,
    SaveProfile,
    UploadImage,
    CreateListing,
    DeleteListing,
    LoadListings,
    SaveListing,
    LoadClaims,
    StartConversation,
    SendMessage,
    LoadMessages,
    SaveSettings,
    UpdateLocation,
    PlaceLookup,
}

impl Action {
    pub fn fallback(&self) -> &'static str {
        match self {
            Self::SignIn | Self::SignUp | Self::SaveProfile | Self::SaveSettings => {
                "Something went wrong"
            }
            Self::SignOut => "Failed to sign out",
            Self::LoadProfile => "Failed to load profile",
            Self::UploadImage => "Failed to upload images. Please check your internet connection.",
            Self::CreateListing => "Failed to create listing",
            Self::DeleteListing => "Failed to delete listing",
            Self::LoadListings => "Failed to load listings",
            Self::SaveListing => "Failed to save listing",
            Self::LoadClaims => "Failed to load claims",
            Self::StartConversation => "Failed to start conversation",
            Self::SendMessage => "Failed to send message",
            Self::LoadMessages => "Failed to load messages",
            Self::UpdateLocation => "Failed to update location",
            Self::PlaceLookup => "Could not get location details",
        }
    }

    /// Mutating actions surface the collaborator's own message; reads show
    /// the fixed fallback.
    fn shows_remote_message(&self) -> bool {
        matches!(
            self,
            Self::SignIn
                | Self::SignUp
                | Self::SaveProfile
                | Self::CreateListing
                | Self::DeleteListing
                | Self::SaveSettings
                | Self::UpdateLocation
        )
    }

    fn sign_in_prompt(&self) -> &'static str {
        match self {
            Self::SaveListing => "Please sign in to save listings",
            Self::StartConversation | Self::SendMessage => "Please sign in to contact hotels",
            _ => "Please sign in to continue",
        }
    }
}

/// Errors returned by command functions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{}", .0.sign_in_prompt())]
    NotSignedIn(Action),

    #[error("Please complete your profile first")]
    ProfileMissing,

    #[error("This action is only available to {} accounts", .0.as_str())]
    WrongRole(Role),

    #[error("You can only change your own listings")]
    NotOwner,

    #[error("This listing is no longer available")]
    ListingNotFound,

    #[error("Please set your location to enable notifications")]
    LocationRequired,

    #[error("{message}")]
    Unsupported {
        title: &'static str,
        message: &'static str,
    },

    #[error("{}: {source}", .action.fallback())]
    Remote {
        action: Action,
        #[source]
        source: BackendError,
    },
}

/// A `{title, body}` dialog for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub title: String,
    pub body: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

impl ClientError {
    pub fn remote(action: Action) -> impl FnOnce(BackendError) -> Self {
        move |source| Self::Remote { action, source }
    }

    pub fn alert(&self) -> Alert {
        match self {
            Self::Validation(v) => Alert::new(v.title(), v.to_string()),
            Self::LocationRequired => Alert::new("Location Required", self.to_string()),
            Self::Unsupported { title, message } => Alert::new(*title, *message),
            Self::Remote { action, source } => {
                let body = source
                    .remote_message()
                    .filter(|_| action.shows_remote_message())
                    .unwrap_or(action.fallback());
                Alert::new("Error", body)
            }
            _ => Alert::new("Error", self.to_string()),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
