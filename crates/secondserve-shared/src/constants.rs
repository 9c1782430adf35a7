/// Application name
pub const APP_NAME: &str = "Second Serve";

/// Maximum number of images attached to a listing
pub const MAX_LISTING_IMAGES: usize = 3;

/// Storage bucket holding listing photos
pub const LISTING_IMAGE_BUCKET: &str = "listing-images";

/// Push relay batch limit (messages per POST)
pub const PUSH_BATCH_SIZE: usize = 100;

/// Default push relay endpoint
pub const PUSH_ENDPOINT: &str = "https://exp.host/--/api/v2/push/send";

/// Notification radius applied when a profile has none stored
pub const DEFAULT_NOTIFICATION_RADIUS_KM: u32 = 15;

/// Radius slider bounds and step, in km
pub const MIN_NOTIFICATION_RADIUS_KM: u32 = 5;
pub const MAX_NOTIFICATION_RADIUS_KM: u32 = 50;
pub const NOTIFICATION_RADIUS_STEP_KM: u32 = 5;

/// Place autocomplete debounce in milliseconds
pub const SEARCH_DEBOUNCE_MS: u64 = 300;

/// Queries shorter than this never reach the autocomplete endpoint
pub const MIN_SEARCH_QUERY_CHARS: usize = 3;

/// Country bias for place autocomplete
pub const DEFAULT_PLACES_COUNTRY: &str = "in";

/// Initial map centre before the user picks a location
pub const DEFAULT_MAP_LATITUDE: f64 = 30.3398;
pub const DEFAULT_MAP_LONGITUDE: f64 = 76.3869;

/// Size of the NGO home feed
pub const RECENT_LISTINGS_LIMIT: usize = 10;

/// Mean Earth radius used by the distance calculation
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Marker colours on the browse map
pub const MARKER_COLOR_NON_VEG: &str = "#EF4444";
pub const MARKER_COLOR_VEG: &str = "#10B981";
