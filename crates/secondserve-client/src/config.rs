//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client can run against the local
//! SQLite backend with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use secondserve_shared::constants::{
    DEFAULT_MAP_LATITUDE, DEFAULT_MAP_LONGITUDE, DEFAULT_NOTIFICATION_RADIUS_KM,
    DEFAULT_PLACES_COUNTRY, LISTING_IMAGE_BUCKET, PUSH_ENDPOINT, SEARCH_DEBOUNCE_MS,
};
use secondserve_shared::types::Coordinates;

const DEFAULT_MAPS_BASE_URL: &str = "https://maps.googleapis.com";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend project URL (REST, auth and storage live under it).
    /// Env: `SUPABASE_URL`
    /// Default: none (remote collaborators unavailable).
    pub supabase_url: Option<String>,

    /// Anonymous API key sent as `apikey` on every backend request.
    /// Env: `SUPABASE_ANON_KEY`
    pub supabase_anon_key: Option<String>,

    /// Env: `GOOGLE_MAPS_API_KEY`
    pub google_maps_api_key: Option<String>,

    /// Env: `MAPS_BASE_URL`
    /// Default: `https://maps.googleapis.com`
    pub maps_base_url: String,

    /// Env: `PUSH_ENDPOINT`
    /// Default: the Expo push relay.
    pub push_endpoint: String,

    /// Env: `LISTING_IMAGE_BUCKET`
    /// Default: `listing-images`
    pub listing_image_bucket: String,

    /// ISO country code biasing place autocomplete.
    /// Env: `PLACES_COUNTRY`
    /// Default: `in`
    pub places_country: String,

    /// Env: `SEARCH_DEBOUNCE_MS`
    /// Default: `300`
    pub search_debounce: Duration,

    /// Radius applied when a profile has none stored.
    /// Env: `DEFAULT_RADIUS_KM`
    /// Default: `15`
    pub default_radius_km: u32,

    /// Map centre before a location is picked.
    pub default_map_center: Coordinates,

    /// SQLite file holding the cached session (and local data when running
    /// offline).
    /// Env: `SESSION_DB_PATH`
    /// Default: the platform data directory.
    pub session_db_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_anon_key: None,
            google_maps_api_key: None,
            maps_base_url: DEFAULT_MAPS_BASE_URL.to_string(),
            push_endpoint: PUSH_ENDPOINT.to_string(),
            listing_image_bucket: LISTING_IMAGE_BUCKET.to_string(),
            places_country: DEFAULT_PLACES_COUNTRY.to_string(),
            search_debounce: Duration::from_millis(SEARCH_DEBOUNCE_MS),
            default_radius_km: DEFAULT_NOTIFICATION_RADIUS_KM,
            default_map_center: Coordinates::new(DEFAULT_MAP_LATITUDE, DEFAULT_MAP_LONGITUDE),
            session_db_path: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("SUPABASE_URL") {
            config.supabase_url = Some(url.trim_end_matches('/').to_string());
        }

        config.supabase_anon_key = non_empty("SUPABASE_ANON_KEY");
        config.google_maps_api_key = non_empty("GOOGLE_MAPS_API_KEY");

        if let Some(url) = non_empty("MAPS_BASE_URL") {
            config.maps_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(url) = non_empty("PUSH_ENDPOINT") {
            config.push_endpoint = url;
        }

        if let Some(bucket) = non_empty("LISTING_IMAGE_BUCKET") {
            config.listing_image_bucket = bucket;
        }

        if let Some(cc) = non_empty("PLACES_COUNTRY") {
            config.places_country = cc.to_lowercase();
        }

        if let Some(val) = non_empty("SEARCH_DEBOUNCE_MS") {
            match val.parse::<u64>() {
                Ok(ms) => config.search_debounce = Duration::from_millis(ms),
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid SEARCH_DEBOUNCE_MS, using default");
                }
            }
        }

        if let Some(val) = non_empty("DEFAULT_RADIUS_KM") {
            match val.parse::<u32>() {
                Ok(km) if km > 0 => config.default_radius_km = km,
                _ => {
                    tracing::warn!(value = %val, "Invalid DEFAULT_RADIUS_KM, using default");
                }
            }
        }

        if let Some(path) = non_empty("SESSION_DB_PATH") {
            config.session_db_path = Some(PathBuf::from(path));
        }

        // RUST_LOG is read by the EnvFilter in init_tracing.

        config
    }

    /// Whether the remote backend is configured.
    pub fn has_remote_backend(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_anon_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ClientConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]);
        assert!(!config.has_remote_backend());
        assert_eq!(config.listing_image_bucket, "listing-images");
        assert_eq!(config.search_debounce, Duration::from_millis(300));
        assert_eq!(config.default_radius_km, 15);
        assert_eq!(config.places_country, "in");
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("SUPABASE_URL", "https://abc.supabase.co/"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("PLACES_COUNTRY", "GB"),
            ("SEARCH_DEBOUNCE_MS", "150"),
            ("SESSION_DB_PATH", "/tmp/ss.db"),
        ]);
        assert!(config.has_remote_backend());
        assert_eq!(config.supabase_url.as_deref(), Some("https://abc.supabase.co"));
        assert_eq!(config.places_country, "gb");
        assert_eq!(config.search_debounce, Duration::from_millis(150));
        assert_eq!(config.session_db_path, Some(PathBuf::from("/tmp/ss.db")));
    }

    #[test]
    fn invalid_numbers_keep_defaults() {
        let config = load(&[("SEARCH_DEBOUNCE_MS", "soon"), ("DEFAULT_RADIUS_KM", "0")]);
        assert_eq!(config.search_debounce, Duration::from_millis(300));
        assert_eq!(config.default_radius_km, 15);
    }
}
