//! Debounced place search and the map location picker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use secondserve_shared::backend::PlacesProvider;
use secondserve_shared::constants::MIN_SEARCH_QUERY_CHARS;
use secondserve_shared::models::PlaceSuggestion;
use secondserve_shared::types::Coordinates;
use secondserve_shared::BackendError;

use crate::error::{Action, ClientError, ClientResult};
use crate::state::App;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Results(Vec<PlaceSuggestion>),
    /// A newer search started while this one was waiting; drop its results.
    Superseded,
}

/// Place autocomplete where only the most recent query wins.
///
/// Each call takes a generation number. After the debounce and again after
/// the HTTP round trip, a call whose generation is no longer current gives
/// up with [`SearchOutcome::Superseded`]. In-flight requests are not
/// cancelled.
pub struct PlaceSearch {
    places: Arc<dyn PlacesProvider>,
    country: String,
    debounce: Duration,
    generation: AtomicU64,
}

impl PlaceSearch {
    pub fn new(app: &App) -> Self {
        Self {
            places: app.places.clone(),
            country: app.config.places_country.clone(),
            debounce: app.config.search_debounce,
            generation: AtomicU64::new(0),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    pub async fn search(&self, query: &str) -> ClientResult<SearchOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_QUERY_CHARS {
            return Ok(SearchOutcome::Results(Vec::new()));
        }

        tokio::time::sleep(self.debounce).await;
        if !self.is_current(generation) {
            debug!(query, "Search superseded before request");
            return Ok(SearchOutcome::Superseded);
        }

        let results = self.places.autocomplete(query, &self.country).await;

        if !self.is_current(generation) {
            debug!(query, failed = results.is_err(), "Search superseded after request");
            return Ok(SearchOutcome::Superseded);
        }
        results
            .map(SearchOutcome::Results)
            .map_err(ClientError::remote(Action::PlaceLookup))
    }
}

/// State behind the "pick a location" map.
pub struct LocationPicker {
    places: Arc<dyn PlacesProvider>,
    pub address: String,
    pub coordinates: Coordinates,
    /// Set once the user picked a suggestion or moved the map.
    pub confirmed: bool,
}

impl LocationPicker {
    pub fn new(app: &App) -> Self {
        Self {
            places: app.places.clone(),
            address: String::new(),
            coordinates: app.config.default_map_center,
            confirmed: false,
        }
    }

    /// Resolve a chosen suggestion to coordinates and centre on it.
    pub async fn select_place(
        &mut self,
        place_id: &str,
        description: &str,
    ) -> ClientResult<Coordinates> {
        let at = self
            .places
            .place_details(place_id)
            .await
            .map_err(ClientError::remote(Action::PlaceLookup))?
            .ok_or_else(|| ClientError::remote(Action::PlaceLookup)(BackendError::NotFound))?;

        self.address = description.to_string();
        self.coordinates = at;
        self.confirmed = true;
        Ok(at)
    }

    /// The map came to rest at `at`. The address follows by reverse geocode;
    /// on failure the previous address is kept.
    pub async fn settle_region(&mut self, at: Coordinates) {
        self.coordinates = at;
        self.confirmed = true;

        match self.places.reverse_geocode(at).await {
            Ok(Some(address)) => self.address = address,
            Ok(None) => debug!(lat = at.latitude, lon = at.longitude, "No address for location"),
            Err(e) => warn!(error = %e, "Reverse geocode failed"),
        }
    }
}
