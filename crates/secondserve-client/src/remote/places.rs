//! Google Places autocomplete, place details and reverse geocoding.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use secondserve_shared::backend::{BackendResult, PlacesProvider};
use secondserve_shared::models::PlaceSuggestion;
use secondserve_shared::types::Coordinates;
use secondserve_shared::BackendError;

use super::json;

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    predictions: Vec<PlaceSuggestion>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    result: Option<DetailsResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

/// The service answers 200 with a status field; anything other than OK or
/// ZERO_RESULTS is a failure.
fn check_status(status: &str, error_message: Option<String>) -> BackendResult<()> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => Err(BackendError::api(
            200,
            error_message.unwrap_or_else(|| other.to_string()),
        )),
    }
}

pub struct GooglePlaces {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GooglePlaces {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> BackendResult<T> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .query(&[("key", &self.api_key)])
            .send()
            .await
            .map_err(super::transport)?;
        json(resp).await
    }
}

#[async_trait]
impl PlacesProvider for GooglePlaces {
    async fn autocomplete(
        &self,
        query: &str,
        country: &str,
    ) -> BackendResult<Vec<PlaceSuggestion>> {
        let resp: AutocompleteResponse = self
            .get(
                "/maps/api/place/autocomplete/json",
                &[
                    ("input", query.to_string()),
                    ("components", format!("country:{country}")),
                ],
            )
            .await?;
        check_status(&resp.status, resp.error_message)?;
        debug!(query, count = resp.predictions.len(), "Autocomplete");
        Ok(resp.predictions)
    }

    async fn place_details(&self, place_id: &str) -> BackendResult<Option<Coordinates>> {
        let resp: DetailsResponse = self
            .get(
                "/maps/api/place/details/json",
                &[
                    ("place_id", place_id.to_string()),
                    ("fields", "geometry".to_string()),
                ],
            )
            .await?;
        check_status(&resp.status, resp.error_message)?;
        Ok(resp
            .result
            .and_then(|r| r.geometry)
            .map(|g| Coordinates::new(g.location.lat, g.location.lng)))
    }

    async fn reverse_geocode(&self, at: Coordinates) -> BackendResult<Option<String>> {
        let resp: GeocodeResponse = self
            .get(
                "/maps/api/geocode/json",
                &[("latlng", format!("{},{}", at.latitude, at.longitude))],
            )
            .await?;
        check_status(&resp.status, resp.error_message)?;
        Ok(resp.results.into_iter().next().map(|r| r.formatted_address))
    }
}
