/// Google Maps Platform provider
///
/// Implements both geocoding and venue enrichment on top of the legacy
/// web-service endpoints:
///
/// 1. Geocoding: /maps/api/geocode/json → reference coordinates
/// 2. Text Search: /maps/api/place/textsearch/json → candidate place IDs
/// 3. Place Details: /maps/api/place/details/json → address, phone, rating, reviews
///
/// Every request goes through [`RetryPolicy::MAPS`]; `OVER_QUERY_LIMIT` and
/// `UNKNOWN_ERROR` statuses count as transient.
use crate::{
    config::MapsSettings,
    error::{AppError, AppResult},
    models::{
        places::{GeocodeResponse, PlaceDetailsResponse, TextSearchHit, TextSearchResponse},
        Coordinates, EnrichmentRecord,
    },
    services::{
        providers::{Geocoder, PlacesProvider},
        retry::RetryPolicy,
    },
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use tracing::instrument;

const LODGING_TYPE: &str = "lodging";
const DETAIL_FIELDS: &str = "name,formatted_address,geometry,formatted_phone_number,rating,user_ratings_total,price_level,website,reviews";

#[derive(Clone)]
pub struct GoogleMapsProvider {
    http_client: HttpClient,
    settings: MapsSettings,
    retry: RetryPolicy,
}

impl GoogleMapsProvider {
    pub fn new(settings: MapsSettings) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            http_client,
            settings,
            retry: RetryPolicy::MAPS,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// GET a Maps web-service endpoint and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        label: &'static str,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.settings.api_url, path);
        let url = url.as_str();
        let client = &self.http_client;
        let api_key = self.settings.api_key.as_str();

        self.retry
            .run(label, move || async move {
                let response = client
                    .get(url)
                    .query(params)
                    .query(&[("key", api_key)])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let message = format!("Maps API returned status {}: {}", status, body);
                    return Err(if status.is_server_error() || status.as_u16() == 429 {
                        AppError::RateLimited(message)
                    } else {
                        AppError::ExternalApi(message)
                    });
                }

                let body = response.text().await?;
                tracing::debug!(call = label, response = %body, "Raw Maps API response");

                serde_json::from_str::<T>(&body).map_err(|e| {
                    AppError::MalformedResponse(format!("Failed to parse Maps response: {}", e))
                })
            })
            .await
    }

    #[instrument(skip(self), fields(provider = "google_maps"))]
    async fn text_search(&self, query: &str, near: Coordinates) -> AppResult<Vec<TextSearchHit>> {
        let params = [
            ("query", query.to_string()),
            ("location", format!("{},{}", near.lat, near.lng)),
            ("radius", self.settings.radius_meters.to_string()),
            ("type", LODGING_TYPE.to_string()),
        ];

        let response: TextSearchResponse = self
            .get_json("places_text_search", "/maps/api/place/textsearch/json", &params)
            .await?;
        check_status(&response.status, response.error_message.as_deref())?;

        tracing::info!(
            query = %query,
            results = response.results.len(),
            provider = "google_maps",
            "Places text search completed"
        );

        Ok(response.results)
    }

    #[instrument(skip(self, hit), fields(provider = "google_maps", place_id = ?hit.place_id))]
    async fn place_details(&self, hit: TextSearchHit) -> AppResult<Option<EnrichmentRecord>> {
        let Some(place_id) = hit.place_id else {
            return Ok(None);
        };

        let params = [("place_id", place_id), ("fields", DETAIL_FIELDS.to_string())];
        let response: PlaceDetailsResponse = self
            .get_json("place_details", "/maps/api/place/details/json", &params)
            .await?;
        check_status(&response.status, response.error_message.as_deref())?;

        Ok(response.result.map(|details| details.into_record(hit.name)))
    }
}

/// Maps a web-service `status` to a result; `ZERO_RESULTS` and `NOT_FOUND` are empty, not errors
fn check_status(status: &str, error_message: Option<&str>) -> AppResult<()> {
    let detail = || {
        format!(
            "Maps API status {}: {}",
            status,
            error_message.unwrap_or("no details")
        )
    };

    match status {
        "OK" | "ZERO_RESULTS" | "NOT_FOUND" => Ok(()),
        "OVER_QUERY_LIMIT" | "UNKNOWN_ERROR" => Err(AppError::RateLimited(detail())),
        _ => Err(AppError::ExternalApi(detail())),
    }
}

/// Text query used for a hotel lookup
fn lookup_query(name: &str, address: Option<&str>) -> String {
    match address {
        Some(address) => format!("{} {}", name, address),
        None => format!("{} hotel", name),
    }
}

/// The highest-rated hit; unrated hits count as 0 and earlier hits win ties
fn best_rated(hits: Vec<TextSearchHit>) -> Option<TextSearchHit> {
    hits.into_iter().reduce(|best, hit| {
        if hit.rating.unwrap_or(0.0) > best.rating.unwrap_or(0.0) {
            hit
        } else {
            best
        }
    })
}

#[async_trait::async_trait]
impl Geocoder for GoogleMapsProvider {
    async fn geocode(&self, query: &str) -> AppResult<Option<Coordinates>> {
        if query.trim().is_empty() {
            return Ok(None);
        }

        let params = [("address", query.to_string())];
        let response: GeocodeResponse = self
            .get_json("geocode", "/maps/api/geocode/json", &params)
            .await?;
        check_status(&response.status, response.error_message.as_deref())?;

        let coords = response
            .results
            .into_iter()
            .next()
            .and_then(|r| r.geometry.location)
            .and_then(|loc| Some(Coordinates::new(loc.lat?, loc.lng?)));

        tracing::info!(
            query = %query,
            found = coords.is_some(),
            provider = "google_maps",
            "Geocoding completed"
        );

        Ok(coords)
    }
}

#[async_trait::async_trait]
impl PlacesProvider for GoogleMapsProvider {
    async fn find_by_name_and_address(
        &self,
        name: &str,
        address: Option<String>,
        near: Coordinates,
    ) -> AppResult<Option<EnrichmentRecord>> {
        if name.trim().is_empty() {
            return Ok(None);
        }

        let query = lookup_query(name, address.as_deref());
        // Results come back sorted by relevance
        let Some(best) = self.text_search(&query, near).await?.into_iter().next() else {
            return Ok(None);
        };

        self.place_details(best).await
    }

    async fn find_by_name(&self, name: &str, near: Coordinates) -> AppResult<Option<EnrichmentRecord>> {
        if name.trim().is_empty() {
            return Ok(None);
        }

        let hits = self.text_search(&lookup_query(name, None), near).await?;
        let Some(best) = best_rated(hits) else {
            return Ok(None);
        };

        match self.place_details(best).await {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::warn!(error = %e, hotel = %name, "Place details failed for name lookup");
                Ok(None)
            }
        }
    }

    async fn search_nearby(&self, near: Coordinates, cap: usize) -> AppResult<Vec<EnrichmentRecord>> {
        let hits = self.text_search("hotel", near).await?;

        let mut records = Vec::new();
        for hit in hits {
            if records.len() >= cap {
                break;
            }
            let place_id = hit.place_id.clone();
            match self.place_details(hit).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        place_id = ?place_id,
                        "Skipping nearby result whose details failed"
                    );
                }
            }
        }

        tracing::info!(
            results = records.len(),
            cap,
            provider = "google_maps",
            "Nearby lodging search completed"
        );

        Ok(records)
    }

    fn name(&self) -> &'static str {
        "google_maps"
    }
}
