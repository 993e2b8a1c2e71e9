/// External data provider abstractions
///
/// The recommendation pipeline talks to three collaborators: a geocoder for the
/// reference point, a candidate generator (language model) for broad
/// suggestions, and a places provider for authoritative venue data. Each one is
/// a trait so the pipeline can be exercised without network access.
use crate::{
    error::AppResult,
    models::{Coordinates, EnrichmentRecord, HotelCandidate, ReservationRequest},
};

pub mod gemini;
pub mod google_maps;

pub use gemini::GeminiProvider;
pub use google_maps::GoogleMapsProvider;

/// Resolves free-text addresses into coordinates
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns `Ok(None)` when the address matches nothing
    async fn geocode(&self, query: &str) -> AppResult<Option<Coordinates>>;
}

/// Produces loosely-structured hotel suggestions for a reservation
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CandidateGenerator: Send + Sync {
    async fn generate_candidates(
        &self,
        reservation: &ReservationRequest,
    ) -> AppResult<Vec<HotelCandidate>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Authoritative venue lookups around a reference point
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PlacesProvider: Send + Sync {
    /// Best match for a hotel name, narrowed by its address when known
    async fn find_by_name_and_address(
        &self,
        name: &str,
        address: Option<String>,
        near: Coordinates,
    ) -> AppResult<Option<EnrichmentRecord>>;

    /// Best match for a hotel name alone
    async fn find_by_name(&self, name: &str, near: Coordinates)
        -> AppResult<Option<EnrichmentRecord>>;

    /// Lodging around the reference point, at most `cap` records
    async fn search_nearby(&self, near: Coordinates, cap: usize)
        -> AppResult<Vec<EnrichmentRecord>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
