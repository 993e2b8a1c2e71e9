use serde::Deserialize;

use super::Coordinates;

/// Authoritative venue data from the places service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentRecord {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub rating: Option<f64>,
    pub total_reviews: Option<u32>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Price tier, 0 (free) to 4 (very expensive)
    pub price_tier: Option<i64>,
    pub website: Option<String>,
    pub reviews: Vec<PlaceReview>,
}

impl EnrichmentRecord {
    /// Coordinates, only when both components are present
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceReview {
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub text: Option<String>,
    pub relative_time: Option<String>,
}

// ============================================================================
// Google Maps Platform API Types
// ============================================================================

/// Response from GET /maps/api/geocode/json
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    pub geometry: ApiGeometry,
    #[serde(default)]
    pub formatted_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiGeometry {
    #[serde(default)]
    pub location: Option<ApiLatLng>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiLatLng {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

/// Response from GET /maps/api/place/textsearch/json
#[derive(Debug, Clone, Deserialize)]
pub struct TextSearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<TextSearchHit>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextSearchHit {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// Response from GET /maps/api/place/details/json
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceDetailsResponse {
    pub status: String,
    #[serde(default)]
    pub result: Option<ApiPlaceDetails>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiPlaceDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub geometry: Option<ApiGeometry>,
    #[serde(default)]
    pub formatted_phone_number: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: Option<u32>,
    #[serde(default)]
    pub price_level: Option<i64>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub reviews: Vec<ApiReview>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiReview {
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub relative_time_description: Option<String>,
}

impl From<ApiReview> for PlaceReview {
    fn from(review: ApiReview) -> Self {
        Self {
            author: review.author_name,
            rating: review.rating,
            text: review.text,
            relative_time: review.relative_time_description,
        }
    }
}

impl ApiPlaceDetails {
    /// Builds an enrichment record, falling back to the search hit's name
    pub fn into_record(self, hit_name: Option<String>) -> EnrichmentRecord {
        let location = self
            .geometry
            .and_then(|g| g.location)
            .unwrap_or_default();

        EnrichmentRecord {
            name: self.name.or(hit_name),
            address: self.formatted_address,
            phone: self.formatted_phone_number,
            rating: self.rating,
            total_reviews: self.user_ratings_total,
            lat: location.lat,
            lng: location.lng,
            price_tier: self.price_level,
            website: self.website,
            reviews: self
                .reviews
                .into_iter()
                .take(super::MAX_REVIEWS)
                .map(PlaceReview::from)
                .collect(),
        }
    }
}
