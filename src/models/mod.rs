use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub mod candidate;
pub mod places;

pub use candidate::{CandidatePrice, HotelCandidate};
pub use places::{EnrichmentRecord, PlaceReview};

/// Upper bound on reviews carried per hotel
pub const MAX_REVIEWS: usize = 5;

/// A hotel recommendation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReservationRequest {
    /// Specific address used as the proximity anchor
    #[serde(default)]
    pub address: Option<String>,
    pub date: NaiveDate,
    pub guests: u32,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub additional_comments: Option<String>,
}

impl ReservationRequest {
    /// Rejects structurally invalid requests
    pub fn validate(&self) -> AppResult<()> {
        if self.guests == 0 {
            return Err(AppError::InvalidInput(
                "guests must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// The anchor address, if one was supplied and is not blank
    pub fn anchor_address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

/// WGS84 coordinates in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Review {
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub text: Option<String>,
    pub relative_time: Option<String>,
}

impl From<PlaceReview> for Review {
    fn from(review: PlaceReview) -> Self {
        Self {
            author: review.author,
            rating: review.rating.filter(|r| valid_rating(*r)),
            text: review.text,
            relative_time: review.relative_time,
        }
    }
}

/// A recommended hotel returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hotel {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    /// Reserved; never populated
    pub email: Option<String>,
    pub rating: Option<f64>,
    pub price_per_night: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub room_features: Option<Vec<String>>,
    pub location: Option<Coordinates>,
    pub distance_km: Option<f64>,
    pub verified: bool,
    pub reviews: Option<Vec<Review>>,
    pub total_reviews: Option<u32>,
}

impl Hotel {
    /// A hotel carrying only its name; every other field is absent
    pub fn unverified(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
            phone: None,
            email: None,
            rating: None,
            price_per_night: None,
            amenities: None,
            room_features: None,
            location: None,
            distance_km: None,
            verified: false,
            reviews: None,
            total_reviews: None,
        }
    }
}

/// Which path produced a set of recommendations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecommendationSource {
    /// Language model candidates cross-checked against places data
    #[serde(rename = "gemini+maps")]
    CandidatesWithEnrichment,
    /// Direct places search around the reference point
    #[serde(rename = "maps")]
    PlacesFallback,
    /// Nothing could be produced
    #[serde(rename = "none")]
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationsResponse {
    pub results: Vec<Hotel>,
    /// Number of hotels before truncation
    pub total_candidates: usize,
    pub total_verified: usize,
    pub source: RecommendationSource,
}

impl RecommendationsResponse {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            total_candidates: 0,
            total_verified: 0,
            source: RecommendationSource::Empty,
        }
    }
}

/// Ratings outside [0, 5] are treated as absent
pub fn valid_rating(rating: f64) -> bool {
    (0.0..=5.0).contains(&rating)
}
