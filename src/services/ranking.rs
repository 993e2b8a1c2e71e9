use std::cmp::Ordering;

use crate::models::Hotel;

/// Sort key used for hotels whose distance is unknown
const MISSING_DISTANCE_KM: f64 = 1e9;

fn distance_key(hotel: &Hotel) -> f64 {
    hotel.distance_km.unwrap_or(MISSING_DISTANCE_KM)
}

fn rating_key(hotel: &Hotel) -> f64 {
    hotel.rating.unwrap_or(0.0)
}

/// Nearest first, then best rated
fn by_distance_then_rating(a: &Hotel, b: &Hotel) -> Ordering {
    distance_key(a)
        .total_cmp(&distance_key(b))
        .then_with(|| rating_key(b).total_cmp(&rating_key(a)))
}

/// Orders candidate-path hotels: verified first, then nearest, then best rated
pub fn rank_candidates(hotels: &mut [Hotel]) {
    hotels.sort_by(|a, b| {
        b.verified
            .cmp(&a.verified)
            .then_with(|| by_distance_then_rating(a, b))
    });
}

/// Orders fallback-path hotels: nearest, then best rated
pub fn rank_fallback(hotels: &mut [Hotel]) {
    hotels.sort_by(by_distance_then_rating);
}
