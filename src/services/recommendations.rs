use std::sync::Arc;

use tokio::task::JoinSet;

use crate::{
    config::RecommenderSettings,
    models::{
        valid_rating, Coordinates, EnrichmentRecord, Hotel, HotelCandidate, PlaceReview,
        RecommendationSource, RecommendationsResponse, ReservationRequest, Review, MAX_REVIEWS,
    },
    services::{
        enrichment,
        geo::{distance_km, round2},
        pricing::{format_price_tier, normalize_price},
        providers::{CandidateGenerator, Geocoder, PlacesProvider},
        ranking,
    },
};

/// Generates hotel recommendations near a reservation's address
///
/// Candidates come from the language model and are cross-checked against the
/// places service, which supplies coordinates, contact details, ratings and
/// reviews. When the model yields nothing, a direct places search around the
/// geocoded address is used instead. Every collaborator failure degrades to
/// "data unavailable"; `recommend` itself never fails.
#[derive(Clone)]
pub struct Recommender {
    geocoder: Arc<dyn Geocoder>,
    generator: Arc<dyn CandidateGenerator>,
    places: Arc<dyn PlacesProvider>,
    settings: RecommenderSettings,
}

impl Recommender {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        generator: Arc<dyn CandidateGenerator>,
        places: Arc<dyn PlacesProvider>,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            geocoder,
            generator,
            places,
            settings,
        }
    }

    pub async fn recommend(&self, reservation: &ReservationRequest) -> RecommendationsResponse {
        let reference = self.resolve_reference(reservation).await;
        let candidates = self.obtain_candidates(reservation).await;

        if !candidates.is_empty() {
            let mut hotels = self.merge_candidates(candidates, reference).await;
            ranking::rank_candidates(&mut hotels);
            return self.finish(hotels, RecommendationSource::CandidatesWithEnrichment);
        }

        match reference {
            Some(reference) => {
                let mut hotels = self.search_fallback(reference).await;
                ranking::rank_fallback(&mut hotels);
                self.finish(hotels, RecommendationSource::PlacesFallback)
            }
            None => {
                tracing::info!("No candidates and no reference point, returning empty result");
                RecommendationsResponse::empty()
            }
        }
    }

    async fn resolve_reference(&self, reservation: &ReservationRequest) -> Option<Coordinates> {
        let address = reservation.anchor_address()?;

        match self.geocoder.geocode(address).await {
            Ok(Some(coords)) => {
                tracing::debug!(address = %address, lat = coords.lat, lng = coords.lng, "Reference point resolved");
                Some(coords)
            }
            Ok(None) => {
                tracing::info!(address = %address, "Address did not geocode");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, address = %address, "Geocoding failed");
                None
            }
        }
    }

    async fn obtain_candidates(&self, reservation: &ReservationRequest) -> Vec<HotelCandidate> {
        match self.generator.generate_candidates(reservation).await {
            Ok(candidates) => {
                tracing::info!(
                    count = candidates.len(),
                    provider = self.generator.name(),
                    "Candidates generated"
                );
                candidates
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    provider = self.generator.name(),
                    "Candidate generation failed, treating as empty"
                );
                Vec::new()
            }
        }
    }

    async fn merge_candidates(
        &self,
        candidates: Vec<HotelCandidate>,
        reference: Option<Coordinates>,
    ) -> Vec<Hotel> {
        let received = candidates.len();
        let named: Vec<(String, HotelCandidate)> = candidates
            .into_iter()
            .filter_map(|c| Some((c.trimmed_name()?.to_string(), c)))
            .collect();

        if named.len() < received {
            tracing::debug!(dropped = received - named.len(), "Dropped candidates without a name");
        }

        let records = match reference {
            Some(near) => self.enrich_all(&named, near).await,
            None => vec![None; named.len()],
        };

        let hotels: Vec<Hotel> = named
            .into_iter()
            .zip(records)
            .map(|((name, candidate), record)| merge_candidate(name, candidate, record, reference))
            .collect();

        tracing::info!(
            hotels = hotels.len(),
            verified = hotels.iter().filter(|h| h.verified).count(),
            "Candidates merged with places data"
        );

        hotels
    }

    /// Looks up every candidate concurrently, keeping candidate order
    ///
    /// Tasks live in a `JoinSet`, so dropping the request aborts them.
    async fn enrich_all(
        &self,
        named: &[(String, HotelCandidate)],
        near: Coordinates,
    ) -> Vec<Option<EnrichmentRecord>> {
        let mut tasks = JoinSet::new();

        for (idx, (name, candidate)) in named.iter().enumerate() {
            let places = Arc::clone(&self.places);
            let name = name.clone();
            let address = candidate.address.clone();
            tasks.spawn(async move {
                let record = enrichment::enrich(places.as_ref(), &name, address.as_deref(), near).await;
                (idx, record)
            });
        }

        let mut records = vec![None; named.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, record)) => records[idx] = record,
                Err(e) => tracing::error!(error = %e, "Enrichment task join error"),
            }
        }

        records
    }

    async fn search_fallback(&self, near: Coordinates) -> Vec<Hotel> {
        let cap = self.settings.fallback_max_candidates;

        match self.places.search_nearby(near, cap).await {
            Ok(records) => {
                tracing::info!(
                    count = records.len(),
                    provider = self.places.name(),
                    "Fallback places search completed"
                );
                records
                    .into_iter()
                    .filter_map(|record| hotel_from_record(record, near))
                    .collect()
            }
            Err(e) => {
                tracing::warn!(error = %e, provider = self.places.name(), "Fallback places search failed");
                Vec::new()
            }
        }
    }

    fn finish(&self, mut hotels: Vec<Hotel>, source: RecommendationSource) -> RecommendationsResponse {
        let total_candidates = hotels.len();
        hotels.truncate(self.settings.max_results);
        let total_verified = hotels.iter().filter(|h| h.verified).count();

        RecommendationsResponse {
            results: hotels,
            total_candidates,
            total_verified,
            source,
        }
    }
}

/// Combines a named candidate with its places record, if any
///
/// Price, amenities and room features come from the candidate. Everything the
/// places service knows better (address, phone, rating, reviews, location)
/// comes from the record, and only when the record carries coordinates.
fn merge_candidate(
    name: String,
    candidate: HotelCandidate,
    record: Option<EnrichmentRecord>,
    reference: Option<Coordinates>,
) -> Hotel {
    let mut hotel = Hotel::unverified(name);
    hotel.address = candidate.address;
    hotel.amenities = candidate.amenities;
    hotel.room_features = candidate.room_features;
    hotel.price_per_night = candidate.price_per_night.as_ref().map(normalize_price);

    let (Some(record), Some(reference)) = (record, reference) else {
        return hotel;
    };
    let Some(location) = record.coordinates() else {
        return hotel;
    };

    hotel.location = Some(location);
    hotel.distance_km = Some(round2(distance_km(reference, location)));
    hotel.verified = true;
    hotel.address = non_blank(record.address).or(hotel.address);
    hotel.phone = record.phone;
    hotel.rating = record.rating.filter(|r| valid_rating(*r));
    hotel.total_reviews = record.total_reviews;
    hotel.reviews = convert_reviews(record.reviews);
    if hotel.price_per_night.is_none() {
        hotel.price_per_night = format_price_tier(record.price_tier);
    }

    hotel
}

/// Converts a fallback search record; records without a usable name are skipped
fn hotel_from_record(record: EnrichmentRecord, reference: Coordinates) -> Option<Hotel> {
    let name = record
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())?
        .to_string();
    let location = record.coordinates();

    let mut hotel = Hotel::unverified(name);
    hotel.address = non_blank(record.address);
    hotel.phone = record.phone;
    hotel.rating = record.rating.filter(|r| valid_rating(*r));
    hotel.total_reviews = record.total_reviews;
    hotel.price_per_night = format_price_tier(record.price_tier);
    hotel.reviews = convert_reviews(record.reviews);
    hotel.location = location;
    hotel.distance_km = location.map(|loc| round2(distance_km(reference, loc)));
    hotel.verified = location.is_some();

    Some(hotel)
}

fn convert_reviews(reviews: Vec<PlaceReview>) -> Option<Vec<Review>> {
    let reviews: Vec<Review> = reviews
        .into_iter()
        .take(MAX_REVIEWS)
        .map(Review::from)
        .collect();
    (!reviews.is_empty()).then_some(reviews)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::CandidatePrice;
    use crate::services::providers::{MockCandidateGenerator, MockGeocoder, MockPlacesProvider};
    use chrono::NaiveDate;

    const MARKET_ST: Coordinates = Coordinates {
        lat: 37.7936,
        lng: -122.3950,
    };

    fn reservation(address: &str) -> ReservationRequest {
        ReservationRequest {
            address: Some(address.to_string()),
            date: NaiveDate::from_ymd_opt(2025, 8, 20).unwrap(),
            guests: 2,
            room_type: Some("double".to_string()),
            additional_comments: Some("High floor preferred".to_string()),
        }
    }

    fn settings(max_results: usize) -> RecommenderSettings {
        RecommenderSettings {
            max_results,
            fallback_max_candidates: 30,
        }
    }

    fn geocoder_at(coords: Option<Coordinates>) -> MockGeocoder {
        let mut geocoder = MockGeocoder::new();
        geocoder.expect_geocode().returning(move |_| Ok(coords));
        geocoder
    }

    fn generator_with(candidates: Vec<HotelCandidate>) -> MockCandidateGenerator {
        let mut generator = MockCandidateGenerator::new();
        generator.expect_name().return_const("mock-llm");
        generator
            .expect_generate_candidates()
            .times(1)
            .returning(move |_| Ok(candidates.clone()));
        generator
    }

    fn failing_generator() -> MockCandidateGenerator {
        let mut generator = MockCandidateGenerator::new();
        generator.expect_name().return_const("mock-llm");
        generator
            .expect_generate_candidates()
            .returning(|_| Err(AppError::RateLimited("ResourceExhausted".to_string())));
        generator
    }

    fn places() -> MockPlacesProvider {
        let mut places = MockPlacesProvider::new();
        places.expect_name().return_const("mock-places");
        places
    }

    /// A record `north_km` kilometres due north of Market St
    fn record(name: &str, north_km: f64, rating: Option<f64>) -> EnrichmentRecord {
        EnrichmentRecord {
            name: Some(name.to_string()),
            address: Some(format!("{} Main St, San Francisco, CA", name.len())),
            phone: Some("(415) 555-0100".to_string()),
            rating,
            total_reviews: Some(120),
            lat: Some(MARKET_ST.lat + north_km / 111.195),
            lng: Some(MARKET_ST.lng),
            price_tier: Some(2),
            website: None,
            reviews: Vec::new(),
        }
    }

    fn recommender(
        geocoder: MockGeocoder,
        generator: MockCandidateGenerator,
        places: MockPlacesProvider,
        max_results: usize,
    ) -> Recommender {
        Recommender::new(
            Arc::new(geocoder),
            Arc::new(generator),
            Arc::new(places),
            settings(max_results),
        )
    }

    fn assert_invariants(response: &RecommendationsResponse, max_results: usize) {
        assert!(response.results.len() <= max_results);
        for hotel in &response.results {
            assert!(!hotel.name.trim().is_empty());
            assert_eq!(hotel.location.is_some(), hotel.verified);
            if hotel.distance_km.is_some() {
                assert!(hotel.location.is_some());
            }
            assert_eq!(hotel.email, None);
            assert!(hotel.reviews.as_ref().map_or(0, Vec::len) <= MAX_REVIEWS);
        }
    }

    #[tokio::test]
    async fn test_name_only_match_verifies_candidate() {
        let mut places = places();
        places
            .expect_find_by_name_and_address()
            .times(1)
            .returning(|_, _, _| Ok(None));
        places.expect_find_by_name().times(1).returning(|name, near| {
            assert_eq!(near, MARKET_ST);
            let mut found = record(name, 1.2, Some(4.1));
            found.address = Some("250 Beach St, San Francisco, CA 94133, USA".to_string());
            Ok(Some(found))
        });

        let recommender = recommender(
            geocoder_at(Some(MARKET_ST)),
            generator_with(vec![HotelCandidate::named("Hotel Zephyr")]),
            places,
            10,
        );

        let response = recommender
            .recommend(&reservation("1 Market St, San Francisco, CA"))
            .await;

        assert_invariants(&response, 10);
        assert_eq!(response.source, RecommendationSource::CandidatesWithEnrichment);
        let hotel = &response.results[0];
        assert_eq!(hotel.name, "Hotel Zephyr");
        assert!(hotel.verified);
        assert!(hotel.distance_km.unwrap() >= 0.0);
        assert!((hotel.distance_km.unwrap() - 1.2).abs() < 0.05);
        assert_eq!(
            hotel.address.as_deref(),
            Some("250 Beach St, San Francisco, CA 94133, USA")
        );
        assert_eq!(hotel.rating, Some(4.1));
        assert_eq!(hotel.phone.as_deref(), Some("(415) 555-0100"));
        assert_eq!(response.total_verified, 1);
    }

    #[tokio::test]
    async fn test_fallback_when_generator_fails() {
        let mut places = places();
        places.expect_find_by_name_and_address().times(0);
        places.expect_find_by_name().times(0);
        places
            .expect_search_nearby()
            .withf(|near, cap| *near == MARKET_ST && *cap == 30)
            .times(1)
            .returning(|_, _| {
                Ok((0..12)
                    .map(|i| {
                        // Pairs share a distance; the odd one is better rated
                        let km = 0.5 + (i / 2) as f64;
                        record(&format!("Lodge {}", i), km, Some(3.0 + (i % 2) as f64))
                    })
                    .rev()
                    .collect())
            });

        let recommender = recommender(geocoder_at(Some(MARKET_ST)), failing_generator(), places, 10);
        let response = recommender
            .recommend(&reservation("1 Market St, San Francisco, CA"))
            .await;

        assert_invariants(&response, 10);
        assert_eq!(response.source, RecommendationSource::PlacesFallback);
        assert_eq!(response.total_candidates, 12);
        assert_eq!(response.results.len(), 10);
        assert_eq!(response.total_verified, 10);

        let names: Vec<&str> = response.results.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Lodge 1", "Lodge 0", "Lodge 3", "Lodge 2", "Lodge 5", "Lodge 4", "Lodge 7",
                "Lodge 6", "Lodge 9", "Lodge 8"
            ]
        );
        for pair in response.results.windows(2) {
            assert!(pair[0].distance_km <= pair[1].distance_km);
        }
        let first = &response.results[0];
        assert_eq!(first.price_per_night.as_deref(), Some("$$"));
        assert_eq!(first.amenities, None);
        assert_eq!(first.room_features, None);
    }

    #[tokio::test]
    async fn test_fallback_when_generator_returns_nothing() {
        let mut places = places();
        places
            .expect_search_nearby()
            .times(1)
            .returning(|_, _| Ok(vec![record("Only Inn", 2.0, None)]));

        let recommender = recommender(geocoder_at(Some(MARKET_ST)), generator_with(vec![]), places, 10);
        let response = recommender.recommend(&reservation("1 Market St")).await;

        assert_eq!(response.source, RecommendationSource::PlacesFallback);
        assert_eq!(response.results.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_address_skips_geocoding_and_enrichment() {
        let mut geocoder = MockGeocoder::new();
        geocoder.expect_geocode().times(0);

        let mut places = places();
        places.expect_find_by_name_and_address().times(0);
        places.expect_find_by_name().times(0);
        places.expect_search_nearby().times(0);

        let candidates = ["Alpha", "Bravo", "Charlie", "Delta", "Echo"]
            .into_iter()
            .map(HotelCandidate::named)
            .collect();

        let recommender = recommender(geocoder, generator_with(candidates), places, 10);
        let response = recommender.recommend(&reservation("")).await;

        assert_invariants(&response, 10);
        assert_eq!(response.results.len(), 5);
        assert_eq!(response.total_verified, 0);
        for hotel in &response.results {
            assert!(!hotel.verified);
            assert_eq!(hotel.location, None);
            assert_eq!(hotel.distance_km, None);
            assert_eq!(hotel.reviews, None);
            assert_eq!(hotel.total_reviews, None);
        }
        let names: Vec<&str> = response.results.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Bravo", "Charlie", "Delta", "Echo"]);
    }

    #[tokio::test]
    async fn test_no_candidates_and_no_reference_is_empty() {
        let mut places = places();
        places.expect_search_nearby().times(0);

        let recommender = recommender(geocoder_at(None), failing_generator(), places, 10);
        let response = recommender.recommend(&reservation("nowhere in particular")).await;

        assert!(response.results.is_empty());
        assert_eq!(response.source, RecommendationSource::Empty);
    }

    #[tokio::test]
    async fn test_geocoding_failure_leaves_candidates_unverified() {
        let mut geocoder = MockGeocoder::new();
        geocoder
            .expect_geocode()
            .returning(|_| Err(AppError::ExternalApi("REQUEST_DENIED".to_string())));

        let mut places = places();
        places.expect_find_by_name_and_address().times(0);
        places.expect_find_by_name().times(0);

        let recommender = recommender(
            geocoder,
            generator_with(vec![HotelCandidate::named("Hotel Zephyr")]),
            places,
            10,
        );
        let response = recommender.recommend(&reservation("1 Market St")).await;

        assert_eq!(response.results.len(), 1);
        assert!(!response.results[0].verified);
    }

    #[tokio::test]
    async fn test_verified_hotels_rank_first_then_by_distance() {
        let mut places = places();
        places
            .expect_find_by_name_and_address()
            .returning(|name, _, _| match name {
                "Far" => Ok(Some(record(name, 6.0, Some(5.0)))),
                "Near" => Ok(Some(record(name, 0.3, Some(3.2)))),
                "Tie High" => Ok(Some(record(name, 2.0, Some(4.8)))),
                "Tie Low" => Ok(Some(record(name, 2.0, Some(4.0)))),
                _ => Ok(None),
            });
        places
            .expect_find_by_name()
            .returning(|_, _| Err(AppError::ExternalApi("timeout".to_string())));

        let candidates = ["Unknown Inn", "Far", "Tie Low", "Near", "Tie High"]
            .into_iter()
            .map(HotelCandidate::named)
            .collect();

        let recommender = recommender(geocoder_at(Some(MARKET_ST)), generator_with(candidates), places, 10);
        let response = recommender.recommend(&reservation("1 Market St")).await;

        assert_invariants(&response, 10);
        let names: Vec<&str> = response.results.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Near", "Tie High", "Tie Low", "Far", "Unknown Inn"]);
        assert_eq!(response.total_verified, 4);
    }

    #[tokio::test]
    async fn test_blank_names_are_dropped_and_results_truncated() {
        let mut places = places();
        places
            .expect_find_by_name_and_address()
            .returning(|name, _, _| Ok(Some(record(name, name.len() as f64, None))));

        let mut candidates: Vec<HotelCandidate> = ["A", "BB", "CCC", "DDDD"]
            .into_iter()
            .map(HotelCandidate::named)
            .collect();
        candidates.push(HotelCandidate::named("   "));
        candidates.push(HotelCandidate::default());

        let recommender = recommender(geocoder_at(Some(MARKET_ST)), generator_with(candidates), places, 3);
        let response = recommender.recommend(&reservation("1 Market St")).await;

        assert_invariants(&response, 3);
        assert_eq!(response.total_candidates, 4);
        let names: Vec<&str> = response.results.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["A", "BB", "CCC"]);
    }

    #[tokio::test]
    async fn test_all_blank_names_do_not_trigger_fallback() {
        let mut places = places();
        places.expect_find_by_name_and_address().times(0);
        places.expect_find_by_name().times(0);
        places.expect_search_nearby().times(0);

        let recommender = recommender(
            geocoder_at(Some(MARKET_ST)),
            generator_with(vec![HotelCandidate::named("  "), HotelCandidate::default()]),
            places,
            10,
        );
        let response = recommender.recommend(&reservation("1 Market St")).await;

        assert!(response.results.is_empty());
        assert_eq!(response.total_candidates, 0);
        assert_eq!(response.source, RecommendationSource::CandidatesWithEnrichment);
    }

    #[test]
    fn test_merge_keeps_candidate_price_and_lists() {
        let candidate = HotelCandidate {
            name: Some("Hotel Zephyr".to_string()),
            address: Some("250 Beach St".to_string()),
            price_per_night: Some(CandidatePrice::Number(serde_json::Number::from_f64(120.0).unwrap())),
            amenities: Some(vec!["wifi".to_string()]),
            room_features: Some(vec!["bay view".to_string()]),
        };

        let hotel = merge_candidate(
            "Hotel Zephyr".to_string(),
            candidate,
            Some(record("Hotel Zephyr", 1.0, Some(4.0))),
            Some(MARKET_ST),
        );

        assert_eq!(hotel.price_per_night.as_deref(), Some("120"));
        assert_eq!(hotel.amenities, Some(vec!["wifi".to_string()]));
        assert_eq!(hotel.room_features, Some(vec!["bay view".to_string()]));
        assert_eq!(hotel.total_reviews, Some(120));
    }

    #[test]
    fn test_merge_fills_missing_price_from_tier() {
        let mut found = record("Budget Inn", 1.0, None);
        found.price_tier = Some(0);
        let hotel = merge_candidate(
            "Budget Inn".to_string(),
            HotelCandidate::named("Budget Inn"),
            Some(found),
            Some(MARKET_ST),
        );
        assert_eq!(hotel.price_per_night.as_deref(), Some("$"));
    }

    #[test]
    fn test_merge_without_match_keeps_only_candidate_fields() {
        let candidate = HotelCandidate {
            name: Some("Ghost Hotel".to_string()),
            address: Some("1 Nowhere Ln".to_string()),
            price_per_night: Some(CandidatePrice::Text("$$$".to_string())),
            ..HotelCandidate::default()
        };

        let hotel = merge_candidate("Ghost Hotel".to_string(), candidate, None, Some(MARKET_ST));

        assert!(!hotel.verified);
        assert_eq!(hotel.address.as_deref(), Some("1 Nowhere Ln"));
        assert_eq!(hotel.price_per_night.as_deref(), Some("$$$"));
        assert_eq!(hotel.phone, None);
        assert_eq!(hotel.rating, None);
        assert_eq!(hotel.reviews, None);
        assert_eq!(hotel.total_reviews, None);
    }

    #[test]
    fn test_merge_caps_reviews_and_drops_bad_rating() {
        let mut found = record("Busy Hotel", 0.5, Some(9.5));
        found.reviews = (0..7)
            .map(|i| PlaceReview {
                author: Some(format!("guest {}", i)),
                rating: Some(4.0),
                text: Some("fine".to_string()),
                relative_time: Some("a week ago".to_string()),
            })
            .collect();

        let hotel = merge_candidate(
            "Busy Hotel".to_string(),
            HotelCandidate::named("Busy Hotel"),
            Some(found),
            Some(MARKET_ST),
        );

        let reviews = hotel.reviews.unwrap();
        assert_eq!(reviews.len(), MAX_REVIEWS);
        assert_eq!(reviews[0].author.as_deref(), Some("guest 0"));
        assert_eq!(hotel.rating, None);
    }

    #[test]
    fn test_fallback_record_without_coordinates_is_unverified() {
        let mut found = record("Mystery Motel", 1.0, Some(3.0));
        found.lat = None;

        let hotel = hotel_from_record(found, MARKET_ST).unwrap();
        assert!(!hotel.verified);
        assert_eq!(hotel.location, None);
        assert_eq!(hotel.distance_km, None);
    }

    #[test]
    fn test_fallback_record_without_name_is_skipped() {
        let mut found = record("x", 1.0, None);
        found.name = Some("  ".to_string());
        assert!(hotel_from_record(found, MARKET_ST).is_none());
    }
}
