use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Local;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{RecommendationsResponse, ReservationRequest},
};

use super::AppState;

const INSTRUCTIONS: &str = "\
You are a helpful assistant that can help with hotel recommendations.
You can use the following endpoints to get hotel recommendations:
- POST /api/v1/recommendations
- GET /api/v1/date

The recommendations endpoint takes a JSON body with the following fields:
- address: string (Required)
- date: string, YYYY-MM-DD (Required)
- guests: integer > 0 (Required)
- room_type: string (Optional)
- additional_comments: string (Optional)

IMPORTANT: REQUIRED FIELDS MUST BE PROVIDED BY THE USER. DO NOT MAKE UP ANYTHING.

The date endpoint returns the current date in the format YYYY-MM-DD.

Example:
- address: \"1 Market St, San Francisco, CA\"
- date: \"2025-08-20\"
- guests: 2

Output Format: You will be given the top N hotels as a list. Return them to the user in a
readable format, and summarize the reviews of a hotel instead of showing all reviews.
";

#[derive(Debug, Serialize)]
pub struct CurrentDateResponse {
    pub date: String,
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Generates hotel recommendations near the requested address
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(reservation): Json<ReservationRequest>,
) -> AppResult<Json<RecommendationsResponse>> {
    reservation.validate()?;

    tracing::info!(
        request_id = %request_id,
        date = %reservation.date,
        guests = reservation.guests,
        has_address = reservation.anchor_address().is_some(),
        "Processing recommendation request"
    );

    let response = state.recommender.recommend(&reservation).await;

    tracing::info!(
        request_id = %request_id,
        results = response.results.len(),
        total_candidates = response.total_candidates,
        total_verified = response.total_verified,
        source = ?response.source,
        "Recommendations completed"
    );

    Ok(Json(response))
}

/// Today's date in server local time
pub async fn current_date() -> Json<CurrentDateResponse> {
    Json(CurrentDateResponse {
        date: Local::now().format("%Y-%m-%d").to_string(),
    })
}

/// Usage instructions for agents calling this service
pub async fn instructions() -> &'static str {
    INSTRUCTIONS
}
