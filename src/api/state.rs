use std::sync::Arc;

use crate::{
    config::Config,
    error::AppResult,
    services::{
        providers::{GeminiProvider, GoogleMapsProvider},
        Recommender,
    },
};

/// Shared application state
///
/// Holds no per-request data; every recommendation call builds its own working
/// set and discards it afterwards.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
}

impl AppState {
    pub fn new(recommender: Recommender) -> Self {
        Self {
            recommender: Arc::new(recommender),
        }
    }

    /// Wires the Google Maps and Gemini providers from configuration
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let maps = Arc::new(GoogleMapsProvider::new(config.maps())?);
        let gemini = Arc::new(GeminiProvider::new(config.gemini())?);

        let recommender = Recommender::new(maps.clone(), gemini, maps, config.recommender());

        Ok(Self::new(recommender))
    }
}
