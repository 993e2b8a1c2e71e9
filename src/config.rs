use std::time::Duration;

use serde::Deserialize;

/// Deployment environment
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    #[default]
    Development,
    Production,
    Test,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub app_env: AppEnv,

    /// Gemini API key
    #[serde(default)]
    pub gemini_api_key: String,

    /// Google Maps platform API key (Geocoding + Places)
    #[serde(default)]
    pub google_maps_api_key: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    /// Sampling temperature for candidate generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_maps_api_url")]
    pub maps_api_url: String,

    /// Places search radius around the reference point
    #[serde(default = "default_maps_radius_meters")]
    pub maps_radius_meters: u32,

    /// Upper bound on candidates requested from the language model
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Upper bound on hotels returned to the caller
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Upper bound on places fetched by the fallback search
    #[serde(default = "default_fallback_max_candidates")]
    pub fallback_max_candidates: usize,

    /// Per-request timeout for outbound HTTP calls
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_maps_api_url() -> String {
    "https://maps.googleapis.com".to_string()
}

fn default_maps_radius_meters() -> u32 {
    8000
}

fn default_max_candidates() -> usize {
    25
}

fn default_max_results() -> usize {
    10
}

fn default_fallback_max_candidates() -> usize {
    30
}

fn default_http_timeout_secs() -> u64 {
    20
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Knobs consumed by the recommendation pipeline itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommenderSettings {
    pub max_results: usize,
    pub fallback_max_candidates: usize,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            fallback_max_candidates: default_fallback_max_candidates(),
        }
    }
}

/// Settings for the Google Maps geocoding / places client
#[derive(Debug, Clone)]
pub struct MapsSettings {
    pub api_key: String,
    pub api_url: String,
    pub radius_meters: u32,
    pub timeout: Duration,
}

/// Settings for the Gemini candidate generator
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_candidates: usize,
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn recommender(&self) -> RecommenderSettings {
        RecommenderSettings {
            max_results: self.max_results,
            fallback_max_candidates: self.fallback_max_candidates,
        }
    }

    pub fn maps(&self) -> MapsSettings {
        MapsSettings {
            api_key: self.google_maps_api_key.clone(),
            api_url: self.maps_api_url.clone(),
            radius_meters: self.maps_radius_meters,
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }

    pub fn gemini(&self) -> GeminiSettings {
        GeminiSettings {
            api_key: self.gemini_api_key.clone(),
            api_url: self.gemini_api_url.clone(),
            model: self.gemini_model.clone(),
            temperature: self.temperature,
            max_candidates: self.max_candidates,
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }
}
