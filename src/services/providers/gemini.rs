/// Gemini candidate generator
///
/// Asks the model for a JSON object `{"hotels": [...]}` describing hotels near
/// the reservation address. The reply is treated as untrusted text: code fences
/// are stripped, the outermost JSON object is salvaged when the model adds
/// prose around it, and each hotel record is parsed on its own so one bad
/// entry does not sink the batch.
///
/// A 429 / `RESOURCE_EXHAUSTED` reply yields an empty list right away so the
/// caller can switch to its places-only fallback instead of waiting on retries.
use crate::{
    config::GeminiSettings,
    error::{AppError, AppResult},
    models::{HotelCandidate, ReservationRequest},
    services::{providers::CandidateGenerator, retry::RetryPolicy},
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

const SYSTEM_PROMPT: &str = "You are a helpful travel assistant. Given reservation details, generate a list of 20-25 hotel candidates near the user's provided location.\n\
Return ONLY valid JSON. The top-level object MUST have key 'hotels' which maps to a list of hotel objects.\n\
Each hotel object MUST include keys: 'name', 'address', 'phone', 'email', 'rating', 'price_per_night', 'amenities', 'room_features'.\n\
If unsure for a field, use null (or an empty list for list fields). Output nothing else besides the JSON.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Clone)]
pub struct GeminiProvider {
    http_client: HttpClient,
    settings: GeminiSettings,
    retry: RetryPolicy,
}

impl GeminiProvider {
    pub fn new(settings: GeminiSettings) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            http_client,
            settings,
            retry: RetryPolicy::LLM,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_request(&self, reservation: &ReservationRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(SYSTEM_PROMPT.to_string()),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(user_prompt(reservation, self.settings.max_candidates)),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                response_mime_type: "application/json",
            },
        }
    }

    /// Calls generateContent; `Ok(None)` means the quota is exhausted
    #[instrument(skip(self, reservation), fields(provider = "gemini", model = %self.settings.model))]
    async fn generate_text(&self, reservation: &ReservationRequest) -> AppResult<Option<String>> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.api_url, self.settings.model
        );
        let url = url.as_str();
        let body = self.build_request(reservation);
        let body = &body;
        let client = &self.http_client;
        let api_key = self.settings.api_key.as_str();

        self.retry
            .run("generate_content", move || async move {
                let response = client
                    .post(url)
                    .header("x-goog-api-key", api_key)
                    .json(body)
                    .send()
                    .await?;

                let status = response.status();
                if status == StatusCode::TOO_MANY_REQUESTS {
                    tracing::warn!(provider = "gemini", "Gemini quota exhausted");
                    return Ok(None);
                }
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    if text.contains("RESOURCE_EXHAUSTED") {
                        tracing::warn!(provider = "gemini", "Gemini quota exhausted");
                        return Ok(None);
                    }
                    let message = format!("Gemini API returned status {}: {}", status, text);
                    return Err(if status.is_server_error() {
                        AppError::RateLimited(message)
                    } else {
                        AppError::ExternalApi(message)
                    });
                }

                let parsed: GenerateContentResponse = response.json().await?;
                Ok(Some(parsed.text().unwrap_or_default()))
            })
            .await
    }
}

#[async_trait::async_trait]
impl CandidateGenerator for GeminiProvider {
    async fn generate_candidates(
        &self,
        reservation: &ReservationRequest,
    ) -> AppResult<Vec<HotelCandidate>> {
        let Some(raw) = self.generate_text(reservation).await? else {
            return Ok(Vec::new());
        };

        tracing::debug!(response = %raw, "Raw Gemini response");
        let candidates = parse_candidates(&raw, self.settings.max_candidates)?;

        tracing::info!(
            candidates = candidates.len(),
            model = %self.settings.model,
            provider = "gemini",
            "Hotel candidates generated"
        );

        Ok(candidates)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

fn user_prompt(reservation: &ReservationRequest, max_candidates: usize) -> String {
    fn or_unspecified(value: Option<&str>) -> &str {
        value.filter(|v| !v.trim().is_empty()).unwrap_or("not specified")
    }

    format!(
        "Reservation Inputs:\n\
         - Address: {}\n\
         - Date: {}\n\
         - Guests: {}\n\
         - Room type: {}\n\
         - Additional comments: {}\n\n\
         Constraints:\n\
         - Provide between 20 and {} hotels.\n\
         - Prefer hotels matching star rating, price range, and location preferences when possible.\n",
        or_unspecified(reservation.address.as_deref()),
        reservation.date.format("%Y-%m-%d"),
        reservation.guests,
        or_unspecified(reservation.room_type.as_deref()),
        or_unspecified(reservation.additional_comments.as_deref()),
        max_candidates,
    )
}

/// Removes a surrounding Markdown code fence, if any
fn strip_markdown_fence(text: &str) -> &str {
    let mut t = text.trim();
    if t.starts_with("```") {
        let unfenced = t.trim_start_matches('`');
        t = match unfenced.find('{') {
            Some(start) => &unfenced[start..],
            None => unfenced,
        };
    }
    if t.ends_with("```") {
        if let Some(end) = t.rfind('}') {
            t = &t[..=end];
        }
    }
    t.trim()
}

/// Extracts hotel candidates from the model's reply
///
/// Returns an empty list when the reply holds no JSON object or the object has
/// no `hotels` list; returns `MalformedResponse` when a JSON-looking span fails
/// to parse.
fn parse_candidates(raw: &str, max_candidates: usize) -> AppResult<Vec<HotelCandidate>> {
    let text = strip_markdown_fence(raw);

    let data: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if end > start => serde_json::from_str(&text[start..=end])
                .map_err(|e| {
                    AppError::MalformedResponse(format!("Gemini reply is not valid JSON: {}", e))
                })?,
            _ => {
                tracing::warn!(provider = "gemini", "Gemini reply contained no JSON object");
                return Ok(Vec::new());
            }
        },
    };

    let Some(hotels) = data.get("hotels").and_then(Value::as_array) else {
        tracing::warn!(provider = "gemini", "Gemini reply has no 'hotels' list");
        return Ok(Vec::new());
    };

    let limit = hotels.len().min(max_candidates);
    Ok(HotelCandidate::parse_list(&hotels[..limit]))
}
