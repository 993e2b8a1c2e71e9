use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A hotel suggestion from the language model, not yet verified
///
/// Only the fields the pipeline trusts from the model are kept. Phone, email
/// and rating are dropped here because the places service is authoritative
/// for them.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct HotelCandidate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price_per_night: Option<CandidatePrice>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub amenities: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub room_features: Option<Vec<String>>,
}

impl HotelCandidate {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Trimmed name, or `None` when it is missing or blank
    pub fn trimmed_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// Parses the `hotels` array of a model response, dropping records that
    /// are not JSON objects
    pub fn parse_list(values: &[Value]) -> Vec<Self> {
        values
            .iter()
            .filter(|v| v.is_object())
            .filter_map(|v| serde_json::from_value::<HotelCandidate>(v.clone()).ok())
            .collect()
    }
}

/// Price as the model supplied it: either free text or a bare number
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CandidatePrice {
    Text(String),
    Number(serde_json::Number),
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_price<'de, D>(deserializer: D) -> Result<Option<CandidatePrice>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(CandidatePrice::Text(s)),
        Value::Number(n) => Some(CandidatePrice::Number(n)),
        _ => None,
    })
}

fn lenient_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}
