use std::fmt::Display;

use crate::{
    error::AppResult,
    models::{Coordinates, EnrichmentRecord},
    services::providers::PlacesProvider,
};

/// One way of matching a candidate name against the places service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Name narrowed by the candidate's address
    NameAndAddress,
    /// Name alone, best-rated hit
    NameOnly,
}

impl LookupStrategy {
    /// Strategies in the order they are tried
    pub const CHAIN: [LookupStrategy; 2] = [LookupStrategy::NameAndAddress, LookupStrategy::NameOnly];

    async fn run(
        self,
        places: &dyn PlacesProvider,
        name: &str,
        address: Option<&str>,
        near: Coordinates,
    ) -> AppResult<Option<EnrichmentRecord>> {
        match self {
            LookupStrategy::NameAndAddress => {
                places
                    .find_by_name_and_address(name, address.map(str::to_string), near)
                    .await
            }
            LookupStrategy::NameOnly => places.find_by_name(name, near).await,
        }
    }
}

impl Display for LookupStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupStrategy::NameAndAddress => write!(f, "name_and_address"),
            LookupStrategy::NameOnly => write!(f, "name_only"),
        }
    }
}

/// Finds the authoritative record for a candidate hotel
///
/// Walks [`LookupStrategy::CHAIN`] and returns the first record that carries
/// coordinates. Lookup failures are logged and treated as "no match" so one
/// bad candidate never aborts the request.
pub async fn enrich(
    places: &dyn PlacesProvider,
    name: &str,
    address: Option<&str>,
    near: Coordinates,
) -> Option<EnrichmentRecord> {
    let address = address.map(str::trim).filter(|a| !a.is_empty());

    for strategy in LookupStrategy::CHAIN {
        match strategy.run(places, name, address, near).await {
            Ok(Some(record)) if record.coordinates().is_some() => {
                tracing::debug!(hotel = %name, strategy = %strategy, "Enrichment match");
                return Some(record);
            }
            Ok(Some(_)) => {
                tracing::debug!(hotel = %name, strategy = %strategy, "Match without coordinates");
            }
            Ok(None) => {
                tracing::debug!(hotel = %name, strategy = %strategy, "No enrichment match");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    hotel = %name,
                    strategy = %strategy,
                    provider = places.name(),
                    "Enrichment lookup failed"
                );
            }
        }
    }

    None
}
