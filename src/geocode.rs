// src/geocode.rs
//! Free-text city → structured location.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Coordinates, Location};

const OPENCAGE_ENDPOINT: &str = "https://api.opencagedata.com/geocode/v1/json";
const CITY_PREFIX: &str = "city of";

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the service has no city-level match for `query`.
    async fn lookup(&self, query: &str) -> Result<Option<Location>>;
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("city not found: {0}")]
    NotFound(String),
    #[error("geocoding service error: {0}")]
    Service(String),
}

/// Look up `city`, retrying once as "city of {city}" before giving up.
pub async fn resolve_city(geocoder: &dyn Geocoder, city: &str) -> Result<Location, GeocodeError> {
    let city = city.trim();
    let service = |e: anyhow::Error| GeocodeError::Service(format!("{e:#}"));

    if let Some(loc) = geocoder.lookup(city).await.map_err(service)? {
        return Ok(loc);
    }
    warn!(target: "geocode", %city, "city not found, retrying with prefix");
    let prefixed = format!("{CITY_PREFIX} {city}");
    match geocoder.lookup(&prefixed).await.map_err(service)? {
        Some(loc) => Ok(loc),
        None => Err(GeocodeError::NotFound(city.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct OpenCageResponse {
    #[serde(default)]
    results: Vec<OpenCageResult>,
}

#[derive(Debug, Deserialize)]
struct OpenCageResult {
    components: Components,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Components {
    #[serde(rename = "_type")]
    kind: Option<String>,
    #[serde(rename = "_normalized_city")]
    normalized_city: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    lat: f64,
    lng: f64,
}

#[derive(Clone)]
pub struct OpenCageGeocoder {
    api_key: String,
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl OpenCageGeocoder {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: OPENCAGE_ENDPOINT.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

#[async_trait]
impl Geocoder for OpenCageGeocoder {
    async fn lookup(&self, query: &str) -> Result<Option<Location>> {
        let resp: OpenCageResponse = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("key", self.api_key.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .context("opencage http get()")?
            .error_for_status()
            .context("opencage http status")?
            .json()
            .await
            .context("opencage json body")?;

        let loc = pick_city(resp)?;
        info!(target: "geocode", %query, found = loc.is_some(), "opencage lookup");
        Ok(loc)
    }
}

/// First result typed as a city wins; it must carry coordinates, a
/// normalized city name and a country.
fn pick_city(resp: OpenCageResponse) -> Result<Option<Location>> {
    let Some(hit) = resp
        .results
        .into_iter()
        .find(|r| r.components.kind.as_deref() == Some("city"))
    else {
        return Ok(None);
    };

    let geometry = hit
        .geometry
        .ok_or_else(|| anyhow!("city result has no coordinates"))?;
    let city = hit
        .components
        .normalized_city
        .ok_or_else(|| anyhow!("city result has no normalized city name"))?;
    let country = hit
        .components
        .country
        .ok_or_else(|| anyhow!("city result has no country"))?;

    Ok(Some(Location {
        city,
        state: hit.components.state,
        country,
        coordinates: Coordinates {
            lat: geometry.lat,
            long: geometry.lng,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct PrefixOnly {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Geocoder for PrefixOnly {
        async fn lookup(&self, query: &str) -> Result<Option<Location>> {
            self.seen.lock().unwrap().push(query.to_string());
            if query.starts_with("city of ") {
                Ok(Some(Location {
                    city: "Waterloo".into(),
                    state: Some("Ontario".into()),
                    country: "Canada".into(),
                    coordinates: Coordinates {
                        lat: 43.46,
                        long: -80.52,
                    },
                }))
            } else {
                Ok(None)
            }
        }
    }

    #[tokio::test]
    async fn retries_once_with_city_prefix() {
        let g = PrefixOnly {
            seen: Mutex::new(vec![]),
        };
        let loc = resolve_city(&g, " Waterloo ").await.unwrap();
        assert_eq!(loc.city, "Waterloo");
        assert_eq!(
            *g.seen.lock().unwrap(),
            vec!["Waterloo".to_string(), "city of Waterloo".to_string()]
        );
    }

    #[test]
    fn picks_first_city_typed_result() {
        let raw = r#"{"results": [
            {"components": {"_type": "county", "country": "Canada"}, "geometry": {"lat": 1.0, "lng": 2.0}},
            {"components": {"_type": "city", "_normalized_city": "Toronto", "state": "Ontario", "country": "Canada"},
             "geometry": {"lat": 43.65, "lng": -79.38}}
        ]}"#;
        let resp: OpenCageResponse = serde_json::from_str(raw).unwrap();
        let loc = pick_city(resp).unwrap().unwrap();
        assert_eq!(loc.city, "Toronto");
        assert_eq!(loc.state.as_deref(), Some("Ontario"));
        assert_eq!(loc.coordinates.long, -79.38);
    }

    #[test]
    fn no_city_result_is_not_found() {
        let resp: OpenCageResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(pick_city(resp).unwrap().is_none());
    }
}
