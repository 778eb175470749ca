//! OpenStreetMap points of interest via the Overpass API.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::retry::with_retries;
use crate::traits::{PlaceRecord, PoiProvider};

const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
const PROVIDER_ID: &str = "openstreetmap";

/// Upper bound on places returned per location.
pub const MAX_PLACES: usize = 10;

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_RETRIES: u32 = 1;
const RETRY_BACKOFF_MS: u64 = 750;
const CACHE_TTL_MINUTES: u64 = 60;
const CACHE_MAX_ENTRIES: u64 = 256;

/// Tourist attractions and museums inside the named area.
pub struct OverpassPoi {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    cache: Cache<String, Vec<PlaceRecord>>,
}

impl OverpassPoi {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: OVERPASS_URL.to_owned(),
            max_retries: DEFAULT_MAX_RETRIES,
            cache: Cache::builder()
                .max_capacity(CACHE_MAX_ENTRIES)
                .time_to_live(Duration::from_secs(CACHE_TTL_MINUTES * 60))
                .build(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn post_query(&self, query: &str) -> Result<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed {
                provider: PROVIDER_ID.into(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::BadStatus {
                provider: PROVIDER_ID.into(),
                status: response.status().as_u16(),
            });
        }

        response.json().await.map_err(|e| ProviderError::ParseFailed {
            provider: PROVIDER_ID.into(),
            reason: e.to_string(),
        })
    }
}

impl Default for OverpassPoi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PoiProvider for OverpassPoi {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    async fn fetch(&self, location: &str) -> Result<Vec<PlaceRecord>> {
        let key = location.trim().to_lowercase();
        if let Some(cached) = self.cache.get(&key).await {
            debug!(location, "returning cached places");
            return Ok(cached);
        }

        let query = build_query(location);
        let body = with_retries(
            PROVIDER_ID,
            self.max_retries,
            Duration::from_millis(RETRY_BACKOFF_MS),
            || self.post_query(&query),
        )
        .await?;

        let places = parse_elements(&body)?;
        debug!(location, count = places.len(), "places fetched");
        self.cache.insert(key, places.clone()).await;
        Ok(places)
    }
}

/// Overpass QL selecting attraction and museum nodes in the named area.
///
/// Quotes are stripped from the location so it cannot terminate the
/// string literal.
pub fn build_query(location: &str) -> String {
    let name: String = location
        .trim()
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | '\\'))
        .collect();
    format!(
        "[out:json][timeout:10];area['name'='{name}']->.a;\
         (node(area.a)[tourism~'attraction|museum'];);out center {MAX_PLACES};"
    )
}

/// Named elements in response order, at most [`MAX_PLACES`].
fn parse_elements(v: &Value) -> Result<Vec<PlaceRecord>> {
    let elements = v
        .get("elements")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::ParseFailed {
            provider: PROVIDER_ID.into(),
            reason: "missing elements array".into(),
        })?;

    let places = elements
        .iter()
        .filter_map(|el| {
            let tags = el.get("tags")?;
            let name = tags.get("name")?.as_str()?.trim();
            if name.is_empty() {
                return None;
            }
            Some(PlaceRecord {
                name: name.to_owned(),
                category: tags.get("tourism").and_then(Value::as_str).map(str::to_owned),
                latitude: el
                    .get("lat")
                    .or_else(|| el.pointer("/center/lat"))
                    .and_then(Value::as_f64),
                longitude: el
                    .get("lon")
                    .or_else(|| el.pointer("/center/lon"))
                    .and_then(Value::as_f64),
            })
        })
        .take(MAX_PLACES)
        .collect();

    Ok(places)
}
