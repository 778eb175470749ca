//! Open-Meteo weather provider.
//!
//! Two calls per location: the geocoding API resolves the name to
//! coordinates (first match wins), then the forecast API returns daily
//! weather codes, temperature extremes and precipitation probability.
//! Results are cached per location for [`CACHE_TTL_MINUTES`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use moka::future::Cache;
use serde_json::Value;
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::retry::with_retries;
use crate::traits::{DailyForecast, WeatherProvider, WeatherRecord};

// ═══════════════════════════════════════════════════════════════════════
//  Constants
// ═══════════════════════════════════════════════════════════════════════

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DAILY_FIELDS: &str =
    "weathercode,temperature_2m_max,temperature_2m_min,precipitation_probability_max";

const PROVIDER_ID: &str = "open-meteo";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_RETRIES: u32 = 2;
const RETRY_BACKOFF_MS: u64 = 500;
const CACHE_TTL_MINUTES: u64 = 15;
const CACHE_MAX_ENTRIES: u64 = 256;

// ═══════════════════════════════════════════════════════════════════════
//  Provider
// ═══════════════════════════════════════════════════════════════════════

/// Weather provider backed by the free Open-Meteo APIs.
pub struct OpenMeteoWeather {
    client: reqwest::Client,
    geocoding_url: String,
    forecast_url: String,
    max_retries: u32,
    cache: Cache<String, WeatherRecord>,
}

impl OpenMeteoWeather {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        let cache = Cache::builder()
            .max_capacity(CACHE_MAX_ENTRIES)
            .time_to_live(Duration::from_secs(CACHE_TTL_MINUTES * 60))
            .build();

        Self {
            client,
            geocoding_url: GEOCODING_URL.to_owned(),
            forecast_url: FORECAST_URL.to_owned(),
            max_retries: DEFAULT_MAX_RETRIES,
            cache,
        }
    }

    /// Point the provider at different API endpoints (self-hosted Open-Meteo).
    pub fn with_endpoints(
        mut self,
        geocoding_url: impl Into<String>,
        forecast_url: impl Into<String>,
    ) -> Self {
        self.geocoding_url = geocoding_url.into();
        self.forecast_url = forecast_url.into();
        self
    }

    pub fn with_geocoding_url(mut self, url: impl Into<String>) -> Self {
        self.geocoding_url = url.into();
        self
    }

    pub fn with_forecast_url(mut self, url: impl Into<String>) -> Self {
        self.forecast_url = url.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::BadStatus {
                provider: PROVIDER_ID.into(),
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::ParseFailed {
                provider: PROVIDER_ID.into(),
                reason: e.to_string(),
            })
    }

    async fn fetch_uncached(&self, location: &str) -> Result<WeatherRecord> {
        let geo_query = [("name", location.to_owned()), ("count", "1".to_owned())];
        let geo = with_retries(PROVIDER_ID, self.max_retries, backoff(), || {
            self.get_json(&self.geocoding_url, &geo_query)
        })
        .await?;
        let (name, latitude, longitude) = parse_geocoding(&geo, location)?;

        let forecast_query = [
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("daily", DAILY_FIELDS.to_owned()),
            ("timezone", "auto".to_owned()),
        ];
        let forecast = with_retries(PROVIDER_ID, self.max_retries, backoff(), || {
            self.get_json(&self.forecast_url, &forecast_query)
        })
        .await?;

        Ok(WeatherRecord {
            location: name,
            latitude,
            longitude,
            days: parse_daily_forecast(&forecast)?,
        })
    }
}

impl Default for OpenMeteoWeather {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoWeather {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    async fn fetch(&self, location: &str) -> Result<WeatherRecord> {
        let key = location.trim().to_lowercase();
        if let Some(cached) = self.cache.get(&key).await {
            debug!(location, "returning cached forecast");
            return Ok(cached);
        }

        let record = self.fetch_uncached(location.trim()).await?;
        debug!(location, days = record.days.len(), "forecast fetched");
        self.cache.insert(key, record.clone()).await;
        Ok(record)
    }
}

fn backoff() -> Duration {
    Duration::from_millis(RETRY_BACKOFF_MS)
}

fn request_failed(reason: String) -> ProviderError {
    ProviderError::RequestFailed {
        provider: PROVIDER_ID.into(),
        reason,
    }
}

fn parse_failed(reason: impl Into<String>) -> ProviderError {
    ProviderError::ParseFailed {
        provider: PROVIDER_ID.into(),
        reason: reason.into(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Response parsing
// ═══════════════════════════════════════════════════════════════════════

/// Extract `(name, latitude, longitude)` from the first geocoding result.
fn parse_geocoding(v: &Value, location: &str) -> Result<(String, f64, f64)> {
    let first = v
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .ok_or_else(|| ProviderError::LocationNotFound {
            location: location.to_owned(),
        })?;

    let latitude = first["latitude"]
        .as_f64()
        .ok_or_else(|| parse_failed("geocoding result has no latitude"))?;
    let longitude = first["longitude"]
        .as_f64()
        .ok_or_else(|| parse_failed("geocoding result has no longitude"))?;
    let name = first["name"].as_str().unwrap_or(location).to_owned();

    Ok((name, latitude, longitude))
}

/// Zip the parallel `daily.*` arrays into forecast days.
fn parse_daily_forecast(v: &Value) -> Result<Vec<DailyForecast>> {
    let daily = &v["daily"];
    let dates = daily["time"]
        .as_array()
        .ok_or_else(|| parse_failed("missing daily.time"))?;
    let maxes = daily["temperature_2m_max"].as_array();
    let mins = daily["temperature_2m_min"].as_array();

    let (Some(maxes), Some(mins)) = (maxes, mins) else {
        return Err(parse_failed("missing daily temperatures"));
    };

    let mut days = Vec::with_capacity(dates.len());
    for (i, date) in dates.iter().enumerate() {
        let (Some(date), Some(max), Some(min)) = (
            date.as_str().and_then(|d| d.parse::<NaiveDate>().ok()),
            maxes.get(i).and_then(Value::as_f64),
            mins.get(i).and_then(Value::as_f64),
        ) else {
            continue;
        };

        days.push(DailyForecast {
            date,
            temp_min_c: min,
            temp_max_c: max,
            precipitation_probability: daily["precipitation_probability_max"]
                .get(i)
                .and_then(Value::as_f64)
                .map(|p| p.clamp(0.0, 100.0).round() as u8),
            weather_code: daily["weathercode"]
                .get(i)
                .and_then(Value::as_u64)
                .map(|c| c as u16),
        });
    }

    if days.is_empty() {
        return Err(parse_failed("forecast contained no usable days"));
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn geocoding_takes_first_result() {
        let v = json!({
            "results": [
                {"name": "Barcelona", "latitude": 41.38879, "longitude": 2.15899},
                {"name": "Barcelona", "latitude": 10.13, "longitude": -64.69}
            ]
        });
        let (name, lat, lon) = parse_geocoding(&v, "barcelona").unwrap();
        assert_eq!(name, "Barcelona");
        assert!((lat - 41.38879).abs() < 1e-9);
        assert!((lon - 2.15899).abs() < 1e-9);
    }

    #[test]
    fn geocoding_without_results_is_location_not_found() {
        let err = parse_geocoding(&json!({"generationtime_ms": 0.5}), "Atlantis").unwrap_err();
        assert!(matches!(err, ProviderError::LocationNotFound { location } if location == "Atlantis"));
    }

    #[test]
    fn daily_forecast_zips_arrays() {
        let v = json!({
            "daily": {
                "time": ["2026-05-01", "2026-05-02", "2026-05-03"],
                "weathercode": [1, 63, 3],
                "temperature_2m_max": [21.5, 18.0, 22.1],
                "temperature_2m_min": [14.0, 12.5, 15.2],
                "precipitation_probability_max": [5, 85, null]
            }
        });
        let days = parse_daily_forecast(&v).unwrap();
        assert_eq!(days.len(), 3);
        assert_eq!(days[1].precipitation_probability, Some(85));
        assert_eq!(days[1].weather_code, Some(63));
        assert!(days[1].is_wet());
        assert_eq!(days[2].precipitation_probability, None);
        assert!(!days[0].is_wet());
    }

    #[test]
    fn daily_forecast_without_temperatures_fails() {
        let v = json!({"daily": {"time": ["2026-05-01"]}});
        assert!(matches!(
            parse_daily_forecast(&v),
            Err(ProviderError::ParseFailed { .. })
        ));
    }

    #[test]
    fn daily_forecast_skips_incomplete_days() {
        let v = json!({
            "daily": {
                "time": ["2026-05-01", "not-a-date"],
                "temperature_2m_max": [21.5, 18.0],
                "temperature_2m_min": [14.0, null]
            }
        });
        let days = parse_daily_forecast(&v).unwrap();
        assert_eq!(days.len(), 1);
    }
}
