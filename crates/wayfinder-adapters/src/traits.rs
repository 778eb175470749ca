//! Collaborator contracts and the records they exchange.
//!
//! The travel workflow depends only on these traits.  Production
//! implementations live in [`crate::weather`], [`crate::poi`] and
//! [`crate::knowledge`]; tests inject their own.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A retrieved unit of reference text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    /// The chunk text.
    pub text: String,
    /// Where the text came from (file name, document id).
    pub source_id: String,
    /// Similarity to the query, in `[0, 1]`.
    pub score: f32,
}

impl Snippet {
    pub fn new(text: impl Into<String>, source_id: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            source_id: source_id.into(),
            score,
        }
    }
}

/// One day of forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    /// Maximum precipitation probability for the day, in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation_probability: Option<u8>,
    /// WMO weather interpretation code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_code: Option<u16>,
}

impl DailyForecast {
    /// Rain, snow, showers or storms are expected.
    ///
    /// WMO codes 51 and above are drizzle, rain, snow, showers and
    /// thunderstorms; below that is clear sky, cloud and fog.
    pub fn is_wet(&self) -> bool {
        self.precipitation_probability.is_some_and(|p| p >= 50)
            || self.weather_code.is_some_and(|c| c >= 51)
    }
}

/// A short-range forecast for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// Resolved location name.
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Forecast days in chronological order; never empty.
    pub days: Vec<DailyForecast>,
}

impl WeatherRecord {
    /// One-line temperature summary across the forecast horizon.
    pub fn summary(&self) -> String {
        let min = self
            .days
            .iter()
            .map(|d| d.temp_min_c)
            .fold(f64::INFINITY, f64::min);
        let max = self
            .days
            .iter()
            .map(|d| d.temp_max_c)
            .fold(f64::NEG_INFINITY, f64::max);
        if self.days.is_empty() {
            return format!("No forecast for {}", self.location);
        }
        let wet = self.days.iter().filter(|d| d.is_wet()).count();
        format!(
            "Temp range next days: {min:.0}-{max:.0}°C, {wet} of {} days wet",
            self.days.len()
        )
    }
}

/// A point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub name: String,
    /// OSM tourism tag (e.g. `museum`, `attraction`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl PlaceRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            latitude: None,
            longitude: None,
        }
    }

    /// Museums, galleries and similar places that work in bad weather.
    pub fn is_indoor(&self) -> bool {
        matches!(
            self.category.as_deref(),
            Some("museum" | "gallery" | "aquarium" | "theatre")
        )
    }
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Similarity search over reference knowledge.
///
/// "No matches" is an empty result, never an error; errors mean the backend
/// itself is unavailable.
#[async_trait]
pub trait RetrievalService: Send + Sync {
    /// Return at most `top_k` snippets in descending score order.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Snippet>>;
}

/// Weather-by-location lookup.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Stable identifier used when citing this provider.
    fn id(&self) -> &str;

    async fn fetch(&self, location: &str) -> Result<WeatherRecord>;
}

/// Points-of-interest-by-location lookup.
#[async_trait]
pub trait PoiProvider: Send + Sync {
    /// Stable identifier used when citing this provider.
    fn id(&self) -> &str;

    async fn fetch(&self, location: &str) -> Result<Vec<PlaceRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(date: &str, min: f64, max: f64, precip: Option<u8>, code: Option<u16>) -> DailyForecast {
        DailyForecast {
            date: date.parse().unwrap(),
            temp_min_c: min,
            temp_max_c: max,
            precipitation_probability: precip,
            weather_code: code,
        }
    }

    #[test]
    fn wet_day_detection() {
        assert!(day("2026-05-01", 10.0, 20.0, Some(80), Some(3)).is_wet());
        assert!(day("2026-05-01", 10.0, 20.0, None, Some(61)).is_wet());
        assert!(!day("2026-05-01", 10.0, 20.0, Some(10), Some(2)).is_wet());
        assert!(!day("2026-05-01", 10.0, 20.0, None, None).is_wet());
    }

    #[test]
    fn summary_reports_range_and_wet_days() {
        let record = WeatherRecord {
            location: "Barcelona".into(),
            latitude: 41.39,
            longitude: 2.17,
            days: vec![
                day("2026-05-01", 14.2, 21.6, Some(5), Some(1)),
                day("2026-05-02", 12.4, 19.0, Some(70), Some(63)),
            ],
        };
        assert_eq!(
            record.summary(),
            "Temp range next days: 12-22°C, 1 of 2 days wet"
        );
    }

    #[test]
    fn indoor_categories() {
        let mut museum = PlaceRecord::named("MNAC");
        museum.category = Some("museum".into());
        assert!(museum.is_indoor());
        assert!(!PlaceRecord::named("Park Güell").is_indoor());
    }
}
