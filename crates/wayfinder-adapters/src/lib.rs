//! Data providers and the retrieval service for Wayfinder.
//!
//! The workflow core depends only on the traits in [`traits`].  This crate
//! also ships the production implementations: Open-Meteo weather,
//! OpenStreetMap points of interest via Overpass, and a local markdown
//! knowledge base.

pub mod error;
pub mod knowledge;
pub mod poi;
mod retry;
pub mod traits;
pub mod weather;

pub use error::{ProviderError, Result};
pub use knowledge::KnowledgeBase;
pub use poi::OverpassPoi;
pub use traits::{
    DailyForecast, PlaceRecord, PoiProvider, RetrievalService, Snippet, WeatherProvider,
    WeatherRecord,
};
pub use weather::OpenMeteoWeather;
