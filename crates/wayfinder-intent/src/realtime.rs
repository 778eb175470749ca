//! Real-time data fetch stage.
//!
//! Weather and points of interest are fetched by two independently spawned
//! tasks.  Each task is supervised with its own timeout (the provider limit,
//! clipped to the stage's cut-off) and joined at a single barrier.  Errors,
//! timeouts and panics are captured per task and turned into the absent
//! value for that source, so one provider can never short-circuit the other.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};
use wayfinder_adapters::{PlaceRecord, PoiProvider, WeatherProvider, WeatherRecord};

/// How one provider call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    Ok,
    Failed,
    TimedOut,
    Panicked,
}

/// Joint output of the fetch stage.  Always well-defined.
#[derive(Debug, Clone)]
pub struct RealtimeData {
    /// `None` when the weather provider failed or timed out.
    pub weather: Option<WeatherRecord>,
    /// Empty when the POI provider failed or timed out.
    pub pois: Vec<PlaceRecord>,
    pub weather_outcome: FetchOutcome,
    pub poi_outcome: FetchOutcome,
}

/// Aborts the task when dropped, so a cancelled request does not leave
/// provider calls running.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Fetch weather and POIs for `city` concurrently.
///
/// Neither call runs past `deadline`, which the engine sets short of the
/// request deadline so synthesis still has time left.
pub async fn fetch_realtime(
    weather: Arc<dyn WeatherProvider>,
    poi: Arc<dyn PoiProvider>,
    city: &str,
    provider_timeout: Duration,
    deadline: Instant,
) -> RealtimeData {
    let limit = provider_timeout.min(deadline.saturating_duration_since(Instant::now()));

    let weather_id = weather.id().to_owned();
    let poi_id = poi.id().to_owned();

    let weather_task = {
        let city = city.to_owned();
        AbortOnDrop(tokio::spawn(async move { weather.fetch(&city).await }))
    };
    let poi_task = {
        let city = city.to_owned();
        AbortOnDrop(tokio::spawn(async move { poi.fetch(&city).await }))
    };

    let (weather_result, poi_result) = tokio::join!(
        supervise(&weather_id, weather_task, limit),
        supervise(&poi_id, poi_task, limit),
    );

    let (weather, weather_outcome) = match weather_result {
        Ok(record) => (Some(record), FetchOutcome::Ok),
        Err(outcome) => (None, outcome),
    };
    let (pois, poi_outcome) = match poi_result {
        Ok(places) => (places, FetchOutcome::Ok),
        Err(outcome) => (Vec::new(), outcome),
    };

    debug!(
        weather = ?weather_outcome,
        pois = pois.len(),
        poi_outcome = ?poi_outcome,
        "real-time fetch complete"
    );

    RealtimeData {
        weather,
        pois,
        weather_outcome,
        poi_outcome,
    }
}

async fn supervise<T>(
    provider: &str,
    mut task: AbortOnDrop<wayfinder_adapters::Result<T>>,
    limit: Duration,
) -> Result<T, FetchOutcome> {
    match tokio::time::timeout(limit, &mut task.0).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => {
            warn!(provider, error = %e, "provider failed, continuing without its data");
            Err(FetchOutcome::Failed)
        }
        Ok(Err(join_error)) => {
            warn!(provider, error = %join_error, "provider task panicked");
            Err(FetchOutcome::Panicked)
        }
        Err(_) => {
            warn!(
                provider,
                limit_ms = limit.as_millis() as u64,
                "provider timed out, cancelling"
            );
            Err(FetchOutcome::TimedOut)
        }
    }
}
