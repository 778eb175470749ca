//! Request state threaded through the workflow stages.
//!
//! Inputs live in an immutable [`TripRequest`].  Every derived field of
//! [`RequestState`] is a [`Slot`] that accepts exactly one write, so a stage
//! cannot overwrite a field owned by an earlier one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfinder_adapters::{PlaceRecord, Snippet, WeatherRecord};

use crate::error::{Result, WorkflowError};

// ---------------------------------------------------------------------------
// Intent and stages
// ---------------------------------------------------------------------------

/// The classified category of a travel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Multi-day itinerary.
    Plan,
    /// Factual or practical question.
    Info,
    /// Events, festivals, exhibitions.
    Events,
    /// Booking request; answered with suggestions only.
    Book,
}

impl Intent {
    pub const ALL: [Intent; 4] = [Intent::Plan, Intent::Info, Intent::Events, Intent::Book];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Info => "info",
            Self::Events => "events",
            Self::Book => "book",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        Intent::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| WorkflowError::invalid(format!("unknown intent `{s}`")))
    }
}

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classify,
    Retrieve,
    Fetch,
    Synthesize,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Classify,
        Stage::Retrieve,
        Stage::Fetch,
        Stage::Synthesize,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::Retrieve => "retrieve",
            Self::Fetch => "fetch",
            Self::Synthesize => "synthesize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Validated workflow input.  Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    pub city: String,
    pub days: u32,
    pub preferences: Option<String>,
    pub user_query: String,
}

impl TripRequest {
    /// Validate raw adapter input.
    ///
    /// `days` is signed so that negative values from a form or flag can be
    /// rejected here rather than wrapping.  A blank query defaults to a
    /// planning request.
    pub fn new(
        city: impl Into<String>,
        days: i64,
        preferences: Option<String>,
        user_query: Option<String>,
    ) -> Result<Self> {
        let city = city.into().trim().to_owned();
        if city.is_empty() {
            return Err(WorkflowError::invalid("city must not be empty"));
        }
        if days <= 0 {
            return Err(WorkflowError::invalid(format!(
                "days must be a positive integer, got {days}"
            )));
        }
        let days = u32::try_from(days)
            .map_err(|_| WorkflowError::invalid(format!("days is too large: {days}")))?;

        let preferences = preferences
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty());
        let user_query = user_query
            .map(|q| q.trim().to_owned())
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| format!("Plan a {days}-day trip to {city}"));

        Ok(Self {
            city,
            days,
            preferences,
            user_query,
        })
    }
}

// ---------------------------------------------------------------------------
// Write-once slot
// ---------------------------------------------------------------------------

/// A field that may be written exactly once.
#[derive(Debug, Clone)]
pub struct Slot<T> {
    name: &'static str,
    value: Option<T>,
}

impl<T> Slot<T> {
    pub fn new(name: &'static str) -> Self {
        Self { name, value: None }
    }

    /// Commit the value; a second write is a [`WorkflowError::StateViolation`].
    pub fn set(&mut self, value: T) -> Result<()> {
        if self.value.is_some() {
            return Err(WorkflowError::StateViolation {
                reason: format!("`{}` written twice", self.name),
            });
        }
        self.value = Some(value);
        Ok(())
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The committed value, or a violation if an upstream stage never wrote it.
    pub fn require(&self) -> Result<&T> {
        self.value.as_ref().ok_or_else(|| WorkflowError::StateViolation {
            reason: format!("`{}` read before it was written", self.name),
        })
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    fn take(&mut self) -> Result<T> {
        self.value.take().ok_or_else(|| WorkflowError::StateViolation {
            reason: format!("`{}` missing from final state", self.name),
        })
    }
}

// ---------------------------------------------------------------------------
// Request state
// ---------------------------------------------------------------------------

/// The single mutable record of one workflow run.
#[derive(Debug, Clone)]
pub struct RequestState {
    pub request_id: Uuid,
    pub request: TripRequest,
    pub intent: Slot<Intent>,
    pub retrieved_context: Slot<Vec<Snippet>>,
    /// `None` is the absent-marker for a failed weather fetch.
    pub weather_data: Slot<Option<WeatherRecord>>,
    pub poi_data: Slot<Vec<PlaceRecord>>,
    pub response: Slot<String>,
    pub sources: Slot<Vec<String>>,
    pub confidence: Slot<f64>,
}

impl RequestState {
    pub fn new(request: TripRequest) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            request,
            intent: Slot::new("intent"),
            retrieved_context: Slot::new("retrieved_context"),
            weather_data: Slot::new("weather_data"),
            poi_data: Slot::new("poi_data"),
            response: Slot::new("response"),
            sources: Slot::new("sources"),
            confidence: Slot::new("confidence"),
        }
    }

    /// Consume a fully populated state into the caller-facing result.
    pub fn into_plan(mut self, timings: StageTimings) -> Result<TripPlan> {
        Ok(TripPlan {
            request_id: self.request_id,
            intent: self.intent.take()?,
            response: self.response.take()?,
            sources: self.sources.take()?,
            confidence: self.confidence.take()?,
            weather: self.weather_data.take()?,
            pois: self.poi_data.take()?,
            snippets: self.retrieved_context.take()?,
            city: self.request.city,
            days: self.request.days,
            preferences: self.request.preferences,
            user_query: self.request.user_query,
            timings,
        })
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Wall-clock time spent in each stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub classify_ms: u64,
    pub retrieve_ms: u64,
    pub fetch_ms: u64,
    pub synthesize_ms: u64,
    pub total_ms: u64,
}

/// The outcome of a successful workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    pub request_id: Uuid,
    pub city: String,
    pub days: u32,
    pub preferences: Option<String>,
    pub user_query: String,
    pub intent: Intent,
    pub response: String,
    pub sources: Vec<String>,
    pub confidence: f64,
    pub weather: Option<WeatherRecord>,
    pub pois: Vec<PlaceRecord>,
    pub snippets: Vec<Snippet>,
    pub timings: StageTimings,
}
