//! Workflow engine: classify, retrieve, fetch, synthesize.
//!
//! The engine owns its collaborators and configuration and holds no
//! per-request state, so one instance serves any number of concurrent runs.
//! Each run builds a fresh [`RequestState`], executes the stages in order
//! under a single request deadline, and returns a [`TripPlan`].
//!
//! Deadline handling differs by stage.  The fetch stage runs against an
//! earlier cut-off (`request_timeout_ms - synthesis_reserve_ms`); reaching it
//! cancels both provider calls and continues without their data.  Expiry
//! anywhere else fails the request with [`WorkflowError::DeadlineExceeded`].

use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};
use wayfinder_adapters::{PoiProvider, RetrievalService, WeatherProvider};
use wayfinder_agent::ModelCaller;

use crate::classifier::{Decision, IntentClassifier};
use crate::confidence::{self, Signals};
use crate::config::WorkflowConfig;
use crate::error::{ErrorKind, Result, WorkflowError};
use crate::metrics::{MetricsSnapshot, WorkflowMetrics};
use crate::prompts::PromptInputs;
use crate::realtime::{self, FetchOutcome};
use crate::retrieval;
use crate::state::{RequestState, Stage, StageTimings, TripPlan, TripRequest};
use crate::synthesis;

/// The travel workflow engine.
pub struct WorkflowEngine {
    config: WorkflowConfig,
    model: Arc<dyn ModelCaller>,
    retrieval: Arc<dyn RetrievalService>,
    weather: Arc<dyn WeatherProvider>,
    poi: Arc<dyn PoiProvider>,
    classifier: IntentClassifier,
    metrics: WorkflowMetrics,
}

impl WorkflowEngine {
    /// Build an engine; fails if `config` does not validate.
    pub fn new(
        config: WorkflowConfig,
        model: Arc<dyn ModelCaller>,
        retrieval: Arc<dyn RetrievalService>,
        weather: Arc<dyn WeatherProvider>,
        poi: Arc<dyn PoiProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let classifier = IntentClassifier::new(
            config.classifier,
            Arc::clone(&model),
            config.classification_model.clone(),
            config.classification_timeout(),
        );
        Ok(Self {
            config,
            model,
            retrieval,
            weather,
            poi,
            classifier,
            metrics: WorkflowMetrics::new(),
        })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Validate raw adapter input and run the workflow.
    ///
    /// Invalid input is rejected here, before any stage runs.
    pub async fn plan(
        &self,
        city: &str,
        days: i64,
        preferences: Option<String>,
        user_query: Option<String>,
    ) -> Result<TripPlan> {
        let request = TripRequest::new(city, days, preferences, user_query)?;
        self.run(request).await
    }

    /// Run all four stages for a validated request.
    ///
    /// Trips longer than `max_days` are rejected before any stage runs.
    pub async fn run(&self, request: TripRequest) -> Result<TripPlan> {
        if request.days > self.config.max_days {
            return Err(WorkflowError::invalid(format!(
                "days must be at most {}, got {}",
                self.config.max_days, request.days
            )));
        }
        let state = RequestState::new(request);
        let span = info_span!(
            "workflow",
            request_id = %state.request_id,
            city = %state.request.city,
            days = state.request.days
        );

        self.metrics.record_started();
        let result = self.execute(state).instrument(span).await;
        match &result {
            Ok(plan) => self.metrics.record_completed(&plan.timings),
            Err(e) => self.metrics.record_failed(e.kind() == ErrorKind::TimedOut),
        }
        result
    }

    async fn execute(&self, mut state: RequestState) -> Result<TripPlan> {
        let started = Instant::now();
        let deadline = started + self.config.request_timeout();
        let fetch_deadline = started + self.config.fetch_budget();
        let mut timings = StageTimings::default();
        info!(query = %state.request.user_query, "workflow started");

        // 1. Classify.
        let t = Instant::now();
        let (intent, decision) = within(
            deadline,
            Stage::Classify,
            self.classifier
                .classify(&state.request.user_query, &state.request.city),
        )
        .await?;
        if decision == Decision::Fallback {
            self.metrics.record_classification_fallback();
        }
        state.intent.set(intent)?;
        timings.classify_ms = elapsed_ms(t);
        debug!(intent = %intent, decision = ?decision, "classified");

        // 2. Retrieve.
        let t = Instant::now();
        let snippets = within(
            deadline,
            Stage::Retrieve,
            retrieval::retrieve(
                self.retrieval.as_ref(),
                &state.request,
                intent,
                self.config.top_k,
            ),
        )
        .await?;
        if snippets.is_empty() {
            self.metrics.record_empty_retrieval();
            warn!("no knowledge retrieved, continuing ungrounded");
        }
        state.retrieved_context.set(snippets)?;
        timings.retrieve_ms = elapsed_ms(t);

        // 3. Fetch real-time data; never fails.
        let t = Instant::now();
        let data = realtime::fetch_realtime(
            Arc::clone(&self.weather),
            Arc::clone(&self.poi),
            &state.request.city,
            self.config.provider_timeout(),
            fetch_deadline,
        )
        .await;
        if data.weather_outcome != FetchOutcome::Ok {
            self.metrics.record_weather_degraded();
        }
        if data.poi_outcome != FetchOutcome::Ok {
            self.metrics.record_poi_degraded();
        }
        state.weather_data.set(data.weather)?;
        state.poi_data.set(data.pois)?;
        timings.fetch_ms = elapsed_ms(t);

        // 4. Synthesize.
        let t = Instant::now();
        let snippets = state.retrieved_context.require()?;
        let weather = state.weather_data.require()?.as_ref();
        let pois = state.poi_data.require()?;

        let inputs = PromptInputs {
            request: &state.request,
            snippets,
            weather,
            pois,
            max_pois: self.config.max_pois_in_prompt,
        };
        let response = within(
            deadline,
            Stage::Synthesize,
            synthesis::synthesize(self.model.as_ref(), intent, &inputs, &self.config),
        )
        .await??;

        let signals = Signals::new(
            snippets,
            self.config.top_k,
            self.config.score_threshold,
            weather.is_some(),
            !pois.is_empty(),
        );
        let confidence = confidence::score(&signals, &self.config.confidence);
        let sources = confidence::collect_sources(
            snippets,
            weather.is_some().then(|| self.weather.id()),
            (!pois.is_empty()).then(|| self.poi.id()),
        );

        state.response.set(response)?;
        state.sources.set(sources)?;
        state.confidence.set(confidence)?;
        timings.synthesize_ms = elapsed_ms(t);
        timings.total_ms = elapsed_ms(started);

        info!(
            intent = %intent,
            confidence,
            retrieval_fill = signals.retrieval_fill,
            weather = signals.weather_present,
            pois = signals.pois_present,
            total_ms = timings.total_ms,
            "workflow complete"
        );

        state.into_plan(timings)
    }
}

/// Run `fut` under the request deadline; expiry is fatal for `stage`.
async fn within<F: Future>(deadline: Instant, stage: Stage, fut: F) -> Result<F::Output> {
    tokio::time::timeout_at(deadline, fut).await.map_err(|_| {
        warn!(stage = %stage, "request deadline exceeded");
        WorkflowError::DeadlineExceeded { stage }
    })
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
