//! Run counters and stage latency aggregates for one
//! [`WorkflowEngine`](crate::workflow::WorkflowEngine).
//!
//! A [`MetricsSnapshot`] renders either as a one-line summary (`Display`) or
//! as Prometheus text exposition via [`MetricsSnapshot::to_prometheus`].

use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::state::StageTimings;

// ── counters ─────────────────────────────────────────────────────────

/// Lock-free counters shared by concurrent runs.
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    runs_timed_out: AtomicU64,
    classification_fallbacks: AtomicU64,
    empty_retrievals: AtomicU64,
    weather_degraded: AtomicU64,
    poi_degraded: AtomicU64,
    latency: LatencyRecorders,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_started(&self) {
        bump(&self.runs_started);
    }

    /// A successful run; its stage timings feed the latency aggregates.
    pub(crate) fn record_completed(&self, timings: &StageTimings) {
        bump(&self.runs_completed);
        self.latency.record(timings);
    }

    /// A fatal error; timeouts are also counted separately.
    pub(crate) fn record_failed(&self, timed_out: bool) {
        bump(&self.runs_failed);
        if timed_out {
            bump(&self.runs_timed_out);
        }
    }

    pub(crate) fn record_classification_fallback(&self) {
        bump(&self.classification_fallbacks);
    }

    pub(crate) fn record_empty_retrieval(&self) {
        bump(&self.empty_retrievals);
    }

    pub(crate) fn record_weather_degraded(&self) {
        bump(&self.weather_degraded);
    }

    pub(crate) fn record_poi_degraded(&self) {
        bump(&self.poi_degraded);
    }

    /// A consistent-enough copy for reporting.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            runs_started: load(&self.runs_started),
            runs_completed: load(&self.runs_completed),
            runs_failed: load(&self.runs_failed),
            runs_timed_out: load(&self.runs_timed_out),
            classification_fallbacks: load(&self.classification_fallbacks),
            empty_retrievals: load(&self.empty_retrievals),
            weather_degraded: load(&self.weather_degraded),
            poi_degraded: load(&self.poi_degraded),
            latency: self.latency.summarize(),
        }
    }
}

// ── latency ──────────────────────────────────────────────────────────

/// Running count, sum and extremes of one duration series, in milliseconds.
#[derive(Debug)]
struct LatencyStats {
    count: AtomicU64,
    total_ms: AtomicU64,
    min_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            total_ms: AtomicU64::new(0),
            min_ms: AtomicU64::new(u64::MAX),
            max_ms: AtomicU64::new(0),
        }
    }
}

impl LatencyStats {
    fn observe(&self, ms: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.min_ms.fetch_min(ms, Ordering::Relaxed);
        self.max_ms.fetch_max(ms, Ordering::Relaxed);
    }

    fn summarize(&self) -> LatencySummary {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return LatencySummary::default();
        }
        let total_ms = self.total_ms.load(Ordering::Relaxed);
        LatencySummary {
            count,
            mean_ms: total_ms as f64 / count as f64,
            min_ms: self.min_ms.load(Ordering::Relaxed),
            max_ms: self.max_ms.load(Ordering::Relaxed),
            total_ms,
        }
    }
}

#[derive(Debug, Default)]
struct LatencyRecorders {
    classify: LatencyStats,
    retrieve: LatencyStats,
    fetch: LatencyStats,
    synthesize: LatencyStats,
    total: LatencyStats,
}

impl LatencyRecorders {
    fn record(&self, t: &StageTimings) {
        self.classify.observe(t.classify_ms);
        self.retrieve.observe(t.retrieve_ms);
        self.fetch.observe(t.fetch_ms);
        self.synthesize.observe(t.synthesize_ms);
        self.total.observe(t.total_ms);
    }

    fn summarize(&self) -> StageLatencies {
        StageLatencies {
            classify: self.classify.summarize(),
            retrieve: self.retrieve.summarize(),
            fetch: self.fetch.summarize(),
            synthesize: self.synthesize.summarize(),
            total: self.total.summarize(),
        }
    }
}

/// Aggregate of one latency series.  All zero when nothing was recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub mean_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub total_ms: u64,
}

/// Latency aggregates per stage over completed runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StageLatencies {
    pub classify: LatencySummary,
    pub retrieve: LatencySummary,
    pub fetch: LatencySummary,
    pub synthesize: LatencySummary,
    /// Whole pipeline.
    pub total: LatencySummary,
}

impl StageLatencies {
    /// `(label, summary)` pairs in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &LatencySummary)> {
        [
            ("classify", &self.classify),
            ("retrieve", &self.retrieve),
            ("fetch", &self.fetch),
            ("synthesize", &self.synthesize),
            ("total", &self.total),
        ]
        .into_iter()
    }
}

// ── snapshot ─────────────────────────────────────────────────────────

/// Point-in-time counter values and latency aggregates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub runs_timed_out: u64,
    pub classification_fallbacks: u64,
    pub empty_retrievals: u64,
    pub weather_degraded: u64,
    pub poi_degraded: u64,
    pub latency: StageLatencies,
}

impl MetricsSnapshot {
    /// Runs started but not yet finished.
    pub fn in_flight(&self) -> u64 {
        self.runs_started
            .saturating_sub(self.runs_completed + self.runs_failed)
    }

    /// Prometheus text exposition (format 0.0.4).
    pub fn to_prometheus(&self) -> String {
        let counters = [
            ("runs_started_total", "Workflow runs started.", self.runs_started),
            ("runs_completed_total", "Workflow runs that produced a plan.", self.runs_completed),
            ("runs_failed_total", "Workflow runs that failed.", self.runs_failed),
            ("runs_timed_out_total", "Failed runs caused by a timeout.", self.runs_timed_out),
            (
                "classification_fallbacks_total",
                "Classifications that fell back to the default intent.",
                self.classification_fallbacks,
            ),
            ("empty_retrievals_total", "Runs with no retrieved knowledge.", self.empty_retrievals),
            ("weather_degraded_total", "Runs without weather data.", self.weather_degraded),
            ("poi_degraded_total", "Runs without points of interest.", self.poi_degraded),
        ];

        let mut out = String::new();
        for (name, help, value) in counters {
            let _ = writeln!(out, "# HELP wayfinder_{name} {help}");
            let _ = writeln!(out, "# TYPE wayfinder_{name} counter");
            let _ = writeln!(out, "wayfinder_{name} {value}");
        }

        let _ = writeln!(
            out,
            "# HELP wayfinder_stage_latency_ms Stage latency of completed runs in milliseconds."
        );
        let _ = writeln!(out, "# TYPE wayfinder_stage_latency_ms summary");
        for (stage, s) in self.latency.iter() {
            let _ = writeln!(out, "wayfinder_stage_latency_ms_sum{{stage=\"{stage}\"}} {}", s.total_ms);
            let _ = writeln!(out, "wayfinder_stage_latency_ms_count{{stage=\"{stage}\"}} {}", s.count);
        }
        for (suffix, max) in [("min", false), ("max", true)] {
            let _ = writeln!(out, "# TYPE wayfinder_stage_latency_ms_{suffix} gauge");
            for (stage, s) in self.latency.iter() {
                let value = if max { s.max_ms } else { s.min_ms };
                let _ = writeln!(
                    out,
                    "wayfinder_stage_latency_ms_{suffix}{{stage=\"{stage}\"}} {value}"
                );
            }
        }
        out
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "runs={} completed={} failed={} timed_out={} fallbacks={} empty_retrievals={} \
             weather_degraded={} poi_degraded={} mean_total_ms={:.1}",
            self.runs_started,
            self.runs_completed,
            self.runs_failed,
            self.runs_timed_out,
            self.classification_fallbacks,
            self.empty_retrievals,
            self.weather_degraded,
            self.poi_degraded,
            self.latency.total.mean_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let m = WorkflowMetrics::new();
        m.record_started();
        m.record_started();
        m.record_completed(&StageTimings::default());
        m.record_weather_degraded();
        let snap = m.snapshot();
        assert_eq!(snap.runs_started, 2);
        assert_eq!(snap.in_flight(), 1);

        m.record_failed(true);
        let snap = m.snapshot();
        assert_eq!(snap.runs_failed, 1);
        assert_eq!(snap.runs_timed_out, 1);
        assert_eq!(snap.in_flight(), 0);
        assert_eq!(snap.weather_degraded, 1);
    }

    #[test]
    fn display_lists_counters() {
        let m = WorkflowMetrics::new();
        m.record_started();
        assert!(m.snapshot().to_string().starts_with("runs=1 completed=0"));
    }

    fn timings(classify: u64, fetch: u64, total: u64) -> StageTimings {
        StageTimings {
            classify_ms: classify,
            retrieve_ms: 1,
            fetch_ms: fetch,
            synthesize_ms: 10,
            total_ms: total,
        }
    }

    #[test]
    fn latency_aggregates_completed_runs() {
        let m = WorkflowMetrics::new();
        assert_eq!(m.snapshot().latency.total, LatencySummary::default());

        m.record_completed(&timings(2, 40, 60));
        m.record_completed(&timings(4, 10, 20));
        m.record_failed(false);

        let lat = m.snapshot().latency;
        assert_eq!(lat.total.count, 2);
        assert_eq!(lat.total.total_ms, 80);
        assert_eq!(lat.total.min_ms, 20);
        assert_eq!(lat.total.max_ms, 60);
        assert!((lat.total.mean_ms - 40.0).abs() < 1e-9);
        assert!((lat.classify.mean_ms - 3.0).abs() < 1e-9);
        assert_eq!(lat.fetch.min_ms, 10);
        assert_eq!(lat.fetch.max_ms, 40);
        assert_eq!(lat.retrieve.total_ms, 2);
    }

    #[test]
    fn prometheus_text_has_counters_and_stage_series() {
        let m = WorkflowMetrics::new();
        m.record_started();
        m.record_completed(&timings(3, 7, 30));
        let text = m.snapshot().to_prometheus();

        assert!(text.contains("# TYPE wayfinder_runs_started_total counter\n"));
        assert!(text.contains("wayfinder_runs_completed_total 1\n"));
        assert!(text.contains("wayfinder_runs_failed_total 0\n"));
        assert!(text.contains("wayfinder_stage_latency_ms_count{stage=\"classify\"} 1\n"));
        assert!(text.contains("wayfinder_stage_latency_ms_sum{stage=\"fetch\"} 7\n"));
        assert!(text.contains("wayfinder_stage_latency_ms_max{stage=\"total\"} 30\n"));
        assert!(
            text.lines()
                .filter(|l| !l.starts_with('#'))
                .all(|l| l.split(' ').count() == 2)
        );
    }
}
