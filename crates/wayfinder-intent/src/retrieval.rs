//! Knowledge retrieval stage.
//!
//! The stage expands the request into a handful of search queries, runs
//! them concurrently against the [`RetrievalService`], and merges the hits
//! into a single top-K list.  Backend errors degrade to fewer (or zero)
//! snippets; they never fail the request.

use std::collections::HashMap;

use futures::future::join_all;
use tracing::{debug, warn};
use wayfinder_adapters::{RetrievalService, Snippet};

use crate::state::{Intent, TripRequest};

/// Category terms appended to the city for each intent.
fn category_terms(intent: Intent) -> &'static str {
    match intent {
        Intent::Plan => "attractions neighborhoods food itinerary tips",
        Intent::Info => "practical information transport safety tips",
        Intent::Events => "events festivals concerts exhibitions nightlife",
        Intent::Book => "hotels accommodation neighborhoods where to stay",
    }
}

/// The queries sent to the retrieval service, most specific first.
pub fn build_queries(request: &TripRequest, intent: Intent) -> Vec<String> {
    let city = &request.city;
    let query = &request.user_query;
    let scoped = if query.to_lowercase().contains(&city.to_lowercase()) {
        query.clone()
    } else {
        format!("{query} {city}")
    };
    let mut queries = vec![scoped, format!("{city} {}", category_terms(intent))];
    if let Some(prefs) = &request.preferences {
        queries.push(format!("{city} {prefs}"));
    }
    queries.dedup();
    queries
}

/// Run every query, merge, and keep the best `top_k`.
pub async fn retrieve(
    service: &dyn RetrievalService,
    request: &TripRequest,
    intent: Intent,
    top_k: usize,
) -> Vec<Snippet> {
    let queries = build_queries(request, intent);
    let results = join_all(queries.iter().map(|q| service.search(q, top_k))).await;

    let mut batches = Vec::with_capacity(results.len());
    for (query, result) in queries.iter().zip(results) {
        match result {
            Ok(hits) => batches.push(hits),
            Err(e) => warn!(query = %query, error = %e, "retrieval query failed"),
        }
    }

    let merged = merge_ranked(batches, top_k);
    debug!(queries = queries.len(), snippets = merged.len(), "retrieval complete");
    merged
}

/// Merge result lists into one ranking.
///
/// Duplicate `(source, text)` pairs keep their highest score.  Ordering is
/// by descending score; equal scores keep first-seen order (query order,
/// then rank within the query).
pub fn merge_ranked(batches: Vec<Vec<Snippet>>, top_k: usize) -> Vec<Snippet> {
    let mut merged: Vec<Snippet> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for snippet in batches.into_iter().flatten() {
        let key = (snippet.source_id.clone(), snippet.text.clone());
        match index.get(&key) {
            Some(&i) => {
                if snippet.score > merged[i].score {
                    merged[i].score = snippet.score;
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(snippet);
            }
        }
    }

    // `sort_by` is stable, which gives the first-seen tie-break.
    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged.truncate(top_k);
    merged
}
