//! Intent classification stage.
//!
//! Two tiers, mirroring how the rest of the system treats the model as a
//! fallible collaborator:
//!
//! 1. **Model**: a label-style prompt at temperature zero, parsed leniently.
//! 2. **Keywords**: local Aho-Corasick rules, used directly in `keywords`
//!    mode and never failing.
//!
//! In model mode any failure (error, timeout, unparseable answer) resolves to
//! [`Intent::Plan`].  Classification never surfaces an error.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use aho_corasick::{AhoCorasick, MatchKind};
use tracing::{debug, warn};
use wayfinder_agent::{ModelCaller, PromptPayload};

use crate::config::ClassifierMode;
use crate::state::Intent;

const SYSTEM_PROMPT: &str = "\
You are an intent classifier for a travel planning assistant.
Classify the user's request into exactly ONE category:

plan   - itinerary, day-by-day activities, trip planning
info   - factual questions: logistics, tips, visas, transport, safety
events - concerts, festivals, exhibitions, happenings
book   - booking hotels, flights, tables or tickets (suggestions only)

Output ONLY one word: plan, info, events, or book.";

/// The fallback used whenever the model cannot produce a label.
pub const FALLBACK_INTENT: Intent = Intent::Plan;

/// How a classification was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The model answered with a recognisable label.
    Model,
    /// Keyword rules decided.
    Keywords,
    /// The model failed or answered off-label; the fallback was used.
    Fallback,
}

/// Classifies a request into one of the four intents.
pub struct IntentClassifier {
    mode: ClassifierMode,
    model: Arc<dyn ModelCaller>,
    model_name: String,
    timeout: Duration,
}

impl IntentClassifier {
    pub fn new(
        mode: ClassifierMode,
        model: Arc<dyn ModelCaller>,
        model_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            mode,
            model,
            model_name: model_name.into(),
            timeout,
        }
    }

    /// Classify `query` about `city`.  Always returns one of the four labels.
    pub async fn classify(&self, query: &str, city: &str) -> (Intent, Decision) {
        if self.mode == ClassifierMode::Keywords {
            return (classify_keywords(query), Decision::Keywords);
        }

        let payload = PromptPayload::label(SYSTEM_PROMPT, format!("City: {city}\nRequest: {query}"))
            .with_model(&self.model_name);

        match tokio::time::timeout(self.timeout, self.model.generate(&payload)).await {
            Ok(Ok(text)) => match parse_label(&text) {
                Some(intent) => {
                    debug!(intent = %intent, "intent classified by model");
                    (intent, Decision::Model)
                }
                None => {
                    warn!(answer = %text.trim(), "unparseable intent label, using fallback");
                    (FALLBACK_INTENT, Decision::Fallback)
                }
            },
            Ok(Err(e)) => {
                warn!(error = %e, "classification call failed, using fallback");
                (FALLBACK_INTENT, Decision::Fallback)
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "classification timed out, using fallback"
                );
                (FALLBACK_INTENT, Decision::Fallback)
            }
        }
    }
}

/// Extract a label from a model answer.
///
/// Accepts the bare word with surrounding punctuation, quotes, or a short
/// lead-in ("Intent: book").  The first recognised word wins.
pub fn parse_label(text: &str) -> Option<Intent> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .take(4)
        .find_map(|w| w.parse::<Intent>().ok())
}

// ---------------------------------------------------------------------------
// Keyword rules
// ---------------------------------------------------------------------------

const BOOK_WORDS: &[&str] = &["book", "booking", "reserve", "reservation", "ticket", "tickets"];
const EVENT_WORDS: &[&str] = &[
    "event", "events", "concert", "concerts", "festival", "festivals", "show", "shows",
    "exhibition", "exhibitions",
];
const QUESTION_WORDS: &[&str] = &[
    "what", "how", "when", "where", "why", "which", "who", "is", "are", "do", "does", "can",
    "should",
];

struct KeywordRules {
    automaton: AhoCorasick,
    /// Intent per pattern index; question words map to `Info`.
    labels: Vec<Intent>,
}

static RULES: LazyLock<Option<KeywordRules>> = LazyLock::new(|| {
    let mut patterns = Vec::new();
    let mut labels = Vec::new();
    for (words, intent) in [
        (BOOK_WORDS, Intent::Book),
        (EVENT_WORDS, Intent::Events),
        (QUESTION_WORDS, Intent::Info),
    ] {
        for w in words {
            patterns.push(*w);
            labels.push(intent);
        }
    }
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(&patterns)
        .ok()
        .map(|automaton| KeywordRules { automaton, labels })
});

/// Deterministic, model-free classification.
///
/// Precedence: book, then events, then info (question mark or a leading
/// question word), otherwise plan.
pub fn classify_keywords(query: &str) -> Intent {
    let text = query.to_lowercase();
    let Some(rules) = RULES.as_ref() else {
        return FALLBACK_INTENT;
    };

    let mut found_book = false;
    let mut found_events = false;
    let mut leading_question = false;
    for m in rules.automaton.find_iter(&text) {
        if !is_word_bounded(&text, m.start(), m.end()) {
            continue;
        }
        match rules.labels[m.pattern().as_usize()] {
            Intent::Book => found_book = true,
            Intent::Events => found_events = true,
            Intent::Info => leading_question |= text[..m.start()].trim().is_empty(),
            Intent::Plan => {}
        }
    }

    if found_book {
        Intent::Book
    } else if found_events {
        Intent::Events
    } else if leading_question || text.contains('?') {
        Intent::Info
    } else {
        Intent::Plan
    }
}

fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}
