//! Response synthesis stage.
//!
//! One handler per [`Intent`].  Unlike the earlier stages there is no
//! degraded output: a model failure here fails the request.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use wayfinder_agent::{ModelCaller, PromptPayload};

use crate::config::WorkflowConfig;
use crate::error::Result;
use crate::prompts::{self, PromptInputs};
use crate::state::Intent;

/// Appended to every booking answer.
pub const SUGGESTIONS_ONLY_NOTE: &str =
    "Suggestions only: compare options and complete any reservation directly with the provider.";

/// Phrases that claim a transaction took place.
static CONFIRMATION_LANGUAGE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(booking|reservation|order|payment)\s+(is\s+|has\s+been\s+)?(confirmed|complete[d]?|successful)\b|\bconfirmation\s+(number|code|id)\b|\bi\s*(have|'ve)\s+(booked|reserved|confirmed|purchased|paid)\b|\b(successfully|now)\s+(booked|reserved|confirmed)\b|\byou\s+are\s+(booked|confirmed)\b|\byour\s+(room|table|seat|ticket|flight)s?\s+(is|are|has\s+been|have\s+been)\s+(booked|reserved|confirmed)\b",
    )
    .ok()
});

/// Build the payload for `intent`.
pub(crate) fn build_payload(
    intent: Intent,
    inputs: &PromptInputs<'_>,
    config: &WorkflowConfig,
) -> PromptPayload {
    let (system, user) = match intent {
        Intent::Plan => (
            prompts::plan_system(config.max_activities_per_day),
            inputs.plan_user(),
        ),
        Intent::Info => (prompts::INFO_SYSTEM.to_owned(), inputs.question_user()),
        Intent::Events => (prompts::EVENTS_SYSTEM.to_owned(), inputs.question_user()),
        Intent::Book => (prompts::BOOK_SYSTEM.to_owned(), inputs.book_user()),
    };

    PromptPayload::free_form(system, user)
        .with_model(&config.synthesis_model)
        .with_temperature(config.synthesis_temperature)
        .with_max_tokens(config.synthesis_max_tokens)
}

/// Generate the response text for `intent`.
pub(crate) async fn synthesize(
    model: &dyn ModelCaller,
    intent: Intent,
    inputs: &PromptInputs<'_>,
    config: &WorkflowConfig,
) -> Result<String> {
    let payload = build_payload(intent, inputs, config);
    let text = model.generate(&payload).await?;
    debug!(intent = %intent, chars = text.len(), "synthesis complete");

    Ok(match intent {
        Intent::Book => enforce_suggestions_only(&text),
        Intent::Plan | Intent::Info | Intent::Events => text.trim().to_owned(),
    })
}

/// Strip lines that claim a booking happened and append the suggestions note.
pub fn enforce_suggestions_only(text: &str) -> String {
    let mut removed = 0usize;
    let mut kept: Vec<&str> = Vec::new();
    for line in text.trim().lines() {
        if contains_confirmation_language(line) {
            removed += 1;
        } else {
            kept.push(line);
        }
    }
    if removed > 0 {
        warn!(removed, "removed transactional language from booking answer");
    }

    let mut out = kept.join("\n").trim().to_owned();
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(SUGGESTIONS_ONLY_NOTE);
    out
}

pub fn contains_confirmation_language(text: &str) -> bool {
    match CONFIRMATION_LANGUAGE.as_ref() {
        Some(re) => re.is_match(text),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TripRequest;

    #[test]
    fn confirmation_language_is_detected() {
        for line in [
            "Booking confirmed for 3 nights.",
            "Your reservation has been confirmed!",
            "Confirmation number: ABC123",
            "I have booked the Hotel Arts for you.",
            "I've reserved a table at 9pm.",
            "Your room is booked.",
            "Successfully reserved two seats.",
        ] {
            assert!(contains_confirmation_language(line), "missed: {line}");
        }
        for line in [
            "Consider booking early for weekends.",
            "Shinjuku hotels book up fast in spring.",
            "Compare prices on the hotel's own site before you reserve.",
            "Reservations are recommended for popular restaurants.",
        ] {
            assert!(!contains_confirmation_language(line), "false positive: {line}");
        }
    }

    #[test]
    fn guardrail_strips_lines_and_appends_note() {
        let out = enforce_suggestions_only(
            "Here are three areas to consider.\nI have booked Hotel Gracery for you.\n- Shinjuku: rail hub",
        );
        assert!(!out.contains("I have booked"));
        assert!(out.contains("Shinjuku: rail hub"));
        assert!(out.ends_with(SUGGESTIONS_ONLY_NOTE));

        assert_eq!(enforce_suggestions_only("Booking confirmed."), SUGGESTIONS_ONLY_NOTE);
    }

    #[test]
    fn payload_per_intent() {
        let req = TripRequest::new("Tokyo", 2, None, Some("Book me a hotel in Tokyo".into()))
            .unwrap();
        let inputs = PromptInputs {
            request: &req,
            snippets: &[],
            weather: None,
            pois: &[],
            max_pois: 12,
        };
        let config = WorkflowConfig {
            synthesis_model: "gpt-4o".into(),
            synthesis_temperature: 0.4,
            ..WorkflowConfig::default()
        };

        let book = build_payload(Intent::Book, &inputs, &config);
        assert!(book.system.contains("Never say that anything has been booked"));
        assert!(book.user.contains("BOOKING REQUEST for Tokyo"));
        assert_eq!(book.model, "gpt-4o");
        assert_eq!(book.temperature, 0.4);
        assert_eq!(book.max_tokens, 2000);

        let plan = build_payload(Intent::Plan, &inputs, &config);
        assert!(plan.user.contains("## Day 2"));
        assert!(plan.system.contains("at most 4 activities per day"));

        let info = build_payload(Intent::Info, &inputs, &config);
        assert!(info.system.contains("Qualify dynamic facts"));
        let events = build_payload(Intent::Events, &inputs, &config);
        assert!(events.user.contains("QUESTION about Tokyo"));
    }
}
