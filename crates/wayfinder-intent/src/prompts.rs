//! Synthesis prompt assembly.
//!
//! Each intent gets its own system instructions.  The user turn is built
//! from the same structured sections (retrieved context, real-time data,
//! trip details) so that the instructions are satisfiable from the payload
//! alone.

use std::fmt::Write as _;

use wayfinder_adapters::{PlaceRecord, Snippet, WeatherRecord};

use crate::state::TripRequest;

/// Used when the traveller gave no preferences.
pub const DEFAULT_PREFERENCES: &str = "culture, food, and authentic local experiences";

const GROUNDING_RULES: &str = "\
GROUNDING:
- Base recommendations on the retrieved context and real-time data below.
- Cite sources naturally (\"according to local tips...\").
- Say so when the context does not cover something; never invent prices, \
opening hours or availability.";

pub(crate) fn plan_system(max_activities_per_day: u32) -> String {
    format!(
        "You are an expert travel itinerary planner creating personalised, \
         realistic trip plans.\n\n\
         PLANNING PRINCIPLES:\n\
         - Pacing: at most {max_activities_per_day} activities per day, including travel time.\n\
         - Group nearby attractions on the same day.\n\
         - Follow the per-day weather hints: favour indoor options on wet days and \
         outdoor ones on dry days.\n\
         - Prioritise the traveller's preferences.\n\n\
         FORMAT:\n\
         Start every day with a heading `## Day N: <theme>` and give morning, lunch, \
         afternoon and evening blocks. Finish with `## Practical Tips`.\n\n\
         {GROUNDING_RULES}"
    )
}

pub(crate) const INFO_SYSTEM: &str = "\
You are a knowledgeable travel information assistant.
Lead with a direct one or two sentence answer, then supporting bullet points.

FACTS AND QUALIFIERS:
- Present stable facts from the knowledge base plainly (geography, customs, \
how a transit pass works).
- Qualify dynamic facts (prices, hours, schedules, availability, weather) with \
\"typically\" or \"at the time of writing\" and recommend checking an official \
source.
- Keep facts and suggestions visibly separate.";

pub(crate) const EVENTS_SYSTEM: &str = "\
You are a travel assistant answering questions about events, festivals, \
concerts and exhibitions.

FACTS AND QUALIFIERS:
- Recurring, well-known events from the knowledge base are static facts.
- Specific dates, line-ups, tickets and prices are dynamic: qualify them and \
tell the traveller to confirm with the organiser.
- Never claim an event is happening on a specific date unless the context says so.";

pub(crate) const BOOK_SYSTEM: &str = "\
You are a travel assistant helping someone compare options they may want to book.

STRICT RULES:
- You cannot make, hold, confirm or pay for any reservation. Never say that \
anything has been booked, reserved or confirmed, and never invent a \
confirmation number.
- Offer suggestions only: areas to stay, types of places to consider, what to \
compare, and where the traveller can complete the booking themselves.
- Qualify all prices and availability as estimates to verify with the provider.";

/// One line per trip day describing what the forecast suggests.
///
/// Trip day `n` is matched to the `n`-th forecast day; days past the
/// forecast horizon have no hint beyond that.
pub fn day_hints(days: u32, weather: Option<&WeatherRecord>) -> Vec<String> {
    (1..=days)
        .map(|n| {
            let forecast = weather.and_then(|w| w.days.get(n as usize - 1));
            match forecast {
                Some(d) => {
                    let advice = if d.is_wet() {
                        "favour indoor activities"
                    } else {
                        "outdoor-friendly"
                    };
                    let rain = d
                        .precipitation_probability
                        .map(|p| format!(", {p}% rain"))
                        .unwrap_or_default();
                    format!(
                        "Day {n} ({}): {advice} ({:.0}-{:.0}°C{rain})",
                        d.date, d.temp_min_c, d.temp_max_c
                    )
                }
                None => format!("Day {n}: no forecast"),
            }
        })
        .collect()
}

/// Retrieved snippets as numbered, source-tagged blocks.
pub fn format_context(snippets: &[Snippet]) -> String {
    if snippets.is_empty() {
        return "No relevant knowledge found in the knowledge base.".into();
    }
    snippets
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] ({}) {}", i + 1, s.source_id, s.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_weather(weather: Option<&WeatherRecord>) -> String {
    match weather {
        Some(w) => w.summary(),
        None => "Weather data unavailable".into(),
    }
}

/// Comma-separated place names, indoor places marked.
pub fn format_pois(pois: &[PlaceRecord], limit: usize) -> String {
    if pois.is_empty() {
        return "No attraction data available".into();
    }
    pois.iter()
        .take(limit)
        .map(|p| {
            if p.is_indoor() {
                format!("{} (indoor)", p.name)
            } else {
                p.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Inputs shared by every synthesis prompt.
pub(crate) struct PromptInputs<'a> {
    pub request: &'a TripRequest,
    pub snippets: &'a [Snippet],
    pub weather: Option<&'a WeatherRecord>,
    pub pois: &'a [PlaceRecord],
    pub max_pois: usize,
}

impl PromptInputs<'_> {
    fn preferences(&self) -> &str {
        self.request
            .preferences
            .as_deref()
            .unwrap_or(DEFAULT_PREFERENCES)
    }

    fn common_sections(&self) -> String {
        format!(
            "RETRIEVED CONTEXT:\n{}\n\nREAL-TIME DATA:\n- Weather: {}\n- Points of interest: {}\n",
            format_context(self.snippets),
            format_weather(self.weather),
            format_pois(self.pois, self.max_pois),
        )
    }

    pub fn plan_user(&self) -> String {
        let req = self.request;
        let mut out = self.common_sections();
        out.push_str("\nDAY-BY-DAY WEATHER HINTS:\n");
        for hint in day_hints(req.days, self.weather) {
            let _ = writeln!(out, "- {hint}");
        }
        let _ = write!(
            out,
            "\nTRIP DETAILS:\n- Destination: {}\n- Duration: {} days\n- Preferences: {}\n- Request: {}\n\n\
             Create the itinerary with exactly {} day sections:\n",
            req.city,
            req.days,
            self.preferences(),
            req.user_query,
            req.days,
        );
        for n in 1..=req.days {
            let _ = writeln!(out, "## Day {n}");
        }
        out
    }

    pub fn question_user(&self) -> String {
        let req = self.request;
        format!(
            "{}\nQUESTION about {} (traveller preferences: {}):\n{}\n\nProvide an accurate, grounded answer:",
            self.common_sections(),
            req.city,
            self.preferences(),
            req.user_query,
        )
    }

    pub fn book_user(&self) -> String {
        let req = self.request;
        format!(
            "{}\nBOOKING REQUEST for {} ({} days, preferences: {}):\n{}\n\n\
             Suggest options to compare. Do not confirm or complete anything:",
            self.common_sections(),
            req.city,
            req.days,
            self.preferences(),
            req.user_query,
        )
    }
}

#[cfg(test)]
mod tests {
    use wayfinder_adapters::DailyForecast;

    use super::*;

    fn forecast() -> WeatherRecord {
        let day = |date: &str, precip: u8| DailyForecast {
            date: date.parse().unwrap(),
            temp_min_c: 12.0,
            temp_max_c: 19.6,
            precipitation_probability: Some(precip),
            weather_code: Some(2),
        };
        WeatherRecord {
            location: "Barcelona".into(),
            latitude: 41.39,
            longitude: 2.17,
            days: vec![day("2026-05-01", 10), day("2026-05-02", 70)],
        }
    }

    #[test]
    fn hints_mark_wet_days_and_horizon() {
        let w = forecast();
        let hints = day_hints(3, Some(&w));
        assert_eq!(hints.len(), 3);
        assert_eq!(hints[0], "Day 1 (2026-05-01): outdoor-friendly (12-20°C, 10% rain)");
        assert!(hints[1].contains("favour indoor"));
        assert_eq!(hints[2], "Day 3: no forecast");
        assert_eq!(day_hints(2, None), ["Day 1: no forecast", "Day 2: no forecast"]);
    }

    #[test]
    fn plan_user_has_one_heading_per_day() {
        let req = TripRequest::new("Barcelona", 3, None, None).unwrap();
        let inputs = PromptInputs {
            request: &req,
            snippets: &[Snippet::new("Tapas in El Born", "food.md", 0.8)],
            weather: None,
            pois: &[],
            max_pois: 12,
        };
        let text = inputs.plan_user();
        for n in 1..=3 {
            assert!(text.contains(&format!("## Day {n}\n")));
        }
        assert!(!text.contains("## Day 4"));
        assert!(text.contains(DEFAULT_PREFERENCES));
        assert!(text.contains("[1] (food.md) Tapas in El Born"));
        assert!(text.contains("Weather data unavailable"));
    }

    #[test]
    fn pois_are_capped_and_marked() {
        let mut museum = PlaceRecord::named("MNAC");
        museum.category = Some("museum".into());
        let pois = vec![museum, PlaceRecord::named("Park Güell"), PlaceRecord::named("Tibidabo")];
        assert_eq!(format_pois(&pois, 2), "MNAC (indoor), Park Güell");
        assert_eq!(format_pois(&[], 5), "No attraction data available");
    }

    #[test]
    fn plan_system_carries_pacing_bound() {
        assert!(plan_system(3).contains("at most 3 activities per day"));
    }
}
