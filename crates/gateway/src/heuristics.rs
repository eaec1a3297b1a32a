//! Heuristic completion provider.
//!
//! A deterministic, keyword-driven stand-in for the structured
//! completion capability, used when no model provider is wired in.
//! It keeps the whole stack functional offline: target classification
//! by keyword, slot readings by token scan, and canned ask/chat text
//! (which the controller replaces with its own deterministic fallbacks
//! when absent anyway).

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use pl_completion::{CompletionProvider, StructuredRequest};
use pl_domain::error::Result;

#[derive(Default)]
pub struct HeuristicProvider;

#[async_trait]
impl CompletionProvider for HeuristicProvider {
    async fn complete(&self, req: StructuredRequest) -> Result<Value> {
        Ok(match req.purpose {
            "classify_target" => classify(&req.user_input),
            "extract_slots" => extract(&req.user_input, &req.context),
            "ask_slot" => json!({ "text": Value::Null }),
            "chat_reply" => json!({ "text": Value::Null }),
            "summarize" => json!({ "summary": summarize(&req.user_input) }),
            _ => json!({}),
        })
    }

    fn provider_id(&self) -> &str {
        "heuristic"
    }
}

const DISTANCE_WORDS: &[&str] = &[
    "marathon", "half", "5k", "10k", "ultra", "26.2", "13.1", "50k", "100k",
];

fn classify(message: &str) -> Value {
    let lowered = message.to_lowercase();
    let target = if lowered.contains("next week") || lowered.contains("this week") {
        "weekly_plan"
    } else if lowered.contains("season") {
        "plan_season"
    } else if lowered.contains("move") || lowered.contains("swap") || lowered.contains("change") {
        "modify_day"
    } else if lowered.contains("add") && lowered.contains("workout") {
        "add_workout"
    } else if DISTANCE_WORDS.iter().any(|w| lowered.contains(w)) || lowered.contains("race") {
        "plan_race_build"
    } else {
        "none"
    };
    json!({ "target_action": target })
}

/// Crude token scan: surfaces candidate substrings per requested slot
/// and lets the extractor's normalizers accept or reject them.
fn extract(message: &str, context: &Value) -> Value {
    let lowered = message.to_lowercase();
    let mut values = Map::new();
    let mut evidence = Map::new();

    let requested: Vec<String> = context["attributes_requested"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    for slot in &requested {
        let candidate = match slot.as_str() {
            "race_distance" => DISTANCE_WORDS
                .iter()
                .find(|w| lowered.contains(*w))
                .map(|w| (*w).to_owned()),
            "race_date" => date_re()
                .find(&lowered)
                .map(|m| m.as_str().trim().to_owned()),
            "target_time" => time_re()
                .find(&lowered)
                .map(|m| m.as_str().trim().to_owned()),
            "weekly_mileage" => mileage_re()
                .find(&lowered)
                .map(|m| m.as_str().trim().to_owned()),
            _ => None,
        };
        if let Some(text) = candidate {
            values.insert(slot.clone(), json!(text));
            evidence.insert(slot.clone(), json!(text));
        }
    }

    json!({ "values": values, "confidence": 0.5, "evidence": evidence })
}

fn summarize(latest: &str) -> String {
    let mut text = latest.trim().to_owned();
    text.truncate(200);
    format!("Most recent athlete message: {text}")
}

fn date_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(
            r"(\d{4}-\d{2}-\d{2})|((january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec)\s+\d{1,2}(st|nd|rd|th)?)|(spring|summer|fall|autumn|winter)",
        )
        .expect("date regex")
    })
}

fn time_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"(sub[- ]?\d(:\d{2})?)|(\d{1,2}:\d{2}(:\d{2})?)").expect("time regex")
    })
}

fn mileage_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"~?\d{1,3}(\.\d)?\s*(mpw|mi/wk|miles?\s*(per|/|a)\s*week)")
            .expect("mileage regex")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_marathon_message_as_race_build() {
        assert_eq!(
            classify("I'm training for a marathon")["target_action"],
            "plan_race_build"
        );
        assert_eq!(classify("Plan my next week")["target_action"], "weekly_plan");
        assert_eq!(classify("how's the weather")["target_action"], "none");
    }

    #[test]
    fn extracts_candidates_for_requested_slots() {
        let context = json!({
            "attributes_requested": ["race_distance", "race_date", "target_time", "weekly_mileage"]
        });
        let out = extract(
            "Marathon on April 25, aiming for sub-3. Running ~55 mpw.",
            &context,
        );
        assert_eq!(out["values"]["race_distance"], "marathon");
        assert_eq!(out["values"]["race_date"], "april 25");
        assert_eq!(out["values"]["target_time"], "sub-3");
        assert_eq!(out["values"]["weekly_mileage"], "~55 mpw");
    }

    #[test]
    fn season_words_surface_for_the_normalizer_to_reject() {
        let context = json!({ "attributes_requested": ["race_date"] });
        let out = extract("I want to race in spring", &context);
        assert_eq!(out["values"]["race_date"], "spring");
    }
}
