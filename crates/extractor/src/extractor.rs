//! The stage-2 extraction agent.
//!
//! Asks the completion capability for raw per-slot readings with
//! evidence spans, then re-validates every reading through the
//! normalizers. A reading that fails its normalizer is demoted to
//! `ambiguous_fields`; requested slots with no reading land in
//! `missing_fields`. The agent may use known slots to disambiguate
//! ("April 25th" + known marathon → a full date) but can never invent a
//! value the normalizers reject.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use pl_domain::extraction::ExtractionResult;
use pl_domain::slots::{SlotName, SlotValue};

use pl_completion::{complete_validated, CompletionProvider, FieldType, Schema, StructuredRequest};

use crate::normalize::{normalize_slot, Normalized, NormalizeContext};

/// Inputs for one extraction call.
#[derive(Debug, Clone)]
pub struct ExtractionInput<'a> {
    pub user_message: &'a str,
    pub attributes_requested: &'a [SlotName],
    pub known_slots: &'a BTreeMap<SlotName, SlotValue>,
    pub conversation_summary: Option<&'a str>,
    pub today: chrono::NaiveDate,
    /// Slot the previous assistant prompt asked for, if any.
    pub prompted_slot: Option<SlotName>,
}

/// The attribute extractor agent.
pub struct AttributeExtractor {
    provider: Arc<dyn CompletionProvider>,
    /// Instruction prompt, loaded through the prompt tool server.
    prompt: String,
}

impl AttributeExtractor {
    pub fn new(provider: Arc<dyn CompletionProvider>, prompt: String) -> Self {
        Self { provider, prompt }
    }

    /// Run one extraction. An empty message is a no-op extraction.
    pub async fn extract(&self, input: ExtractionInput<'_>) -> ExtractionResult {
        if input.user_message.trim().is_empty() {
            return ExtractionResult::empty(input.attributes_requested);
        }

        let schema = Schema::object()
            .required("values", FieldType::Object)
            .required("confidence", FieldType::Number)
            .optional("evidence", FieldType::Object);

        let request = StructuredRequest {
            purpose: "extract_slots",
            system_prompt: self.prompt.clone(),
            user_input: input.user_message.to_owned(),
            context: json!({
                "attributes_requested": input.attributes_requested,
                "known_slots": input.known_slots,
                "conversation_summary": input.conversation_summary,
                "today": input.today.to_string(),
            }),
        };

        let raw = match complete_validated(self.provider.as_ref(), request, &schema).await {
            Ok(value) => value,
            Err(e) => {
                // Extraction failure is never fatal: everything requested
                // stays missing and the controller re-asks.
                tracing::warn!(error = %e, "extraction completion failed");
                return ExtractionResult::empty(input.attributes_requested);
            }
        };

        self.validate_readings(&input, &raw)
    }

    /// Re-validate raw model readings through the slot normalizers.
    fn validate_readings(&self, input: &ExtractionInput<'_>, raw: &Value) -> ExtractionResult {
        let mut result = ExtractionResult {
            confidence: raw
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(0.0)
                .clamp(0.0, 1.0),
            ..ExtractionResult::default()
        };

        let readings = raw.get("values").and_then(Value::as_object);
        let evidence = raw.get("evidence").and_then(Value::as_object);

        let ctx = NormalizeContext {
            today: Some(input.today),
            known_distance: input
                .known_slots
                .get(&SlotName::RaceDistance)
                .and_then(SlotValue::as_distance),
            prompted_slot: input.prompted_slot,
        };

        for slot in input.attributes_requested {
            let key = slot.to_string();
            let reading = readings
                .and_then(|m| m.get(&key))
                .and_then(Value::as_str)
                .unwrap_or("");

            // Distance read in this same message beats stored context
            // when disambiguating a target time.
            let ctx = match normalize_reading_distance(readings, input) {
                Some(d) if *slot == SlotName::TargetTime => NormalizeContext {
                    known_distance: Some(d),
                    ..ctx
                },
                _ => ctx,
            };

            match normalize_slot(*slot, reading, &ctx) {
                Normalized::Value(value) => {
                    let span = evidence
                        .and_then(|m| m.get(&key))
                        .and_then(Value::as_str)
                        .unwrap_or(reading);
                    // Evidence must cite the message; an unsupported
                    // reading is not a value.
                    if span_supported(input.user_message, span) {
                        result.evidence.insert(*slot, span.to_owned());
                        result.values.insert(*slot, value);
                    } else {
                        result
                            .ambiguous_fields
                            .insert(*slot);
                    }
                }
                Normalized::Ambiguous(reason) => {
                    tracing::debug!(slot = %slot, %reason, "ambiguous reading");
                    result.ambiguous_fields.insert(*slot);
                }
                Normalized::Missing => {
                    result.missing_fields.insert(*slot);
                }
            }
        }

        result
    }
}

/// Distance extracted in the current message, normalized, if any.
fn normalize_reading_distance(
    readings: Option<&serde_json::Map<String, Value>>,
    input: &ExtractionInput<'_>,
) -> Option<pl_domain::slots::RaceDistance> {
    let raw = readings?
        .get(&SlotName::RaceDistance.to_string())?
        .as_str()?;
    match crate::normalize::normalize_distance(raw) {
        Normalized::Value(SlotValue::Distance(d)) => Some(d),
        _ => input
            .known_slots
            .get(&SlotName::RaceDistance)
            .and_then(SlotValue::as_distance),
    }
}

/// An evidence span supports a value when it appears in the message
/// (case-insensitive).
fn span_supported(message: &str, span: &str) -> bool {
    !span.is_empty() && message.to_lowercase().contains(&span.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_completion::ScriptedProvider;
    use pl_domain::slots::RaceDistance;

    fn extractor(responses: Vec<Value>) -> AttributeExtractor {
        let provider = ScriptedProvider::new();
        for r in responses {
            provider.push(r);
        }
        AttributeExtractor::new(Arc::new(provider), "extract".into())
    }

    fn input<'a>(
        message: &'a str,
        requested: &'a [SlotName],
        known: &'a BTreeMap<SlotName, SlotValue>,
    ) -> ExtractionInput<'a> {
        ExtractionInput {
            user_message: message,
            attributes_requested: requested,
            known_slots: known,
            conversation_summary: None,
            today: "2026-01-10".parse().unwrap(),
            prompted_slot: None,
        }
    }

    #[tokio::test]
    async fn extracts_and_normalizes_marathon() {
        let ex = extractor(vec![json!({
            "values": {"race_distance": "marathon"},
            "confidence": 0.95,
            "evidence": {"race_distance": "marathon"},
        })]);
        let known = BTreeMap::new();
        let requested = [SlotName::RaceDistance, SlotName::RaceDate];

        let out = ex
            .extract(input("I'm training for a marathon", &requested, &known))
            .await;

        assert_eq!(
            out.values.get(&SlotName::RaceDistance),
            Some(&SlotValue::Distance(RaceDistance::Marathon))
        );
        assert!(out.missing_fields.contains(&SlotName::RaceDate));
        assert!(out.ambiguous_fields.is_empty());
    }

    #[tokio::test]
    async fn ambiguous_season_lands_in_ambiguous_fields() {
        let ex = extractor(vec![json!({
            "values": {"race_date": "spring"},
            "confidence": 0.4,
            "evidence": {"race_date": "spring"},
        })]);
        let known = BTreeMap::new();
        let requested = [SlotName::RaceDate];

        let out = ex
            .extract(input("I want to race in spring", &requested, &known))
            .await;

        assert!(out.values.is_empty());
        assert!(out.ambiguous_fields.contains(&SlotName::RaceDate));
    }

    #[tokio::test]
    async fn known_distance_disambiguates_followup_date_and_time() {
        let ex = extractor(vec![json!({
            "values": {"race_date": "April 25th", "target_time": "3:15"},
            "confidence": 0.9,
            "evidence": {"race_date": "April 25th", "target_time": "3:15"},
        })]);
        let mut known = BTreeMap::new();
        known.insert(
            SlotName::RaceDistance,
            SlotValue::Distance(RaceDistance::Marathon),
        );
        let requested = [SlotName::RaceDate, SlotName::TargetTime];

        let out = ex
            .extract(input("April 25th, going for 3:15", &requested, &known))
            .await;

        assert_eq!(
            out.values.get(&SlotName::RaceDate),
            Some(&SlotValue::Date("2026-04-25".parse().unwrap()))
        );
        assert_eq!(
            out.values.get(&SlotName::TargetTime),
            Some(&SlotValue::Time(3 * 3600 + 15 * 60))
        );
    }

    #[tokio::test]
    async fn empty_message_is_a_noop_extraction() {
        let ex = extractor(vec![]);
        let known = BTreeMap::new();
        let requested = [SlotName::RaceDistance, SlotName::RaceDate];

        let out = ex.extract(input("   ", &requested, &known)).await;
        assert!(out.values.is_empty());
        assert_eq!(out.missing_fields.len(), 2);
    }

    #[tokio::test]
    async fn unsupported_evidence_is_rejected() {
        let ex = extractor(vec![json!({
            "values": {"race_distance": "marathon"},
            "confidence": 0.9,
            "evidence": {"race_distance": "marathon"},
        })]);
        let known = BTreeMap::new();
        let requested = [SlotName::RaceDistance];

        // The message never says marathon; the model made it up.
        let out = ex.extract(input("I like running", &requested, &known)).await;
        assert!(out.values.is_empty());
        assert!(out.ambiguous_fields.contains(&SlotName::RaceDistance));
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_all_missing() {
        let ex = extractor(vec![]); // nothing queued → provider errors
        let known = BTreeMap::new();
        let requested = [SlotName::RaceDate];

        let out = ex
            .extract(input("race on April 25th", &requested, &known))
            .await;
        assert!(out.values.is_empty());
        assert!(out.missing_fields.contains(&SlotName::RaceDate));
    }
}
