//! Schema-level response validators.
//!
//! All four rules must pass or the turn's rendered text is discarded
//! and replaced with the deterministic fallback question. The token
//! list for the no-advice rule comes from configuration.

use pl_domain::config::PlanningConfig;
use pl_domain::slots::SlotName;

use crate::machine::Decision;

/// A validator rejection, by rule name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule: &'static str,
    pub detail: String,
}

/// The deterministic fallback emitted after any validator rejection.
pub fn fallback_question(slot: SlotName) -> String {
    format!("I need one more detail: {}?", slot)
}

/// Validate a rendered response against the turn's decision.
pub fn validate_response(
    config: &PlanningConfig,
    decision: &Decision,
    missing: &[SlotName],
    text: &str,
) -> Result<(), Violation> {
    let has_target = !matches!(decision, Decision::Chat);

    // Rule 1: exactly one question mark while slots are missing.
    if !missing.is_empty() {
        let questions = text.matches('?').count();
        if questions != 1 {
            return Err(Violation {
                rule: "single_question",
                detail: format!("{questions} question marks with missing slots"),
            });
        }
    }

    // Rule 2: no advice/explanation markers while a slot is pending.
    if has_target && !missing.is_empty() {
        let lowered = text.to_lowercase();
        for marker in &config.advice_markers {
            if lowered.contains(marker.as_str()) {
                return Err(Violation {
                    rule: "no_advice",
                    detail: format!("contains advice marker {marker:?}"),
                });
            }
        }
    }

    // Rule 3: slot-oriented responses stay terse.
    if has_target {
        if text.len() > config.max_slot_response_chars {
            return Err(Violation {
                rule: "no_chatty",
                detail: format!("{} chars exceeds cap", text.len()),
            });
        }
        if text.matches('\n').count() > 1 {
            return Err(Violation {
                rule: "no_chatty",
                detail: "multi-paragraph response".into(),
            });
        }
    }

    // Rule 4: nothing missing + target present must execute, never ask.
    if missing.is_empty() && has_target && !matches!(decision, Decision::Execute(_)) {
        return Err(Violation {
            rule: "execute_immediately",
            detail: "complete slots did not execute".into(),
        });
    }

    Ok(())
}
