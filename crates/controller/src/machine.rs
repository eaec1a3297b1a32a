//! MERGE + DECIDE — the pure core of the slot state machine.

use pl_domain::conversation::{Progress, TargetAction};
use pl_domain::extraction::ExtractionResult;
use pl_domain::slots::SlotName;

/// What the controller will do this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Ask exactly one question for this slot.
    AskOne(SlotName),
    /// All requireds filled and a target exists: execute now.
    Execute(TargetAction),
    /// No target action: informational reply.
    Chat,
}

/// The merged turn state handed to response rendering.
#[derive(Debug, Clone)]
pub struct TurnDecision {
    pub progress: Progress,
    pub decision: Decision,
    pub missing: Vec<SlotName>,
}

/// Apply MERGE then DECIDE.
///
/// `filled' = filled ∪ values`; ambiguous fields are dropped from
/// `filled'` and counted missing; `awaiting' = missing'`. If any slot is
/// missing, ask for the first one; else execute the target; with no
/// target, chat.
pub fn merge_and_decide(
    mut progress: Progress,
    target: Option<TargetAction>,
    required: &[SlotName],
    optional: &[SlotName],
    extraction: &ExtractionResult,
) -> TurnDecision {
    progress.target_action = target;
    if !required.is_empty() || progress.required_attributes.is_empty() {
        progress.required_attributes = required.to_vec();
        progress.optional_attributes = optional.to_vec();
    }

    // MERGE: extracted values fill slots; ambiguity evicts.
    for (slot, value) in &extraction.values {
        progress.filled_slots.insert(*slot, value.clone());
    }
    for slot in &extraction.ambiguous_fields {
        progress.filled_slots.remove(slot);
    }

    let missing: Vec<SlotName> = progress
        .required_attributes
        .iter()
        .copied()
        .filter(|s| !progress.filled_slots.contains_key(s))
        .collect();

    progress.awaiting_slots = missing.clone();

    let decision = match (missing.first(), progress.target_action) {
        (Some(slot), Some(_)) => Decision::AskOne(*slot),
        (None, Some(target)) => Decision::Execute(target),
        (_, None) => Decision::Chat,
    };

    TurnDecision {
        progress,
        decision,
        missing,
    }
}
