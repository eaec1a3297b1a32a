//! CLASSIFY_TARGET — pick the single planning tool for the current
//! intent and declare its slot requirements. No value extraction
//! happens here.

use std::sync::Arc;

use serde_json::{json, Value};

use pl_completion::{complete_validated, CompletionProvider, FieldType, Schema, StructuredRequest};
use pl_domain::conversation::TargetAction;
use pl_domain::slots::SlotName;

/// The classification outcome: a target (or none) plus declared slots,
/// and any inline arguments for modification targets.
#[derive(Debug, Clone, Default)]
pub struct TargetClassification {
    pub target: Option<TargetAction>,
    pub required: Vec<SlotName>,
    pub optional: Vec<SlotName>,
    /// Free-form arguments for modify targets (`date`, `scale`).
    pub arguments: Value,
}

/// Declared slot requirements per target action.
pub fn requirements_for(target: TargetAction) -> (Vec<SlotName>, Vec<SlotName>) {
    match target {
        TargetAction::PlanRaceBuild => (
            vec![SlotName::RaceDistance, SlotName::RaceDate],
            vec![SlotName::TargetTime, SlotName::WeeklyMileage],
        ),
        TargetAction::PlanSeason => (
            vec![SlotName::WeeklyMileage],
            vec![SlotName::RaceDistance],
        ),
        // Weekly plans inherit the race build's slots when gating
        // rewrites them; standalone they need nothing new.
        TargetAction::WeeklyPlan => (vec![], vec![]),
        TargetAction::AddWorkout => (vec![], vec![]),
        TargetAction::ModifyDay => (vec![], vec![]),
        TargetAction::ModifyWeek => (vec![], vec![]),
    }
}

/// Target classifier backed by the completion capability.
pub struct TargetClassifier {
    provider: Arc<dyn CompletionProvider>,
    prompt: String,
}

impl TargetClassifier {
    pub fn new(provider: Arc<dyn CompletionProvider>, prompt: String) -> Self {
        Self { provider, prompt }
    }

    /// Classify one message given the conversation summary and the
    /// previously stored target.
    pub async fn classify(
        &self,
        message: &str,
        summary: Option<&str>,
        stored_target: Option<TargetAction>,
    ) -> TargetClassification {
        let schema = Schema::object()
            .required("target_action", FieldType::String)
            .optional("arguments", FieldType::Object);

        let request = StructuredRequest {
            purpose: "classify_target",
            system_prompt: self.prompt.clone(),
            user_input: message.to_owned(),
            context: json!({
                "summary": summary,
                "stored_target": stored_target.map(|t| t.as_str()),
            }),
        };

        let raw = match complete_validated(self.provider.as_ref(), request, &schema).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "target classification failed");
                // A mid-flow turn keeps its stored target; otherwise chat.
                return from_target(stored_target, Value::Null);
            }
        };

        let classified = parse_target(raw["target_action"].as_str().unwrap_or("none"));
        let arguments = raw.get("arguments").cloned().unwrap_or(Value::Null);

        // A "none" classification mid slot-filling continues the stored
        // target instead of dropping the flow.
        match classified {
            Some(target) => from_target(Some(target), arguments),
            None => from_target(stored_target, arguments),
        }
    }
}

fn parse_target(raw: &str) -> Option<TargetAction> {
    match raw {
        "plan_race_build" => Some(TargetAction::PlanRaceBuild),
        "plan_season" => Some(TargetAction::PlanSeason),
        "add_workout" => Some(TargetAction::AddWorkout),
        "weekly_plan" => Some(TargetAction::WeeklyPlan),
        "modify_day" => Some(TargetAction::ModifyDay),
        "modify_week" => Some(TargetAction::ModifyWeek),
        _ => None,
    }
}

fn from_target(target: Option<TargetAction>, arguments: Value) -> TargetClassification {
    match target {
        Some(t) => {
            let (required, optional) = requirements_for(t);
            TargetClassification {
                target: Some(t),
                required,
                optional,
                arguments,
            }
        }
        None => TargetClassification {
            arguments,
            ..TargetClassification::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_completion::ScriptedProvider;

    fn classifier(responses: Vec<Value>) -> TargetClassifier {
        let provider = ScriptedProvider::new();
        for r in responses {
            provider.push(r);
        }
        TargetClassifier::new(Arc::new(provider), "classify".into())
    }

    #[tokio::test]
    async fn race_build_declares_required_slots() {
        let c = classifier(vec![json!({"target_action": "plan_race_build"})]);
        let out = c.classify("I'm training for a marathon", None, None).await;
        assert_eq!(out.target, Some(TargetAction::PlanRaceBuild));
        assert_eq!(out.required, vec![SlotName::RaceDistance, SlotName::RaceDate]);
        assert_eq!(out.optional, vec![SlotName::TargetTime, SlotName::WeeklyMileage]);
    }

    #[tokio::test]
    async fn none_mid_flow_keeps_stored_target() {
        let c = classifier(vec![json!({"target_action": "none"})]);
        let out = c
            .classify("April 25th", None, Some(TargetAction::PlanRaceBuild))
            .await;
        assert_eq!(out.target, Some(TargetAction::PlanRaceBuild));
        assert!(!out.required.is_empty());
    }

    #[tokio::test]
    async fn unknown_label_is_chat() {
        let c = classifier(vec![json!({"target_action": "order_pizza"})]);
        let out = c.classify("hello", None, None).await;
        assert_eq!(out.target, None);
        assert!(out.required.is_empty());
    }

    #[tokio::test]
    async fn classification_failure_keeps_stored_target() {
        let c = classifier(vec![]); // provider errors
        let out = c
            .classify("anything", None, Some(TargetAction::WeeklyPlan))
            .await;
        assert_eq!(out.target, Some(TargetAction::WeeklyPlan));
    }
}
