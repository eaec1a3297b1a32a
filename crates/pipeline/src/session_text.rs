//! Session text and workout steps.
//!
//! Description text is deterministic. Workout steps may come from the
//! structured-completion capability, but only after schema validation;
//! any failure falls back to a deterministic three-step template. Paces
//! are always derived from the athlete's race-goal pace, never from
//! free text.

use chrono::NaiveDate;
use serde_json::{json, Value};

use pl_completion::{complete_validated, CompletionProvider, FieldType, Schema};
use pl_domain::athlete::AthleteProfile;
use pl_domain::session::{Intent, MaterializedSession, WorkoutStep};
use pl_domain::trace::TraceEvent;

use crate::template::SessionDraft;

const METERS_PER_MILE: f64 = 1609.34;
/// Sessions start at 09:00 UTC on their calendar day.
const SESSION_START_HOUR: u32 = 9;

/// Per-intent pace offset (seconds per mile) from the race-goal pace.
fn pace_offset(intent: Intent) -> i64 {
    match intent {
        Intent::Easy => 90,
        Intent::Long => 60,
        Intent::Quality => -10,
        Intent::Rest => 0,
    }
}

/// Target pace for a session, `MM:SS/mi`, derived from the athlete's
/// goal pace when one is on file.
pub fn derived_pace(athlete: &AthleteProfile, intent: Intent) -> Option<String> {
    let goal = i64::from(athlete.goal_pace_secs_per_mile?);
    let secs = (goal + pace_offset(intent)).max(240);
    Some(format!("{}:{:02}/mi", secs / 60, secs % 60))
}

/// Materialize one drafted session: deterministic description, steps
/// from the completion capability with fallback.
pub async fn materialize_session(
    provider: &dyn CompletionProvider,
    athlete: &AthleteProfile,
    plan_id: &str,
    draft: &SessionDraft,
) -> MaterializedSession {
    let description = description_for(athlete, draft);
    let steps = match generate_steps(provider, athlete, draft, &description).await {
        Ok(steps) => steps,
        Err(e) => {
            tracing::debug!(plan_id, error = %e, "step generation failed, using fallback");
            TraceEvent::CompletionCall {
                purpose: "session_text_fallback".into(),
                duration_ms: 0,
                fallback_used: true,
            }
            .emit();
            fallback_steps(athlete, draft)
        }
    };

    MaterializedSession {
        starts_at: session_start(draft.day.date),
        sport: "run".into(),
        session_type: draft.day.session_type.clone(),
        intent: draft.day.intent,
        duration_seconds: None,
        distance_meters: Some((draft.day.miles * METERS_PER_MILE * 10.0).round() / 10.0),
        description_text: description,
        workout_steps: steps,
    }
}

fn session_start(date: NaiveDate) -> chrono::DateTime<chrono::Utc> {
    // 09:00 is a valid wall-clock time on every calendar day.
    date.and_hms_opt(SESSION_START_HOUR, 0, 0)
        .expect("fixed session hour")
        .and_utc()
}

/// Deterministic one-line description from the template body and
/// resolved parameters.
fn description_for(athlete: &AthleteProfile, draft: &SessionDraft) -> String {
    let mut text = draft.template_body.trim().to_owned();
    for (name, value) in &draft.params {
        text = text.replace(&format!("{{{name}}}"), &trim_float(*value));
    }
    if let Some(pace) = derived_pace(athlete, draft.day.intent) {
        text.push_str(&format!(" Target around {pace}."));
    }
    if text.is_empty() {
        text = format!("{} of {} mi.", draft.day.session_type, trim_float(draft.day.miles));
    }
    text
}

async fn generate_steps(
    provider: &dyn CompletionProvider,
    athlete: &AthleteProfile,
    draft: &SessionDraft,
    description: &str,
) -> pl_domain::error::Result<Vec<WorkoutStep>> {
    let schema = Schema::object().required("steps", FieldType::Array);
    let request = pl_completion::StructuredRequest {
        purpose: "session_text",
        system_prompt: "Produce ordered workout steps for the described session.".into(),
        user_input: description.to_owned(),
        context: json!({
            "session_type": draft.day.session_type,
            "intent": draft.day.intent,
            "miles": draft.day.miles,
            "params": draft.params,
            "constraints": draft.constraints,
            "pace": derived_pace(athlete, draft.day.intent),
        }),
    };

    let value = complete_validated(provider, request, &schema).await?;
    parse_steps(&value)
}

/// Every step must carry `step_index`, `step_type`, `targets`,
/// `instructions`, `purpose`; anything less rejects the whole batch.
fn parse_steps(value: &Value) -> pl_domain::error::Result<Vec<WorkoutStep>> {
    let step_schema = Schema::object()
        .required("step_index", FieldType::Number)
        .required("step_type", FieldType::String)
        .required("targets", FieldType::Object)
        .required("instructions", FieldType::String)
        .required("purpose", FieldType::String);

    let raw_steps = value["steps"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    if raw_steps.is_empty() {
        return Err(pl_domain::error::Error::Validation(
            "completion returned no steps".into(),
        ));
    }

    let mut steps = Vec::with_capacity(raw_steps.len());
    for raw in &raw_steps {
        step_schema.validate(raw)?;
        steps.push(serde_json::from_value::<WorkoutStep>(raw.clone())?);
    }
    steps.sort_by_key(|s| s.step_index);
    Ok(steps)
}

/// Deterministic warm-up / main / cool-down fallback.
fn fallback_steps(athlete: &AthleteProfile, draft: &SessionDraft) -> Vec<WorkoutStep> {
    let pace = derived_pace(athlete, draft.day.intent);
    let main_targets = match pace {
        Some(ref p) => json!({ "distance_miles": draft.day.miles, "pace": p }),
        None => json!({ "distance_miles": draft.day.miles }),
    };

    match draft.day.intent {
        Intent::Easy | Intent::Long => vec![WorkoutStep {
            step_index: 0,
            step_type: "run".into(),
            targets: main_targets,
            instructions: description_for(athlete, draft),
            purpose: if draft.day.intent == Intent::Long {
                "long aerobic endurance".into()
            } else {
                "easy aerobic volume".into()
            },
        }],
        Intent::Quality => vec![
            WorkoutStep {
                step_index: 0,
                step_type: "warmup".into(),
                targets: json!({ "duration_minutes": 15 }),
                instructions: "15 min easy jogging, build to steady".into(),
                purpose: "prepare for hard running".into(),
            },
            WorkoutStep {
                step_index: 1,
                step_type: "main".into(),
                targets: main_targets,
                instructions: description_for(athlete, draft),
                purpose: "race-specific stimulus".into(),
            },
            WorkoutStep {
                step_index: 2,
                step_type: "cooldown".into(),
                targets: json!({ "duration_minutes": 10 }),
                instructions: "10 min easy jogging".into(),
                purpose: "flush and recover".into(),
            },
        ],
        Intent::Rest => Vec::new(),
    }
}

fn trim_float(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{v:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::DayAllocation;
    use pl_completion::ScriptedProvider;
    use std::collections::BTreeMap;

    fn draft(intent: Intent, miles: f64) -> SessionDraft {
        let mut params = BTreeMap::new();
        params.insert("easy_mi_range".into(), miles);
        SessionDraft {
            day: DayAllocation {
                weekday: 2,
                date: "2026-02-04".parse().unwrap(),
                session_type: "easy_run".into(),
                intent,
                miles,
            },
            template_id: "easy-b".into(),
            template_body: "Run {easy_mi_range} miles relaxed.".into(),
            params,
            constraints: BTreeMap::new(),
        }
    }

    fn athlete_with_goal() -> AthleteProfile {
        let mut athlete = AthleteProfile::anonymous("u1");
        athlete.goal_pace_secs_per_mile = Some(412); // 6:52/mi
        athlete
    }

    #[test]
    fn pace_is_derived_from_goal_pace_only() {
        let athlete = athlete_with_goal();
        assert_eq!(derived_pace(&athlete, Intent::Easy).unwrap(), "8:22/mi");
        assert_eq!(derived_pace(&athlete, Intent::Quality).unwrap(), "6:42/mi");
        assert!(derived_pace(&AthleteProfile::anonymous("u2"), Intent::Easy).is_none());
    }

    #[tokio::test]
    async fn valid_completion_steps_are_used_in_index_order() {
        let provider = ScriptedProvider::new();
        provider.push(json!({ "steps": [
            { "step_index": 1, "step_type": "main", "targets": {"distance_miles": 6.0},
              "instructions": "6 mi steady", "purpose": "aerobic" },
            { "step_index": 0, "step_type": "warmup", "targets": {"duration_minutes": 10},
              "instructions": "10 min easy", "purpose": "prepare" },
        ]}));

        let session =
            materialize_session(&provider, &athlete_with_goal(), "p1", &draft(Intent::Easy, 6.0))
                .await;
        assert_eq!(session.workout_steps.len(), 2);
        assert_eq!(session.workout_steps[0].step_type, "warmup");
        assert!(session.has_one_primary_metric());
    }

    #[tokio::test]
    async fn invalid_steps_fall_back_deterministically() {
        let provider = ScriptedProvider::new();
        // Missing required fields → rejected → fallback.
        provider.push(json!({ "steps": [{ "step_index": 0 }] }));

        let session =
            materialize_session(&provider, &athlete_with_goal(), "p1", &draft(Intent::Quality, 7.0))
                .await;
        assert_eq!(session.workout_steps.len(), 3);
        assert_eq!(session.workout_steps[0].step_type, "warmup");
        assert_eq!(session.workout_steps[2].step_type, "cooldown");
    }

    #[tokio::test]
    async fn description_substitutes_params_and_pace() {
        let provider = ScriptedProvider::new(); // empty → fallback path
        let session =
            materialize_session(&provider, &athlete_with_goal(), "p1", &draft(Intent::Easy, 6.0))
                .await;
        assert!(session.description_text.contains("Run 6 miles relaxed."));
        assert!(session.description_text.contains("8:22/mi"));
    }

    #[tokio::test]
    async fn distance_is_the_single_primary_metric() {
        let provider = ScriptedProvider::new();
        let session =
            materialize_session(&provider, &athlete_with_goal(), "p1", &draft(Intent::Long, 16.0))
                .await;
        assert!(session.duration_seconds.is_none());
        let meters = session.distance_meters.unwrap();
        assert!((meters - 16.0 * METERS_PER_MILE).abs() < 1.0);
    }
}
