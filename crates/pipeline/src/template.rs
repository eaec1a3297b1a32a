//! Template selection and parameter resolution.
//!
//! For each allocated day, pick the highest-priority matching template
//! (id breaks ties) and resolve its bounded parameters against the
//! allocated distance: start from the midpoint, then move toward the
//! closest range bound until the allocation is matched.

use std::collections::BTreeMap;

use pl_corpus::{CorpusStore, SessionTemplate};
use pl_domain::error::{Error, Result};
use pl_domain::session::Intent;

use crate::volume::DayAllocation;

/// A day with its resolved template, ready for text generation.
#[derive(Debug, Clone)]
pub struct SessionDraft {
    pub day: DayAllocation,
    pub template_id: String,
    pub template_body: String,
    /// Resolved scalar parameters (one value per bounded range).
    pub params: BTreeMap<String, f64>,
    /// Scalar constraints carried through from the template.
    pub constraints: BTreeMap<String, f64>,
}

/// Select and instantiate templates for every running day of a week.
/// Rest days produce no draft.
pub fn draft_sessions(
    store: &CorpusStore,
    philosophy_id: &str,
    race_type: &str,
    audience: &str,
    phase: &str,
    days: &[DayAllocation],
) -> Result<Vec<SessionDraft>> {
    days.iter()
        .filter(|day| day.intent != Intent::Rest)
        .map(|day| {
            let template = pick_template(store, philosophy_id, race_type, audience, phase, &day.session_type)
                .ok_or_else(|| Error::PipelineInvariant {
                    stage: "template",
                    guard: "template_available",
                    message: format!(
                        "no template for {philosophy_id}/{race_type}/{audience}/{phase}/{}",
                        day.session_type
                    ),
                })?;

            let params = resolve_params(&template, day.miles);
            Ok(SessionDraft {
                day: day.clone(),
                template_id: template.id,
                template_body: template.body,
                params,
                constraints: template.constraints,
            })
        })
        .collect()
}

/// Deterministic selection: priority desc, id lexicographic asc.
fn pick_template(
    store: &CorpusStore,
    philosophy_id: &str,
    race_type: &str,
    audience: &str,
    phase: &str,
    session_type: &str,
) -> Option<SessionTemplate> {
    let mut candidates = store.templates(philosophy_id, race_type, audience, phase, session_type);
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
    candidates.into_iter().next()
}

/// Resolve each bounded parameter.
///
/// Mileage-like ranges (`*_mi_range`) target the allocated distance:
/// the value is the allocation when it falls inside the range, else the
/// nearest bound. Other ranges resolve to their midpoint.
fn resolve_params(template: &SessionTemplate, allocated_miles: f64) -> BTreeMap<String, f64> {
    template
        .params
        .iter()
        .map(|(name, [lo, hi])| {
            let value = if name.ends_with("_mi_range") {
                allocated_miles.clamp(*lo, *hi)
            } else {
                (lo + hi) / 2.0
            };
            (name.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_corpus::document::parse_document;
    use pl_domain::session::Intent;

    fn store() -> CorpusStore {
        let raw = r#"---
id: tpl-doc
domain: template
race_types: [marathon]
audience: [intermediate]
phase: build
template_sets:
  - id: easy-a
    philosophy_id: p1
    session_type: easy_run
    priority: 5
    params:
      easy_mi_range: [3, 10]
  - id: easy-b
    philosophy_id: p1
    session_type: easy_run
    priority: 9
    params:
      easy_mi_range: [4, 8]
  - id: intervals-a
    philosophy_id: p1
    session_type: intervals
    priority: 5
    params:
      work_mi_range: [4, 7]
      repeats: [5, 9]
    constraints:
      hard_minutes_max: 45
---
Run {easy_mi_range} miles.
"#;
        let s = CorpusStore::empty();
        s.insert_documents(&[parse_document(raw).unwrap()]).unwrap();
        s
    }

    fn day(session_type: &str, intent: Intent, miles: f64) -> DayAllocation {
        DayAllocation {
            weekday: 2,
            date: "2026-02-04".parse().unwrap(),
            session_type: session_type.into(),
            intent,
            miles,
        }
    }

    #[test]
    fn highest_priority_template_wins() {
        let drafts = draft_sessions(
            &store(),
            "p1",
            "marathon",
            "intermediate",
            "build",
            &[day("easy_run", Intent::Easy, 5.5)],
        )
        .unwrap();
        assert_eq!(drafts[0].template_id, "easy-b");
    }

    #[test]
    fn mileage_param_matches_allocation_inside_range() {
        let drafts = draft_sessions(
            &store(),
            "p1",
            "marathon",
            "intermediate",
            "build",
            &[day("easy_run", Intent::Easy, 5.5)],
        )
        .unwrap();
        assert_eq!(drafts[0].params["easy_mi_range"], 5.5);
    }

    #[test]
    fn mileage_param_clamps_to_nearest_bound() {
        let drafts = draft_sessions(
            &store(),
            "p1",
            "marathon",
            "intermediate",
            "build",
            &[day("easy_run", Intent::Easy, 12.0)],
        )
        .unwrap();
        // easy-b range is [4, 8]; 12 clamps down to 8.
        assert_eq!(drafts[0].params["easy_mi_range"], 8.0);
    }

    #[test]
    fn non_mileage_params_take_the_midpoint() {
        let drafts = draft_sessions(
            &store(),
            "p1",
            "marathon",
            "intermediate",
            "build",
            &[day("intervals", Intent::Quality, 6.0)],
        )
        .unwrap();
        assert_eq!(drafts[0].params["repeats"], 7.0);
        assert_eq!(drafts[0].constraints["hard_minutes_max"], 45.0);
    }

    #[test]
    fn rest_days_produce_no_draft() {
        let drafts = draft_sessions(
            &store(),
            "p1",
            "marathon",
            "intermediate",
            "build",
            &[day("rest", Intent::Rest, 0.0)],
        )
        .unwrap();
        assert!(drafts.is_empty());
    }

    #[test]
    fn missing_template_is_a_stage_failure() {
        let err = draft_sessions(
            &store(),
            "p1",
            "marathon",
            "intermediate",
            "build",
            &[day("hill_sprints", Intent::Quality, 4.0)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::PipelineInvariant { stage: "template", .. }));
    }
}
