//! Week-structure loading.
//!
//! For each macro week, pick the structure matching `(philosophy,
//! race_type, audience, phase)` whose days-to-race range contains the
//! week. Structures that declare a taper bound are preferred once the
//! week is inside it.

use pl_corpus::{CorpusStore, WeekStructure};
use pl_domain::error::{Error, Result};
use pl_domain::plan::MacroWeek;

/// Load one structure per macro week.
pub fn load_structures(
    store: &CorpusStore,
    philosophy_id: &str,
    race_type: &str,
    audience: &str,
    weeks: &[MacroWeek],
) -> Result<Vec<WeekStructure>> {
    weeks
        .iter()
        .map(|week| {
            pick_structure(store, philosophy_id, race_type, audience, week).ok_or_else(|| {
                Error::PipelineInvariant {
                    stage: "structure",
                    guard: "structure_available",
                    message: format!(
                        "no structure for {philosophy_id}/{race_type}/{audience}/{} at {} days to race",
                        week.phase.as_str(),
                        week.days_to_race
                    ),
                }
            })
        })
        .collect()
}

fn pick_structure(
    store: &CorpusStore,
    philosophy_id: &str,
    race_type: &str,
    audience: &str,
    week: &MacroWeek,
) -> Option<WeekStructure> {
    let mut candidates: Vec<WeekStructure> = store
        .structures(philosophy_id, race_type, audience, week.phase.as_str())
        .into_iter()
        .filter(|s| s.covers(week.days_to_race))
        .collect();

    // Taper-declaring structures win inside their bound; then priority,
    // then id for determinism.
    candidates.sort_by(|a, b| {
        b.prefers_taper(week.days_to_race)
            .cmp(&a.prefers_taper(week.days_to_race))
            .then(b.priority.cmp(&a.priority))
            .then(a.id.cmp(&b.id))
    });

    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_corpus::document::parse_document;
    use pl_domain::plan::Phase;

    fn structure_doc(id: &str, phase: &str, range: [i64; 2], taper_le: Option<i64>, priority: i64) -> String {
        let taper = taper_le
            .map(|v| format!("  taper_days_to_race_le: {v}\n"))
            .unwrap_or_default();
        format!(
            r#"---
id: {id}
domain: structure
race_types: [marathon]
audience: [intermediate]
phase: {phase}
priority: {priority}
structure_spec:
  philosophy_id: p1
  days_to_race_range: [{}, {}]
{taper}  week_pattern:
    mon: rest
    tue: intervals
    wed: easy_run
    thu: tempo
    fri: easy_run
    sat: long_run
    sun: easy_run
  rules:
    hard_days_max: 2
    no_consecutive_hard_days: true
    long_run:
      required_count: 1
  session_groups:
    hard: [intervals, tempo]
    easy: [easy_run]
    long: [long_run]
---
week
"#,
            range[0], range[1]
        )
    }

    fn week(phase: Phase, days_to_race: i64) -> MacroWeek {
        MacroWeek {
            index: 0,
            phase,
            focus: String::new(),
            target_weekly_miles: 40.0,
            start_date: "2026-02-02".parse().unwrap(),
            days_to_race,
            recovery: false,
        }
    }

    fn store_with(docs: &[String]) -> CorpusStore {
        let store = CorpusStore::empty();
        let parsed: Vec<_> = docs.iter().map(|d| parse_document(d).unwrap()).collect();
        store.insert_documents(&parsed).unwrap();
        store
    }

    #[test]
    fn picks_covering_structure_for_phase() {
        let store = store_with(&[
            structure_doc("build-early", "build", [43, 120], None, 5),
            structure_doc("build-late", "build", [22, 42], None, 5),
        ]);
        let picked = pick_structure(&store, "p1", "marathon", "intermediate", &week(Phase::Build, 30));
        assert_eq!(picked.unwrap().id, "build-late");
    }

    #[test]
    fn taper_structure_preferred_inside_bound() {
        let store = store_with(&[
            structure_doc("generic", "taper", [0, 30], None, 9),
            structure_doc("sharpen", "taper", [0, 30], Some(21), 5),
        ]);
        let picked = pick_structure(&store, "p1", "marathon", "intermediate", &week(Phase::Taper, 14));
        assert_eq!(picked.unwrap().id, "sharpen");

        let picked = pick_structure(&store, "p1", "marathon", "intermediate", &week(Phase::Taper, 28));
        assert_eq!(picked.unwrap().id, "generic");
    }

    #[test]
    fn missing_structure_is_a_stage_failure() {
        let store = CorpusStore::empty();
        let err = load_structures(&store, "p1", "marathon", "intermediate", &[week(Phase::Base, 80)])
            .unwrap_err();
        assert!(matches!(err, Error::PipelineInvariant { stage: "structure", .. }));
    }
}
