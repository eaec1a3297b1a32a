//! End-to-end pipeline test: corpus fixture in, sessions persisted to a
//! real (in-process) data tool server, weekly invariants checked on the
//! way through.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use pl_completion::ScriptedProvider;
use pl_corpus::document::parse_document;
use pl_corpus::CorpusStore;
use pl_domain::athlete::AthleteProfile;
use pl_domain::config::ToolsConfig;
use pl_domain::plan::PlanningContext;
use pl_domain::session::Intent;
use pl_domain::slots::{RaceDistance, SlotName, SlotValue};
use pl_pipeline::pipeline::PlanScope;
use pl_pipeline::PlanningPipeline;
use pl_toolclient::ToolClient;
use pl_toolsrv::db::Database;
use pl_toolsrv::server::data_router;

// ── corpus fixture ───────────────────────────────────────────────────

fn philosophy() -> String {
    r#"---
id: polarized-marathon
domain: philosophy
race_types: [marathon]
priority: 10
intensity_distribution:
  easy: [0.75, 0.85]
  hard: [0.15, 0.25]
hard_days_max: 2
---
Polarized marathon training: easy volume, two focused hard sessions.
"#
    .into()
}

fn structure_for(phase: &str, taper: bool) -> String {
    let taper_line = if taper {
        "  taper_days_to_race_le: 21\n"
    } else {
        ""
    };
    format!(
        r#"---
id: polarized-{phase}-week
domain: structure
race_types: [marathon]
phase: {phase}
priority: 5
structure_spec:
  philosophy_id: polarized-marathon
  days_to_race_range: [0, 400]
{taper_line}  week_pattern:
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
{phase} week
"#
    )
}

fn templates_for(phase: &str) -> String {
    format!(
        r#"---
id: marathon-{phase}-templates
domain: template
race_types: [marathon]
phase: {phase}
template_sets:
  - id: {phase}-easy
    philosophy_id: polarized-marathon
    session_type: easy_run
    priority: 5
    params:
      easy_mi_range: [2, 12]
  - id: {phase}-long
    philosophy_id: polarized-marathon
    session_type: long_run
    priority: 5
    params:
      long_mi_range: [8, 22]
  - id: {phase}-intervals
    philosophy_id: polarized-marathon
    session_type: intervals
    priority: 5
    params:
      work_mi_range: [3, 9]
    constraints:
      hard_minutes_max: 45
  - id: {phase}-tempo
    philosophy_id: polarized-marathon
    session_type: tempo
    priority: 5
    params:
      tempo_mi_range: [3, 10]
---
Run {{easy_mi_range}} relaxed miles.
"#
    )
}

fn corpus() -> Arc<CorpusStore> {
    let store = CorpusStore::empty();
    let mut docs = vec![philosophy()];
    for phase in ["base", "build", "peak", "taper"] {
        docs.push(structure_for(phase, phase == "taper"));
        docs.push(templates_for(phase));
    }
    let parsed: Vec<_> = docs.iter().map(|d| parse_document(d).unwrap()).collect();
    store.insert_documents(&parsed).unwrap();
    Arc::new(store)
}

// ── wiring ───────────────────────────────────────────────────────────

async fn start_data_server() -> (String, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let app = data_router(db.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), db)
}

fn context() -> PlanningContext {
    let mut slots = BTreeMap::new();
    slots.insert(
        SlotName::RaceDistance,
        SlotValue::Distance(RaceDistance::Marathon),
    );
    slots.insert(
        SlotName::RaceDate,
        SlotValue::Date("2026-04-25".parse().unwrap()),
    );
    slots.insert(SlotName::TargetTime, SlotValue::Time(3 * 3600));
    slots.insert(SlotName::WeeklyMileage, SlotValue::Mileage(55.0));

    let mut athlete = AthleteProfile::anonymous("u1");
    athlete.goal_pace_secs_per_mile = Some(412);

    PlanningContext {
        plan_id: "plan-int-1".into(),
        athlete,
        slots,
        recent_activity: vec![],
        today: "2026-01-10".parse().unwrap(),
        fatigue_factor: None,
    }
}

async fn pipeline(base_url: &str) -> PlanningPipeline {
    let tools = ToolClient::new(&ToolsConfig {
        data_tool_endpoint: base_url.into(),
        prompt_tool_endpoint: base_url.into(),
        tool_call_timeout_seconds: 5,
    })
    .unwrap();
    PlanningPipeline::new(
        corpus(),
        Arc::new(ScriptedProvider::new()), // no queued steps, session text falls back
        Arc::new(tools),
        Duration::from_secs(120),
    )
}

// ── tests ────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_plan_meets_weekly_invariants() {
    let (url, _db) = start_data_server().await;
    let outcome = pipeline(&url)
        .await
        .run(&context(), PlanScope::Full)
        .await
        .unwrap();

    assert_eq!(outcome.philosophy_id, "polarized-marathon");
    assert!(outcome.weeks.len() >= 12);
    assert!(outcome.persist.inserted > 0);
    assert_eq!(outcome.persist.conflicts, 0);

    // P5: per-week sums within 1%, exactly one long run per week.
    for week in &outcome.weeks {
        let week_sessions: Vec<_> = outcome
            .sessions
            .iter()
            .filter(|s| {
                let d = s.starts_at.date_naive();
                d >= week.start_date && d < week.start_date + chrono::Duration::days(7)
            })
            .collect();

        let miles: f64 = week_sessions
            .iter()
            .filter_map(|s| s.distance_meters)
            .sum::<f64>()
            / 1609.34;
        assert!(
            (miles - week.target_weekly_miles).abs() <= week.target_weekly_miles * 0.01 + 0.1,
            "week {} sums to {miles:.1} against {:.1}",
            week.index,
            week.target_weekly_miles
        );

        let longs = week_sessions
            .iter()
            .filter(|s| s.intent == Intent::Long)
            .count();
        assert_eq!(longs, 1, "week {} long-run count", week.index);

        // P6: no two consecutive hard days.
        let mut hard_days: Vec<i64> = week_sessions
            .iter()
            .filter(|s| s.intent == Intent::Quality)
            .map(|s| (s.starts_at.date_naive() - week.start_date).num_days())
            .collect();
        hard_days.sort_unstable();
        for pair in hard_days.windows(2) {
            assert!(pair[1] - pair[0] > 1, "week {} adjacent hard days", week.index);
        }
    }
}

#[tokio::test]
async fn rerunning_the_pipeline_is_idempotent() {
    let (url, db) = start_data_server().await;
    let p = pipeline(&url).await;

    let first = p.run(&context(), PlanScope::Full).await.unwrap();
    let second = p.run(&context(), PlanScope::Full).await.unwrap();

    assert_eq!(second.persist.inserted, 0);
    assert_eq!(second.persist.updated, first.persist.inserted);

    let conn = db.conn.lock();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM planned_sessions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows as usize, first.persist.inserted);
}

#[tokio::test]
async fn next_week_scope_materializes_one_week() {
    let (url, _db) = start_data_server().await;
    let outcome = pipeline(&url)
        .await
        .run(&context(), PlanScope::NextWeek)
        .await
        .unwrap();
    assert_eq!(outcome.weeks.len(), 1);
    assert!(outcome.sessions.len() <= 7);
}

#[tokio::test]
async fn unreachable_data_server_fails_the_plan_without_sessions() {
    // Nothing listens here; persistence must propagate a boundary error.
    let p = pipeline("http://127.0.0.1:9").await;
    let err = p.run(&context(), PlanScope::Full).await.unwrap_err();
    assert!(matches!(err, pl_domain::error::Error::Boundary(_)));
}
