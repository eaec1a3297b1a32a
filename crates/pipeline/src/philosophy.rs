//! Philosophy selection — the deterministic doctrine pick.
//!
//! Filter by race type and audience, drop gated-out documents, rank by
//! priority then embedding similarity to a query built from the slots,
//! break ties lexicographically by id. The winner and its scores are
//! logged.

use pl_corpus::{embedding, CorpusStore, PhilosophyDoc};
use pl_domain::error::{Error, Result};
use pl_domain::plan::PlanningContext;
use pl_domain::slots::{SlotName, SlotValue};
use pl_domain::trace::TraceEvent;

/// Audience band derived from starting volume and tags.
pub fn audience_for(ctx: &PlanningContext) -> &'static str {
    if ctx.athlete.tags.iter().any(|t| t == "beginner") {
        return "beginner";
    }
    if ctx.athlete.tags.iter().any(|t| t == "advanced") {
        return "advanced";
    }
    match ctx.slot(SlotName::WeeklyMileage).and_then(SlotValue::as_mileage) {
        Some(m) if m < 25.0 => "beginner",
        Some(m) if m >= 45.0 => "advanced",
        _ => "intermediate",
    }
}

/// Select the philosophy for this plan.
pub fn select_philosophy(store: &CorpusStore, ctx: &PlanningContext) -> Result<PhilosophyDoc> {
    let race_type = ctx
        .slot(SlotName::RaceDistance)
        .and_then(SlotValue::as_distance)
        .ok_or_else(|| Error::Validation("philosophy selection needs a race distance".into()))?
        .race_type();
    let audience = audience_for(ctx);

    let candidates: Vec<PhilosophyDoc> = store
        .philosophies(race_type, audience)
        .into_iter()
        .filter(|p| p.admits(&ctx.athlete.tags))
        .collect();

    if candidates.is_empty() {
        return Err(Error::PipelineInvariant {
            stage: "philosophy",
            guard: "philosophy_available",
            message: format!("no admissible philosophy for {race_type}/{audience}"),
        });
    }

    let query = embedding::embed(&query_text(ctx, race_type, audience));

    let mut ranked: Vec<(i64, f64, PhilosophyDoc)> = candidates
        .into_iter()
        .map(|p| {
            let similarity = embedding::cosine(&query, &p.embedding);
            (p.priority, similarity, p)
        })
        .collect();

    // Priority desc, similarity desc, id lexicographic asc.
    ranked.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then(b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
            .then(a.2.id.cmp(&b.2.id))
    });

    let candidates_count = ranked.len();
    let (priority, similarity, winner) = ranked.swap_remove(0);

    TraceEvent::PhilosophySelected {
        plan_id: ctx.plan_id.clone(),
        philosophy_id: winner.id.clone(),
        priority,
        similarity,
        candidates: candidates_count,
    }
    .emit();

    Ok(winner)
}

/// Query text built from the filled slots.
fn query_text(ctx: &PlanningContext, race_type: &str, audience: &str) -> String {
    let mut parts = vec![race_type.to_owned(), audience.to_owned()];
    if let Some(secs) = ctx.slot(SlotName::TargetTime).and_then(SlotValue::as_time_secs) {
        parts.push(format!("target {}", pl_domain::slots::format_hms(secs)));
    }
    if let Some(miles) = ctx.slot(SlotName::WeeklyMileage).and_then(SlotValue::as_mileage) {
        parts.push(format!("{miles} miles per week"));
    }
    parts.extend(ctx.athlete.tags.iter().cloned());
    parts.join(" ")
}
