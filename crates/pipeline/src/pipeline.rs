//! The pipeline runner — stages in order, guards between them, one
//! deadline around the whole invocation.

use std::sync::Arc;
use std::time::Duration;

use pl_completion::CompletionProvider;
use pl_corpus::CorpusStore;
use pl_domain::error::{Error, Result};
use pl_domain::plan::{MacroWeek, PlanningContext};
use pl_domain::session::MaterializedSession;
use pl_domain::slots::{SlotName, SlotValue};
use pl_domain::trace::TraceEvent;
use pl_toolclient::ToolClient;

use crate::guards;
use crate::macro_plan::build_macro_plan;
use crate::persist::{persist_sessions, PersistReport};
use crate::philosophy::{audience_for, select_philosophy};
use crate::session_text::materialize_session;
use crate::structure::load_structures;
use crate::template::draft_sessions;
use crate::volume::allocate_week;

/// How much of the plan to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanScope {
    /// The full span to race day.
    Full,
    /// Only the next training week (weekly_plan refresh).
    NextWeek,
}

/// The result handed back to the controller.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan_id: String,
    pub philosophy_id: String,
    pub weeks: Vec<MacroWeek>,
    pub sessions: Vec<MaterializedSession>,
    pub persist: PersistReport,
}

/// Deterministic planning pipeline over the retrieval corpus.
pub struct PlanningPipeline {
    corpus: Arc<CorpusStore>,
    provider: Arc<dyn CompletionProvider>,
    tools: Arc<ToolClient>,
    deadline: Duration,
}

impl PlanningPipeline {
    pub fn new(
        corpus: Arc<CorpusStore>,
        provider: Arc<dyn CompletionProvider>,
        tools: Arc<ToolClient>,
        deadline: Duration,
    ) -> Self {
        Self {
            corpus,
            provider,
            tools,
            deadline,
        }
    }

    /// Run a race-build plan end to end under the pipeline deadline.
    /// On deadline, nothing has been persisted (persistence is the last
    /// stage and is transactional server-side).
    pub async fn run(&self, ctx: &PlanningContext, scope: PlanScope) -> Result<PlanOutcome> {
        match tokio::time::timeout(self.deadline, self.run_inner(ctx, scope)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "planning pipeline exceeded {}s deadline",
                self.deadline.as_secs()
            ))),
        }
    }

    async fn run_inner(&self, ctx: &PlanningContext, scope: PlanScope) -> Result<PlanOutcome> {
        let race_type = ctx
            .slot(SlotName::RaceDistance)
            .and_then(SlotValue::as_distance)
            .ok_or_else(|| Error::Validation("pipeline needs a race distance".into()))?
            .race_type();
        let audience = audience_for(ctx);

        // ── macro plan ───────────────────────────────────────────────
        let mut weeks = self.stage(ctx, "macro_plan", || build_macro_plan(ctx))?;
        guards::guard_macro_plan(&weeks)?;
        if scope == PlanScope::NextWeek {
            weeks.truncate(1);
        }

        // ── philosophy ───────────────────────────────────────────────
        let philosophy = self.stage(ctx, "philosophy", || select_philosophy(&self.corpus, ctx))?;

        // ── week structures ──────────────────────────────────────────
        let structures = self.stage(ctx, "structure", || {
            load_structures(&self.corpus, &philosophy.id, race_type, audience, &weeks)
        })?;

        // ── volume allocation ────────────────────────────────────────
        let scale = ctx.fatigue_factor.map_or(1.0, |f| f.clamp(0.7, 1.0));
        let mut allocations = Vec::with_capacity(weeks.len());
        for (week, structure) in weeks.iter().zip(&structures) {
            let days = allocate_week(week, structure, ctx.fatigue_factor)?;
            guards::guard_week_allocation(
                week,
                structure,
                crate::volume::round_tenth(week.target_weekly_miles * scale),
                &days,
            )?;
            allocations.push(days);
        }
        TraceEvent::StageCompleted {
            plan_id: ctx.plan_id.clone(),
            stage: "volume".into(),
            duration_ms: 0,
        }
        .emit();

        // ── templates ────────────────────────────────────────────────
        let mut drafts = Vec::new();
        for (week, days) in weeks.iter().zip(&allocations) {
            drafts.extend(draft_sessions(
                &self.corpus,
                &philosophy.id,
                race_type,
                audience,
                week.phase.as_str(),
                days,
            )?);
        }
        TraceEvent::StageCompleted {
            plan_id: ctx.plan_id.clone(),
            stage: "template".into(),
            duration_ms: 0,
        }
        .emit();

        // ── session text ─────────────────────────────────────────────
        let mut sessions = Vec::with_capacity(drafts.len());
        for draft in &drafts {
            sessions
                .push(materialize_session(self.provider.as_ref(), &ctx.athlete, &ctx.plan_id, draft).await);
        }
        guards::guard_primary_metric(&sessions)?;
        guards::guard_unique_starts(&sessions)?;
        TraceEvent::StageCompleted {
            plan_id: ctx.plan_id.clone(),
            stage: "session_text".into(),
            duration_ms: 0,
        }
        .emit();

        // ── persistence ──────────────────────────────────────────────
        let plan_type = match scope {
            PlanScope::Full => "race_build",
            PlanScope::NextWeek => "weekly",
        };
        let persist = persist_sessions(&self.tools, ctx, plan_type, &sessions).await?;
        TraceEvent::StageCompleted {
            plan_id: ctx.plan_id.clone(),
            stage: "persist".into(),
            duration_ms: 0,
        }
        .emit();

        Ok(PlanOutcome {
            plan_id: ctx.plan_id.clone(),
            philosophy_id: philosophy.id.clone(),
            weeks,
            sessions,
            persist,
        })
    }

    /// Run one synchronous stage with tracing; violations abort.
    fn stage<T>(
        &self,
        ctx: &PlanningContext,
        name: &'static str,
        run: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let start = std::time::Instant::now();
        match run() {
            Ok(out) => {
                TraceEvent::StageCompleted {
                    plan_id: ctx.plan_id.clone(),
                    stage: name.into(),
                    duration_ms: start.elapsed().as_millis() as u64,
                }
                .emit();
                Ok(out)
            }
            Err(e) => {
                if let Error::PipelineInvariant { stage, guard, .. } = &e {
                    TraceEvent::PipelineAborted {
                        plan_id: ctx.plan_id.clone(),
                        stage: (*stage).into(),
                        guard: (*guard).into(),
                    }
                    .emit();
                }
                Err(e)
            }
        }
    }
}
