//! Calendar persistence through the tool boundary.
//!
//! One `save_planned_sessions` call per plan: the data server applies
//! the whole batch in a single transaction keyed on `(user_id, plan_id,
//! starts_at, session_type)`, so repeating the call is a no-op and
//! concurrent inserts collapse. Write failures propagate — a partial
//! plan is never reported as success.

use serde::{Deserialize, Serialize};
use serde_json::json;

use pl_domain::error::Result;
use pl_domain::plan::PlanningContext;
use pl_domain::session::MaterializedSession;
use pl_domain::trace::TraceEvent;
use pl_toolclient::{routing, ToolClient};

/// Outcome of persisting one plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistReport {
    pub inserted: usize,
    pub updated: usize,
    pub conflicts: usize,
}

/// Persist the plan's sessions.
pub async fn persist_sessions(
    tools: &ToolClient,
    ctx: &PlanningContext,
    plan_type: &str,
    sessions: &[MaterializedSession],
) -> Result<PersistReport> {
    let result = tools
        .call(
            routing::data::SAVE_PLANNED_SESSIONS,
            json!({
                "user_id": ctx.athlete.user_id,
                "plan_id": ctx.plan_id,
                "plan_type": plan_type,
                "sessions": sessions,
            }),
        )
        .await?;

    let report: PersistReport = serde_json::from_value(result)
        .map_err(|e| pl_domain::error::Error::Boundary(format!("malformed persist report: {e}")))?;

    TraceEvent::PlanPersisted {
        plan_id: ctx.plan_id.clone(),
        inserted: report.inserted,
        updated: report.updated,
        conflicts: report.conflicts,
    }
    .emit();

    Ok(report)
}
