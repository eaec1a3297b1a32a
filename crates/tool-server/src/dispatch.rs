//! Tool dispatch — the closed mapping from tool name to typed handler.
//!
//! Arguments are deserialized into per-tool request structs before any
//! handler runs; a shape mismatch is `INVALID_INPUT` at the boundary.

use serde::de::DeserializeOwned;
use serde_json::Value;

use pl_domain::tool::{ToolCallRequest, ToolError, ToolErrorCode};

use crate::activities;
use crate::calendar;
use crate::conversation;
use crate::db::Database;
use crate::plans;
use crate::prompts::PromptStore;

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError {
        code: ToolErrorCode::InvalidInput,
        message: format!("invalid arguments for {tool}: {e}"),
    })
}

fn unknown_tool(tool: &str) -> ToolError {
    ToolError {
        code: ToolErrorCode::InvalidInput,
        message: format!("unknown tool {tool}"),
    }
}

/// Dispatch a data-server tool call.
pub fn dispatch_data(db: &Database, req: ToolCallRequest) -> Result<Value, ToolError> {
    let tool = req.tool.as_str();
    let args = req.arguments;
    match tool {
        "load_context" => conversation::load_context(db, parse_args(tool, args)?),
        "save_context" => conversation::save_context(db, parse_args(tool, args)?),
        "load_progress" => conversation::load_progress(db, parse_args(tool, args)?),
        "save_progress" => conversation::save_progress(db, parse_args(tool, args)?),
        "save_summary" => conversation::save_summary(db, parse_args(tool, args)?),
        "get_athlete" => activities::get_athlete(db, parse_args(tool, args)?),
        "save_athlete" => activities::save_athlete(db, parse_args(tool, args)?),
        "get_recent_activities" => activities::get_recent_activities(db, parse_args(tool, args)?),
        "save_activities" => activities::save_activities(db, parse_args(tool, args)?),
        "save_planned_sessions" => calendar::save_planned_sessions(db, parse_args(tool, args)?),
        "modify_planned_session" => calendar::modify_planned_session(db, parse_args(tool, args)?),
        "modify_day" => calendar::modify_day(db, parse_args(tool, args)?),
        "modify_week" => calendar::modify_week(db, parse_args(tool, args)?),
        "link_session" => calendar::link_session(db, parse_args(tool, args)?),
        "record_conflict" => calendar::record_conflict(db, parse_args(tool, args)?),
        "plan_race_build" => plans::plan_race_build(db, parse_args(tool, args)?),
        "plan_season" => plans::plan_season(db, parse_args(tool, args)?),
        "add_workout" => plans::add_workout(db, parse_args(tool, args)?),
        "has_race_plan" => plans::has_race_plan(db, parse_args(tool, args)?),
        other => Err(unknown_tool(other)),
    }
}

/// Dispatch a prompt-server tool call.
pub fn dispatch_prompt(store: &PromptStore, req: ToolCallRequest) -> Result<Value, ToolError> {
    let tool = req.tool.as_str();
    match tool {
        "load_orchestrator_prompt" => store.load_orchestrator_prompt(),
        "load_prompt" => store.load_prompt(parse_args(tool, req.arguments)?),
        other => Err(unknown_tool(other)),
    }
}
