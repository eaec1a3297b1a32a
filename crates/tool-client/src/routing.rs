//! Static routing table: tool name → upstream server.

/// The two upstream tool servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolEndpoint {
    Data,
    Prompt,
}

/// Tool names served by the data server.
pub mod data {
    pub const LOAD_CONTEXT: &str = "load_context";
    pub const SAVE_CONTEXT: &str = "save_context";
    pub const SAVE_PROGRESS: &str = "save_progress";
    pub const LOAD_PROGRESS: &str = "load_progress";
    pub const SAVE_SUMMARY: &str = "save_summary";
    pub const GET_ATHLETE: &str = "get_athlete";
    pub const SAVE_ATHLETE: &str = "save_athlete";
    pub const GET_RECENT_ACTIVITIES: &str = "get_recent_activities";
    pub const SAVE_ACTIVITIES: &str = "save_activities";
    pub const SAVE_PLANNED_SESSIONS: &str = "save_planned_sessions";
    pub const MODIFY_PLANNED_SESSION: &str = "modify_planned_session";
    pub const MODIFY_DAY: &str = "modify_day";
    pub const MODIFY_WEEK: &str = "modify_week";
    pub const LINK_SESSION: &str = "link_session";
    pub const HAS_RACE_PLAN: &str = "has_race_plan";
    pub const RECORD_CONFLICT: &str = "record_conflict";
    pub const PLAN_RACE_BUILD: &str = "plan_race_build";
    pub const PLAN_SEASON: &str = "plan_season";
    pub const ADD_WORKOUT: &str = "add_workout";
}

/// Tool names served by the prompt server.
pub mod prompt {
    pub const LOAD_ORCHESTRATOR_PROMPT: &str = "load_orchestrator_prompt";
    pub const LOAD_PROMPT: &str = "load_prompt";
}

/// Every known tool and the endpoint it routes to.
pub const ROUTES: &[(&str, ToolEndpoint)] = &[
    (data::LOAD_CONTEXT, ToolEndpoint::Data),
    (data::SAVE_CONTEXT, ToolEndpoint::Data),
    (data::SAVE_PROGRESS, ToolEndpoint::Data),
    (data::LOAD_PROGRESS, ToolEndpoint::Data),
    (data::SAVE_SUMMARY, ToolEndpoint::Data),
    (data::GET_ATHLETE, ToolEndpoint::Data),
    (data::SAVE_ATHLETE, ToolEndpoint::Data),
    (data::GET_RECENT_ACTIVITIES, ToolEndpoint::Data),
    (data::SAVE_ACTIVITIES, ToolEndpoint::Data),
    (data::SAVE_PLANNED_SESSIONS, ToolEndpoint::Data),
    (data::MODIFY_PLANNED_SESSION, ToolEndpoint::Data),
    (data::MODIFY_DAY, ToolEndpoint::Data),
    (data::MODIFY_WEEK, ToolEndpoint::Data),
    (data::LINK_SESSION, ToolEndpoint::Data),
    (data::HAS_RACE_PLAN, ToolEndpoint::Data),
    (data::RECORD_CONFLICT, ToolEndpoint::Data),
    (data::PLAN_RACE_BUILD, ToolEndpoint::Data),
    (data::PLAN_SEASON, ToolEndpoint::Data),
    (data::ADD_WORKOUT, ToolEndpoint::Data),
    (prompt::LOAD_ORCHESTRATOR_PROMPT, ToolEndpoint::Prompt),
    (prompt::LOAD_PROMPT, ToolEndpoint::Prompt),
];

/// Resolve a tool name to its endpoint.
pub fn route(tool: &str) -> Option<ToolEndpoint> {
    ROUTES
        .iter()
        .find(|(name, _)| *name == tool)
        .map(|(_, endpoint)| *endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_tools_route_to_data() {
        assert_eq!(route("load_context"), Some(ToolEndpoint::Data));
        assert_eq!(route("save_planned_sessions"), Some(ToolEndpoint::Data));
    }

    #[test]
    fn prompt_tools_route_to_prompt() {
        assert_eq!(route("load_prompt"), Some(ToolEndpoint::Prompt));
        assert_eq!(route("load_orchestrator_prompt"), Some(ToolEndpoint::Prompt));
    }

    #[test]
    fn unknown_tool_has_no_route() {
        assert_eq!(route("drop_tables"), None);
    }

    #[test]
    fn routing_table_has_no_duplicates() {
        let mut names: Vec<&str> = ROUTES.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ROUTES.len());
    }
}
