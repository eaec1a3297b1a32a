use pl_domain::config::{Config, ConfigSeverity};

#[test]
fn default_timeouts_match_contract() {
    let config = Config::default();
    assert_eq!(config.tools.tool_call_timeout_seconds, 30);
    assert_eq!(config.planning.turn_deadline_seconds, 60);
    assert_eq!(config.planning.plan_deadline_seconds, 120);
    assert_eq!(config.planning.sync_recent_user_window_hours, 2);
}

#[test]
fn default_config_fails_closed_without_endpoints() {
    let config = Config::default();
    let issues = config.validate();
    let errors: Vec<_> = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .collect();
    assert!(errors.iter().any(|e| e.field == "tools.data_tool_endpoint"));
    assert!(errors.iter().any(|e| e.field == "tools.prompt_tool_endpoint"));
}

#[test]
fn configured_endpoints_validate_clean() {
    let toml_str = r#"
[tools]
data_tool_endpoint = "http://127.0.0.1:8701"
prompt_tool_endpoint = "http://127.0.0.1:8702"
"#;
    let config = Config::from_toml_str(toml_str).unwrap();
    let errors = config
        .validate()
        .into_iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    assert_eq!(errors, 0);
}

#[test]
fn advice_markers_have_defaults() {
    let config = Config::default();
    assert!(config.planning.advice_markers.iter().any(|m| m == "recommend"));
    assert!(config.planning.advice_markers.iter().any(|m| m == "typically"));
}
