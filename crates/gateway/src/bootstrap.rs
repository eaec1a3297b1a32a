//! Subsystem wiring shared by `serve` and any future CLI entry point.

use std::sync::Arc;

use anyhow::Context;

use pl_completion::CompletionProvider;
use pl_controller::store::ConversationStore;
use pl_controller::TurnRunner;
use pl_corpus::CorpusStore;
use pl_domain::config::{Config, ConfigSeverity};
use pl_pipeline::PlanningPipeline;
use pl_toolclient::ToolClient;

use crate::heuristics::HeuristicProvider;
use crate::state::AppState;

/// Validate config and wire every subsystem into an [`AppState`].
///
/// Boot is fail-closed: Error-severity config issues (including missing
/// tool endpoints) abort before any subsystem starts.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── tool boundary (fail-closed constructor) ──────────────────────
    let tools = Arc::new(ToolClient::new(&config.tools).context("initializing tool client")?);
    tracing::info!(
        data = %config.tools.data_tool_endpoint,
        prompt = %config.tools.prompt_tool_endpoint,
        timeout_s = config.tools.tool_call_timeout_seconds,
        "tool client ready"
    );

    // ── retrieval corpus ─────────────────────────────────────────────
    let corpus =
        Arc::new(CorpusStore::load(&config.stores.corpus_path).context("loading corpus")?);

    // ── completion capability ────────────────────────────────────────
    let provider: Arc<dyn CompletionProvider> = Arc::new(HeuristicProvider);
    tracing::info!(provider = provider.provider_id(), "completion provider ready");

    // ── pipeline + controller ────────────────────────────────────────
    let pipeline = Arc::new(PlanningPipeline::new(
        corpus,
        provider.clone(),
        tools.clone(),
        std::time::Duration::from_secs(config.planning.plan_deadline_seconds),
    ));
    let store = Arc::new(ConversationStore::new(tools));
    let runner = Arc::new(TurnRunner::new(
        store,
        provider,
        pipeline,
        config.planning.clone(),
    ));
    tracing::info!("controller ready");

    Ok(AppState { config, runner })
}
