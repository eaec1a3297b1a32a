use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pl_gateway::api;
use pl_gateway::bootstrap::build_app_state;
use pl_gateway::cli::{load_config, validate, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        None | Some(Command::Serve) => {
            init_tracing(&config.server.log_filter);
            serve(Arc::new(config)).await
        }
        Some(Command::ConfigValidate) => {
            if !validate(&config) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::ConfigShow) => {
            println!("{}", toml_show(&config)?);
            Ok(())
        }
    }
}

async fn serve(config: Arc<pl_domain::config::Config>) -> anyhow::Result<()> {
    let state = build_app_state(config.clone())?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "paceline gateway listening");
    axum::serve(listener, api::router(state)).await?;
    Ok(())
}

fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();
}

fn toml_show(config: &pl_domain::config::Config) -> anyhow::Result<String> {
    toml::to_string_pretty(config).map_err(Into::into)
}
