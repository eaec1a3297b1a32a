//! `paceline-promptsrv` — the prompt tool server binary.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pl_toolsrv::server;

#[derive(Parser)]
#[command(name = "paceline-promptsrv", about = "Paceline prompt tool server")]
struct Cli {
    /// Directory of prompt files.
    #[arg(long, default_value = "prompts")]
    prompts: PathBuf,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8702)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    if !cli.prompts.is_dir() {
        anyhow::bail!("prompt directory {} does not exist", cli.prompts.display());
    }

    server::serve(server::prompt_router(&cli.prompts), &cli.host, cli.port).await
}
