//! `paceline-datasrv` — the data tool server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pl_toolsrv::db::Database;
use pl_toolsrv::server;

#[derive(Parser)]
#[command(name = "paceline-datasrv", about = "Paceline data tool server")]
struct Cli {
    /// SQLite database file.
    #[arg(long, default_value = "paceline.db")]
    database: PathBuf,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8701)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let db = Arc::new(Database::open(&cli.database)?);
    tracing::info!(database = %cli.database.display(), "database ready");

    server::serve(server::data_router(db), &cli.host, cli.port).await
}
