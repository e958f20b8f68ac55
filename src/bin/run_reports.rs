use anyhow::{Context, Result};
use evloader::{
    config::{self, ReportConfig},
    reports,
};
use sqlx::{ConnectOptions, Connection};
use std::io::{self, Write};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr) // stdout carries the reports
        .init();

    config::load_dotenv();
    let cfg = ReportConfig::from_env().context("reading configuration")?;
    info!(table = %cfg.table, db = ?cfg.db, "running reports");

    let mut conn = cfg
        .db
        .connect_options()
        .connect()
        .await
        .with_context(|| format!("connecting to {}:{}", cfg.db.host, cfg.db.port))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = reports::run_all(&mut conn, &cfg, &mut out).await;
    out.flush()?;

    if let Err(e) = conn.close().await {
        warn!(error = %e, "closing connection");
    }
    result?;

    info!("reports finished");
    Ok(())
}
