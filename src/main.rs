use anyhow::{Context, Result};
use evloader::{
    config::{self, LoaderConfig},
    dataset::FieldIndex,
    fetch, load, normalize,
};
use sqlx::{ConnectOptions, Connection};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) configuration ────────────────────────────────────────────
    config::load_dotenv();
    let cfg = LoaderConfig::from_env().context("reading configuration")?;
    info!(
        url = %cfg.dataset_url,
        table = %cfg.table,
        batch_size = cfg.batch_size,
        db = ?cfg.db,
        "startup"
    );

    if let Err(e) = run(&cfg).await {
        error!(error = %format!("{:#}", e), "load failed");
        return Err(e);
    }
    Ok(())
}

async fn run(cfg: &LoaderConfig) -> Result<()> {
    let start = Instant::now();

    // ─── 3) fetch & map columns ──────────────────────────────────────
    let client = fetch::build_client(cfg.fetch_timeout)?;
    let doc = fetch::fetch_dataset(&client, &cfg.dataset_url).await?;
    let index = FieldIndex::from_columns(doc.columns());
    info!(mapped = index.len(), "field index built");
    if index.position(normalize::fields::DOL_VEHICLE_ID).is_none() {
        warn!("dataset has no dol_vehicle_id column");
    }

    // ─── 4) normalize ────────────────────────────────────────────────
    let rows = normalize::normalize_rows(&index, &doc.data)?;
    drop(doc);
    info!(rows = rows.len(), "rows to load");

    // ─── 5) upsert in one transaction ────────────────────────────────
    let mut conn = cfg
        .db
        .connect_options()
        .connect()
        .await
        .with_context(|| format!("connecting to {}:{}", cfg.db.host, cfg.db.port))?;

    let result = async {
        load::ensure_table(&mut conn, &cfg.table).await?;
        load::load_registrations(&mut conn, &cfg.table, &rows, cfg.batch_size).await
    }
    .await;

    if let Err(e) = conn.close().await {
        warn!(error = %e, "closing connection");
    }
    let summary = result?;

    info!(
        batches = summary.batches,
        rows = summary.rows,
        elapsed = ?start.elapsed(),
        "load complete"
    );
    Ok(())
}
