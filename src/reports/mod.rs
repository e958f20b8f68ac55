// src/reports/mod.rs

pub mod queries;
pub mod render;

use anyhow::Result;
use sqlx::PgConnection;
use std::io::Write;
use tracing::info;

use crate::config::ReportConfig;
use render::{group_runs, table_of, Tabular};

const RULE_WIDTH: usize = 100;

pub fn write_section(out: &mut impl Write, title: &str) -> Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "\n{}\n{}\n{}", rule, title, rule)?;
    Ok(())
}

pub fn write_table<T: Tabular>(out: &mut impl Write, rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        writeln!(out, "(no rows)")?;
    } else {
        table_of(rows).print(out)?;
    }
    Ok(())
}

/// One sub-table per group, each under a `Label: value` heading.
pub fn write_grouped<T: Tabular>(
    out: &mut impl Write,
    label: &str,
    rows: &[T],
    key: impl Fn(&T) -> &str,
) -> Result<()> {
    if rows.is_empty() {
        writeln!(out, "(no rows)")?;
        return Ok(());
    }
    for (k, group) in group_runs(rows, key) {
        writeln!(out, "\n{}: {}", label, k)?;
        table_of(group).print(out)?;
    }
    Ok(())
}

/// Run every report in order and write them to `out`.
pub async fn run_all(conn: &mut PgConnection, cfg: &ReportConfig, out: &mut impl Write) -> Result<()> {
    let t = &cfg.table;

    // ─── 1) counties ─────────────────────────────────────────────────
    write_section(out, &format!("1) Top {} counties by EV registrations", cfg.top_counties))?;
    let rows = queries::top_counties(conn, t, cfg.top_counties).await?;
    info!(rows = rows.len(), "counties report");
    write_table(out, &rows)?;

    // ─── 2) makes/models per city ────────────────────────────────────
    write_section(
        out,
        &format!("2) Top {} makes/models per city (most common)", cfg.top_per_city),
    )?;
    let rows = queries::top_models_per_city(conn, t, cfg.top_per_city).await?;
    info!(rows = rows.len(), "models per city report");
    write_grouped(out, "City", &rows, |r| r.city.as_str())?;

    // ─── 3) electric range by type ───────────────────────────────────
    write_section(out, "3) Average electric range: BEV vs PHEV")?;
    let rows = queries::range_by_type(conn, t).await?;
    write_table(out, &rows)?;

    // ─── 4) price by ZIP ─────────────────────────────────────────────
    write_section(out, "4) Base MSRP by ZIP code")?;
    let rows = queries::msrp_by_zip(conn, t).await?;
    info!(rows = rows.len(), "msrp by zip report");
    write_table(out, &rows)?;

    // ─── 5) utilities ────────────────────────────────────────────────
    write_section(
        out,
        &format!("5a) Top {} electric utilities by EV count", cfg.top_utilities),
    )?;
    let rows = queries::top_utilities(conn, t, cfg.top_utilities).await?;
    write_table(out, &rows)?;

    write_section(
        out,
        &format!(
            "5b) Distribution by county (top {} per utility)",
            queries::COUNTIES_PER_UTILITY
        ),
    )?;
    let rows = queries::counties_per_utility(conn, t).await?;
    write_grouped(out, "Utility", &rows, |r| r.electric_utility.as_str())?;

    Ok(())
}
