// src/load/postgres.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info, instrument};

use super::{last_wins, upsert_all, LoadSummary, UpsertTarget};
use crate::config::TableName;
use crate::normalize::{Registration, COLUMNS};

const KEY: &str = "dol_vehicle_id";

/// Create the schema (if qualified) and table when missing.
#[instrument(level = "info", skip(conn, table), fields(table = %table))]
pub async fn ensure_table(conn: &mut PgConnection, table: &TableName) -> Result<()> {
    if let Some(schema) = table.schema() {
        let ddl = format!("CREATE SCHEMA IF NOT EXISTS {}", schema);
        sqlx::query(&ddl)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("creating schema {}", schema))?;
    }
    let ddl = create_table_sql(table);
    sqlx::query(&ddl)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("creating table {}", table))?;
    debug!("table ready");
    Ok(())
}

fn create_table_sql(table: &TableName) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            dol_vehicle_id       TEXT PRIMARY KEY,
            vin_1_10             TEXT,
            county               TEXT,
            city                 TEXT,
            state                TEXT,
            zip_code             TEXT,
            legislative_district TEXT,
            latitude             DOUBLE PRECISION,
            longitude            DOUBLE PRECISION,
            model_year           INTEGER,
            make                 TEXT,
            model                TEXT,
            ev_type              TEXT,
            cafv_type            TEXT,
            electric_range       INTEGER,
            base_msrp            DOUBLE PRECISION,
            electric_utility     TEXT
        )"
    )
}

/// `INSERT INTO t (cols) ` and the `ON CONFLICT` clause that replaces every
/// non-key column.
fn statement_parts(table: &TableName) -> (String, String) {
    let head = format!("INSERT INTO {} ({}) ", table, COLUMNS.join(", "));
    let set = COLUMNS
        .iter()
        .filter(|c| **c != KEY)
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let tail = format!(" ON CONFLICT ({}) DO UPDATE SET {}", KEY, set);
    (head, tail)
}

fn build_upsert<'a>(
    head: &str,
    tail: &str,
    rows: impl IntoIterator<Item = &'a Registration>,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(head);
    qb.push_values(rows, |mut b, r| {
        b.push_bind(r.dol_vehicle_id.clone())
            .push_bind(r.vin_1_10.clone())
            .push_bind(r.county.clone())
            .push_bind(r.city.clone())
            .push_bind(r.state.clone())
            .push_bind(r.zip_code.clone())
            .push_bind(r.legislative_district.clone())
            .push_bind(r.latitude)
            .push_bind(r.longitude)
            .push_bind(r.model_year)
            .push_bind(r.make.clone())
            .push_bind(r.model.clone())
            .push_bind(r.ev_type.clone())
            .push_bind(r.cafv_type.clone())
            .push_bind(r.electric_range)
            .push_bind(r.base_msrp)
            .push_bind(r.electric_utility.clone());
    });
    qb.push(tail);
    qb
}

/// Upserts into one PostgreSQL transaction.
pub struct PgUpsert<'c> {
    tx: Transaction<'c, Postgres>,
    head: String,
    tail: String,
}

impl<'c> PgUpsert<'c> {
    pub fn new(tx: Transaction<'c, Postgres>, table: &TableName) -> Self {
        let (head, tail) = statement_parts(table);
        Self { tx, head, tail }
    }
}

#[async_trait]
impl<'c> UpsertTarget for PgUpsert<'c> {
    async fn upsert_batch(&mut self, rows: &[Registration]) -> Result<u64> {
        let unique = last_wins(rows);
        if unique.len() < rows.len() {
            debug!(
                collapsed = rows.len() - unique.len(),
                "duplicate ids in batch; keeping last"
            );
        }
        let mut qb = build_upsert(&self.head, &self.tail, unique);
        let done = qb
            .build()
            .execute(&mut *self.tx)
            .await
            .context("executing upsert")?;
        Ok(done.rows_affected())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("committing load")
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.context("rolling back load")
    }
}

/// Load `rows` into `table` in one transaction.
#[instrument(level = "info", skip_all, fields(table = %table, rows = rows.len()))]
pub async fn load_registrations(
    conn: &mut PgConnection,
    table: &TableName,
    rows: &[Registration],
    batch_size: usize,
) -> Result<LoadSummary> {
    let tx = conn.begin().await.context("opening load transaction")?;
    info!(batch_size, "transaction open");
    upsert_all(PgUpsert::new(tx, table), rows, batch_size).await
}
