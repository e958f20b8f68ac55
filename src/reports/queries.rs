// src/reports/queries.rs

use anyhow::{Context, Result};
use sqlx::{FromRow, PgConnection};

use crate::config::TableName;
use crate::normalize::coerce::{BEV_LABEL, PHEV_LABEL};

/// Registrations outside this state are excluded from the geographic reports.
pub const HOME_STATE: &str = "WA";
pub const MIN_ZIP_SAMPLE: i64 = 10;
pub const ZIP_LIMIT: i64 = 50;
pub const COUNTIES_PER_UTILITY: i64 = 5;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CountyCount {
    pub county: String,
    pub ev_count: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CityModel {
    pub city: String,
    pub make: String,
    pub model: String,
    pub n: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RangeByType {
    pub ev_type: String,
    pub vehicles: i64,
    pub avg_electric_range: Option<f64>,
    pub median_range: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct MsrpByZip {
    pub zip_code: String,
    pub n: i64,
    pub avg_msrp: Option<f64>,
    pub median_msrp: Option<f64>,
    pub p90_msrp: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UtilityCount {
    pub electric_utility: String,
    pub ev_count: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UtilityCounty {
    pub electric_utility: String,
    pub county: String,
    pub n: i64,
}

pub async fn top_counties(
    conn: &mut PgConnection,
    table: &TableName,
    limit: i64,
) -> Result<Vec<CountyCount>> {
    let sql = format!(
        "SELECT COALESCE(county, 'Unknown') AS county, COUNT(*) AS ev_count
         FROM {table}
         WHERE state = $1
         GROUP BY county
         ORDER BY ev_count DESC, county ASC
         LIMIT $2"
    );
    sqlx::query_as(&sql)
        .bind(HOME_STATE)
        .bind(limit)
        .fetch_all(conn)
        .await
        .context("top counties query")
}

pub async fn top_models_per_city(
    conn: &mut PgConnection,
    table: &TableName,
    per_city: i64,
) -> Result<Vec<CityModel>> {
    let sql = format!(
        "WITH base AS (
           SELECT city, make, model, COUNT(*) AS n
           FROM {table}
           WHERE state = $1
             AND city IS NOT NULL AND make IS NOT NULL AND model IS NOT NULL
           GROUP BY 1, 2, 3
         ),
         ranked AS (
           SELECT city, make, model, n,
                  ROW_NUMBER() OVER (PARTITION BY city ORDER BY n DESC, make, model) AS rn
           FROM base
         )
         SELECT city, make, model, n
         FROM ranked
         WHERE rn <= $2
         ORDER BY city, n DESC, make, model"
    );
    sqlx::query_as(&sql)
        .bind(HOME_STATE)
        .bind(per_city)
        .fetch_all(conn)
        .await
        .context("models per city query")
}

pub async fn range_by_type(conn: &mut PgConnection, table: &TableName) -> Result<Vec<RangeByType>> {
    let sql = format!(
        "SELECT ev_type,
                COUNT(*) AS vehicles,
                ROUND(AVG(electric_range)::numeric, 2)::float8 AS avg_electric_range,
                PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY electric_range) AS median_range
         FROM {table}
         WHERE electric_range IS NOT NULL
           AND ev_type IN ($1, $2)
         GROUP BY ev_type
         ORDER BY ev_type"
    );
    sqlx::query_as(&sql)
        .bind(BEV_LABEL)
        .bind(PHEV_LABEL)
        .fetch_all(conn)
        .await
        .context("range by type query")
}

pub async fn msrp_by_zip(conn: &mut PgConnection, table: &TableName) -> Result<Vec<MsrpByZip>> {
    let sql = format!(
        "SELECT zip_code,
                COUNT(*) AS n,
                ROUND(AVG(base_msrp)::numeric, 2)::float8 AS avg_msrp,
                ROUND((PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY base_msrp))::numeric, 2)::float8
                  AS median_msrp,
                ROUND((PERCENTILE_CONT(0.9) WITHIN GROUP (ORDER BY base_msrp))::numeric, 2)::float8
                  AS p90_msrp
         FROM {table}
         WHERE base_msrp IS NOT NULL
           AND zip_code IS NOT NULL
         GROUP BY zip_code
         HAVING COUNT(*) >= $1
         ORDER BY avg_msrp DESC, zip_code
         LIMIT $2"
    );
    sqlx::query_as(&sql)
        .bind(MIN_ZIP_SAMPLE)
        .bind(ZIP_LIMIT)
        .fetch_all(conn)
        .await
        .context("msrp by zip query")
}

pub async fn top_utilities(
    conn: &mut PgConnection,
    table: &TableName,
    limit: i64,
) -> Result<Vec<UtilityCount>> {
    let sql = format!(
        "SELECT COALESCE(electric_utility, 'Unknown') AS electric_utility, COUNT(*) AS ev_count
         FROM {table}
         GROUP BY electric_utility
         ORDER BY ev_count DESC, electric_utility
         LIMIT $1"
    );
    sqlx::query_as(&sql)
        .bind(limit)
        .fetch_all(conn)
        .await
        .context("top utilities query")
}

pub async fn counties_per_utility(
    conn: &mut PgConnection,
    table: &TableName,
) -> Result<Vec<UtilityCounty>> {
    let sql = format!(
        "WITH base AS (
           SELECT COALESCE(electric_utility, 'Unknown') AS electric_utility,
                  COALESCE(county, 'Unknown') AS county,
                  COUNT(*) AS n
           FROM {table}
           GROUP BY 1, 2
         ),
         ranked AS (
           SELECT electric_utility, county, n,
                  ROW_NUMBER() OVER (PARTITION BY electric_utility ORDER BY n DESC, county) AS rn
           FROM base
         )
         SELECT electric_utility, county, n
         FROM ranked
         WHERE rn <= $1
         ORDER BY electric_utility, n DESC, county"
    );
    sqlx::query_as(&sql)
        .bind(COUNTIES_PER_UTILITY)
        .fetch_all(conn)
        .await
        .context("counties per utility query")
}
