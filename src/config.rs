// src/config.rs

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::postgres::PgConnectOptions;
use std::{fmt, path::Path, str::FromStr, time::Duration};
use tracing::debug;
use url::Url;

pub const DEFAULT_DATA_URL: &str =
    "https://data.wa.gov/api/views/f6w7-q2d2/rows.json?accessType=DOWNLOAD";
pub const DEFAULT_TABLE: &str = "ev.ev_registrations";
pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 120;

/// PostgreSQL caps one statement at 65535 bind parameters; each row binds 17.
pub const MAX_BATCH_SIZE: usize = 65535 / crate::normalize::COLUMN_COUNT;

static TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("table name pattern should compile")
});

/// Reads one option from `std::env`.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Load `.env` from the working directory if present. A missing file is fine.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => debug!("no .env file"),
        Err(e) => debug!(error = %e, "ignoring unreadable .env"),
    }
}

/// Read a `KEY=VALUE` file into a lookup without touching the process environment.
pub fn lookup_from_file(path: &Path) -> Result<impl Fn(&str) -> Option<String>> {
    let mut pairs = Vec::new();
    for item in dotenvy::from_path_iter(path)
        .with_context(|| format!("opening env file {}", path.display()))?
    {
        pairs.push(item.with_context(|| format!("parsing env file {}", path.display()))?);
    }
    Ok(move |key: &str| {
        pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
}

fn first_set(env: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|&k| env(k))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn parse_or<T>(env: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match first_set(env, &[key]) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", key, raw, e)),
    }
}

/// Connection parameters for the relational store.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "db".into(),
            port: 5432,
            database: "ev_db".into(),
            user: "ev_user".into(),
            password: "ev_pass".into(),
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl DbConfig {
    pub fn from_lookup(env: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            host: first_set(env, &["PGHOST"]).unwrap_or(d.host),
            port: parse_or(env, "POSTGRES_PORT", d.port)?,
            database: first_set(env, &["POSTGRES_DB", "PGDATABASE"]).unwrap_or(d.database),
            user: first_set(env, &["POSTGRES_USER", "PGUSER"]).unwrap_or(d.user),
            password: first_set(env, &["POSTGRES_PASSWORD", "PGPASSWORD"]).unwrap_or(d.password),
        })
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
    }
}

/// A validated, possibly schema-qualified table identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    pub fn parse(raw: &str) -> Result<Self> {
        if !TABLE_NAME.is_match(raw) {
            bail!("invalid table name {:?}: expected `name` or `schema.name`", raw);
        }
        Ok(Self(raw.to_string()))
    }

    /// Schema part, if the name is qualified.
    pub fn schema(&self) -> Option<&str> {
        self.0.split_once('.').map(|(s, _)| s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything one ingestion run needs.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub db: DbConfig,
    pub dataset_url: Url,
    pub batch_size: usize,
    pub table: TableName,
    pub fetch_timeout: Duration,
}

impl LoaderConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(env: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw_url = first_set(env, &["EV_DATA_URL"]).unwrap_or_else(|| DEFAULT_DATA_URL.into());
        let dataset_url =
            Url::parse(&raw_url).with_context(|| format!("invalid EV_DATA_URL {:?}", raw_url))?;

        let batch_size = parse_or(env, "EV_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if !(1..=MAX_BATCH_SIZE).contains(&batch_size) {
            bail!(
                "EV_BATCH_SIZE must be between 1 and {}, got {}",
                MAX_BATCH_SIZE,
                batch_size
            );
        }

        let timeout_secs = parse_or(env, "EV_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            bail!("EV_FETCH_TIMEOUT_SECS must be positive");
        }

        Ok(Self {
            db: DbConfig::from_lookup(env)?,
            dataset_url,
            batch_size,
            table: TableName::parse(
                &first_set(env, &["EV_TABLE"]).unwrap_or_else(|| DEFAULT_TABLE.into()),
            )?,
            fetch_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Options for the report binary.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub db: DbConfig,
    pub table: TableName,
    pub top_counties: i64,
    pub top_per_city: i64,
    pub top_utilities: i64,
}

impl ReportConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(env: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let cfg = Self {
            db: DbConfig::from_lookup(env)?,
            table: TableName::parse(
                &first_set(env, &["EV_TABLE"]).unwrap_or_else(|| DEFAULT_TABLE.into()),
            )?,
            top_counties: parse_or(env, "TOP_N_COUNTIES", 20)?,
            top_per_city: parse_or(env, "TOP_N_PER_CITY", 5)?,
            top_utilities: parse_or(env, "TOP_N_UTILITIES", 20)?,
        };
        for (name, v) in [
            ("TOP_N_COUNTIES", cfg.top_counties),
            ("TOP_N_PER_CITY", cfg.top_per_city),
            ("TOP_N_UTILITIES", cfg.top_utilities),
        ] {
            if v < 1 {
                bail!("{} must be positive, got {}", name, v);
            }
        }
        Ok(cfg)
    }
}
