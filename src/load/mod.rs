// src/load/mod.rs

pub mod postgres;

pub use postgres::{ensure_table, load_registrations, PgUpsert};

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::normalize::Registration;

/// One open write transaction against the store.
///
/// `upsert_batch` may be called any number of times; exactly one of
/// `commit` or `rollback` ends the transaction.
#[async_trait]
pub trait UpsertTarget: Send + Sized {
    /// Insert-or-replace `rows` keyed by `dol_vehicle_id`. Returns rows affected.
    async fn upsert_batch(&mut self, rows: &[Registration]) -> Result<u64>;
    async fn commit(self) -> Result<()>;
    async fn rollback(self) -> Result<()>;
}

/// Outcome of a committed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    pub batches: usize,
    pub rows: usize,
}

/// Write `rows` in order, `batch_size` at a time, inside the target's single
/// transaction. The first failing batch rolls everything back and is returned.
pub async fn upsert_all<T: UpsertTarget>(
    mut target: T,
    rows: &[Registration],
    batch_size: usize,
) -> Result<LoadSummary> {
    if batch_size == 0 {
        target.rollback().await?;
        bail!("batch size must be positive");
    }

    let mut summary = LoadSummary::default();
    for (i, chunk) in rows.chunks(batch_size).enumerate() {
        let batch = i + 1;
        if let Err(e) = target.upsert_batch(chunk).await {
            warn!(batch, rows = chunk.len(), error = %e, "batch failed; rolling back");
            if let Err(rb) = target.rollback().await {
                warn!(error = %rb, "rollback failed");
            }
            return Err(e.context(format!("upserting batch {}", batch)));
        }
        info!(batch, rows = chunk.len(), "upserted batch");
        summary.batches += 1;
        summary.rows += chunk.len();
    }

    target.commit().await?;
    info!(
        batches = summary.batches,
        rows = summary.rows,
        "load committed"
    );
    Ok(summary)
}

/// Keep only the last record for each identifier, in first-seen order.
/// A single upsert statement may not touch the same key twice.
pub fn last_wins(rows: &[Registration]) -> Vec<&Registration> {
    let mut slot: HashMap<&str, usize> = HashMap::with_capacity(rows.len());
    let mut out: Vec<&Registration> = Vec::with_capacity(rows.len());
    for r in rows {
        match slot.get(r.dol_vehicle_id.as_str()) {
            Some(&i) => out[i] = r,
            None => {
                slot.insert(&r.dol_vehicle_id, out.len());
                out.push(r);
            }
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::memory::{MemoryTarget, Store};
    use super::*;
    use std::sync::{Arc, Mutex};

    fn rec(id: usize, make: &str) -> Registration {
        Registration {
            dol_vehicle_id: id.to_string(),
            make: Some(make.to_string()),
            ..Registration::default()
        }
    }

    fn fleet(n: usize, make: &str) -> Vec<Registration> {
        (0..n).map(|i| rec(i, make)).collect()
    }

    #[tokio::test]
    async fn splits_into_ordered_batches() -> Result<()> {
        let store = Arc::new(Mutex::new(Store::default()));
        let rows = fleet(2500, "TESLA");

        let summary = upsert_all(MemoryTarget::begin(&store), &rows, 1000).await?;
        assert_eq!(summary, LoadSummary { batches: 3, rows: 2500 });

        let s = store.lock().unwrap();
        let sizes: Vec<_> = s.statements.iter().map(Vec::len).collect();
        assert_eq!(sizes, [1000, 1000, 500]);
        let flat: Vec<String> = s.statements.concat();
        let expected: Vec<String> = (0..2500).map(|i| i.to_string()).collect();
        assert_eq!(flat, expected);
        assert_eq!(s.table.len(), 2500);
        Ok(())
    }

    #[tokio::test]
    async fn reloading_replaces_rows() -> Result<()> {
        let store = Arc::new(Mutex::new(Store::default()));
        upsert_all(MemoryTarget::begin(&store), &fleet(30, "NISSAN"), 7).await?;
        upsert_all(MemoryTarget::begin(&store), &fleet(30, "KIA"), 7).await?;

        let s = store.lock().unwrap();
        assert_eq!(s.table.len(), 30);
        assert!(s.table.values().all(|r| r.make.as_deref() == Some("KIA")));
        Ok(())
    }

    #[tokio::test]
    async fn failed_batch_commits_nothing() -> Result<()> {
        let store = Arc::new(Mutex::new(Store::default()));
        let target = MemoryTarget::begin(&store).failing_on(2);

        let err = upsert_all(target, &fleet(3000, "FORD"), 1000)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("upserting batch 2"));

        let s = store.lock().unwrap();
        assert!(s.table.is_empty());
        // the third batch is never attempted
        assert_eq!(s.statements.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn empty_input_still_commits() -> Result<()> {
        let store = Arc::new(Mutex::new(Store::default()));
        let summary = upsert_all(MemoryTarget::begin(&store), &[], 1000).await?;
        assert_eq!(summary, LoadSummary::default());
        assert!(store.lock().unwrap().statements.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn zero_batch_size_is_rejected() {
        let store = Arc::new(Mutex::new(Store::default()));
        assert!(upsert_all(MemoryTarget::begin(&store), &fleet(3, "BMW"), 0)
            .await
            .is_err());
    }

    #[test]
    fn duplicate_ids_keep_the_latest_record() {
        let rows = vec![rec(1, "A"), rec(2, "B"), rec(1, "C"), rec(3, "D")];
        let kept: Vec<_> = last_wins(&rows)
            .into_iter()
            .map(|r| (r.dol_vehicle_id.as_str(), r.make.as_deref().unwrap()))
            .collect();
        assert_eq!(kept, [("1", "C"), ("2", "B"), ("3", "D")]);
    }
}
