use crate::datasource::{DataSourceError, PriceSource};
use crate::domain::{PriceSeries, ReferenceClock};
use crate::engine::{normalize, ReconcileOutcome, Reconciler};
use crate::store::{StoreError, TableStore};
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Runs reconciliation passes over a tracking table.
///
/// Rows are processed one at a time in table order. Each row is replaced
/// only after its reconciliation finished, so an aborted pass never leaves
/// a half-updated row.
#[derive(Clone)]
pub struct BatchRunner {
    reconciler: Reconciler,
    store: Arc<dyn TableStore>,
    clock: ReferenceClock,
    persist_each_row: bool,
}

impl BatchRunner {
    pub fn new(source: Arc<dyn PriceSource>, store: Arc<dyn TableStore>, clock: ReferenceClock) -> Self {
        Self {
            reconciler: Reconciler::new(source),
            store,
            clock,
            persist_each_row: false,
        }
    }

    /// Save the table after every changed row, not only at the end.
    pub fn persist_each_row(mut self, enabled: bool) -> Self {
        self.persist_each_row = enabled;
        self
    }

    /// Reconcile every row as of today's reference date.
    pub async fn run_pass(&self) -> Result<BatchSummary, BatchError> {
        self.run_pass_at(self.clock.today()).await
    }

    /// Reconcile every row as of `reference_date`, then persist the table.
    pub async fn run_pass_at(&self, reference_date: NaiveDate) -> Result<BatchSummary, BatchError> {
        let mut table = self.store.load_table()?;
        let mut summary = BatchSummary {
            total: table.positions().count(),
            ..Default::default()
        };
        info!(
            "Processing {} stocks as of {}",
            summary.total, reference_date
        );

        let mut seen = 0;
        for index in 0..table.rows.len() {
            // Lines without a symbol pass through untouched.
            let Some(row) = table.rows[index].position.as_ref() else {
                continue;
            };
            seen += 1;
            info!("Updating stock #{}: {}", seen, row.symbol);
            let result = self.reconciler.reconcile(row, reference_date).await;

            match result.outcome {
                ReconcileOutcome::AlreadyComplete => summary.skipped += 1,
                ReconcileOutcome::Deferred(_) => summary.deferred += 1,
                ReconcileOutcome::Updated { .. } => summary.updated += 1,
            }

            let changed = Some(&result.row) != table.rows[index].position.as_ref();
            table.rows[index].position = Some(result.row);
            if changed && self.persist_each_row {
                self.store.save_table(&table)?;
            }
        }

        self.store.save_table(&table)?;
        info!("Completed pass: {}", summary);
        Ok(summary)
    }
}

/// Fetch and normalize one symbol's history without touching any table.
pub async fn fetch_series(
    source: &dyn PriceSource,
    symbol: &str,
    date_from: NaiveDate,
    date_to: Option<NaiveDate>,
) -> Result<PriceSeries, DataSourceError> {
    let raw = source.fetch_prices(symbol, date_from, date_to).await?;
    Ok(normalize(&raw))
}

/// Row counts for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub updated: usize,
    pub deferred: usize,
    /// Rows already complete before the pass.
    pub skipped: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows: {} updated, {} deferred, {} already complete",
            self.total, self.updated, self.deferred, self.skipped
        )
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
