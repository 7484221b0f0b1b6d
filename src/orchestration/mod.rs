//! Batch orchestration over the tracking table.

pub mod batch;

pub use batch::{fetch_series, BatchError, BatchRunner, BatchSummary};
