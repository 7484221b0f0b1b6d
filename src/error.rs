use crate::config::ConfigError;
use crate::datasource::DataSourceError;
use crate::orchestration::BatchError;
use crate::store::StoreError;
use thiserror::Error;

/// Top-level failure of a tracker run.
///
/// Per-row data problems never show up here; they are deferred rows.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Table error: {0}")]
    Store(#[from] StoreError),
    #[error("Price source error: {0}")]
    DataSource(#[from] DataSourceError),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Store(e) => AppError::Store(e),
        }
    }
}

impl AppError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 2,
            _ => 1,
        }
    }
}
