pub mod config;
pub mod credentials;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod store;

pub use config::Config;
pub use credentials::ApiCredentials;
pub use datasource::{DataSourceError, MockPriceSource, PriceSource, StockDataSource};
pub use domain::{
    Decimal, DayEntry, PriceBar, PriceSeries, ReferenceClock, Symbol, TrackedPosition,
    DAYS_TRACKED,
};
pub use engine::{normalize, ReconcileOutcome, Reconciler, Window};
pub use error::AppError;
pub use orchestration::{BatchRunner, BatchSummary};
pub use store::{CsvTableStore, TableStore, TRACKING_COLUMNS};
