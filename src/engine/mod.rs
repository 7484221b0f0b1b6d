//! Pure computation engine for filling tracked positions.

pub mod normalizer;
pub mod reconciler;

pub use normalizer::{normalize, normalize_str};
pub use reconciler::{
    apply_series, derive_initial_price, DeferReason, ReconcileOutcome, Reconciler, Reconciliation,
    Window,
};
