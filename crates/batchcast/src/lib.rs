//! batchcast: batch forecasting for grouped time series.
//!
//! Many independent series are stored contiguously in one buffer
//! ([`GroupedArray`]) and forecast with a shared set of pluggable models.
//! Execution is either sequential or fanned out over a worker pool, and the
//! parallel path is a pure re-partitioning of the sequential one: results are
//! identical regardless of worker count.
//!
//! # Key Types
//!
//! - [`GroupedArray`] / [`GroupedArrayBuilder`] - Ragged-array storage
//! - [`Forecaster`] / [`FittedModel`] - The model contract
//! - [`BatchForecaster`] - High-level engine with fit/predict/forecast/CV
//! - [`CvConfig`] - Walk-forward cross-validation configuration
//!
//! # Example
//!
//! ```
//! use batchcast::{BatchForecaster, GroupedArrayBuilder, Naive};
//!
//! let ga = GroupedArrayBuilder::new()
//!     .push_series(&[1.0, 2.0, 3.0, 4.0], None)
//!     .push_series(&[10.0, 11.0, 12.0], None)
//!     .build()
//!     .unwrap();
//!
//! let mut engine = BatchForecaster::new(vec![Box::new(Naive)]);
//! let out = engine.forecast(&ga, 2, None, &[], false).unwrap();
//! assert_eq!(out.values.nrows(), 4); // 2 groups x horizon 2
//! assert_eq!(out.columns, vec!["Naive"]);
//! ```

pub mod batch;
pub mod data;
pub mod engine;
pub mod layout;
pub mod model;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Storage
pub use data::{GroupedArray, GroupedArrayBuilder, GroupedArrayError};

// Model contract and baselines
pub use model::{
    FittedModel, Forecaster, HistoricAverage, IntervalBand, ModelError, ModelOutput, Naive,
    WindowAverage,
};

// Batch algorithms and outputs
pub use batch::{CvConfig, CvFitted, CvOutput, FittedOutput, FittedSet, ForecastOutput};

// Column layout
pub use layout::ColumnLayout;

// Engine
pub use engine::{BatchError, BatchForecaster};

// Parallelism helpers
pub use utils::Verbosity;
