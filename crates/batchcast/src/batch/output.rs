//! Flat output containers returned by the batch algorithms.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Forecast matrix plus its column names.
///
/// Rows are group-major: all `h` rows of group 0, then group 1, and so on.
/// Columns follow the [`ColumnLayout`](crate::ColumnLayout) for the model
/// list the call was made with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastOutput {
    pub values: Array2<f32>,
    pub columns: Vec<String>,
}

/// In-sample fitted values recorded by a `forecast` call.
///
/// One row per original observation; column 0 repeats the target, column
/// `1 + m` carries model `m`'s fitted trace (NaN where undefined). Columns
/// are `["y", <model names>...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedOutput {
    pub values: Array2<f32>,
    pub columns: Vec<String>,
}

/// Walk-forward cross-validation result.
///
/// Logically `[group, window, step, 1 + layout width]` collapsed row-major
/// into `(group * n_windows + window) * h + step`. Column 0 holds the
/// realized actuals; the rest follow the forecast layout. Columns are
/// `["y", <layout names>...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvOutput {
    pub values: Array2<f32>,
    pub n_windows: usize,
    pub columns: Vec<String>,
}

/// Fitted-value side channel of a cross-validation run.
///
/// The logical `(row, window)` axes are flattened column-major: all original
/// rows for window 0 first, then window 1, and so on. Downstream
/// reconstruction relies on this to slice out one window's fitted rows
/// contiguously, so the ordering deliberately differs from the row-major
/// main result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvFitted {
    /// `[total_rows * n_windows, 1 + n_models]`; column 0 repeats the
    /// training target per window, NaN outside the window's training rows.
    pub values: Array2<f32>,
    /// True where the original row was part of the window's training slice.
    pub idxs: Vec<bool>,
    /// True only at the last training row of each window; downstream code
    /// looks up that row's timestamp to recover the window's cutoff.
    pub last_idxs: Vec<bool>,
    pub columns: Vec<String>,
}
