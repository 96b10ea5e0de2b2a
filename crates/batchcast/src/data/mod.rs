//! Grouped time-series storage.
//!
//! This module provides [`GroupedArray`], the ragged-array container that
//! partitions one contiguous value buffer into per-series segments, and
//! [`GroupedArrayBuilder`] for assembling it series by series.

mod builder;
mod grouped;

pub use builder::GroupedArrayBuilder;
pub use grouped::GroupedArray;

/// Errors raised while constructing a [`GroupedArray`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupedArrayError {
    /// The buffer must contain at least one group.
    #[error("grouped array must contain at least one series")]
    Empty,

    /// Every row needs at least the target column.
    #[error("data must have at least one column (the target)")]
    NoColumns,

    /// Offsets must start at zero, end at the row count, and never decrease.
    #[error("invalid offsets: {reason}")]
    InvalidOffsets { reason: &'static str },

    /// Offsets end point disagrees with the data row count.
    #[error("offsets cover {covered} rows but data has {rows}")]
    RowCountMismatch { covered: usize, rows: usize },

    /// A series was pushed with a different exogenous column count.
    #[error("series {series}: expected {expected} exogenous columns, got {got}")]
    ExogColumnMismatch {
        series: usize,
        expected: usize,
        got: usize,
    },

    /// Exogenous rows must line up with the target observations.
    #[error("series {series}: target has {target_rows} rows but exogenous has {exog_rows}")]
    ExogRowMismatch {
        series: usize,
        target_rows: usize,
        exog_rows: usize,
    },

    /// Series must contain at least one observation.
    #[error("series {series} is empty")]
    EmptySeries { series: usize },
}
