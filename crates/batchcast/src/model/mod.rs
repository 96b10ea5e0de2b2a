//! The model contract: pluggable forecasters and their structured output.
//!
//! The engine never looks inside a model. It relies on four operations:
//! fresh fit ([`Forecaster::fit`]), prediction from a trained handle
//! ([`FittedModel::predict`]), one-shot fit+forecast
//! ([`Forecaster::forecast`]), and the interval capability flag
//! ([`Forecaster::supports_intervals`]). Results come back as a structured
//! [`ModelOutput`] rather than a string-keyed map, so output columns are
//! selected by position, not by label prefix.

mod baseline;

pub use baseline::{HistoricAverage, Naive, WindowAverage};

use ndarray::{Array1, ArrayView1, ArrayView2};

/// Errors raised by model fit/predict/forecast.
///
/// Any model failure is fatal for the whole batch call; there is no
/// per-group isolation or retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// The series does not carry enough observations for this model.
    #[error("{model}: series too short ({got} observations, need at least {needed})")]
    TooShort {
        model: &'static str,
        needed: usize,
        got: usize,
    },

    /// A model was asked for fitted values but produced none.
    #[error("{model} produced no fitted values")]
    MissingFitted { model: String },

    /// Model-specific failure.
    #[error("{0}")]
    Failed(String),
}

/// One prediction-interval band: lower and upper bounds for a level.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalBand {
    /// Confidence percentage in `(0, 100)`, e.g. 80 or 95.
    pub level: u32,
    /// Lower bound, length `h`.
    pub lo: Array1<f32>,
    /// Upper bound, length `h`.
    pub hi: Array1<f32>,
}

/// Structured result of a predict or forecast call.
///
/// `intervals` holds one band per requested level, in request order, and is
/// empty when the model does not support intervals or none were requested.
/// `fitted` is the in-sample trace aligned to the training rows (NaN where
/// undefined, e.g. warm-up steps) and is only populated when asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    /// Point forecast, length `h`.
    pub mean: Array1<f32>,
    /// Prediction-interval bands, one per requested level.
    pub intervals: Vec<IntervalBand>,
    /// In-sample fitted values, length = training size.
    pub fitted: Option<Array1<f32>>,
}

impl ModelOutput {
    /// A point-only output with no intervals and no fitted trace.
    pub fn point(mean: Array1<f32>) -> Self {
        Self {
            mean,
            intervals: Vec::new(),
            fitted: None,
        }
    }
}

/// An untrained forecasting model: stateless configuration plus the fit and
/// one-shot forecast operations.
///
/// Implementations must be cheap to share across worker threads; all state
/// produced by training lives in the returned [`FittedModel`] handle.
pub trait Forecaster: Send + Sync {
    /// Model name used to compose output column names.
    fn name(&self) -> &str;

    /// Whether the model can produce prediction intervals.
    ///
    /// When `false`, requested levels are silently ignored for this model
    /// and it contributes a single mean column to the output.
    fn supports_intervals(&self) -> bool {
        false
    }

    /// Train on one series, returning an opaque fitted handle.
    fn fit(
        &self,
        y: ArrayView1<f32>,
        x: Option<ArrayView2<f32>>,
    ) -> Result<Box<dyn FittedModel>, ModelError>;

    /// Fit and forecast in one call without persisting the fitted handle.
    ///
    /// The default implementation composes [`fit`](Self::fit) and
    /// [`FittedModel::predict`], attaching the in-sample trace when `fitted`
    /// is requested. Models with a cheaper combined path may override it.
    fn forecast(
        &self,
        h: usize,
        y: ArrayView1<f32>,
        x: Option<ArrayView2<f32>>,
        x_future: Option<ArrayView2<f32>>,
        fitted: bool,
        levels: &[u32],
    ) -> Result<ModelOutput, ModelError> {
        let handle = self.fit(y, x)?;
        let mut out = handle.predict(h, x_future, levels)?;
        if fitted {
            out.fitted = Some(handle.fitted_values().to_owned());
        }
        Ok(out)
    }
}

/// A trained model handle produced by [`Forecaster::fit`].
///
/// Handles from different groups or models never share state, so a whole
/// matrix of them can be consumed from worker threads concurrently.
pub trait FittedModel: Send + Sync + std::fmt::Debug {
    /// Forecast `h` steps ahead.
    ///
    /// `levels` is non-empty only when the producing model supports
    /// intervals and the caller requested them.
    fn predict(
        &self,
        h: usize,
        x_future: Option<ArrayView2<f32>>,
        levels: &[u32],
    ) -> Result<ModelOutput, ModelError>;

    /// In-sample fitted values for the training rows, NaN where undefined.
    fn fitted_values(&self) -> ArrayView1<'_, f32>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn point_output_has_no_bands() {
        let out = ModelOutput::point(array![1.0, 2.0]);
        assert!(out.intervals.is_empty());
        assert!(out.fitted.is_none());
    }

    fn assert_send_sync<T: Send + Sync + ?Sized>() {}

    #[test]
    fn trait_objects_are_send_sync() {
        assert_send_sync::<dyn Forecaster>();
        assert_send_sync::<dyn FittedModel>();
    }
}
