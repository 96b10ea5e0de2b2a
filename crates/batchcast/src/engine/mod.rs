//! The high-level forecasting engine: validation, worker resolution, and
//! chunked dispatch over the sequential batch algorithms.
//!
//! Every operation is split / run / merge around the functions in
//! [`batch`](crate::batch): the buffer is partitioned into contiguous group
//! chunks, a [`ChunkRunner`] maps the unchanged sequential algorithm over the
//! chunks, and chunk outputs are stacked back in chunk order. A single-worker
//! call is the one-chunk case on the [`Serial`] runner and borrows the input
//! buffer directly. Group order is preserved end to end, so results never
//! depend on the worker count.

mod dispatch;

pub use dispatch::{ChunkRunner, Runner, Serial, WorkerPool};

pub use crate::batch::BatchError;

use ndarray::{concatenate, Array2, ArrayView2, Axis};

use crate::batch::{
    self, CvConfig, CvFitted, CvOutput, FittedOutput, FittedSet, ForecastOutput,
};
use crate::data::GroupedArray;
use crate::model::Forecaster;
use crate::utils::{resolve_workers, Verbosity};

// =============================================================================
// Engine
// =============================================================================

/// Batch forecasting over a [`GroupedArray`] with a fixed model list.
///
/// The engine owns the models and the state produced by stateful calls: the
/// fitted-model matrix after [`fit`](Self::fit), and the fitted-value side
/// channels after [`forecast`](Self::forecast) / a fitted
/// [`cross_validation`](Self::cross_validation) run.
///
/// `n_jobs` controls parallelism: `1` (the default) runs everything on the
/// calling thread, `0` sizes the pool automatically, anything else caps the
/// worker count. Workers never exceed the group count.
///
/// # Example
///
/// ```
/// use batchcast::{BatchForecaster, GroupedArrayBuilder, HistoricAverage, Naive};
///
/// let ga = GroupedArrayBuilder::new()
///     .push_series(&[1.0, 2.0, 3.0, 4.0, 5.0], None)
///     .push_series(&[8.0, 6.0, 7.0], None)
///     .build()
///     .unwrap();
///
/// let mut engine = BatchForecaster::new(vec![Box::new(Naive), Box::new(HistoricAverage)])
///     .with_n_jobs(2);
/// engine.fit(&ga).unwrap();
/// let out = engine.predict(&ga, 3, None, &[80]).unwrap();
/// assert_eq!(out.values.nrows(), 6);
/// ```
pub struct BatchForecaster {
    models: Vec<Box<dyn Forecaster>>,
    n_jobs: usize,
    verbosity: Verbosity,
    fitted: Option<FittedSet>,
    forecast_fitted: Option<FittedOutput>,
    cv_fitted: Option<CvFitted>,
}

impl BatchForecaster {
    /// Create an engine over the given models, sequential by default.
    ///
    /// # Panics
    ///
    /// An empty model list is a programmer error and panics.
    pub fn new(models: Vec<Box<dyn Forecaster>>) -> Self {
        assert!(!models.is_empty(), "at least one model is required");
        Self {
            models,
            n_jobs: 1,
            verbosity: Verbosity::default(),
            fitted: None,
            forecast_fitted: None,
            cv_fitted: None,
        }
    }

    /// Set the requested worker count (`0` = automatic).
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Set diagnostic verbosity.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// The model list, in output-column order.
    #[inline]
    pub fn models(&self) -> &[Box<dyn Forecaster>] {
        &self.models
    }

    /// The fitted-model matrix from the last [`fit`](Self::fit), if any.
    #[inline]
    pub fn fitted(&self) -> Option<&FittedSet> {
        self.fitted.as_ref()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fit every model on every group and retain the handles.
    ///
    /// Replaces any previously fitted state.
    pub fn fit(&mut self, ga: &GroupedArray) -> Result<(), BatchError> {
        let w = self.workers(ga.n_groups());
        let runner = Runner::new(w)?;
        let owned = (w > 1).then(|| ga.split(w));
        let chunks = chunk_refs(ga, owned.as_deref());
        let results = runner.run(chunks.len(), |i| batch::fit(chunks[i], &self.models));

        let mut iter = results.into_iter();
        let mut fm = iter.next().expect("split yields at least one chunk")?;
        for part in iter {
            fm.extend(part?);
        }
        self.fitted = Some(fm);
        Ok(())
    }

    /// Forecast `h` steps from the handles retained by [`fit`](Self::fit).
    ///
    /// `ga` must be the buffer the engine was fitted on; `x_future` must
    /// carry one row per horizon step per group and exactly the training
    /// buffer's exogenous columns.
    pub fn predict(
        &self,
        ga: &GroupedArray,
        h: usize,
        x_future: Option<&GroupedArray>,
        levels: &[u32],
    ) -> Result<ForecastOutput, BatchError> {
        let fm = self.fitted.as_ref().ok_or(BatchError::NotFitted)?;
        assert_eq!(
            fm.n_groups(),
            ga.n_groups(),
            "predict buffer does not match the fitted buffer"
        );
        validate_horizon(h)?;
        validate_levels(levels)?;
        validate_future(ga, x_future, h)?;

        let w = self.workers(ga.n_groups());
        let runner = Runner::new(w)?;
        let owned = (w > 1).then(|| ga.split(w));
        let chunks = chunk_refs(ga, owned.as_deref());
        let fm_chunks = fm.chunks(chunks.len());
        let x_owned = x_future.filter(|_| w > 1).map(|x| x.split(w));
        let x_chunks = future_chunk_refs(x_future, x_owned.as_deref());

        let results = runner.run(chunks.len(), |i| {
            batch::predict(
                chunks[i],
                &fm_chunks[i],
                h,
                x_chunks.as_ref().map(|xs| xs[i]),
                levels,
            )
        });
        merge_forecasts(results)
    }

    /// Fit then forecast in one call, retaining the fitted handles.
    pub fn fit_predict(
        &mut self,
        ga: &GroupedArray,
        h: usize,
        x_future: Option<&GroupedArray>,
        levels: &[u32],
    ) -> Result<ForecastOutput, BatchError> {
        validate_horizon(h)?;
        validate_levels(levels)?;
        validate_future(ga, x_future, h)?;

        let w = self.workers(ga.n_groups());
        let runner = Runner::new(w)?;
        let owned = (w > 1).then(|| ga.split(w));
        let chunks = chunk_refs(ga, owned.as_deref());
        let x_owned = x_future.filter(|_| w > 1).map(|x| x.split(w));
        let x_chunks = future_chunk_refs(x_future, x_owned.as_deref());

        let results = runner.run(chunks.len(), |i| {
            batch::fit_predict(
                chunks[i],
                &self.models,
                h,
                x_chunks.as_ref().map(|xs| xs[i]),
                levels,
            )
        });
        let mut sets = Vec::with_capacity(results.len());
        let mut outs = Vec::with_capacity(results.len());
        for part in results {
            let (set, out) = part?;
            sets.push(set);
            outs.push(Ok(out));
        }
        let mut iter = sets.into_iter();
        let mut fm = iter.next().expect("split yields at least one chunk");
        for part in iter {
            fm.extend(part);
        }
        let out = merge_forecasts(outs)?;
        self.fitted = Some(fm);
        Ok(out)
    }

    /// Fit and forecast per group without retaining handles.
    ///
    /// With `fitted = true` the in-sample fitted values are recorded and can
    /// be read back with
    /// [`forecast_fitted_values`](Self::forecast_fitted_values); with
    /// `fitted = false` any previously recorded values are cleared.
    pub fn forecast(
        &mut self,
        ga: &GroupedArray,
        h: usize,
        x_future: Option<&GroupedArray>,
        levels: &[u32],
        fitted: bool,
    ) -> Result<ForecastOutput, BatchError> {
        validate_horizon(h)?;
        validate_levels(levels)?;
        validate_future(ga, x_future, h)?;

        let w = self.workers(ga.n_groups());
        let runner = Runner::new(w)?;
        let owned = (w > 1).then(|| ga.split(w));
        let chunks = chunk_refs(ga, owned.as_deref());
        let x_owned = x_future.filter(|_| w > 1).map(|x| x.split(w));
        let x_chunks = future_chunk_refs(x_future, x_owned.as_deref());

        let results = runner.run(chunks.len(), |i| {
            batch::forecast(
                chunks[i],
                &self.models,
                h,
                x_chunks.as_ref().map(|xs| xs[i]),
                levels,
                fitted,
            )
        });
        let mut outs = Vec::with_capacity(results.len());
        let mut fitted_parts = Vec::with_capacity(results.len());
        for part in results {
            let (out, fv) = part?;
            outs.push(Ok(out));
            if let Some(fv) = fv {
                fitted_parts.push(fv);
            }
        }
        let fitted_out = fitted.then(|| FittedOutput {
            values: stack_rows(fitted_parts.iter().map(|p| p.values.view())),
            columns: fitted_parts[0].columns.clone(),
        });
        let out = merge_forecasts(outs)?;
        self.forecast_fitted = fitted_out;
        Ok(out)
    }

    /// Walk-forward cross-validation over every group.
    ///
    /// With `cfg.fitted = true` the per-window fitted values are recorded and
    /// can be read back with
    /// [`cross_validation_fitted_values`](Self::cross_validation_fitted_values);
    /// otherwise any previously recorded values are cleared.
    pub fn cross_validation(
        &mut self,
        ga: &GroupedArray,
        cfg: &CvConfig,
    ) -> Result<CvOutput, BatchError> {
        validate_levels(&cfg.levels)?;
        let n_windows = cfg.n_windows()?;

        let w = self.workers(ga.n_groups());
        let runner = Runner::new(w)?;
        let owned = (w > 1).then(|| ga.split(w));
        let chunks = chunk_refs(ga, owned.as_deref());

        let results = runner.run(chunks.len(), |i| {
            batch::cross_validation(chunks[i], &self.models, cfg)
        });
        let mut outs = Vec::with_capacity(results.len());
        let mut sides = Vec::with_capacity(results.len());
        for part in results {
            let (out, side) = part?;
            outs.push(out);
            if let Some(side) = side {
                sides.push(side);
            }
        }
        let merged = CvOutput {
            values: stack_rows(outs.iter().map(|o| o.values.view())),
            n_windows,
            columns: outs[0].columns.clone(),
        };
        // Chunk blocks are stacked whole, so the side channel is window-major
        // within each chunk rather than globally.
        let side = cfg.fitted.then(|| CvFitted {
            values: stack_rows(sides.iter().map(|s| s.values.view())),
            idxs: sides.iter().flat_map(|s| s.idxs.iter().copied()).collect(),
            last_idxs: sides
                .iter()
                .flat_map(|s| s.last_idxs.iter().copied())
                .collect(),
            columns: sides[0].columns.clone(),
        });
        self.cv_fitted = side;
        Ok(merged)
    }

    // =========================================================================
    // Fitted-Value Accessors
    // =========================================================================

    /// In-sample fitted values from the last `forecast(.., fitted = true)`.
    ///
    /// # Errors
    ///
    /// [`BatchError::FittedUnavailable`] when no such call has been made.
    pub fn forecast_fitted_values(&self) -> Result<&FittedOutput, BatchError> {
        self.forecast_fitted
            .as_ref()
            .ok_or(BatchError::FittedUnavailable)
    }

    /// Per-window fitted values from the last fitted cross-validation run.
    ///
    /// # Errors
    ///
    /// [`BatchError::FittedUnavailable`] when no such run has been made.
    pub fn cross_validation_fitted_values(&self) -> Result<&CvFitted, BatchError> {
        self.cv_fitted.as_ref().ok_or(BatchError::FittedUnavailable)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn workers(&self, n_groups: usize) -> usize {
        let w = resolve_workers(n_groups, self.n_jobs);
        if self.verbosity.is_info() && self.n_jobs != 1 {
            eprintln!("batchcast: dispatching {n_groups} groups across {w} workers");
        }
        w
    }
}

impl std::fmt::Debug for BatchForecaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchForecaster")
            .field("models", &self.models.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("n_jobs", &self.n_jobs)
            .field("fitted", &self.fitted.is_some())
            .finish()
    }
}

// =============================================================================
// Chunk Borrowing
// =============================================================================

/// The per-chunk borrows for a call: the split chunks when a pool is active,
/// or the input buffer itself as the single chunk (no copy).
fn chunk_refs<'a>(
    ga: &'a GroupedArray,
    owned: Option<&'a [GroupedArray]>,
) -> Vec<&'a GroupedArray> {
    match owned {
        Some(chunks) => chunks.iter().collect(),
        None => vec![ga],
    }
}

fn future_chunk_refs<'a>(
    x_future: Option<&'a GroupedArray>,
    owned: Option<&'a [GroupedArray]>,
) -> Option<Vec<&'a GroupedArray>> {
    match (owned, x_future) {
        (Some(chunks), _) => Some(chunks.iter().collect()),
        (None, Some(x)) => Some(vec![x]),
        (None, None) => None,
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_horizon(h: usize) -> Result<(), BatchError> {
    if h == 0 {
        return Err(BatchError::InvalidHorizon);
    }
    Ok(())
}

fn validate_levels(levels: &[u32]) -> Result<(), BatchError> {
    match levels.iter().find(|&&l| l == 0 || l >= 100) {
        Some(&level) => Err(BatchError::InvalidLevel { level }),
        None => Ok(()),
    }
}

/// A future-exogenous buffer carries only exogenous columns: its column
/// count must equal the training buffer's exogenous count, and every group
/// must have exactly `h` rows.
fn validate_future(
    ga: &GroupedArray,
    x_future: Option<&GroupedArray>,
    h: usize,
) -> Result<(), BatchError> {
    let Some(x) = x_future else { return Ok(()) };
    let rows_ok = x.n_groups() == ga.n_groups()
        && (0..x.n_groups()).all(|g| x.group(g).nrows() == h);
    if !rows_ok || x.values().ncols() != ga.n_exog() {
        return Err(BatchError::FutureExogShape {
            expected_groups: ga.n_groups(),
            h,
            expected_cols: ga.n_exog(),
            got_groups: x.n_groups(),
            got_rows: x.values().nrows(),
            got_cols: x.values().ncols(),
        });
    }
    Ok(())
}

// =============================================================================
// Merging
// =============================================================================

fn stack_rows<'a>(parts: impl Iterator<Item = ArrayView2<'a, f32>>) -> Array2<f32> {
    let views: Vec<_> = parts.collect();
    debug_assert!(!views.is_empty());
    concatenate(Axis(0), &views).expect("chunk outputs share a column count")
}

fn merge_forecasts(
    results: Vec<Result<ForecastOutput, crate::model::ModelError>>,
) -> Result<ForecastOutput, BatchError> {
    let parts = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    Ok(ForecastOutput {
        values: stack_rows(parts.iter().map(|p| p.values.view())),
        columns: parts[0].columns.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GroupedArrayBuilder;
    use crate::model::{HistoricAverage, Naive, WindowAverage};
    use ndarray::Array2;

    fn ga_three_groups() -> GroupedArray {
        GroupedArrayBuilder::new()
            .push_series(&[1.0, 2.0, 3.0, 4.0, 5.0], None)
            .push_series(&[10.0, 20.0, 30.0], None)
            .push_series(&[7.0, 7.0, 7.0, 7.0], None)
            .build()
            .unwrap()
    }

    fn engine() -> BatchForecaster {
        BatchForecaster::new(vec![Box::new(Naive), Box::new(HistoricAverage)])
    }

    #[test]
    fn predict_requires_fit() {
        let ga = ga_three_groups();
        let eng = engine();
        assert!(matches!(
            eng.predict(&ga, 2, None, &[]),
            Err(BatchError::NotFitted)
        ));
    }

    #[test]
    fn fit_then_predict_sequential() {
        let ga = ga_three_groups();
        let mut eng = engine();
        eng.fit(&ga).unwrap();
        let out = eng.predict(&ga, 2, None, &[]).unwrap();
        assert_eq!(out.values.nrows(), 6);
        assert_eq!(out.columns, vec!["Naive", "HistoricAverage"]);
        assert_eq!(out.values[[0, 0]], 5.0);
        assert_eq!(out.values[[2, 0]], 30.0);
    }

    #[test]
    fn parallel_fit_predict_matches_sequential() {
        let ga = ga_three_groups();
        let mut seq = engine();
        let seq_out = seq.fit_predict(&ga, 3, None, &[80]).unwrap();
        for n_jobs in [2, 3, 5] {
            let mut par = engine().with_n_jobs(n_jobs);
            let par_out = par.fit_predict(&ga, 3, None, &[80]).unwrap();
            assert_eq!(par_out.values, seq_out.values, "n_jobs = {n_jobs}");
            assert_eq!(par_out.columns, seq_out.columns);
        }
    }

    #[test]
    fn single_group_collapses_to_one_chunk() {
        // One group clamps any worker request to 1, taking the serial
        // one-chunk path regardless of n_jobs.
        let ga = GroupedArrayBuilder::new()
            .push_series(&[1.0, 2.0, 3.0, 4.0], None)
            .build()
            .unwrap();
        let mut wide = engine().with_n_jobs(8);
        let mut seq = engine();
        let wide_out = wide.forecast(&ga, 2, None, &[90], false).unwrap();
        let seq_out = seq.forecast(&ga, 2, None, &[90], false).unwrap();
        assert_eq!(wide_out.values, seq_out.values);
        assert_eq!(wide_out.columns, seq_out.columns);
    }

    #[test]
    fn forecast_records_and_clears_fitted_values() {
        let ga = ga_three_groups();
        let mut eng = BatchForecaster::new(vec![Box::new(Naive)]);
        assert!(matches!(
            eng.forecast_fitted_values(),
            Err(BatchError::FittedUnavailable)
        ));
        eng.forecast(&ga, 2, None, &[], true).unwrap();
        let fitted = eng.forecast_fitted_values().unwrap();
        assert_eq!(fitted.values.nrows(), ga.n_rows());
        assert_eq!(fitted.columns, vec!["y", "Naive"]);
        eng.forecast(&ga, 2, None, &[], false).unwrap();
        assert!(matches!(
            eng.forecast_fitted_values(),
            Err(BatchError::FittedUnavailable)
        ));
    }

    #[test]
    fn cross_validation_records_side_channel() {
        let ga = ga_three_groups();
        let mut eng = BatchForecaster::new(vec![Box::new(Naive)]);
        let cfg = CvConfig::builder().h(1).test_size(2).fitted(true).build();
        let out = eng.cross_validation(&ga, &cfg).unwrap();
        assert_eq!(out.n_windows, 2);
        assert_eq!(out.values.nrows(), 6); // 3 groups * 2 windows * h 1
        let side = eng.cross_validation_fitted_values().unwrap();
        assert_eq!(side.values.nrows(), ga.n_rows() * 2);
    }

    #[test]
    fn rejects_zero_horizon_and_bad_levels() {
        let ga = ga_three_groups();
        let mut eng = BatchForecaster::new(vec![Box::new(Naive)]);
        assert!(matches!(
            eng.forecast(&ga, 0, None, &[], false),
            Err(BatchError::InvalidHorizon)
        ));
        assert!(matches!(
            eng.forecast(&ga, 2, None, &[100], false),
            Err(BatchError::InvalidLevel { level: 100 })
        ));
        assert!(matches!(
            eng.forecast(&ga, 2, None, &[0], false),
            Err(BatchError::InvalidLevel { level: 0 })
        ));
    }

    #[test]
    fn rejects_misshapen_future_exog() {
        let ga = ga_three_groups(); // no exogenous columns
        let x = GroupedArray::from_parts(
            Array2::zeros((6, 1)),
            vec![0, 2, 4, 6],
        )
        .unwrap();
        let mut eng = BatchForecaster::new(vec![Box::new(Naive)]);
        assert!(matches!(
            eng.forecast(&ga, 2, Some(&x), &[], false),
            Err(BatchError::FutureExogShape { expected_cols: 0, .. })
        ));
    }

    #[test]
    fn model_failure_aborts_the_whole_call() {
        let ga = ga_three_groups();
        // Window longer than the shortest series fails that group's fit.
        let mut eng = BatchForecaster::new(vec![Box::new(WindowAverage { window: 4 })])
            .with_n_jobs(3);
        assert!(eng.forecast(&ga, 1, None, &[], false).is_err());
    }
}
