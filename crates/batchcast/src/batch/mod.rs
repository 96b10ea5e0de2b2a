//! Batch algorithms over a [`GroupedArray`]: fit, predict, combined
//! fit-predict, one-shot forecast, and walk-forward cross-validation.
//!
//! Everything here is strictly sequential; the parallel path in
//! [`engine`](crate::engine) re-partitions the buffer and runs these same
//! functions per chunk, which is what makes parallel execution
//! observationally equivalent to sequential.

mod output;

pub use output::{CvFitted, CvOutput, FittedOutput, ForecastOutput};

use std::fmt;
use std::ops::Range;

use bon::Builder;
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::data::GroupedArray;
use crate::layout::ColumnLayout;
use crate::model::{FittedModel, Forecaster, ModelError, ModelOutput};
use crate::utils::chunk_ranges;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by batch operations and the engine built on them.
///
/// Configuration errors are detected before any model runs; model failures
/// abort the whole batch call in both sequential and parallel modes.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The forecast horizon must be positive.
    #[error("forecast horizon must be positive")]
    InvalidHorizon,

    /// `step_size` must be positive.
    #[error("step_size must be positive")]
    InvalidStepSize,

    /// Interval levels are percentages strictly between 0 and 100.
    #[error("interval level {level} must lie in (0, 100)")]
    InvalidLevel { level: u32 },

    /// `test_size - h` must be a multiple of `step_size`.
    #[error(
        "`test_size - h` must be divisible by `step_size` \
         (test_size={test_size}, h={h}, step_size={step_size})"
    )]
    InvalidWindow {
        test_size: usize,
        h: usize,
        step_size: usize,
    },

    /// Every series needs at least one training row before the first cutoff.
    #[error("test_size {test_size} leaves no training data for group {group} ({len} rows)")]
    TestSizeTooLarge {
        test_size: usize,
        group: usize,
        len: usize,
    },

    /// The future exogenous buffer does not line up with the training
    /// buffer and horizon.
    #[error(
        "future exogenous buffer must have {expected_groups} groups of {h} rows \
         and {expected_cols} columns, got {got_groups} groups, {got_rows} rows, \
         {got_cols} columns"
    )]
    FutureExogShape {
        expected_groups: usize,
        h: usize,
        expected_cols: usize,
        got_groups: usize,
        got_rows: usize,
        got_cols: usize,
    },

    /// `predict` was called before `fit`.
    #[error("`predict` requires a prior `fit` call")]
    NotFitted,

    /// A fitted-value accessor was called but the producing call did not
    /// request fitted values.
    #[error("fitted values were not recorded; rerun with `fitted = true`")]
    FittedUnavailable,

    /// Worker-pool construction failed.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A model fit/predict/forecast failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

// =============================================================================
// Fitted Model Matrix
// =============================================================================

/// The `[group, model]` matrix of trained handles produced by [`fit`].
///
/// Handles are stored row-major (all models of group 0, then group 1, ...).
/// Model names and interval capabilities are captured at fit time so a later
/// `predict` needs nothing but this set.
pub struct FittedSet {
    handles: Vec<Box<dyn FittedModel>>,
    names: Vec<String>,
    supports: Vec<bool>,
}

impl FittedSet {
    /// Number of models per group.
    #[inline]
    pub fn n_models(&self) -> usize {
        self.names.len()
    }

    /// Number of groups.
    #[inline]
    pub fn n_groups(&self) -> usize {
        self.handles.len() / self.names.len()
    }

    /// Model names in model order.
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Per-model interval capability in model order.
    #[inline]
    pub fn supports(&self) -> &[bool] {
        &self.supports
    }

    /// The handle for `(group, model)`.
    ///
    /// # Panics
    ///
    /// Out-of-range indices are a programmer error and panic.
    #[inline]
    pub fn get(&self, group: usize, model: usize) -> &dyn FittedModel {
        assert!(group < self.n_groups() && model < self.n_models());
        self.handles[group * self.n_models() + model].as_ref()
    }

    /// A view covering every group.
    pub fn view_all(&self) -> FittedSetView<'_> {
        FittedSetView {
            set: self,
            groups: 0..self.n_groups(),
        }
    }

    /// Borrowed per-chunk views using the same boundary rule as
    /// [`GroupedArray::split`], so chunk `i` of the set lines up row-for-row
    /// with chunk `i` of the buffer it was fitted on.
    pub fn chunks(&self, n: usize) -> Vec<FittedSetView<'_>> {
        chunk_ranges(self.n_groups(), n)
            .into_iter()
            .map(|groups| FittedSetView { set: self, groups })
            .collect()
    }

    /// Append another set's groups (used to merge parallel fit results).
    ///
    /// # Panics
    ///
    /// Debug-asserts that both sets were fitted with the same model list.
    pub fn extend(&mut self, other: FittedSet) {
        debug_assert_eq!(self.names, other.names);
        self.handles.extend(other.handles);
    }
}

impl fmt::Debug for FittedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FittedSet")
            .field("n_groups", &self.n_groups())
            .field("models", &self.names)
            .finish()
    }
}

/// A borrowed, group-contiguous slice of a [`FittedSet`].
#[derive(Clone)]
pub struct FittedSetView<'a> {
    set: &'a FittedSet,
    groups: Range<usize>,
}

impl FittedSetView<'_> {
    #[inline]
    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn n_models(&self) -> usize {
        self.set.n_models()
    }

    #[inline]
    pub fn names(&self) -> &[String] {
        self.set.names()
    }

    #[inline]
    pub fn supports(&self) -> &[bool] {
        self.set.supports()
    }

    /// The handle for `(group, model)`, with `group` local to this view.
    #[inline]
    pub fn get(&self, group: usize, model: usize) -> &dyn FittedModel {
        assert!(group < self.groups.len());
        self.set.get(self.groups.start + group, model)
    }
}

// =============================================================================
// Cross-Validation Configuration
// =============================================================================

fn default_step_size() -> usize {
    1
}

/// Walk-forward cross-validation configuration.
///
/// # Example
///
/// ```
/// use batchcast::CvConfig;
///
/// let cfg = CvConfig::builder().h(5).test_size(10).step_size(5).build();
/// assert_eq!(cfg.n_windows().unwrap(), 2);
/// ```
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct CvConfig {
    /// Forecast horizon per window.
    pub h: usize,
    /// Total rows held out at the end of each series.
    pub test_size: usize,
    /// Cutoff spacing. Default 1.
    #[builder(default = 1)]
    #[serde(default = "default_step_size")]
    pub step_size: usize,
    /// Fixed training-window length; unset means expanding window (all
    /// history up to the cutoff).
    #[serde(default)]
    pub input_size: Option<usize>,
    /// Prediction-interval levels, possibly empty.
    #[builder(default)]
    #[serde(default)]
    pub levels: Vec<u32>,
    /// Record per-window fitted values and masks.
    #[builder(default)]
    #[serde(default)]
    pub fitted: bool,
}

impl CvConfig {
    /// Configuration from a window count instead of a held-out size.
    ///
    /// Derives `test_size = h + step_size * (n_windows - 1)`, the smallest
    /// hold-out that yields exactly `n_windows` cutoffs. Levels, `input_size`,
    /// and `fitted` start at their defaults; adjust the public fields
    /// afterwards when needed.
    ///
    /// # Example
    ///
    /// ```
    /// use batchcast::CvConfig;
    ///
    /// let cfg = CvConfig::from_n_windows(5, 2, 5);
    /// assert_eq!(cfg.test_size, 15);
    /// assert_eq!(cfg.n_windows().unwrap(), 2);
    /// ```
    ///
    /// # Panics
    ///
    /// A zero window count is a programmer error and panics.
    pub fn from_n_windows(h: usize, n_windows: usize, step_size: usize) -> Self {
        assert!(n_windows > 0, "at least one window is required");
        Self {
            h,
            test_size: h + step_size * (n_windows - 1),
            step_size,
            input_size: None,
            levels: Vec::new(),
            fitted: false,
        }
    }

    /// Number of walk-forward windows, validating the window arithmetic.
    ///
    /// # Errors
    ///
    /// [`BatchError::InvalidHorizon`] / [`BatchError::InvalidStepSize`] for
    /// zero parameters, [`BatchError::InvalidWindow`] when `test_size - h`
    /// is not a multiple of `step_size`.
    pub fn n_windows(&self) -> Result<usize, BatchError> {
        if self.h == 0 {
            return Err(BatchError::InvalidHorizon);
        }
        if self.step_size == 0 {
            return Err(BatchError::InvalidStepSize);
        }
        if self.test_size < self.h || (self.test_size - self.h) % self.step_size != 0 {
            return Err(BatchError::InvalidWindow {
                test_size: self.test_size,
                h: self.h,
                step_size: self.step_size,
            });
        }
        Ok((self.test_size - self.h) / self.step_size + 1)
    }
}

// =============================================================================
// Record Writing
// =============================================================================

/// Write one model's output block at `(row0, col0)`: mean first, then all
/// lower bounds in level order, then all upper bounds.
fn write_record(values: &mut Array2<f32>, row0: usize, col0: usize, rec: &ModelOutput, h: usize) {
    debug_assert_eq!(rec.mean.len(), h, "model returned wrong horizon");
    for (r, &v) in rec.mean.iter().enumerate() {
        values[[row0 + r, col0]] = v;
    }
    let k = rec.intervals.len();
    for (b, band) in rec.intervals.iter().enumerate() {
        debug_assert_eq!(band.lo.len(), h);
        debug_assert_eq!(band.hi.len(), h);
        for r in 0..h {
            values[[row0 + r, col0 + 1 + b]] = band.lo[r];
            values[[row0 + r, col0 + 1 + k + b]] = band.hi[r];
        }
    }
}

// =============================================================================
// fit / predict / fit_predict
// =============================================================================

/// Fit every model on every group, producing the fitted-model matrix.
///
/// All `(group, model)` fits are independent; iteration order is group-major
/// but nothing depends on it.
///
/// # Panics
///
/// An empty model list is a programmer error and panics; the resulting set
/// would have no well-defined group count.
pub fn fit(ga: &GroupedArray, models: &[Box<dyn Forecaster>]) -> Result<FittedSet, ModelError> {
    assert!(!models.is_empty(), "at least one model is required");
    let mut handles = Vec::with_capacity(ga.n_groups() * models.len());
    for g in 0..ga.n_groups() {
        let (y, x) = ga.series(g);
        for model in models {
            handles.push(model.fit(y.view(), x.as_ref().map(|v| v.view()))?);
        }
    }
    Ok(FittedSet {
        handles,
        names: models.iter().map(|m| m.name().to_string()).collect(),
        supports: models.iter().map(|m| m.supports_intervals()).collect(),
    })
}

/// Forecast `h` steps from previously fitted handles.
///
/// Levels are passed through only to interval-capable models; every model's
/// record lands in its own column block at the group's row range.
pub fn predict(
    ga: &GroupedArray,
    fm: &FittedSetView<'_>,
    h: usize,
    x_future: Option<&GroupedArray>,
    levels: &[u32],
) -> Result<ForecastOutput, ModelError> {
    debug_assert_eq!(ga.n_groups(), fm.n_groups(), "buffer/fitted-set mismatch");
    let layout = ColumnLayout::plan(fm.supports(), levels);
    let mut values = Array2::from_elem((ga.n_groups() * h, layout.total()), f32::NAN);
    for m in 0..fm.n_models() {
        let lv = layout.levels_for(m);
        for g in 0..ga.n_groups() {
            let xf = x_future.map(|x| x.group(g));
            let rec = fm.get(g, m).predict(h, xf, lv)?;
            write_record(&mut values, g * h, layout.range(m).start, &rec, h);
        }
    }
    let names: Vec<&str> = fm.names().iter().map(String::as_str).collect();
    Ok(ForecastOutput {
        values,
        columns: layout.names(&names),
    })
}

/// Fit then predict; a pure composition with no shared-state shortcut.
pub fn fit_predict(
    ga: &GroupedArray,
    models: &[Box<dyn Forecaster>],
    h: usize,
    x_future: Option<&GroupedArray>,
    levels: &[u32],
) -> Result<(FittedSet, ForecastOutput), ModelError> {
    let fm = fit(ga, models)?;
    let fcst = predict(ga, &fm.view_all(), h, x_future, levels)?;
    Ok((fm, fcst))
}

// =============================================================================
// forecast
// =============================================================================

/// One-shot fit+forecast per `(group, model)` without persisting handles.
///
/// When `fitted` is requested, each model's in-sample trace is written at the
/// group's original rows of a full-height side buffer whose column 0 repeats
/// the target. Fitted values carry no interval columns.
pub fn forecast(
    ga: &GroupedArray,
    models: &[Box<dyn Forecaster>],
    h: usize,
    x_future: Option<&GroupedArray>,
    levels: &[u32],
    fitted: bool,
) -> Result<(ForecastOutput, Option<FittedOutput>), ModelError> {
    let supports: Vec<bool> = models.iter().map(|m| m.supports_intervals()).collect();
    let layout = ColumnLayout::plan(&supports, levels);
    let mut values = Array2::from_elem((ga.n_groups() * h, layout.total()), f32::NAN);

    let mut fitted_vals = fitted.then(|| {
        let mut fv = Array2::from_elem((ga.n_rows(), 1 + models.len()), f32::NAN);
        fv.column_mut(0).assign(&ga.targets());
        fv
    });

    for g in 0..ga.n_groups() {
        let (y, x) = ga.series(g);
        let xf = x_future.map(|x| x.group(g));
        for (m, model) in models.iter().enumerate() {
            let rec = model.forecast(
                h,
                y.view(),
                x.as_ref().map(|v| v.view()),
                xf.as_ref().map(|v| v.view()),
                fitted,
                layout.levels_for(m),
            )?;
            write_record(&mut values, g * h, layout.range(m).start, &rec, h);
            if let Some(fv) = fitted_vals.as_mut() {
                let trace = rec.fitted.as_ref().ok_or_else(|| ModelError::MissingFitted {
                    model: model.name().to_string(),
                })?;
                debug_assert_eq!(trace.len(), y.len());
                let start = ga.offset(g);
                for (r, &v) in trace.iter().enumerate() {
                    fv[[start + r, 1 + m]] = v;
                }
            }
        }
    }

    let names: Vec<&str> = models.iter().map(|m| m.name()).collect();
    let out = ForecastOutput {
        values,
        columns: layout.names(&names),
    };
    let fitted_out = fitted_vals.map(|values| FittedOutput {
        values,
        columns: std::iter::once("y".to_string())
            .chain(names.iter().map(|n| (*n).to_string()))
            .collect(),
    });
    Ok((out, fitted_out))
}

// =============================================================================
// cross_validation
// =============================================================================

/// Walk-forward cross-validation.
///
/// Window cutoffs run from `test_size` rows before the end of each series to
/// `h` rows before it, spaced `step_size` apart; window 0 is the most
/// historical. For each window the model sees only rows before the cutoff
/// (the full history, or the last `input_size` rows when set) and is scored
/// against the `h` rows after it; the final window's test slice runs through
/// the end of the series.
pub fn cross_validation(
    ga: &GroupedArray,
    models: &[Box<dyn Forecaster>],
    cfg: &CvConfig,
) -> Result<(CvOutput, Option<CvFitted>), BatchError> {
    let n_windows = cfg.n_windows()?;
    let h = cfg.h;
    let n_models = models.len();
    let supports: Vec<bool> = models.iter().map(|m| m.supports_intervals()).collect();
    let layout = ColumnLayout::plan(&supports, &cfg.levels);

    // Column 0 carries the realized actuals.
    let mut values = Array2::from_elem(
        (ga.n_groups() * n_windows * h, 1 + layout.total()),
        f32::NAN,
    );
    let mut side = cfg.fitted.then(|| CvFitted {
        values: Array2::from_elem((ga.n_rows() * n_windows, 1 + n_models), f32::NAN),
        idxs: vec![false; ga.n_rows() * n_windows],
        last_idxs: vec![false; ga.n_rows() * n_windows],
        columns: std::iter::once("y".to_string())
            .chain(models.iter().map(|m| m.name().to_string()))
            .collect(),
    });

    for g in 0..ga.n_groups() {
        let grp = ga.group(g);
        let n = grp.nrows();
        if cfg.test_size >= n {
            return Err(BatchError::TestSizeTooLarge {
                test_size: cfg.test_size,
                group: g,
                len: n,
            });
        }
        for w in 0..n_windows {
            // Absolute cutoff: `test_size` from the end, stepping forward.
            let cut = n - cfg.test_size + w * cfg.step_size;
            let train_size = cfg.input_size.map_or(cut, |s| s.min(cut));
            let train = grp.slice(s![cut - train_size..cut, ..]);
            let y_train = train.column(0);
            let x_train = (grp.ncols() > 1).then(|| train.slice(s![.., 1..]));
            // `cut + h <= n` always holds; the last window ends exactly at
            // the end of the series.
            let test = grp.slice(s![cut..cut + h, ..]);
            let x_future = (grp.ncols() > 1).then(|| test.slice(s![.., 1..]));

            let row0 = (g * n_windows + w) * h;
            for (r, &actual) in test.column(0).iter().enumerate() {
                values[[row0 + r, 0]] = actual;
            }

            if let Some(side) = side.as_mut() {
                // (row, window) flattened column-major: window block first.
                let base = w * ga.n_rows() + ga.offset(g);
                for (r, &v) in y_train.iter().enumerate() {
                    let row = base + cut - train_size + r;
                    side.values[[row, 0]] = v;
                    side.idxs[row] = true;
                }
                side.last_idxs[base + cut - 1] = true;
            }

            for (m, model) in models.iter().enumerate() {
                let rec = model.forecast(
                    h,
                    y_train.view(),
                    x_train.as_ref().map(|v| v.view()),
                    x_future.as_ref().map(|v| v.view()),
                    cfg.fitted,
                    layout.levels_for(m),
                )?;
                write_record(&mut values, row0, 1 + layout.range(m).start, &rec, h);
                if let Some(side) = side.as_mut() {
                    let trace = rec.fitted.as_ref().ok_or_else(|| ModelError::MissingFitted {
                        model: model.name().to_string(),
                    })?;
                    debug_assert_eq!(trace.len(), train_size);
                    let base = w * ga.n_rows() + ga.offset(g);
                    for (r, &v) in trace.iter().enumerate() {
                        side.values[[base + cut - train_size + r, 1 + m]] = v;
                    }
                }
            }
        }
    }

    let names: Vec<&str> = models.iter().map(|m| m.name()).collect();
    let columns = std::iter::once("y".to_string())
        .chain(layout.names(&names))
        .collect();
    Ok((
        CvOutput {
            values,
            n_windows,
            columns,
        },
        side,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GroupedArrayBuilder;
    use crate::model::{HistoricAverage, Naive, WindowAverage};
    use approx::assert_abs_diff_eq;

    fn ga_two_groups() -> GroupedArray {
        GroupedArrayBuilder::new()
            .push_series(&[1.0, 2.0, 3.0, 4.0, 5.0], None)
            .push_series(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0], None)
            .build()
            .unwrap()
    }

    fn naive_only() -> Vec<Box<dyn Forecaster>> {
        vec![Box::new(Naive)]
    }

    #[test]
    fn fit_produces_one_handle_per_group_and_model() {
        let ga = ga_two_groups();
        let models: Vec<Box<dyn Forecaster>> = vec![Box::new(Naive), Box::new(HistoricAverage)];
        let fm = fit(&ga, &models).unwrap();
        assert_eq!(fm.n_groups(), 2);
        assert_eq!(fm.n_models(), 2);
        assert_eq!(fm.names(), &["Naive", "HistoricAverage"]);
        assert_eq!(fm.supports(), &[true, true]);
    }

    #[test]
    #[should_panic(expected = "at least one model is required")]
    fn fit_rejects_empty_model_list() {
        let ga = ga_two_groups();
        let _ = fit(&ga, &[]);
    }

    #[test]
    fn fitted_set_chunks_align_with_buffer_split() {
        let ga = GroupedArrayBuilder::new()
            .push_series(&[1.0, 2.0], None)
            .push_series(&[3.0, 4.0], None)
            .push_series(&[5.0, 6.0], None)
            .push_series(&[7.0, 8.0], None)
            .push_series(&[9.0, 10.0], None)
            .build()
            .unwrap();
        let fm = fit(&ga, &naive_only()).unwrap();
        let buf_chunks = ga.split(3);
        let fm_chunks = fm.chunks(3);
        assert_eq!(buf_chunks.len(), fm_chunks.len());
        for (b, f) in buf_chunks.iter().zip(&fm_chunks) {
            assert_eq!(b.n_groups(), f.n_groups());
        }
        // 5 over 3 gives sizes 2, 2, 1; chunk 1 starts at global group 2.
        let out = predict(&buf_chunks[1], &fm_chunks[1], 1, None, &[]).unwrap();
        assert_eq!(out.values[[0, 0]], 6.0); // last value of group 2
    }

    #[test]
    fn predict_writes_each_model_block() {
        let ga = ga_two_groups();
        let models: Vec<Box<dyn Forecaster>> =
            vec![Box::new(Naive), Box::new(WindowAverage { window: 2 })];
        let fm = fit(&ga, &models).unwrap();
        let out = predict(&ga, &fm.view_all(), 2, None, &[80]).unwrap();
        // Naive has intervals (width 3), WindowAverage is mean-only.
        assert_eq!(
            out.columns,
            vec!["Naive", "Naive-lo-80", "Naive-hi-80", "WindowAverage"]
        );
        assert_eq!(out.values.nrows(), 4);
        // Group 0: last = 5, trailing-2 mean = 4.5.
        assert_eq!(out.values[[0, 0]], 5.0);
        assert_abs_diff_eq!(out.values[[0, 3]], 4.5, epsilon = 1e-6);
        // Group 1 rows start at h = 2.
        assert_eq!(out.values[[2, 0]], 60.0);
        assert_abs_diff_eq!(out.values[[2, 3]], 55.0, epsilon = 1e-6);
    }

    #[test]
    fn fit_predict_composes() {
        let ga = ga_two_groups();
        let models = naive_only();
        let (fm, fcst) = fit_predict(&ga, &models, 3, None, &[]).unwrap();
        assert_eq!(fm.n_groups(), 2);
        let direct = forecast(&ga, &models, 3, None, &[], false).unwrap().0;
        assert_eq!(fcst.values, direct.values);
        assert_eq!(fcst.columns, direct.columns);
    }

    #[test]
    fn forecast_fitted_side_buffer_covers_all_rows() {
        let ga = ga_two_groups();
        let models = naive_only();
        let (_, fitted) = forecast(&ga, &models, 2, None, &[], true).unwrap();
        let fitted = fitted.unwrap();
        assert_eq!(fitted.columns, vec!["y", "Naive"]);
        assert_eq!(fitted.values.nrows(), ga.n_rows());
        // Column 0 repeats the target.
        assert_eq!(fitted.values.column(0).to_vec(), ga.targets().to_vec());
        // Naive trace: NaN at each group start, lag-1 elsewhere.
        assert!(fitted.values[[0, 1]].is_nan());
        assert_eq!(fitted.values[[1, 1]], 1.0);
        assert!(fitted.values[[5, 1]].is_nan()); // group 1 starts at row 5
        assert_eq!(fitted.values[[6, 1]], 10.0);
    }

    #[test]
    fn forecast_without_fitted_returns_no_side_buffer() {
        let ga = ga_two_groups();
        let (_, fitted) = forecast(&ga, &naive_only(), 2, None, &[], false).unwrap();
        assert!(fitted.is_none());
    }

    #[test]
    fn cv_window_count() {
        let cfg = CvConfig::builder().h(5).test_size(10).step_size(5).build();
        assert_eq!(cfg.n_windows().unwrap(), 2);
        let bad = CvConfig::builder().h(5).test_size(10).step_size(3).build();
        assert!(matches!(
            bad.n_windows(),
            Err(BatchError::InvalidWindow { test_size: 10, h: 5, step_size: 3 })
        ));
    }

    #[test]
    fn cv_by_hand_naive() {
        // One group, y = 1..=10, h = 2, test_size = 4, step = 2 -> 2 windows
        // with cutoffs at rows 6 and 8.
        let y: Vec<f32> = (1..=10).map(|v| v as f32).collect();
        let ga = GroupedArrayBuilder::new().push_series(&y, None).build().unwrap();
        let cfg = CvConfig::builder().h(2).test_size(4).step_size(2).build();
        let (out, side) = cross_validation(&ga, &naive_only(), &cfg).unwrap();
        assert!(side.is_none());
        assert_eq!(out.n_windows, 2);
        assert_eq!(out.columns, vec!["y", "Naive"]);
        assert_eq!(out.values.nrows(), 4); // 1 group * 2 windows * h 2
        // Window 0: train = rows 0..6, test = rows 6..8 (actuals 7, 8).
        assert_eq!(out.values[[0, 0]], 7.0);
        assert_eq!(out.values[[1, 0]], 8.0);
        assert_eq!(out.values[[0, 1]], 6.0);
        assert_eq!(out.values[[1, 1]], 6.0);
        // Window 1: cutoff + h reaches the end of the series.
        assert_eq!(out.values[[2, 0]], 9.0);
        assert_eq!(out.values[[3, 0]], 10.0);
        assert_eq!(out.values[[2, 1]], 8.0);
    }

    #[test]
    fn cv_input_size_limits_training_window() {
        let y: Vec<f32> = (1..=10).map(|v| v as f32).collect();
        let ga = GroupedArrayBuilder::new().push_series(&y, None).build().unwrap();
        let cfg = CvConfig::builder()
            .h(2)
            .test_size(4)
            .step_size(2)
            .input_size(3)
            .fitted(true)
            .build();
        let (_, side) = cross_validation(&ga, &naive_only(), &cfg).unwrap();
        let side = side.unwrap();
        // Window 0 trains on rows 3..6 only.
        let w0: Vec<usize> = (0..10).filter(|&r| side.idxs[r]).collect();
        assert_eq!(w0, vec![3, 4, 5]);
        // Window 1 block starts at total_rows = 10.
        let w1: Vec<usize> = (0..10).filter(|&r| side.idxs[10 + r]).collect();
        assert_eq!(w1, vec![5, 6, 7]);
    }

    #[test]
    fn cv_fitted_side_channel_is_window_major() {
        let y: Vec<f32> = (1..=8).map(|v| v as f32).collect();
        let ga = GroupedArrayBuilder::new().push_series(&y, None).build().unwrap();
        let cfg = CvConfig::builder()
            .h(2)
            .test_size(4)
            .step_size(2)
            .fitted(true)
            .build();
        let (_, side) = cross_validation(&ga, &naive_only(), &cfg).unwrap();
        let side = side.unwrap();
        assert_eq!(side.values.nrows(), 16); // 8 rows * 2 windows
        assert_eq!(side.columns, vec!["y", "Naive"]);
        // Window 0: cutoff at row 4, training rows 0..4.
        assert_eq!(side.values[[0, 0]], 1.0);
        assert_eq!(side.values[[3, 0]], 4.0);
        assert!(side.values[[4, 0]].is_nan());
        assert!(side.idxs[..4].iter().all(|&b| b));
        assert!(!side.idxs[4]);
        // Window 1 rows live in the second block of 8.
        assert_eq!(side.values[[8, 0]], 1.0);
        assert_eq!(side.values[[13, 0]], 6.0);
        assert!(side.idxs[8..14].iter().all(|&b| b));
        // Exactly one last-training-row marker per window, at cut - 1.
        let w0_last: Vec<usize> = (0..8).filter(|&r| side.last_idxs[r]).collect();
        let w1_last: Vec<usize> = (0..8).filter(|&r| side.last_idxs[8 + r]).collect();
        assert_eq!(w0_last, vec![3]);
        assert_eq!(w1_last, vec![5]);
        // Naive fitted trace per window: lag-1 within the training slice.
        assert!(side.values[[0, 1]].is_nan());
        assert_eq!(side.values[[1, 1]], 1.0);
        assert_eq!(side.values[[13, 1]], 5.0);
    }

    #[test]
    fn cv_rejects_oversized_test_size() {
        let ga = GroupedArrayBuilder::new()
            .push_series(&[1.0, 2.0, 3.0], None)
            .build()
            .unwrap();
        let cfg = CvConfig::builder().h(1).test_size(3).build();
        assert!(matches!(
            cross_validation(&ga, &naive_only(), &cfg),
            Err(BatchError::TestSizeTooLarge { group: 0, len: 3, .. })
        ));
    }

    #[test]
    fn cv_config_from_n_windows_derives_test_size() {
        let cfg = CvConfig::from_n_windows(5, 2, 5);
        assert_eq!(cfg.test_size, 15);
        assert_eq!(cfg.step_size, 5);
        assert_eq!(cfg.n_windows().unwrap(), 2);
        // One window holds out exactly the horizon.
        let single = CvConfig::from_n_windows(3, 1, 7);
        assert_eq!(single.test_size, 3);
        assert_eq!(single.n_windows().unwrap(), 1);
        // The derived hold-out always satisfies the divisibility rule.
        let many = CvConfig::from_n_windows(2, 4, 3);
        assert_eq!(many.test_size, 11);
        assert_eq!(many.n_windows().unwrap(), 4);
    }

    #[test]
    fn cv_config_defaults() {
        let cfg = CvConfig::builder().h(1).test_size(3).build();
        assert_eq!(cfg.step_size, 1);
        assert_eq!(cfg.input_size, None);
        assert!(cfg.levels.is_empty());
        assert!(!cfg.fitted);
        assert_eq!(cfg.n_windows().unwrap(), 3);
    }
}
