//! Deterministic baseline forecasters.
//!
//! These cover the three shapes of model the engine has to handle: interval
//! support with step-dependent widths ([`Naive`]), interval support with
//! constant widths ([`HistoricAverage`]), and no interval support at all
//! ([`WindowAverage`]).

use ndarray::{Array1, ArrayView1, ArrayView2};

use super::{FittedModel, Forecaster, IntervalBand, ModelError, ModelOutput};

/// Sample standard deviation (ddof = 1); zero when fewer than two values.
fn sample_sd(values: impl Iterator<Item = f32>, n: usize) -> f32 {
    if n < 2 {
        return 0.0;
    }
    let sq_sum: f64 = values.map(|v| f64::from(v) * f64::from(v)).sum();
    (sq_sum / (n - 1) as f64).sqrt() as f32
}

/// Inverse standard-normal CDF (Acklam's rational approximation).
///
/// Accurate to about 1.15e-9 over (0, 1), which is far tighter than the f32
/// outputs need.
fn norm_ppf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    debug_assert!(p > 0.0 && p < 1.0);
    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

/// Two-sided z-score for a confidence percentage in `(0, 100)`.
fn z_for_level(level: u32) -> f32 {
    norm_ppf(0.5 + f64::from(level) / 200.0) as f32
}

/// Build interval bands around a constant-or-varying standard error.
///
/// `se(step)` receives 1-based forecast steps.
fn bands(mean: &Array1<f32>, levels: &[u32], se: impl Fn(usize) -> f32) -> Vec<IntervalBand> {
    levels
        .iter()
        .map(|&level| {
            let z = z_for_level(level);
            let mut lo = mean.clone();
            let mut hi = mean.clone();
            for (i, (l, u)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
                let half = z * se(i + 1);
                *l -= half;
                *u += half;
            }
            IntervalBand { level, lo, hi }
        })
        .collect()
}

// =============================================================================
// Naive
// =============================================================================

/// Random-walk forecast: every future step repeats the last observation.
///
/// Intervals assume normal one-step residuals, widening with the square root
/// of the forecast step. Fitted values are the one-step lag (NaN at t = 0).
#[derive(Debug, Clone, Copy, Default)]
pub struct Naive;

#[derive(Debug)]
struct NaiveFit {
    last: f32,
    sigma: f32,
    fitted: Array1<f32>,
}

impl Forecaster for Naive {
    fn name(&self) -> &str {
        "Naive"
    }

    fn supports_intervals(&self) -> bool {
        true
    }

    fn fit(
        &self,
        y: ArrayView1<f32>,
        _x: Option<ArrayView2<f32>>,
    ) -> Result<Box<dyn FittedModel>, ModelError> {
        let n = y.len();
        if n == 0 {
            return Err(ModelError::TooShort {
                model: "Naive",
                needed: 1,
                got: 0,
            });
        }
        let sigma = sample_sd(y.windows(2).into_iter().map(|w| w[1] - w[0]), n - 1);
        let mut fitted = Array1::from_elem(n, f32::NAN);
        for t in 1..n {
            fitted[t] = y[t - 1];
        }
        Ok(Box::new(NaiveFit {
            last: y[n - 1],
            sigma,
            fitted,
        }))
    }
}

impl FittedModel for NaiveFit {
    fn predict(
        &self,
        h: usize,
        _x_future: Option<ArrayView2<f32>>,
        levels: &[u32],
    ) -> Result<ModelOutput, ModelError> {
        let mean = Array1::from_elem(h, self.last);
        let intervals = bands(&mean, levels, |step| self.sigma * (step as f32).sqrt());
        Ok(ModelOutput {
            mean,
            intervals,
            fitted: None,
        })
    }

    fn fitted_values(&self) -> ArrayView1<'_, f32> {
        self.fitted.view()
    }
}

// =============================================================================
// HistoricAverage
// =============================================================================

/// Forecasts the sample mean of the whole training series.
///
/// Intervals use the residual standard deviation with the usual
/// `sqrt(1 + 1/n)` inflation; the width does not grow with the horizon.
/// Fitted values are the sample mean at every training row.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoricAverage;

#[derive(Debug)]
struct HistoricAverageFit {
    mean: f32,
    se: f32,
    fitted: Array1<f32>,
}

impl Forecaster for HistoricAverage {
    fn name(&self) -> &str {
        "HistoricAverage"
    }

    fn supports_intervals(&self) -> bool {
        true
    }

    fn fit(
        &self,
        y: ArrayView1<f32>,
        _x: Option<ArrayView2<f32>>,
    ) -> Result<Box<dyn FittedModel>, ModelError> {
        let n = y.len();
        if n == 0 {
            return Err(ModelError::TooShort {
                model: "HistoricAverage",
                needed: 1,
                got: 0,
            });
        }
        let mean = (y.iter().map(|&v| f64::from(v)).sum::<f64>() / n as f64) as f32;
        let sigma = sample_sd(y.iter().map(|&v| v - mean), n);
        let se = sigma * (1.0 + 1.0 / n as f32).sqrt();
        Ok(Box::new(HistoricAverageFit {
            mean,
            se,
            fitted: Array1::from_elem(n, mean),
        }))
    }
}

impl FittedModel for HistoricAverageFit {
    fn predict(
        &self,
        h: usize,
        _x_future: Option<ArrayView2<f32>>,
        levels: &[u32],
    ) -> Result<ModelOutput, ModelError> {
        let mean = Array1::from_elem(h, self.mean);
        let intervals = bands(&mean, levels, |_| self.se);
        Ok(ModelOutput {
            mean,
            intervals,
            fitted: None,
        })
    }

    fn fitted_values(&self) -> ArrayView1<'_, f32> {
        self.fitted.view()
    }
}

// =============================================================================
// WindowAverage
// =============================================================================

/// Forecasts the mean of the trailing `window` observations.
///
/// Does not support prediction intervals: requested levels yield only the
/// mean column for this model. Fitted values are the trailing-window mean
/// (NaN for the first `window` rows).
#[derive(Debug, Clone, Copy)]
pub struct WindowAverage {
    pub window: usize,
}

#[derive(Debug)]
struct WindowAverageFit {
    mean: f32,
    fitted: Array1<f32>,
}

impl Forecaster for WindowAverage {
    fn name(&self) -> &str {
        "WindowAverage"
    }

    fn fit(
        &self,
        y: ArrayView1<f32>,
        _x: Option<ArrayView2<f32>>,
    ) -> Result<Box<dyn FittedModel>, ModelError> {
        let n = y.len();
        if n < self.window || self.window == 0 {
            return Err(ModelError::TooShort {
                model: "WindowAverage",
                needed: self.window.max(1),
                got: n,
            });
        }
        let window_mean = |end: usize| {
            (y.slice(ndarray::s![end - self.window..end])
                .iter()
                .map(|&v| f64::from(v))
                .sum::<f64>()
                / self.window as f64) as f32
        };
        let mut fitted = Array1::from_elem(n, f32::NAN);
        for t in self.window..n {
            fitted[t] = window_mean(t);
        }
        Ok(Box::new(WindowAverageFit {
            mean: window_mean(n),
            fitted,
        }))
    }
}

impl FittedModel for WindowAverageFit {
    fn predict(
        &self,
        h: usize,
        _x_future: Option<ArrayView2<f32>>,
        _levels: &[u32],
    ) -> Result<ModelOutput, ModelError> {
        Ok(ModelOutput::point(Array1::from_elem(h, self.mean)))
    }

    fn fitted_values(&self) -> ArrayView1<'_, f32> {
        self.fitted.view()
    }
}
