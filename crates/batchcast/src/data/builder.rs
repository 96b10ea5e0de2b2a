//! Series-by-series construction of a [`GroupedArray`].

use ndarray::{Array2, ArrayView2};

use super::{GroupedArray, GroupedArrayError};

/// Builder that assembles a [`GroupedArray`] one series at a time.
///
/// Each pushed series contributes its target values and, optionally, a block
/// of exogenous rows (`[series_len, n_exog]`). Validation happens in
/// [`build`](Self::build): all series must agree on the exogenous column
/// count and none may be empty.
///
/// # Example
///
/// ```
/// use batchcast::GroupedArrayBuilder;
/// use ndarray::array;
///
/// let exog = array![[1.0], [2.0], [3.0]];
/// let ga = GroupedArrayBuilder::new()
///     .push_series(&[5.0, 6.0, 7.0], Some(exog.view()))
///     .build()
///     .unwrap();
/// assert_eq!(ga.n_exog(), 1);
/// ```
#[derive(Debug, Default)]
pub struct GroupedArrayBuilder {
    series: Vec<(Vec<f32>, Option<Array2<f32>>)>,
}

impl GroupedArrayBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one series: target values plus optional exogenous rows.
    pub fn push_series(mut self, y: &[f32], exog: Option<ArrayView2<f32>>) -> Self {
        self.series.push((y.to_vec(), exog.map(|x| x.to_owned())));
        self
    }

    /// Assemble the grouped buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GroupedArrayError`] when no series were pushed, a series is
    /// empty, exogenous row counts disagree with the target length, or the
    /// exogenous column count varies across series.
    pub fn build(self) -> Result<GroupedArray, GroupedArrayError> {
        if self.series.is_empty() {
            return Err(GroupedArrayError::Empty);
        }

        let n_exog = self.series[0].1.as_ref().map_or(0, |x| x.ncols());
        let mut offsets = Vec::with_capacity(self.series.len() + 1);
        offsets.push(0);

        for (i, (y, exog)) in self.series.iter().enumerate() {
            if y.is_empty() {
                return Err(GroupedArrayError::EmptySeries { series: i });
            }
            let got = exog.as_ref().map_or(0, |x| x.ncols());
            if got != n_exog {
                return Err(GroupedArrayError::ExogColumnMismatch {
                    series: i,
                    expected: n_exog,
                    got,
                });
            }
            if let Some(x) = exog {
                if x.nrows() != y.len() {
                    return Err(GroupedArrayError::ExogRowMismatch {
                        series: i,
                        target_rows: y.len(),
                        exog_rows: x.nrows(),
                    });
                }
            }
            offsets.push(offsets[i] + y.len());
        }

        let total_rows = *offsets.last().unwrap();
        let mut data = Array2::zeros((total_rows, 1 + n_exog));
        let mut row = 0;
        for (y, exog) in &self.series {
            for (t, &v) in y.iter().enumerate() {
                data[[row + t, 0]] = v;
                if let Some(x) = exog {
                    for c in 0..n_exog {
                        data[[row + t, 1 + c]] = x[[t, c]];
                    }
                }
            }
            row += y.len();
        }

        GroupedArray::from_parts(data, offsets)
    }
}
