//! The ragged-array container for grouped series.

use ndarray::{s, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::GroupedArrayError;
use crate::utils::chunk_ranges;

/// Many independent time series stored contiguously in one buffer.
///
/// # Storage Layout
///
/// `data` is `[total_rows, 1 + n_exog]`: column 0 holds the target, the
/// remaining columns hold exogenous regressors. Group `i` occupies rows
/// `[offsets[i], offsets[i + 1])`, and rows within a group are sorted by time
/// ascending (enforced by whatever produced the buffer, assumed here).
///
/// The container is read-only for the lifetime of a batch operation;
/// [`slice`](Self::slice) and [`split`](Self::split) produce owned copies
/// with rebased offsets and never mutate the source.
///
/// # Example
///
/// ```
/// use batchcast::GroupedArrayBuilder;
///
/// let ga = GroupedArrayBuilder::new()
///     .push_series(&[1.0, 2.0, 3.0], None)
///     .push_series(&[4.0, 5.0], None)
///     .build()
///     .unwrap();
///
/// assert_eq!(ga.n_groups(), 2);
/// assert_eq!(ga.offsets(), &[0, 3, 5]);
/// assert_eq!(ga.series(1).0.to_vec(), vec![4.0, 5.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GroupedArrayParts")]
pub struct GroupedArray {
    /// Value buffer: `[total_rows, 1 + n_exog]`.
    data: Array2<f32>,
    /// Group boundaries: length `n_groups + 1`, `offsets[0] == 0`.
    offsets: Vec<usize>,
}

/// Wire form of [`GroupedArray`]. Deserialization funnels through
/// [`GroupedArray::from_parts`], so decoded buffers satisfy the same
/// invariants as constructed ones.
#[derive(Deserialize)]
struct GroupedArrayParts {
    data: Array2<f32>,
    offsets: Vec<usize>,
}

impl TryFrom<GroupedArrayParts> for GroupedArray {
    type Error = GroupedArrayError;

    fn try_from(parts: GroupedArrayParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts.data, parts.offsets)
    }
}

impl GroupedArray {
    /// Build from an externally assembled buffer and offsets.
    ///
    /// # Errors
    ///
    /// Returns [`GroupedArrayError`] when the offsets are not a valid
    /// partition of the buffer rows or the buffer has no columns.
    pub fn from_parts(data: Array2<f32>, offsets: Vec<usize>) -> Result<Self, GroupedArrayError> {
        if offsets.len() < 2 {
            return Err(GroupedArrayError::Empty);
        }
        if data.ncols() == 0 {
            return Err(GroupedArrayError::NoColumns);
        }
        if offsets[0] != 0 {
            return Err(GroupedArrayError::InvalidOffsets {
                reason: "offsets must start at 0",
            });
        }
        if offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(GroupedArrayError::InvalidOffsets {
                reason: "offsets must be non-decreasing",
            });
        }
        let covered = *offsets.last().unwrap();
        if covered != data.nrows() {
            return Err(GroupedArrayError::RowCountMismatch {
                covered,
                rows: data.nrows(),
            });
        }
        Ok(Self { data, offsets })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of groups (series).
    #[inline]
    pub fn n_groups(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total observation count across all groups.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of exogenous columns (total columns minus the target).
    #[inline]
    pub fn n_exog(&self) -> usize {
        self.data.ncols() - 1
    }

    /// Group boundaries, length `n_groups + 1`.
    #[inline]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Start row of group `i`.
    #[inline]
    pub fn offset(&self, i: usize) -> usize {
        self.offsets[i]
    }

    /// The whole value buffer.
    #[inline]
    pub fn values(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// The target column across all groups.
    #[inline]
    pub fn targets(&self) -> ArrayView1<'_, f32> {
        self.data.column(0)
    }

    /// All rows of group `i`, every column.
    ///
    /// # Panics
    ///
    /// Indexing out of `[0, n_groups)` is a programmer error and panics.
    pub fn group(&self, i: usize) -> ArrayView2<'_, f32> {
        assert!(i < self.n_groups(), "group index {i} out of bounds");
        self.data.slice(s![self.offsets[i]..self.offsets[i + 1], ..])
    }

    /// Group `i` split into target and optional exogenous columns.
    pub fn series(&self, i: usize) -> (ArrayView1<'_, f32>, Option<ArrayView2<'_, f32>>) {
        assert!(i < self.n_groups(), "group index {i} out of bounds");
        let (start, end) = (self.offsets[i], self.offsets[i + 1]);
        let y = self.data.slice(s![start..end, 0]);
        let x = (self.data.ncols() > 1).then(|| self.data.slice(s![start..end, 1..]));
        (y, x)
    }

    // =========================================================================
    // Slicing
    // =========================================================================

    /// A new buffer holding exactly groups `[i, j)`, offsets rebased to 0.
    ///
    /// # Panics
    ///
    /// Panics when `i > j` or `j > n_groups`.
    pub fn slice(&self, i: usize, j: usize) -> GroupedArray {
        assert!(i <= j && j <= self.n_groups(), "group range {i}..{j} out of bounds");
        let (start, end) = (self.offsets[i], self.offsets[j]);
        let data = self.data.slice(s![start..end, ..]).to_owned();
        let offsets = self.offsets[i..=j].iter().map(|&o| o - start).collect();
        GroupedArray { data, offsets }
    }

    /// Partition into at most `n` balanced contiguous chunks.
    ///
    /// The first `n_groups % n` chunks carry one extra group; empty chunks
    /// are omitted. Concatenating the chunks in order reproduces the
    /// original buffer.
    pub fn split(&self, n: usize) -> Vec<GroupedArray> {
        chunk_ranges(self.n_groups(), n)
            .into_iter()
            .map(|r| self.slice(r.start, r.end))
            .collect()
    }
}
