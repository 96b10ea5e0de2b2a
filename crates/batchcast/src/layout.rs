//! Output-column layout planning.
//!
//! For a list of models and requested interval levels, the planner computes
//! the cut points that give each model its block of output columns. It runs
//! once per batch call; models are assumed homogeneous in capability across
//! the whole run, so recomputing per group would only invite inconsistent
//! column sets.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Per-model output-column ranges.
///
/// Model `i` occupies columns `cuts[i]..cuts[i + 1]`. A model's block is one
/// column (the mean) when it does not support intervals or no levels were
/// requested, else `1 + 2 * levels.len()`: the mean, all lower bounds in
/// level order, then all upper bounds in level order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    cuts: Vec<usize>,
    has_level: Vec<bool>,
    levels: Vec<u32>,
}

impl ColumnLayout {
    /// Plan the layout from per-model interval capability and the requested
    /// levels.
    pub fn plan(supports_intervals: &[bool], levels: &[u32]) -> Self {
        let mut cuts = Vec::with_capacity(supports_intervals.len() + 1);
        cuts.push(0);
        let mut has_level = Vec::with_capacity(supports_intervals.len());
        for &supports in supports_intervals {
            let with_level = supports && !levels.is_empty();
            has_level.push(with_level);
            let width = if with_level { 1 + 2 * levels.len() } else { 1 };
            cuts.push(cuts.last().unwrap() + width);
        }
        Self {
            cuts,
            has_level,
            levels: levels.to_vec(),
        }
    }

    /// Number of models in the layout.
    #[inline]
    pub fn n_models(&self) -> usize {
        self.has_level.len()
    }

    /// Total output width.
    #[inline]
    pub fn total(&self) -> usize {
        *self.cuts.last().unwrap()
    }

    /// Column range of model `i`.
    #[inline]
    pub fn range(&self, i: usize) -> Range<usize> {
        self.cuts[i]..self.cuts[i + 1]
    }

    /// Whether levels are passed through to model `i`.
    #[inline]
    pub fn has_level(&self, i: usize) -> bool {
        self.has_level[i]
    }

    /// The levels model `i` should receive: the requested levels when it
    /// takes part in interval output, empty otherwise.
    #[inline]
    pub fn levels_for(&self, i: usize) -> &[u32] {
        if self.has_level[i] {
            &self.levels
        } else {
            &[]
        }
    }

    /// Compose the output column names, one per column.
    ///
    /// `<name>` for the mean, `<name>-lo-<level>` / `<name>-hi-<level>` for
    /// the interval bounds, lower bounds first.
    pub fn names(&self, model_names: &[&str]) -> Vec<String> {
        debug_assert_eq!(model_names.len(), self.n_models());
        let mut out = Vec::with_capacity(self.total());
        for (i, name) in model_names.iter().enumerate() {
            out.push((*name).to_string());
            if self.has_level[i] {
                for level in &self.levels {
                    out.push(format!("{name}-lo-{level}"));
                }
                for level in &self.levels {
                    out.push(format!("{name}-hi-{level}"));
                }
            }
        }
        out
    }
}
