//! Deterministic synthetic data for tests and benchmarks.
//!
//! Everything here is reproducible from its arguments alone; no randomness,
//! so failures bisect cleanly.

use ndarray::Array2;

use crate::data::GroupedArray;

/// A grouped buffer of `n_groups` series with uneven lengths.
///
/// Group `g` has `base_len + (g % 3)` rows of a trend plus a sine wave, offset
/// per group so no two series coincide. With `n_exog > 0` each exogenous
/// column is a shifted cosine of the row index.
///
/// # Panics
///
/// `base_len` must be at least 3 so every group has enough rows for the
/// baseline models.
pub fn synthetic(n_groups: usize, base_len: usize, n_exog: usize) -> GroupedArray {
    assert!(base_len >= 3, "base_len must be at least 3");
    let mut offsets = Vec::with_capacity(n_groups + 1);
    offsets.push(0usize);
    let mut rows: Vec<f32> = Vec::new();
    for g in 0..n_groups {
        let len = base_len + g % 3;
        for t in 0..len {
            let t_f = t as f32;
            let y = 10.0 * (g as f32 + 1.0) + 0.5 * t_f + (0.7 * t_f).sin();
            rows.push(y);
            for e in 0..n_exog {
                rows.push((0.3 * t_f + e as f32).cos());
            }
        }
        offsets.push(offsets.last().unwrap() + len);
    }
    let n_rows = *offsets.last().unwrap();
    let data = Array2::from_shape_vec((n_rows, 1 + n_exog), rows)
        .expect("row count and width are consistent by construction");
    GroupedArray::from_parts(data, offsets).expect("offsets partition the buffer by construction")
}

/// Future exogenous rows matching [`synthetic`]'s generator, continued for
/// `h` steps past each group's last observation.
pub fn synthetic_future(ga: &GroupedArray, h: usize, n_exog: usize) -> GroupedArray {
    assert!(n_exog > 0, "a future buffer needs at least one column");
    let mut offsets = Vec::with_capacity(ga.n_groups() + 1);
    offsets.push(0usize);
    let mut rows: Vec<f32> = Vec::new();
    for g in 0..ga.n_groups() {
        let len = ga.group(g).nrows();
        for t in len..len + h {
            let t_f = t as f32;
            for e in 0..n_exog {
                rows.push((0.3 * t_f + e as f32).cos());
            }
        }
        offsets.push(offsets.last().unwrap() + h);
    }
    let data = Array2::from_shape_vec((ga.n_groups() * h, n_exog), rows)
        .expect("row count and width are consistent by construction");
    GroupedArray::from_parts(data, offsets).expect("offsets partition the buffer by construction")
}
