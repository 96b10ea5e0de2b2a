//! Common utilities: chunk boundary arithmetic, worker-count resolution, and
//! the verbosity flag used for engine diagnostics.

use std::ops::Range;

// =============================================================================
// Chunk Boundaries
// =============================================================================

/// Partition `0..n_items` into at most `n_chunks` contiguous balanced ranges.
///
/// The first `n_items % n_chunks` ranges hold `ceil(n_items / n_chunks)`
/// items, the rest hold the floor. Ranges that would be empty are omitted, so
/// fewer than `n_chunks` ranges come back when `n_items < n_chunks`.
///
/// Both [`GroupedArray::split`](crate::GroupedArray::split) and
/// [`FittedSet::chunks`](crate::FittedSet::chunks) use this function, which is
/// what keeps buffer chunks and fitted-model chunks row-aligned.
///
/// # Panics
///
/// Panics if `n_chunks` is zero.
pub fn chunk_ranges(n_items: usize, n_chunks: usize) -> Vec<Range<usize>> {
    assert!(n_chunks > 0, "n_chunks must be positive");
    let base = n_items / n_chunks;
    let rem = n_items % n_chunks;
    let mut ranges = Vec::with_capacity(n_chunks.min(n_items));
    let mut start = 0;
    for i in 0..n_chunks {
        let len = base + usize::from(i < rem);
        if len == 0 {
            break;
        }
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

// =============================================================================
// Worker Resolution
// =============================================================================

/// Resolve the effective worker count for a batch call.
///
/// `n_jobs == 0` means "use all available processing units". The result is
/// clamped to `n_groups` since a worker without a group would idle, and to a
/// minimum of one.
pub fn resolve_workers(n_groups: usize, n_jobs: usize) -> usize {
    let requested = if n_jobs == 0 {
        rayon::current_num_threads()
    } else {
        n_jobs
    };
    requested.min(n_groups).max(1)
}

// =============================================================================
// Verbosity
// =============================================================================

/// Diagnostic verbosity for the engine.
///
/// The core never installs a global logger; callers opt into informational
/// stderr output per engine instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    #[default]
    Silent,
    Info,
}

impl Verbosity {
    #[inline]
    pub fn is_info(self) -> bool {
        matches!(self, Verbosity::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ranges_even() {
        assert_eq!(chunk_ranges(6, 3), vec![0..2, 2..4, 4..6]);
    }

    #[test]
    fn chunk_ranges_uneven_front_loaded() {
        // 7 over 3: sizes 3, 2, 2
        assert_eq!(chunk_ranges(7, 3), vec![0..3, 3..5, 5..7]);
        // 10 over 4: sizes 3, 3, 2, 2
        assert_eq!(chunk_ranges(10, 4), vec![0..3, 3..6, 6..8, 8..10]);
    }

    #[test]
    fn chunk_ranges_more_chunks_than_items() {
        // Empty chunks are dropped.
        assert_eq!(chunk_ranges(2, 5), vec![0..1, 1..2]);
    }

    #[test]
    fn chunk_ranges_single_chunk() {
        assert_eq!(chunk_ranges(4, 1), vec![0..4]);
    }

    #[test]
    fn chunk_ranges_sizes_differ_by_at_most_one() {
        for n_items in 1..40 {
            for n_chunks in 1..12 {
                let ranges = chunk_ranges(n_items, n_chunks);
                let sizes: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
                let max = *sizes.iter().max().unwrap();
                let min = *sizes.iter().min().unwrap();
                assert!(max - min <= 1, "unbalanced split for {n_items}/{n_chunks}");
                assert_eq!(sizes.iter().sum::<usize>(), n_items);
                // Larger chunks come first.
                let larger = sizes.iter().take_while(|&&s| s == max).count();
                assert!(sizes[larger..].iter().all(|&s| s == min));
            }
        }
    }

    #[test]
    #[should_panic(expected = "n_chunks must be positive")]
    fn chunk_ranges_zero_chunks_panics() {
        chunk_ranges(3, 0);
    }

    #[test]
    fn resolve_workers_clamps_to_groups() {
        assert_eq!(resolve_workers(3, 8), 3);
        assert_eq!(resolve_workers(8, 3), 3);
        assert_eq!(resolve_workers(8, 1), 1);
    }

    #[test]
    fn resolve_workers_auto_uses_pool_width() {
        let auto = resolve_workers(1024, 0);
        assert_eq!(auto, rayon::current_num_threads().min(1024));
    }

    #[test]
    fn verbosity_default_is_silent() {
        assert!(!Verbosity::default().is_info());
        assert!(Verbosity::Info.is_info());
    }
}
