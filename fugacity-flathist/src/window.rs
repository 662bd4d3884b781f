use serde::{Deserialize, Serialize};

/// A contiguous macrostate bin range owned by one simulation window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub min_bin: usize,
    pub max_bin: usize,
}

impl Window {
    pub fn size(&self) -> usize {
        self.max_bin - self.min_bin + 1
    }
}

/// Partitions `[0, num_bins)` into `num_windows` contiguous, non-overlapping
/// windows.
///
/// `alpha > 1` skews window sizes so low-bin windows (which equilibrate
/// faster in particle-number walks) take more bins; `alpha = 1` splits
/// evenly.
pub fn partition_windows(num_bins: usize, num_windows: usize, alpha: f64) -> Vec<Window> {
    assert!(num_windows >= 1 && num_windows <= num_bins);
    assert!(alpha >= 1.0);
    let mut boundaries = Vec::with_capacity(num_windows + 1);
    for w in 0..=num_windows {
        let f = (w as f64 / num_windows as f64).powf(1.0 / alpha);
        boundaries.push((f * num_bins as f64).round() as usize);
    }
    // guard degenerate rounding
    boundaries[0] = 0;
    boundaries[num_windows] = num_bins;
    for w in 1..=num_windows {
        if boundaries[w] <= boundaries[w - 1] {
            boundaries[w] = boundaries[w - 1] + 1;
        }
    }
    (0..num_windows)
        .map(|w| Window { min_bin: boundaries[w], max_bin: boundaries[w + 1] - 1 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::partition_windows;

    #[test]
    fn windows_tile_the_range_without_overlap() {
        for alpha in [1.0, 1.5, 2.0] {
            let windows = partition_windows(101, 4, alpha);
            assert_eq!(windows[0].min_bin, 0);
            assert_eq!(windows.last().unwrap().max_bin, 100);
            for pair in windows.windows(2) {
                assert_eq!(pair[0].max_bin + 1, pair[1].min_bin);
            }
        }
    }

    #[test]
    fn skewed_partitions_favor_low_bins() {
        let windows = partition_windows(100, 4, 2.0);
        assert!(windows[0].size() > windows[3].size());
    }
}
