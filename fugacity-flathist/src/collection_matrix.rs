use serde::{Deserialize, Serialize};

use crate::LnProbability;

/// The transition-matrix accumulator: for every macrostate bin, the
/// accumulated probability flow down (`0`), staying (`1`) and up (`2`).
///
/// The log-probability follows from the detailed-balance recursion
/// `$ \ln\pi_b = \ln\pi_{b-1} + \ln(P_{b-1}^{\uparrow} / P_b^{\downarrow}) $`
/// with each row normalized by its total flow, which makes the result
/// invariant under scaling all entries by a constant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionMatrix {
    rows: Vec<[f64; 3]>,
}

impl CollectionMatrix {
    pub fn new(num_bins: usize) -> CollectionMatrix {
        CollectionMatrix { rows: vec![[0.0; 3]; num_bins] }
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, bin: usize) -> &[f64; 3] {
        &self.rows[bin]
    }

    pub fn set_row(&mut self, bin: usize, row: [f64; 3]) {
        self.rows[bin] = row;
    }

    /// Accumulates an attempted transition from `bin` in `direction`
    /// (-1, 0, +1) with the given probability weight.
    pub fn increment(&mut self, bin: usize, direction: i64, weight: f64) {
        let column = match direction {
            -1 => 0,
            0 => 1,
            1 => 2,
            other => panic!("collection matrix direction out of range: {}", other),
        };
        self.rows[bin][column] += weight;
    }

    fn transition_probability(&self, bin: usize, column: usize) -> f64 {
        let total: f64 = self.rows[bin].iter().sum();
        if total <= 0.0 {
            return 0.0;
        }
        self.rows[bin][column] / total
    }

    /// Solves the recursion into a normalized log-probability.
    pub fn ln_prob(&self) -> LnProbability {
        let mut lnpi = LnProbability::new(self.rows.len());
        for b in 1..self.rows.len() {
            let up = self.transition_probability(b - 1, 2);
            let down = self.transition_probability(b, 0);
            let delta = if up > 0.0 && down > 0.0 { (up / down).ln() } else { 0.0 };
            let prev = lnpi.value(b - 1);
            lnpi.set(b, prev + delta);
        }
        lnpi.normalize();
        lnpi
    }

    /// True once every bin has accumulated flow in both directions at least
    /// `min_visits` times (one TMMC "sweep" ingredient).
    pub fn is_swept(&self, min_visits: f64) -> bool {
        if self.rows.is_empty() {
            return false;
        }
        self.rows.iter().enumerate().all(|(b, row)| {
            let down_ok = b == 0 || row[0] >= min_visits;
            let up_ok = b == self.rows.len() - 1 || row[2] >= min_visits;
            down_ok && up_ok
        })
    }

    /// Splices rows from `other` over the bin range `[begin, end]`
    pub fn splice_rows(&mut self, other: &CollectionMatrix, begin: usize, end: usize) {
        for b in begin..=end {
            self.rows[b] = other.rows[b];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CollectionMatrix;

    fn filled() -> CollectionMatrix {
        let mut cm = CollectionMatrix::new(3);
        cm.set_row(0, [0.0, 4.0, 6.0]);
        cm.set_row(1, [3.0, 4.0, 3.0]);
        cm.set_row(2, [5.0, 5.0, 0.0]);
        cm
    }

    #[test]
    fn ln_prob_is_scale_invariant() {
        let cm = filled();
        let lnpi = cm.ln_prob();
        let mut scaled = CollectionMatrix::new(3);
        for b in 0..3 {
            let row = cm.row(b);
            scaled.set_row(b, [row[0] * 7.5, row[1] * 7.5, row[2] * 7.5]);
        }
        assert!(lnpi.is_equal(&scaled.ln_prob(), 1e-12));
    }

    #[test]
    fn recursion_matches_hand_computation() {
        let cm = filled();
        let lnpi = cm.ln_prob();
        // P_up(0) = 0.6, P_down(1) = 0.3: pi(1)/pi(0) = 2
        let ratio = (lnpi.value(1) - lnpi.value(0)).exp();
        assert!((ratio - 2.0).abs() < 1e-12);
    }

    #[test]
    fn sweep_needs_both_directions() {
        let mut cm = CollectionMatrix::new(2);
        cm.increment(0, 1, 50.0);
        assert!(!cm.is_swept(50.0));
        cm.increment(1, -1, 50.0);
        assert!(cm.is_swept(50.0));
    }
}
