use std::any::Any;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Bias, CollectionMatrix, LnProbability};

/// Transition-matrix (TMMC) bias.
///
/// Every attempt deposits `$ e^{\min(0, \ln\chi)} $` of probability flow in
/// the attempted direction and the complement on the diagonal; the
/// log-probability is rebuilt from the collection matrix every
/// `updates_per_ln_prob` updates. A sweep completes when every bin has
/// accumulated at least `min_visits_per_sweep` of flow in both directions;
/// the bias is complete after `min_sweeps` sweeps.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionMatrix {
    collection: CollectionMatrix,
    ln_prob: LnProbability,
    updates_per_ln_prob: usize,
    updates_since_ln_prob: usize,
    min_visits_per_sweep: f64,
    min_sweeps: usize,
    num_sweeps: usize,
}

impl TransitionMatrix {
    /// Defaults: rebuild every 100 updates, sweeps need 100 visits per bin
    /// and direction.
    pub fn new(num_bins: usize, min_sweeps: usize) -> TransitionMatrix {
        TransitionMatrix {
            collection: CollectionMatrix::new(num_bins),
            ln_prob: LnProbability::new(num_bins),
            updates_per_ln_prob: 100,
            updates_since_ln_prob: 0,
            min_visits_per_sweep: 100.0,
            min_sweeps,
            num_sweeps: 0,
        }
    }

    pub fn collection(&self) -> &CollectionMatrix {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut CollectionMatrix {
        &mut self.collection
    }

    pub fn num_sweeps(&self) -> usize {
        self.num_sweeps
    }

    fn check_sweep(&mut self) {
        if self.collection.is_swept(self.min_visits_per_sweep * (self.num_sweeps + 1) as f64) {
            self.num_sweeps += 1;
            debug!("transition matrix completed sweep {}", self.num_sweeps);
        }
    }
}

impl Bias for TransitionMatrix {
    fn update(&mut self, bin_old: usize, bin_new: usize, ln_metropolis_prob: f64, _accepted: bool) {
        let acceptance_prob = ln_metropolis_prob.min(0.0).exp();
        let direction = (bin_new as i64 - bin_old as i64).signum();
        // every attempt deposits unit flow: the acceptance probability in the
        // attempted direction, its complement on the diagonal (both land in
        // the stay column for same-bin attempts)
        self.collection.increment(bin_old, direction, acceptance_prob);
        self.collection.increment(bin_old, 0, 1.0 - acceptance_prob);
        self.updates_since_ln_prob += 1;
        if self.updates_since_ln_prob >= self.updates_per_ln_prob {
            self.updates_since_ln_prob = 0;
            self.infrequent_update();
        }
    }

    fn ln_prob(&self) -> &LnProbability {
        &self.ln_prob
    }

    fn set_ln_prob(&mut self, ln_prob: LnProbability) {
        self.ln_prob = ln_prob;
    }

    /// Rebuilds the log-probability from the collection matrix and checks
    /// for sweep completion.
    fn infrequent_update(&mut self) {
        self.ln_prob = self.collection.ln_prob();
        self.check_sweep();
    }

    fn is_complete(&self) -> bool {
        self.num_sweeps >= self.min_sweeps
    }

    fn num_iterations(&self) -> usize {
        self.num_sweeps
    }

    fn name(&self) -> &str {
        "TransitionMatrix"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_flow_splits_between_direction_and_diagonal() {
        let mut tm = TransitionMatrix::new(3, 1);
        tm.update(0, 1, (0.25f64).ln(), true);
        let row = tm.collection().row(0);
        assert!((row[2] - 0.25).abs() < 1e-12);
        assert!((row[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn uphill_certainty_deposits_unit_flow() {
        let mut tm = TransitionMatrix::new(3, 1);
        tm.update(1, 0, 2.0, true);
        let row = tm.collection().row(1);
        assert!((row[0] - 1.0).abs() < 1e-12);
        assert_eq!(row[1], 0.0);
    }

    #[test]
    fn same_bin_attempts_still_deposit_unit_flow() {
        // displacement moves never change the bin but must still count
        let mut tm = TransitionMatrix::new(3, 1);
        tm.update(1, 1, (0.25f64).ln(), true);
        tm.update(1, 1, -3.0, false);
        let row = tm.collection().row(1);
        assert!((row[1] - 2.0).abs() < 1e-12);
        assert_eq!(row[0], 0.0);
        assert_eq!(row[2], 0.0);
    }

    #[test]
    fn mixed_move_sets_keep_rows_normalized_per_attempt() {
        // a bin visited by both in-place moves and transfers accumulates
        // exactly one unit of flow per attempt
        let mut tm = TransitionMatrix::new(3, 1);
        tm.update(1, 1, -0.7, true);
        tm.update(1, 2, (0.4f64).ln(), false);
        tm.update(1, 0, (0.9f64).ln(), true);
        let row = tm.collection().row(1);
        let total: f64 = row.iter().sum();
        assert!((total - 3.0).abs() < 1e-12, "row total {}", total);
        assert!((row[2] - 0.4).abs() < 1e-12);
        assert!((row[0] - 0.9).abs() < 1e-12);
    }
}
