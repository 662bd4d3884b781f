use std::any::Any;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{Bias, LnProbability};

/// Wang-Landau flat-histogram bias.
///
/// Every visit adds the modification factor `f` to the visited bin's
/// log-probability. When the visit histogram becomes flat (minimum over mean
/// at least `flatness_threshold`, with at least `min_visit_per_bin` visits
/// everywhere), `f` shrinks by `reduce_factor` and the visits reset; the run
/// is complete after `min_flatness_checks` such reductions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WangLandau {
    ln_prob: LnProbability,
    visited: Vec<u64>,
    add_to_ln_prob: f64,
    reduce_factor: f64,
    flatness_threshold: f64,
    updates_per_flat_check: usize,
    updates_since_flat_check: usize,
    min_visit_per_bin: u64,
    num_flatness: usize,
    min_flatness: usize,
}

impl WangLandau {
    /// Defaults: `f` starts at 1.0 and halves on each flatness, flatness is
    /// min/mean >= 0.8 with at least 1000 visits per bin, checked every 100
    /// updates.
    pub fn new(num_bins: usize, min_flatness: usize) -> WangLandau {
        WangLandau {
            ln_prob: LnProbability::new(num_bins),
            visited: vec![0; num_bins],
            add_to_ln_prob: 1.0,
            reduce_factor: 0.5,
            flatness_threshold: 0.8,
            updates_per_flat_check: 100,
            updates_since_flat_check: 0,
            min_visit_per_bin: 1000,
            num_flatness: 0,
            min_flatness,
        }
    }

    pub fn num_flatness(&self) -> usize {
        self.num_flatness
    }

    pub fn modification_factor(&self) -> f64 {
        self.add_to_ln_prob
    }

    fn is_flat(&self) -> bool {
        let min = *self.visited.iter().min().unwrap_or(&0);
        if min < self.min_visit_per_bin {
            return false;
        }
        let mean = self.visited.iter().sum::<u64>() as f64 / self.visited.len() as f64;
        min as f64 / mean >= self.flatness_threshold
    }

    fn flatness_check(&mut self) {
        if !self.is_flat() {
            return;
        }
        self.add_to_ln_prob *= self.reduce_factor;
        self.num_flatness += 1;
        info!(
            "flatness {} of {}: modification factor now {}",
            self.num_flatness, self.min_flatness, self.add_to_ln_prob
        );
        for v in self.visited.iter_mut() {
            *v = 0;
        }
        self.ln_prob.normalize();
    }
}

impl Bias for WangLandau {
    fn update(&mut self, bin_old: usize, bin_new: usize, _ln_metropolis_prob: f64, accepted: bool) {
        let bin = if accepted { bin_new } else { bin_old };
        self.ln_prob.add(bin, self.add_to_ln_prob);
        self.visited[bin] += 1;
        self.updates_since_flat_check += 1;
        if self.updates_since_flat_check >= self.updates_per_flat_check {
            self.updates_since_flat_check = 0;
            self.flatness_check();
        }
    }

    fn ln_prob(&self) -> &LnProbability {
        &self.ln_prob
    }

    fn set_ln_prob(&mut self, ln_prob: LnProbability) {
        assert_eq!(ln_prob.size(), self.visited.len());
        self.ln_prob = ln_prob;
    }

    fn is_complete(&self) -> bool {
        self.num_flatness >= self.min_flatness
    }

    fn num_iterations(&self) -> usize {
        self.num_flatness
    }

    fn name(&self) -> &str {
        "WangLandau"
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
    fn visits_build_the_bias() {
        let mut wl = WangLandau::new(3, 1);
        wl.update(0, 1, 0.0, true);
        wl.update(1, 2, 0.0, false);
        assert_eq!(wl.ln_prob().value(1), 2.0);
        assert_eq!(wl.ln_prob().value(0), 0.0);
    }

    #[test]
    fn flatness_reduces_the_factor() {
        let mut wl = WangLandau::new(2, 2);
        // drive both bins evenly past the visit minimum
        for i in 0..2200 {
            wl.update(i % 2, i % 2, 0.0, false);
        }
        assert!(wl.num_flatness() >= 1);
        assert!(wl.modification_factor() < 1.0);
        assert!(!wl.is_complete() || wl.num_flatness() >= 2);
    }
}
