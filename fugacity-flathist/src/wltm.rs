use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::{Bias, LnProbability, TransitionMatrix, WangLandau};

/// Wang-Landau to transition-matrix crossover.
///
/// Begins as pure Wang-Landau; once the modification factor drops below
/// `collect_factor` the collection matrix starts accumulating in parallel,
/// and below `switch_factor` the Wang-Landau updates of the log-probability
/// are abandoned in favor of the transition-matrix recursion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WangLandauTransitionMatrix {
    wang_landau: WangLandau,
    transition_matrix: TransitionMatrix,
    collect_factor: f64,
    switch_factor: f64,
}

impl WangLandauTransitionMatrix {
    pub fn new(
        num_bins: usize,
        collect_factor: f64,
        switch_factor: f64,
        min_sweeps: usize,
    ) -> WangLandauTransitionMatrix {
        assert!(switch_factor <= collect_factor, "switching must come after collecting begins");
        WangLandauTransitionMatrix {
            // flatness count is unbounded here; completion comes from sweeps
            wang_landau: WangLandau::new(num_bins, usize::MAX),
            transition_matrix: TransitionMatrix::new(num_bins, min_sweeps),
            collect_factor,
            switch_factor,
        }
    }

    pub fn transition_matrix(&self) -> &TransitionMatrix {
        &self.transition_matrix
    }

    fn is_collecting(&self) -> bool {
        self.wang_landau.modification_factor() <= self.collect_factor
    }

    fn is_switched(&self) -> bool {
        self.wang_landau.modification_factor() <= self.switch_factor
    }
}

impl Bias for WangLandauTransitionMatrix {
    fn update(&mut self, bin_old: usize, bin_new: usize, ln_metropolis_prob: f64, accepted: bool) {
        if self.is_collecting() {
            self.transition_matrix.update(bin_old, bin_new, ln_metropolis_prob, accepted);
        }
        if !self.is_switched() {
            self.wang_landau.update(bin_old, bin_new, ln_metropolis_prob, accepted);
        }
    }

    fn ln_prob(&self) -> &LnProbability {
        if self.is_switched() {
            self.transition_matrix.ln_prob()
        } else {
            self.wang_landau.ln_prob()
        }
    }

    fn set_ln_prob(&mut self, ln_prob: LnProbability) {
        if self.is_switched() {
            self.transition_matrix.set_ln_prob(ln_prob);
        } else {
            self.wang_landau.set_ln_prob(ln_prob);
        }
    }

    fn infrequent_update(&mut self) {
        if self.is_collecting() {
            self.transition_matrix.infrequent_update();
        }
    }

    fn is_complete(&self) -> bool {
        self.is_switched() && self.transition_matrix.is_complete()
    }

    fn num_iterations(&self) -> usize {
        if self.is_switched() {
            self.transition_matrix.num_iterations()
        } else {
            self.wang_landau.num_iterations()
        }
    }

    fn name(&self) -> &str {
        "WangLandauTransitionMatrix"
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
    fn starts_as_wang_landau() {
        let wltm = WangLandauTransitionMatrix::new(4, 0.5, 0.25, 2);
        assert!(!wltm.is_collecting());
        assert!(!wltm.is_switched());
        assert_eq!(wltm.name(), "WangLandauTransitionMatrix");
    }
}
