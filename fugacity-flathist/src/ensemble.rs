use serde::{Deserialize, Serialize};

use crate::LnProbability;

/// Post-processing of a converged macrostate distribution: reweighting to
/// other chemical potentials, phase-boundary detection and phase-restricted
/// averages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ensemble {
    /// the value of the macrostate at each bin
    macrostates: Vec<f64>,
    ln_prob: LnProbability,
}

impl Ensemble {
    pub fn new(macrostates: Vec<f64>, mut ln_prob: LnProbability) -> Ensemble {
        assert_eq!(macrostates.len(), ln_prob.size());
        ln_prob.normalize();
        Ensemble { macrostates, ln_prob }
    }

    pub fn ln_prob(&self) -> &LnProbability {
        &self.ln_prob
    }

    /// Reweights by a change in the conjugate variable (`$ \Delta(\beta\mu) $`
    /// in the grand canonical ensemble).
    pub fn reweight(&self, delta_conjugate: f64) -> Ensemble {
        Ensemble {
            macrostates: self.macrostates.clone(),
            ln_prob: self.ln_prob.reweighted(delta_conjugate, &self.macrostates),
        }
    }

    /// The interior minimum dividing two phases, if any
    pub fn phase_boundary(&self) -> Option<usize> {
        let minima = self.ln_prob.local_minima();
        minima
            .into_iter()
            .min_by(|&a, &b| self.ln_prob.value(a).partial_cmp(&self.ln_prob.value(b)).unwrap())
    }

    fn phase_range(&self, phase: usize) -> (usize, usize) {
        match self.phase_boundary() {
            None => (0, self.ln_prob.size() - 1),
            Some(boundary) => {
                if phase == 0 {
                    (0, boundary)
                } else {
                    (boundary, self.ln_prob.size() - 1)
                }
            }
        }
    }

    /// Probability-weighted average of the macrostate over one phase
    pub fn average_macrostate(&self, phase: usize) -> f64 {
        self.average(&self.macrostates, phase)
    }

    /// Probability-weighted average of a per-bin property over one phase
    pub fn average(&self, per_bin: &[f64], phase: usize) -> f64 {
        assert_eq!(per_bin.len(), self.ln_prob.size());
        let (lo, hi) = self.phase_range(phase);
        let mut weight = 0.0;
        let mut total = 0.0;
        for b in lo..=hi {
            let p = self.ln_prob.value(b).exp();
            weight += p;
            total += p * per_bin[b];
        }
        total / weight
    }

    /// The probability of one phase
    pub fn phase_probability(&self, phase: usize) -> f64 {
        let (lo, hi) = self.phase_range(phase);
        (lo..=hi).map(|b| self.ln_prob.value(b).exp()).sum()
    }

    /// Saturation-style pressure estimate: `$ \beta p V = \ln\sum\pi - \ln\pi(0) $`
    pub fn beta_pv(&self) -> f64 {
        -self.ln_prob.value(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double_well() -> Ensemble {
        // two lobes with a barrier at bin 2
        let lnpi = LnProbability::from_values(vec![-1.0, -1.2, -6.0, -1.1, -0.9]);
        Ensemble::new(vec![0.0, 1.0, 2.0, 3.0, 4.0], lnpi)
    }

    #[test]
    fn boundary_sits_at_the_barrier() {
        let ens = double_well();
        assert_eq!(ens.phase_boundary(), Some(2));
    }

    #[test]
    fn phase_averages_split_at_the_boundary() {
        let ens = double_well();
        let vapor = ens.average_macrostate(0);
        let liquid = ens.average_macrostate(1);
        assert!(vapor < 1.5, "vapor average {}", vapor);
        assert!(liquid > 2.5, "liquid average {}", liquid);
    }

    #[test]
    fn reweighting_moves_phase_weight() {
        let ens = double_well();
        let before = ens.phase_probability(1) / ens.phase_probability(0);
        let after_ens = ens.reweight(1.0);
        let after = after_ens.phase_probability(1) / after_ens.phase_probability(0);
        assert!(after > before);
    }
}
