use serde::{Deserialize, Serialize};

use fugacity_montecarlo::Acceptance;
use fugacity_statistics::Histogram;
use fugacity_system::System;

/// The scalar observable over which the biased random walk runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MacrostateKind {
    /// particle count, of one type or in total
    NumParticles { particle_type: Option<usize> },
    /// total potential energy
    Energy,
    /// inverse temperature (temperature-expanded ensembles)
    Beta,
}

/// A macrostate: the observable, its binning, and a shrinkable soft window
/// restricting the active sampling range.
///
/// Bins outside the soft window stay in storage; only sampling ignores them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Macrostate {
    kind: MacrostateKind,
    histogram: Histogram,
    soft_min: usize,
    soft_max: usize,
}

impl Macrostate {
    pub fn new(kind: MacrostateKind, histogram: Histogram) -> Macrostate {
        let soft_max = histogram.size() - 1;
        Macrostate { kind, histogram, soft_min: 0, soft_max }
    }

    /// Particle-count macrostate with unit bins over `[min, max]`
    pub fn num_particles(particle_type: Option<usize>, min: i64, max: i64) -> Macrostate {
        Macrostate::new(MacrostateKind::NumParticles { particle_type }, Histogram::for_integers(min, max))
    }

    pub fn kind(&self) -> &MacrostateKind {
        &self.kind
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    pub fn num_bins(&self) -> usize {
        self.histogram.size()
    }

    pub fn soft_min(&self) -> usize {
        self.soft_min
    }

    pub fn soft_max(&self) -> usize {
        self.soft_max
    }

    pub fn set_soft_bounds(&mut self, soft_min: usize, soft_max: usize) {
        assert!(soft_min <= soft_max && soft_max < self.histogram.size());
        self.soft_min = soft_min;
        self.soft_max = soft_max;
    }

    pub fn is_in_soft_range(&self, bin: usize) -> bool {
        bin >= self.soft_min && bin <= self.soft_max
    }

    /// The observable's current value, including any uncommitted shift the
    /// acceptance record carries.
    pub fn value(&self, system: &System, acceptance: &Acceptance) -> f64 {
        match &self.kind {
            MacrostateKind::NumParticles { particle_type } => {
                let raw = match particle_type {
                    Some(t) => system.configuration(0).num_particles_of_type(*t) as i64,
                    None => system.configuration(0).num_particles() as i64,
                };
                let shifted = match (particle_type, acceptance.macrostate_shift_type()) {
                    (None, _) => raw + acceptance.macrostate_shift(),
                    (Some(t), Some(shift_t)) if *t == shift_t => raw + acceptance.macrostate_shift(),
                    _ => raw,
                };
                shifted as f64
            }
            MacrostateKind::Energy => acceptance.energy_new(),
            MacrostateKind::Beta => system.beta(),
        }
    }

    /// The current value's bin, or `None` outside the histogram range
    pub fn bin(&self, system: &System, acceptance: &Acceptance) -> Option<usize> {
        let value = self.value(system, acceptance);
        if !self.histogram.is_in_range(value) {
            return None;
        }
        Some(self.histogram.bin(value))
    }

    pub fn value_of_bin(&self, bin: usize) -> f64 {
        self.histogram.center_of_bin(bin)
    }

    /// Values of every bin, for reweighting
    pub fn bin_values(&self) -> Vec<f64> {
        (0..self.histogram.size()).map(|b| self.histogram.center_of_bin(b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugacity_configuration::{Configuration, Domain};

    #[test]
    fn soft_window_shrinks_but_bins_remain() {
        let mut m = Macrostate::num_particles(None, 0, 10);
        assert_eq!(m.num_bins(), 11);
        m.set_soft_bounds(2, 8);
        assert!(!m.is_in_soft_range(1));
        assert!(m.is_in_soft_range(5));
        assert_eq!(m.num_bins(), 11);
    }

    #[test]
    fn count_includes_the_pending_shift() {
        let system = System::new(Configuration::new(Domain::cubic(8.0)));
        let m = Macrostate::num_particles(None, 0, 10);
        let mut acceptance = Acceptance::new();
        assert_eq!(m.value(&system, &acceptance), 0.0);
        acceptance.add_to_macrostate_shift(-1);
        assert_eq!(m.value(&system, &acceptance), -1.0);
        assert!(m.bin(&system, &acceptance).is_none());
    }
}
