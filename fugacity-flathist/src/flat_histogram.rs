use std::any::Any;

use log::debug;
use rand::rngs::SmallRng;
use rand::Rng;

use fugacity_montecarlo::{Acceptance, Constraint, Criterion};
use fugacity_system::System;

use crate::{Bias, Macrostate};

/// The flat-histogram acceptance criterion: a macrostate, a pluggable bias
/// and optional constraints.
///
/// The decision log-ratio is the trial's unbiased Metropolis term plus
/// `$ \ln\pi(b_{old}) - \ln\pi(b_{new}) $`; attempts that leave the soft
/// window reject outright, and every in-window attempt updates the bias with
/// its unbiased probability.
pub struct FlatHistogram {
    macrostate: Macrostate,
    bias: Box<dyn Bias>,
    constraints: Vec<Constraint>,
    current_energy: f64,
    current_energy_profile: Vec<f64>,
    was_accepted: bool,
    phase: usize,
    bin_old: usize,
    bin_current: usize,
}

impl FlatHistogram {
    pub fn new(macrostate: Macrostate, bias: Box<dyn Bias>) -> FlatHistogram {
        assert_eq!(
            macrostate.num_bins(),
            bias.ln_prob().size(),
            "macrostate and bias disagree on the number of bins"
        );
        FlatHistogram {
            macrostate,
            bias,
            constraints: Vec::new(),
            current_energy: 0.0,
            current_energy_profile: Vec::new(),
            was_accepted: false,
            phase: 0,
            bin_old: 0,
            bin_current: 0,
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> FlatHistogram {
        self.constraints.push(constraint);
        self
    }

    pub fn macrostate(&self) -> &Macrostate {
        &self.macrostate
    }

    pub fn macrostate_mut(&mut self) -> &mut Macrostate {
        &mut self.macrostate
    }

    pub fn bias(&self) -> &dyn Bias {
        self.bias.as_ref()
    }

    pub fn bias_mut(&mut self) -> &mut Box<dyn Bias> {
        &mut self.bias
    }
}

impl Criterion for FlatHistogram {
    fn before_attempt(&mut self, system: &System) {
        let empty = Acceptance::new();
        self.bin_old = self
            .macrostate
            .bin(system, &empty)
            .expect("the system sits outside the macrostate range");
    }

    fn is_accepted(&mut self, acceptance: &Acceptance, system: &System, rng: &mut SmallRng) -> bool {
        self.was_accepted = false;
        if acceptance.reject() {
            self.bin_current = self.bin_old;
            return false;
        }
        if !self.constraints.iter().all(|c| c.is_allowed(system, acceptance)) {
            self.bin_current = self.bin_old;
            return false;
        }
        let bin_new = match self.macrostate.bin(system, acceptance) {
            Some(bin) => bin,
            None => {
                self.bin_current = self.bin_old;
                return false;
            }
        };
        if !self.macrostate.is_in_soft_range(bin_new) || !self.macrostate.is_in_soft_range(self.bin_old) {
            debug!("bin {} -> {} leaves the soft window", self.bin_old, bin_new);
            self.bin_current = self.bin_old;
            return false;
        }

        let ln_metropolis = acceptance.ln_metropolis_prob();
        let lnpi = self.bias.ln_prob();
        let ln_biased = ln_metropolis + lnpi.value(self.bin_old) - lnpi.value(bin_new);
        if ln_biased >= 0.0 || rng.gen_range(0.0..1.0) < ln_biased.exp() {
            self.current_energy = acceptance.energy_new();
            self.current_energy_profile = acceptance.energy_profile_new().clone();
            self.was_accepted = true;
        }
        self.bias.update(self.bin_old, bin_new, ln_metropolis, self.was_accepted);
        self.bin_current = if self.was_accepted { bin_new } else { self.bin_old };
        self.was_accepted
    }

    fn was_accepted(&self) -> bool {
        self.was_accepted
    }

    fn current_energy(&self) -> f64 {
        self.current_energy
    }

    fn set_current_energy(&mut self, energy: f64) {
        self.current_energy = energy;
    }

    fn current_energy_profile(&self) -> &Vec<f64> {
        &self.current_energy_profile
    }

    fn set_current_energy_profile(&mut self, profile: Vec<f64>) {
        self.current_energy_profile = profile;
    }

    fn is_complete(&self) -> bool {
        self.bias.is_complete()
    }

    fn phase(&self) -> usize {
        self.phase
    }

    fn increment_phase(&mut self) {
        self.phase += 1;
    }

    fn state(&self) -> Option<usize> {
        Some(self.bin_current)
    }

    fn num_states(&self) -> usize {
        self.macrostate.num_bins()
    }

    fn update(&mut self) {
        self.bias.infrequent_update();
    }

    fn write(&self) -> String {
        let mut out = format!("state,{}\n", self.bias.write_per_bin_header());
        for bin in self.macrostate.soft_min()..=self.macrostate.soft_max() {
            out.push_str(&format!("{},{}\n", bin, self.bias.write_per_bin(bin)));
        }
        out
    }

    fn name(&self) -> &str {
        "FlatHistogram"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
