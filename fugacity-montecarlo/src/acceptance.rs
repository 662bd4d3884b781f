use serde::{Deserialize, Serialize};

use fugacity_configuration::Select;

/// Per-attempt scratchpad carrying everything a criterion needs to decide.
///
/// Reset at the start of every trial; selectors, perturbers and computes
/// accumulate into it. All failure modes short of a fatal invariant encode
/// as `reject = true`, never as an error.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Acceptance {
    ln_metropolis_prob: f64,
    reject: bool,
    /// the trial brushed a macrostate endpoint (TM boundary bookkeeping)
    endpoint: bool,
    energy_new: f64,
    energy_old: f64,
    /// energies already inside the Rosenbluth weights (reference or full)
    energy_weight_new: f64,
    energy_weight_old: f64,
    /// per-potential-term energy deltas of the last evaluation
    energy_profile_new: Vec<f64>,
    energy_profile_old: Vec<f64>,
    /// pending change of the macrostate (e.g. -1 for an uncommitted removal)
    macrostate_shift: i64,
    /// the particle type whose count shifts
    macrostate_shift_type: Option<usize>,
    /// all sites touched by the trial, tagged with their trial state
    perturbed: Select,
    /// configurations touched by the trial (two for Gibbs transfers)
    configurations: Vec<usize>,
}

impl Acceptance {
    pub fn new() -> Acceptance {
        Acceptance::default()
    }

    pub fn reset(&mut self) {
        *self = Acceptance::default();
    }

    pub fn ln_metropolis_prob(&self) -> f64 {
        self.ln_metropolis_prob
    }

    pub fn add_to_ln_metropolis_prob(&mut self, delta: f64) {
        self.ln_metropolis_prob += delta;
    }

    pub fn reject(&self) -> bool {
        self.reject
    }

    pub fn set_reject(&mut self) {
        self.reject = true;
    }

    pub fn endpoint(&self) -> bool {
        self.endpoint
    }

    pub fn set_endpoint(&mut self) {
        self.endpoint = true;
    }

    pub fn energy_new(&self) -> f64 {
        self.energy_new
    }

    pub fn set_energy_new(&mut self, energy: f64) {
        self.energy_new = energy;
    }

    pub fn add_to_energy_new(&mut self, energy: f64) {
        self.energy_new += energy;
    }

    pub fn energy_old(&self) -> f64 {
        self.energy_old
    }

    pub fn add_to_energy_old(&mut self, energy: f64) {
        self.energy_old += energy;
    }

    pub fn energy_weight_new(&self) -> f64 {
        self.energy_weight_new
    }

    pub fn add_to_energy_weight_new(&mut self, energy: f64) {
        self.energy_weight_new += energy;
    }

    pub fn energy_weight_old(&self) -> f64 {
        self.energy_weight_old
    }

    pub fn add_to_energy_weight_old(&mut self, energy: f64) {
        self.energy_weight_old += energy;
    }

    pub fn energy_profile_new(&self) -> &Vec<f64> {
        &self.energy_profile_new
    }

    pub fn set_energy_profile_new(&mut self, profile: Vec<f64>) {
        self.energy_profile_new = profile;
    }

    pub fn energy_profile_old(&self) -> &Vec<f64> {
        &self.energy_profile_old
    }

    pub fn set_energy_profile_old(&mut self, profile: Vec<f64>) {
        self.energy_profile_old = profile;
    }

    pub fn macrostate_shift(&self) -> i64 {
        self.macrostate_shift
    }

    pub fn add_to_macrostate_shift(&mut self, shift: i64) {
        self.macrostate_shift += shift;
    }

    pub fn macrostate_shift_type(&self) -> Option<usize> {
        self.macrostate_shift_type
    }

    pub fn set_macrostate_shift_type(&mut self, particle_type: usize) {
        self.macrostate_shift_type = Some(particle_type);
    }

    pub fn perturbed(&self) -> &Select {
        &self.perturbed
    }

    pub fn add_to_perturbed(&mut self, select: &Select) {
        self.perturbed.extend_from(select);
    }

    pub fn configurations(&self) -> &Vec<usize> {
        &self.configurations
    }

    pub fn add_configuration(&mut self, config_index: usize) {
        if !self.configurations.contains(&config_index) {
            self.configurations.push(config_index);
        }
    }
}
