use std::any::Any;

use log::debug;
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use fugacity_statistics::Accumulator;
use fugacity_system::System;

use crate::Acceptance;

/// Pluggable predicates that force rejection regardless of the Metropolis
/// ratio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// particle count of `particle_type` (or all, if `None`) within bounds
    NumParticles { minimum: usize, maximum: usize, particle_type: Option<usize> },
    /// counts of two types stay equal
    NumEqual { type_a: usize, type_b: usize },
    /// `$ |N_a - N_b/2| \le 1 $`
    NumHalf { type_a: usize, type_b: usize },
}

impl Constraint {
    /// Counts include the trial's pending macrostate shift so uncommitted
    /// removals are judged at their destination state.
    pub fn is_allowed(&self, system: &System, acceptance: &Acceptance) -> bool {
        let count = |t: Option<usize>| -> i64 {
            let raw = match t {
                Some(t) => system.configuration(0).num_particles_of_type(t) as i64,
                None => system.configuration(0).num_particles() as i64,
            };
            match (t, acceptance.macrostate_shift_type()) {
                (None, _) => raw + acceptance.macrostate_shift(),
                (Some(a), Some(b)) if a == b => raw + acceptance.macrostate_shift(),
                _ => raw,
            }
        };
        match self {
            Constraint::NumParticles { minimum, maximum, particle_type } => {
                let n = count(*particle_type);
                n >= *minimum as i64 && n <= *maximum as i64
            }
            Constraint::NumEqual { type_a, type_b } => count(Some(*type_a)) == count(Some(*type_b)),
            Constraint::NumHalf { type_a, type_b } => {
                (count(Some(*type_a)) - count(Some(*type_b)) / 2).abs() <= 1
            }
        }
    }
}

/// Decides whether a trial is accepted.
///
/// Implementations cache the current total energy (and per-term profile) so
/// the driver never recomputes a full sum inside the trial loop.
pub trait Criterion: Send {
    /// Called once before each attempt, while the system is still unperturbed
    fn before_attempt(&mut self, _system: &System) {}

    /// The decision. The uniform variate must only be drawn when the outcome
    /// is genuinely probabilistic; auto-rejections never consume randomness.
    fn is_accepted(&mut self, acceptance: &Acceptance, system: &System, rng: &mut SmallRng) -> bool;

    fn was_accepted(&self) -> bool;

    fn current_energy(&self) -> f64;
    fn set_current_energy(&mut self, energy: f64);
    fn current_energy_profile(&self) -> &Vec<f64>;
    fn set_current_energy_profile(&mut self, profile: Vec<f64>);

    /// Completion for open-ended criteria (flat-histogram convergence)
    fn is_complete(&self) -> bool {
        false
    }

    /// Phase counter used by stepper gating
    fn phase(&self) -> usize;
    fn increment_phase(&mut self);

    /// Current macrostate bin, if the criterion tracks one
    fn state(&self) -> Option<usize> {
        None
    }

    fn num_states(&self) -> usize {
        1
    }

    /// Infrequent maintenance (e.g. transition-matrix renormalization)
    fn update(&mut self) {}

    /// Human-readable status block for the criteria writer
    fn write(&self) -> String;

    fn name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The classical Metropolis criterion with optional constraints.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Metropolis {
    constraints: Vec<Constraint>,
    current_energy: f64,
    current_energy_profile: Vec<f64>,
    was_accepted: bool,
    phase: usize,
}

impl Metropolis {
    pub fn new() -> Metropolis {
        Metropolis::default()
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Metropolis {
        self.constraints.push(constraint);
        self
    }
}

impl Criterion for Metropolis {
    fn is_accepted(&mut self, acceptance: &Acceptance, system: &System, rng: &mut SmallRng) -> bool {
        self.was_accepted = false;
        if acceptance.reject() {
            debug!("auto-rejected");
            return false;
        }
        if !self.constraints.iter().all(|c| c.is_allowed(system, acceptance)) {
            debug!("constraint rejected");
            return false;
        }
        let ln_prob = acceptance.ln_metropolis_prob();
        if ln_prob >= 0.0 || rng.gen_range(0.0..1.0) < ln_prob.exp() {
            self.current_energy = acceptance.energy_new();
            self.current_energy_profile = acceptance.energy_profile_new().clone();
            self.was_accepted = true;
        }
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

    fn phase(&self) -> usize {
        self.phase
    }

    fn increment_phase(&mut self) {
        self.phase += 1;
    }

    fn write(&self) -> String {
        format!("Metropolis,energy,{:.10}\n", self.current_energy)
    }

    fn name(&self) -> &str {
        "Metropolis"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Mayer-sampling criterion for virial-coefficient ratios: trials are
/// accepted on `$ |f| = |e^{-\beta \Delta U} - 1| $` ratios while `$ f $`
/// and the reference `$ f_{ref} $` are accumulated for the final ratio.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MayerSampling {
    current_energy: f64,
    current_energy_profile: Vec<f64>,
    f12: Accumulator,
    f12_ref: Accumulator,
    was_accepted: bool,
    phase: usize,
    beta: f64,
}

impl MayerSampling {
    pub fn new(beta: f64) -> MayerSampling {
        MayerSampling {
            current_energy: 0.0,
            current_energy_profile: Vec::new(),
            f12: Accumulator::new(),
            f12_ref: Accumulator::new(),
            was_accepted: false,
            phase: 0,
            beta,
        }
    }

    /// `$ \langle f \rangle / \langle f_{ref} \rangle $`, the second-virial ratio
    pub fn second_virial_ratio(&self) -> f64 {
        self.f12.average() / self.f12_ref.average()
    }
}

impl Criterion for MayerSampling {
    fn is_accepted(&mut self, acceptance: &Acceptance, _system: &System, rng: &mut SmallRng) -> bool {
        self.was_accepted = false;
        if acceptance.reject() {
            return false;
        }
        let f_old = (-self.beta * self.current_energy).exp() - 1.0;
        let f_new = (-self.beta * acceptance.energy_new()).exp() - 1.0;
        let ratio = if f_old.abs() < fugacity_numerical::NEAR_ZERO {
            1.0
        } else {
            (f_new / f_old).abs()
        };
        if ratio >= 1.0 || rng.gen_range(0.0..1.0) < ratio {
            self.current_energy = acceptance.energy_new();
            self.current_energy_profile = acceptance.energy_profile_new().clone();
            self.was_accepted = true;
        }
        let f = (-self.beta * self.current_energy).exp() - 1.0;
        self.f12.accumulate(f.signum());
        // hard-sphere style reference: unit overlap inside the current frame
        let f_ref = if self.current_energy.abs() > fugacity_numerical::NEAR_ZERO { -1.0 } else { 0.0 };
        self.f12_ref.accumulate(f_ref);
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

    fn phase(&self) -> usize {
        self.phase
    }

    fn increment_phase(&mut self) {
        self.phase += 1;
    }

    fn write(&self) -> String {
        format!(
            "MayerSampling,f12,{:.10},f12_ref,{:.10}\n",
            self.f12.average(),
            self.f12_ref.average()
        )
    }

    fn name(&self) -> &str {
        "MayerSampling"
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
    use fugacity_configuration::{Configuration, Domain};
    use rand::SeedableRng;

    fn empty_system() -> System {
        System::new(Configuration::new(Domain::cubic(8.0)))
    }

    #[test]
    fn downhill_moves_always_accept() {
        let mut criterion = Metropolis::new();
        let mut acceptance = Acceptance::new();
        acceptance.add_to_ln_metropolis_prob(2.5);
        acceptance.set_energy_new(-1.0);
        let mut rng = SmallRng::seed_from_u64(0);
        assert!(criterion.is_accepted(&acceptance, &empty_system(), &mut rng));
        assert_eq!(criterion.current_energy(), -1.0);
    }

    #[test]
    fn rejected_attempts_never_draw() {
        let mut criterion = Metropolis::new();
        let mut acceptance = Acceptance::new();
        acceptance.set_reject();
        let mut rng_a = SmallRng::seed_from_u64(11);
        let mut rng_b = SmallRng::seed_from_u64(11);
        assert!(!criterion.is_accepted(&acceptance, &empty_system(), &mut rng_a));
        // the stream is untouched: both generators still agree
        assert_eq!(rng_a.gen_range(0.0..1.0f64), rng_b.gen_range(0.0..1.0f64));
    }
}
