use log::trace;
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use fugacity_configuration::TrialState;
use fugacity_system::{System, OVERLAP_ENERGY};

use crate::{Acceptance, Perturber, TrialSelection, TrialSelector};

/// One stage of a trial: a selector, a perturber, and the Rosenbluth
/// bookkeeping for `num_steps` candidate placements.
///
/// A stage walks `SelectDone -> PerturbDone -> WeightDone` inside one
/// attempt; candidate weights exclude the intramolecular energy the
/// perturber's generation distribution already consumed, so bonded terms are
/// never double-counted. When `reference_index` is set the weights are built
/// on that cheaper potential (dual-cutoff configurational bias) and the
/// difference to the full potential enters the acceptance correction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrialStage {
    pub selector: TrialSelector,
    pub perturber: Perturber,
    /// number of configurational-bias candidates (1 disables staging)
    pub num_steps: usize,
    /// reference potential used for candidate weights, if any
    pub reference_index: Option<usize>,
    /// skip the old-configuration half (insertions)
    pub new_only: bool,
    /// which configuration this stage addresses (Gibbs transfers use two)
    pub config_index: usize,
    selection: Option<TrialSelection>,
}

impl TrialStage {
    pub fn new(selector: TrialSelector, perturber: Perturber) -> TrialStage {
        TrialStage {
            selector,
            perturber,
            num_steps: 1,
            reference_index: None,
            new_only: false,
            config_index: 0,
            selection: None,
        }
    }

    pub fn in_configuration(mut self, config_index: usize) -> TrialStage {
        self.config_index = config_index;
        self
    }

    pub fn with_num_steps(mut self, num_steps: usize) -> TrialStage {
        assert!(num_steps >= 1);
        self.num_steps = num_steps;
        self
    }

    pub fn with_reference(mut self, reference_index: usize) -> TrialStage {
        self.reference_index = Some(reference_index);
        self
    }

    pub fn new_only(mut self) -> TrialStage {
        self.new_only = true;
        self
    }

    pub fn precompute(&mut self, system: &System) {
        self.selector.precompute(system);
        self.perturber.precompute(system);
    }

    pub fn selection(&self) -> Option<&TrialSelection> {
        self.selection.as_ref()
    }

    /// Runs the selector; a failed selection is an automatic rejection.
    pub fn select(&mut self, system: &mut System, acceptance: &mut Acceptance, rng: &mut SmallRng) {
        match self.selector.select_in(system, rng, self.config_index) {
            Some(selection) => {
                acceptance.add_configuration(selection.config_index);
                self.selection = Some(selection);
            }
            None => {
                trace!("selection failed; auto-reject");
                acceptance.set_reject();
                self.selection = None;
            }
        }
    }

    fn weight_energy(&self, system: &mut System, selection: &TrialSelection) -> f64 {
        match self.reference_index {
            Some(r) => system.reference_energy(r, &selection.mobile),
            None => system.energy_select(selection.config_index, &selection.mobile),
        }
    }

    /// The bonded energy the generation distribution accounts for in the
    /// existing (unperturbed) placement; zero for perturbers that do not
    /// sample internal coordinates.
    fn existing_generated_energy(&self, system: &System, selection: &TrialSelection) -> f64 {
        self.perturber.existing_excluded_energy(system, selection)
    }

    /// Accumulates the old-configuration Rosenbluth factor. Candidate 1 is
    /// always the existing placement; the remaining `num_steps - 1`
    /// candidates are drawn and discarded.
    pub fn compute_rosenbluth_old(
        &mut self,
        system: &mut System,
        acceptance: &mut Acceptance,
        rng: &mut SmallRng,
    ) {
        if self.new_only || acceptance.reject() {
            return;
        }
        let beta = system.beta();
        let mut selection = match self.selection.take() {
            Some(s) => s,
            None => return,
        };

        let raw_existing = self.weight_energy(system, &selection);
        let full_existing = system.energy_select(selection.config_index, &selection.mobile);
        let profile_old = system.energy_profile(selection.config_index);
        let gen_existing = self.existing_generated_energy(system, &selection);
        let mut rosenbluth = boltzmann(beta, raw_existing - gen_existing);

        if self.num_steps > 1 {
            // removals weigh alternative placements the way the paired
            // insertion generates them
            let mut generator = if matches!(self.perturber, Perturber::Remove) {
                Perturber::Add { region: crate::AddRegion::Box, orient: false }
            } else {
                self.perturber.clone()
            };
            for _ in 1..self.num_steps {
                generator.perturb(system, &mut selection, rng);
                let raw = self.weight_energy(system, &selection);
                rosenbluth += boltzmann(beta, raw - selection.excluded_energy);
            }
            drop(generator); // stage perturbers carry no per-candidate state
            // the trial candidates displaced the selection; put it back
            system
                .configuration_mut(selection.config_index)
                .revert_positions(&selection.mobile);
            selection.mobile.restore_original();
            selection.mobile.set_trial_state(TrialState::None);
        }

        if rosenbluth <= 0.0 || full_existing >= OVERLAP_ENERGY {
            acceptance.set_reject();
            self.selection = Some(selection);
            return;
        }
        acceptance.add_to_ln_metropolis_prob(-(rosenbluth / self.num_steps as f64).ln());
        acceptance.add_to_energy_old(full_existing);
        acceptance.add_to_energy_weight_old(raw_existing);
        acceptance.set_energy_profile_old(profile_old);
        if selection.mobile.trial_state() == TrialState::Remove
            || matches!(self.perturber, Perturber::Remove)
        {
            acceptance.add_to_perturbed(&selection.mobile);
        }
        self.selection = Some(selection);
    }

    /// Draws `num_steps` candidates, picks one by its weight, and leaves the
    /// system in the chosen configuration.
    pub fn compute_rosenbluth_new(
        &mut self,
        system: &mut System,
        acceptance: &mut Acceptance,
        rng: &mut SmallRng,
    ) {
        if acceptance.reject() {
            return;
        }
        let beta = system.beta();
        let mut selection = match self.selection.take() {
            Some(s) => s,
            None => return,
        };

        if matches!(self.perturber, Perturber::Remove) {
            // nothing to place; the old half carried the energies and the
            // perturbed record, this only tags the deferred removal
            self.perturber.perturb(system, &mut selection, rng);
            self.selection = Some(selection);
            return;
        }

        let mut weights = Vec::with_capacity(self.num_steps);
        let mut raws = Vec::with_capacity(self.num_steps);
        let mut candidates = Vec::with_capacity(self.num_steps);
        for _ in 0..self.num_steps {
            self.perturber.perturb(system, &mut selection, rng);
            let raw = self.weight_energy(system, &selection);
            weights.push(boltzmann(beta, raw - selection.excluded_energy));
            raws.push(raw);
            candidates.push((selection.mobile.positions().clone(), selection.mobile.eulers().clone()));
        }
        let rosenbluth: f64 = weights.iter().sum();
        if rosenbluth <= 0.0 {
            trace!("all candidates overlap; auto-reject");
            acceptance.set_reject();
            self.selection = Some(selection);
            return;
        }

        // pick proportionally to the weights
        let mut chosen = self.num_steps - 1;
        if self.num_steps > 1 {
            let draw = rng.gen_range(0.0..rosenbluth);
            let mut running = 0.0;
            for (i, w) in weights.iter().enumerate() {
                running += w;
                if draw < running {
                    chosen = i;
                    break;
                }
            }
            let (positions, eulers) = candidates[chosen].clone();
            selection.mobile.set_proposal(positions, eulers);
            system
                .configuration_mut(selection.config_index)
                .update_positions(&selection.mobile);
        }

        let full = system.energy_select(selection.config_index, &selection.mobile);
        if full >= OVERLAP_ENERGY {
            acceptance.set_reject();
            self.selection = Some(selection);
            return;
        }
        acceptance.add_to_ln_metropolis_prob((rosenbluth / self.num_steps as f64).ln());
        acceptance.add_to_energy_new(full);
        acceptance.add_to_energy_weight_new(raws[chosen]);
        acceptance.set_energy_profile_new(system.energy_profile(selection.config_index));
        acceptance.add_to_perturbed(&selection.mobile);
        self.selection = Some(selection);
    }

    /// Applies the perturber once without Rosenbluth bookkeeping (volume
    /// moves recompute whole-system energies instead).
    pub fn perturb_only(&mut self, system: &mut System, rng: &mut SmallRng) {
        if let Some(selection) = self.selection.as_mut() {
            self.perturber.perturb(system, selection, rng);
        }
    }

    /// Revert path; called in reverse stage order on rejection.
    pub fn revert(&mut self, system: &mut System) {
        if let Some(selection) = self.selection.take() {
            self.perturber.revert(system, &selection);
        }
    }

    /// Finalize path; called in reverse stage order on acceptance.
    pub fn finalize(&mut self, system: &mut System) {
        if let Some(selection) = self.selection.take() {
            system.finalize(selection.config_index, &selection.mobile);
            self.perturber.finalize(system, &selection);
        }
    }

    /// Tune the step size towards its target acceptance
    pub fn tune(&mut self, actual_acceptance: f64) {
        if let Some(tunable) = self.perturber.tunable_mut() {
            tunable.tune(actual_acceptance);
        }
    }
}

fn boltzmann(beta: f64, energy: f64) -> f64 {
    if energy >= OVERLAP_ENERGY {
        0.0
    } else {
        (-beta * energy).exp()
    }
}
