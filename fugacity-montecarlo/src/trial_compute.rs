use log::trace;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use fugacity_system::{System, OVERLAP_ENERGY};

use crate::{Acceptance, TrialStage};

/// Packages the staged selection/perturbation into the Metropolis log-ratio,
/// adding the ensemble-specific terms on top of the Rosenbluth factors the
/// stages accumulate.
///
/// Every kind finishes with the shared correction
/// `$ -\beta[(\Delta E) - (\Delta E_w)] $`, where `$ \Delta E_w $` is the
/// part already inside the stage weights (the whole of `$ \Delta E $` for
/// plain staging, the reference part for dual-cutoff bias), and sets the
/// absolute new energy for the criterion's cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrialCompute {
    /// in-place displacement
    Move,
    /// grand-canonical insertion: `$ +\ln V - \ln(N+1) + \beta\mu $`
    Add,
    /// grand-canonical deletion: `$ -\ln V + \ln N - \beta\mu $`
    Remove,
    /// box rescale: `$ -\beta p \Delta V + N\ln(V'/V) $` (`$ +\ln(V'/V) $` for ln-V steps)
    Volume,
    /// insertion into an aggregation shell: `$ +\ln v_{AV} - \ln(N^{AV}+1) + \beta\mu $`
    AvbAdd,
    /// deletion out of an aggregation shell: `$ -\ln v_{AV} + \ln N^{AV} - \beta\mu $`
    AvbRemove,
    /// particle transfer between two boxes:
    /// `$ \ln\frac{N_{from}}{N_{to}+1} + \ln\frac{V_{to}}{V_{from}} $`
    GibbsTransfer { from: usize, to: usize },
}

impl TrialCompute {
    pub fn perturb_and_acceptance(
        &self,
        system: &mut System,
        acceptance: &mut Acceptance,
        stages: &mut [TrialStage],
        rng: &mut SmallRng,
        current_energy: f64,
        current_profile: &[f64],
    ) {
        match self {
            TrialCompute::Move => {
                for stage in stages.iter_mut() {
                    stage.compute_rosenbluth_old(system, acceptance, rng);
                }
                for stage in stages.iter_mut() {
                    stage.compute_rosenbluth_new(system, acceptance, rng);
                }
                if acceptance.reject() {
                    return;
                }
                Self::energy_correction(system, acceptance);
                Self::set_absolute_energies(acceptance, current_energy, current_profile);
            }
            TrialCompute::Add | TrialCompute::AvbAdd => {
                for stage in stages.iter_mut() {
                    stage.compute_rosenbluth_new(system, acceptance, rng);
                }
                if acceptance.reject() {
                    return;
                }
                Self::energy_correction(system, acceptance);
                let selection = stages[0].selection().expect("add stages keep their selection");
                let cfg = selection.config_index;
                let pi = selection.mobile.particle_index(0);
                let config = system.configuration(cfg);
                let particle_type = config.particle(pi).type_index();
                let beta_mu = system.thermo().beta_mu(particle_type);
                match self {
                    TrialCompute::Add => {
                        // the revived particle is already counted
                        let n_after = config.num_particles_of_type(particle_type) as f64;
                        let volume = config.domain().volume();
                        acceptance.add_to_ln_metropolis_prob(volume.ln() - n_after.ln() + beta_mu);
                    }
                    _ => {
                        let shell_volume =
                            selection.mobile.property("shell_volume").unwrap_or_else(|| {
                                system.configuration(cfg).domain().volume()
                            });
                        let n_in_shell = selection.mobile.property("num_in_shell").unwrap_or(0.0);
                        acceptance
                            .add_to_ln_metropolis_prob(shell_volume.ln() - (n_in_shell + 1.0).ln() + beta_mu);
                    }
                }
                acceptance.set_macrostate_shift_type(particle_type);
                Self::set_absolute_energies(acceptance, current_energy, current_profile);
            }
            TrialCompute::Remove | TrialCompute::AvbRemove => {
                for stage in stages.iter_mut() {
                    stage.compute_rosenbluth_old(system, acceptance, rng);
                }
                for stage in stages.iter_mut() {
                    stage.compute_rosenbluth_new(system, acceptance, rng);
                }
                if acceptance.reject() {
                    return;
                }
                Self::energy_correction(system, acceptance);
                let selection = stages[0].selection().expect("remove stages keep their selection");
                let cfg = selection.config_index;
                let pi = selection.mobile.particle_index(0);
                let config = system.configuration(cfg);
                let particle_type = config.particle(pi).type_index();
                let beta_mu = system.thermo().beta_mu(particle_type);
                match self {
                    TrialCompute::Remove => {
                        let n = config.num_particles_of_type(particle_type) as f64;
                        let volume = config.domain().volume();
                        acceptance.add_to_ln_metropolis_prob(-volume.ln() + n.ln() - beta_mu);
                    }
                    _ => {
                        let shell_volume = selection
                            .mobile
                            .property("shell_volume")
                            .unwrap_or_else(|| system.configuration(cfg).domain().volume());
                        let n_in_shell = selection.mobile.property("num_in_shell").unwrap_or(1.0);
                        acceptance
                            .add_to_ln_metropolis_prob(-shell_volume.ln() + n_in_shell.ln() - beta_mu);
                    }
                }
                acceptance.add_to_macrostate_shift(-1);
                acceptance.set_macrostate_shift_type(particle_type);
                Self::set_absolute_energies(acceptance, current_energy, current_profile);
            }
            TrialCompute::Volume => {
                let beta = system.beta();
                let stage = &mut stages[0];
                stage.perturb_only(system, rng);
                let selection = stage.selection().expect("volume stages keep their selection");
                let cfg = selection.config_index;
                let volume_old = selection.mobile.property("volume_old").unwrap_or(0.0);
                let volume_new = selection.mobile.property("volume_new").unwrap_or(0.0);
                let log_step = matches!(stage.perturber, crate::Perturber::Volume { uniform: false, .. });
                if (volume_new - volume_old).abs() < fugacity_numerical::NEAR_ZERO {
                    acceptance.set_reject();
                    return;
                }
                let energy_new = system.energy(cfg);
                if energy_new >= OVERLAP_ENERGY {
                    acceptance.set_reject();
                    return;
                }
                let n = system.configuration(cfg).num_particles() as f64;
                let pressure = system.thermo().pressure();
                let mut ln_prob = -beta * (energy_new - current_energy)
                    - beta * pressure * (volume_new - volume_old)
                    + n * (volume_new / volume_old).ln();
                if log_step {
                    ln_prob += (volume_new / volume_old).ln();
                }
                acceptance.add_to_ln_metropolis_prob(ln_prob);
                acceptance.set_energy_new(energy_new);
                acceptance.set_energy_profile_new(system.energy_profile(cfg));
            }
            TrialCompute::GibbsTransfer { from, to } => {
                // stage 0 removes from `from`, stage 1 inserts into `to`
                for stage in stages.iter_mut() {
                    stage.compute_rosenbluth_old(system, acceptance, rng);
                }
                for stage in stages.iter_mut() {
                    stage.compute_rosenbluth_new(system, acceptance, rng);
                }
                if acceptance.reject() {
                    return;
                }
                Self::energy_correction(system, acceptance);
                let removal = stages[0].selection().expect("transfer stages keep their selection");
                let particle_type =
                    system.configuration(*from).particle(removal.mobile.particle_index(0)).type_index();
                let n_from = system.configuration(*from).num_particles_of_type(particle_type) as f64;
                // insertion already revived its particle in `to`
                let n_to_after = system.configuration(*to).num_particles_of_type(particle_type) as f64;
                let v_from = system.configuration(*from).domain().volume();
                let v_to = system.configuration(*to).domain().volume();
                acceptance.add_to_ln_metropolis_prob((n_from / n_to_after).ln() + (v_to / v_from).ln());
                if *from == 0 {
                    acceptance.add_to_macrostate_shift(-1);
                }
                acceptance.set_macrostate_shift_type(particle_type);
                Self::set_absolute_energies(acceptance, current_energy, current_profile);
            }
        }
        trace!("ln_metropolis_prob = {}", acceptance.ln_metropolis_prob());
    }

    /// `$ -\beta[(\Delta E) - (\Delta E_w)] $`; zero unless a stage built its
    /// weights on a reference potential.
    fn energy_correction(system: &System, acceptance: &mut Acceptance) {
        let beta = system.beta();
        let delta_full = acceptance.energy_new() - acceptance.energy_old();
        let delta_weight = acceptance.energy_weight_new() - acceptance.energy_weight_old();
        acceptance.add_to_ln_metropolis_prob(-beta * (delta_full - delta_weight));
    }

    /// Converts the accumulated selection energies into the absolute total
    /// and profile the criterion caches on acceptance.
    fn set_absolute_energies(acceptance: &mut Acceptance, current_energy: f64, current_profile: &[f64]) {
        let delta = acceptance.energy_new() - acceptance.energy_old();
        acceptance.set_energy_new(current_energy + delta);
        let profile_new = acceptance.energy_profile_new().clone();
        let profile_old = acceptance.energy_profile_old().clone();
        let mut absolute: Vec<f64> = current_profile.to_vec();
        for i in 0..absolute.len() {
            let new_term = profile_new.get(i).copied().unwrap_or(0.0);
            let old_term = profile_old.get(i).copied().unwrap_or(0.0);
            absolute[i] += new_term - old_term;
        }
        acceptance.set_energy_profile_new(absolute);
    }
}
