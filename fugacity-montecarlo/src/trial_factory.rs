use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use fugacity_system::System;

use crate::{Criterion, Trial};

/// The collection of trials a simulation samples from, weighted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrialFactory {
    trials: Vec<Trial>,
}

impl TrialFactory {
    pub fn new() -> TrialFactory {
        TrialFactory::default()
    }

    pub fn add(&mut self, trial: Trial) {
        self.trials.push(trial);
    }

    /// Removes a trial by name; unknown names are a caller error
    pub fn remove(&mut self, name: &str) {
        let before = self.trials.len();
        self.trials.retain(|t| t.name() != name);
        assert!(self.trials.len() < before, "no trial named `{}` to remove", name);
    }

    pub fn num(&self) -> usize {
        self.trials.len()
    }

    pub fn trial(&self, i: usize) -> &Trial {
        &self.trials[i]
    }

    pub fn trial_mut(&mut self, i: usize) -> &mut Trial {
        &mut self.trials[i]
    }

    pub fn trials(&self) -> &Vec<Trial> {
        &self.trials
    }

    pub fn precompute(&mut self, system: &mut System) {
        for trial in self.trials.iter_mut() {
            trial.precompute(system);
        }
    }

    /// Total attempts across all trials
    pub fn num_attempts(&self) -> u64 {
        self.trials.iter().map(|t| t.num_attempts()).sum()
    }

    /// Picks a trial proportionally to its weight and attempts it.
    /// Returns whether the attempt was accepted.
    pub fn attempt(
        &mut self,
        criterion: &mut dyn Criterion,
        system: &mut System,
        rng: &mut SmallRng,
    ) -> bool {
        assert!(!self.trials.is_empty(), "no trials to attempt");
        let total: f64 = self.trials.iter().map(|t| t.weight()).sum();
        let draw = rng.gen_range(0.0..total);
        let mut running = 0.0;
        let mut picked = self.trials.len() - 1;
        for (i, trial) in self.trials.iter().enumerate() {
            running += trial.weight();
            if draw < running {
                picked = i;
                break;
            }
        }
        self.trials[picked].attempt(criterion, system, rng)
    }

    /// Tunes every trial's step sizes from its recent acceptance
    pub fn tune(&mut self) {
        for trial in self.trials.iter_mut() {
            trial.tune();
        }
    }

    pub fn status_header(&self) -> String {
        self.trials.iter().map(|t| t.status_header()).collect()
    }

    pub fn status(&self) -> String {
        self.trials.iter().map(|t| t.status()).collect()
    }
}
