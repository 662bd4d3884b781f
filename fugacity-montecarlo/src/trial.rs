use log::debug;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use fugacity_system::System;

use crate::{Acceptance, Criterion, TrialCompute, TrialStage};

/// A complete trial move: a pipeline of stages, the compute that assembles
/// their acceptance terms, a sampling weight, and attempt statistics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trial {
    name: String,
    stages: Vec<TrialStage>,
    compute: TrialCompute,
    weight: f64,
    num_attempts: u64,
    num_success: u64,
    num_auto_reject: u64,
    #[serde(skip)]
    acceptance: Acceptance,
}

impl Trial {
    pub fn new(name: &str, compute: TrialCompute) -> Trial {
        Trial {
            name: name.to_string(),
            stages: Vec::new(),
            compute,
            weight: 1.0,
            num_attempts: 0,
            num_success: 0,
            num_auto_reject: 0,
            acceptance: Acceptance::new(),
        }
    }

    pub fn add_stage(mut self, stage: TrialStage) -> Trial {
        self.stages.push(stage);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Trial {
        assert!(weight > 0.0, "trial weight must be positive: {}", weight);
        self.weight = weight;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn stage(&self, i: usize) -> &TrialStage {
        &self.stages[i]
    }

    pub fn stage_mut(&mut self, i: usize) -> &mut TrialStage {
        &mut self.stages[i]
    }

    pub fn num_attempts(&self) -> u64 {
        self.num_attempts
    }

    pub fn num_success(&self) -> u64 {
        self.num_success
    }

    pub fn num_auto_reject(&self) -> u64 {
        self.num_auto_reject
    }

    /// Success fraction over attempts that were not automatic rejections
    pub fn acceptance_ratio(&self) -> f64 {
        let real = self.num_attempts - self.num_auto_reject;
        if real == 0 {
            return 0.0;
        }
        self.num_success as f64 / real as f64
    }

    pub fn reset_stats(&mut self) {
        self.num_attempts = 0;
        self.num_success = 0;
        self.num_auto_reject = 0;
    }

    pub fn precompute(&mut self, system: &mut System) {
        for stage in self.stages.iter_mut() {
            stage.precompute(system);
        }
    }

    /// One attempt of this trial: select, perturb, decide, then finalize or
    /// revert. Returns whether the move was accepted.
    pub fn attempt(
        &mut self,
        criterion: &mut dyn Criterion,
        system: &mut System,
        rng: &mut SmallRng,
    ) -> bool {
        debug!("attempting {}", self.name);
        self.num_attempts += 1;
        self.acceptance.reset();
        criterion.before_attempt(system);

        for stage in self.stages.iter_mut() {
            if self.acceptance.reject() {
                break;
            }
            stage.select(system, &mut self.acceptance, rng);
        }
        if !self.acceptance.reject() {
            let current_energy = criterion.current_energy();
            let current_profile = criterion.current_energy_profile().clone();
            self.compute.perturb_and_acceptance(
                system,
                &mut self.acceptance,
                &mut self.stages,
                rng,
                current_energy,
                &current_profile,
            );
        }
        if self.acceptance.reject() {
            self.num_auto_reject += 1;
        }

        let accepted = criterion.is_accepted(&self.acceptance, system, rng);
        if accepted {
            self.num_success += 1;
            for stage in self.stages.iter_mut().rev() {
                stage.finalize(system);
            }
        } else {
            for stage in self.stages.iter_mut().rev() {
                stage.revert(system);
            }
        }
        debug!("{}: {}", self.name, if accepted { "accepted" } else { "rejected" });
        accepted
    }

    /// Adjusts every stage's step size towards its target
    pub fn tune(&mut self) {
        let real_attempts = self.num_attempts - self.num_auto_reject;
        if real_attempts == 0 {
            return;
        }
        let ratio = self.acceptance_ratio();
        for stage in self.stages.iter_mut() {
            stage.tune(ratio);
        }
        self.reset_stats();
    }

    pub fn status_header(&self) -> String {
        format!(",{}_acceptance,{}_tunable", self.name, self.name)
    }

    pub fn status(&self) -> String {
        let tunable = self.stages.first().and_then(|s| s.perturber.tunable()).map(|t| t.value());
        match tunable {
            Some(v) => format!(",{:.6},{:.6}", self.acceptance_ratio(), v),
            None => format!(",{:.6},", self.acceptance_ratio()),
        }
    }

    /// Loose equality for checkpoint round-trips
    pub fn is_equal(&self, other: &Trial) -> bool {
        self.name == other.name
            && self.num_attempts == other.num_attempts
            && self.num_success == other.num_success
            && (self.weight - other.weight).abs() < 1e-12
    }
}
