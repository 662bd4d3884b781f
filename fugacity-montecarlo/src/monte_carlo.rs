use log::info;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use fugacity_system::System;

use crate::{
    step_analyze, step_modify, Analyze, Criterion, Metropolis, Modify, Trial, TrialFactory,
};

/// The driver: owns the system, the criterion, the weighted trial collection,
/// the analyze/modify steppers and the random stream.
///
/// One `MonteCarlo` is strictly sequential; trial attempts form a totally
/// ordered chain and steppers observe trial `k`'s committed state before
/// trial `k + 1` begins.
pub struct MonteCarlo {
    system: System,
    criterion: Box<dyn Criterion>,
    trials: TrialFactory,
    analyzers: Vec<Box<dyn Analyze>>,
    modifiers: Vec<Box<dyn Modify>>,
    rng: SmallRng,
    terminate: bool,
    initialized: bool,
}

impl MonteCarlo {
    pub fn new(system: System) -> MonteCarlo {
        MonteCarlo {
            system,
            criterion: Box::new(Metropolis::new()),
            trials: TrialFactory::new(),
            analyzers: Vec::new(),
            modifiers: Vec::new(),
            rng: SmallRng::from_entropy(),
            terminate: false,
            initialized: false,
        }
    }

    pub fn seed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut System {
        &mut self.system
    }

    pub fn criterion(&self) -> &dyn Criterion {
        self.criterion.as_ref()
    }

    pub fn criterion_mut(&mut self) -> &mut Box<dyn Criterion> {
        &mut self.criterion
    }

    pub fn set_criterion(&mut self, criterion: Box<dyn Criterion>) {
        self.criterion = criterion;
        self.initialized = false;
    }

    pub fn trials(&self) -> &TrialFactory {
        &self.trials
    }

    pub fn trials_mut(&mut self) -> &mut TrialFactory {
        &mut self.trials
    }

    pub fn add_trial(&mut self, mut trial: Trial) {
        trial.precompute(&mut self.system);
        self.trials.add(trial);
    }

    pub fn remove_trial(&mut self, name: &str) {
        self.trials.remove(name);
    }

    pub fn add_analyze(&mut self, analyze: Box<dyn Analyze>) {
        self.analyzers.push(analyze);
    }

    pub fn add_modify(&mut self, modify: Box<dyn Modify>) {
        self.modifiers.push(modify);
    }

    pub fn remove_modify(&mut self, name: &str) {
        let before = self.modifiers.len();
        self.modifiers.retain(|m| m.name() != name);
        assert!(self.modifiers.len() < before, "no modify named `{}` to remove", name);
    }

    pub fn analyzers(&self) -> &Vec<Box<dyn Analyze>> {
        &self.analyzers
    }

    pub fn terminate(&mut self) {
        self.terminate = true;
    }

    pub fn is_terminated(&self) -> bool {
        self.terminate
    }

    pub fn num_attempts(&self) -> u64 {
        self.trials.num_attempts()
    }

    /// Computes the initial energy cache; runs once before the first attempt.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.system.precompute();
        self.trials.precompute(&mut self.system);
        let mut energy = 0.0;
        for config_index in 0..self.system.num_configurations() {
            energy += self.system.energy(config_index);
        }
        self.criterion.set_current_energy(energy);
        self.criterion.set_current_energy_profile(self.system.energy_profile(0));
        info!("initial energy: {}", energy);
        self.initialized = true;
    }

    /// One trial attempt plus the stepper pass. Returns whether the trial
    /// was accepted.
    pub fn attempt(&mut self) -> bool {
        self.initialize();
        let accepted =
            self.trials.attempt(self.criterion.as_mut(), &mut self.system, &mut self.rng);
        for analyze in self.analyzers.iter_mut() {
            step_analyze(analyze.as_mut(), &self.system, self.criterion.as_ref(), &self.trials);
        }
        for modify in self.modifiers.iter_mut() {
            step_modify(modify.as_mut(), &mut self.system, &mut self.criterion, &mut self.trials);
            if modify.wants_terminate() {
                self.terminate = true;
            }
        }
        accepted
    }

    /// Runs a fixed number of attempts (or fewer on terminate)
    pub fn run_num_attempts(&mut self, num: u64) {
        for _ in 0..num {
            if self.terminate {
                break;
            }
            self.attempt();
        }
    }

    /// Runs until the criterion reports completion or a stepper terminates
    pub fn run_until_complete(&mut self) {
        self.initialize();
        while !self.criterion.is_complete() && !self.terminate {
            self.attempt();
        }
    }

    /// Runs for at most a wall-clock budget (never interrupting a trial)
    pub fn run_for_hours(&mut self, hours: f64) {
        self.initialize();
        let start = std::time::Instant::now();
        while start.elapsed().as_secs_f64() / 3600.0 < hours {
            if self.terminate || self.criterion.is_complete() {
                break;
            }
            // amortize the clock read over a small batch
            for _ in 0..100 {
                if self.terminate {
                    break;
                }
                self.attempt();
            }
        }
    }
}
