use log::{info, warn};

use fugacity_system::System;

use crate::{Criterion, Modify, StepperCounters, StepperOptions, TrialFactory};

/// Recomputes the total energy from scratch and asserts agreement with the
/// criterion's cache; also replays the cell-list consistency pass.
pub struct CheckEnergy {
    pub options: StepperOptions,
    counters: StepperCounters,
    tolerance: f64,
}

impl CheckEnergy {
    pub fn new(options: StepperOptions, tolerance: f64) -> CheckEnergy {
        CheckEnergy { options, counters: StepperCounters::default(), tolerance }
    }
}

impl Modify for CheckEnergy {
    fn options(&self) -> &StepperOptions {
        &self.options
    }

    fn counters_mut(&mut self) -> &mut StepperCounters {
        &mut self.counters
    }

    fn update(
        &mut self,
        system: &mut System,
        criterion: &mut Box<dyn Criterion>,
        _trials: &mut TrialFactory,
    ) {
        for config_index in 0..system.num_configurations() {
            system.configuration(config_index).check();
        }
        let mut recomputed = 0.0;
        for config_index in 0..system.num_configurations() {
            recomputed += system.energy(config_index);
        }
        let cached = criterion.current_energy();
        let scale = 1.0f64.max(cached.abs());
        assert!(
            (recomputed - cached).abs() / scale <= self.tolerance,
            "CheckEnergy::update: recomputed energy {} disagrees with the cached {} beyond {}",
            recomputed,
            cached,
            self.tolerance
        );
        // absorb accumulated floating-point drift
        criterion.set_current_energy(recomputed);
        criterion.set_current_energy_profile(system.energy_profile(0));
    }

    fn name(&self) -> &str {
        "CheckEnergy"
    }
}

/// Adjusts every trial's step sizes towards their target acceptance.
pub struct Tuner {
    pub options: StepperOptions,
    counters: StepperCounters,
}

impl Tuner {
    pub fn new(options: StepperOptions) -> Tuner {
        Tuner { options, counters: StepperCounters::default() }
    }
}

impl Modify for Tuner {
    fn options(&self) -> &StepperOptions {
        &self.options
    }

    fn counters_mut(&mut self) -> &mut StepperCounters {
        &mut self.counters
    }

    fn update(
        &mut self,
        _system: &mut System,
        _criterion: &mut Box<dyn Criterion>,
        trials: &mut TrialFactory,
    ) {
        trials.tune();
    }

    fn name(&self) -> &str {
        "Tuner"
    }
}

/// Periodically triggers the criterion's infrequent maintenance (e.g. the
/// transition-matrix ln-probability recursion).
pub struct CriteriaUpdater {
    pub options: StepperOptions,
    counters: StepperCounters,
}

impl CriteriaUpdater {
    pub fn new(options: StepperOptions) -> CriteriaUpdater {
        CriteriaUpdater { options, counters: StepperCounters::default() }
    }
}

impl Modify for CriteriaUpdater {
    fn options(&self) -> &StepperOptions {
        &self.options
    }

    fn counters_mut(&mut self) -> &mut StepperCounters {
        &mut self.counters
    }

    fn update(
        &mut self,
        _system: &mut System,
        criterion: &mut Box<dyn Criterion>,
        _trials: &mut TrialFactory,
    ) {
        criterion.update();
    }

    fn name(&self) -> &str {
        "CriteriaUpdater"
    }
}

/// Advances the phase counter once a trial-count threshold passes.
pub struct IncrementPhase {
    pub options: StepperOptions,
    counters: StepperCounters,
    after_num_attempts: u64,
    done: bool,
}

impl IncrementPhase {
    pub fn new(options: StepperOptions, after_num_attempts: u64) -> IncrementPhase {
        IncrementPhase { options, counters: StepperCounters::default(), after_num_attempts, done: false }
    }
}

impl Modify for IncrementPhase {
    fn options(&self) -> &StepperOptions {
        &self.options
    }

    fn counters_mut(&mut self) -> &mut StepperCounters {
        &mut self.counters
    }

    fn update(
        &mut self,
        _system: &mut System,
        criterion: &mut Box<dyn Criterion>,
        trials: &mut TrialFactory,
    ) {
        if !self.done && trials.num_attempts() >= self.after_num_attempts {
            info!("incrementing phase after {} attempts", trials.num_attempts());
            criterion.increment_phase();
            self.done = true;
        }
    }

    fn name(&self) -> &str {
        "IncrementPhase"
    }
}

/// Raises the terminate flag once wall-clock time runs out. Advisory: the
/// current trial always completes.
pub struct WallClockLimit {
    pub options: StepperOptions,
    counters: StepperCounters,
    max_hours: f64,
    started: std::time::Instant,
    expired: bool,
}

impl WallClockLimit {
    pub fn new(options: StepperOptions, max_hours: f64) -> WallClockLimit {
        WallClockLimit {
            options,
            counters: StepperCounters::default(),
            max_hours,
            started: std::time::Instant::now(),
            expired: false,
        }
    }
}

impl Modify for WallClockLimit {
    fn options(&self) -> &StepperOptions {
        &self.options
    }

    fn counters_mut(&mut self) -> &mut StepperCounters {
        &mut self.counters
    }

    fn update(
        &mut self,
        _system: &mut System,
        _criterion: &mut Box<dyn Criterion>,
        _trials: &mut TrialFactory,
    ) {
        let hours = self.started.elapsed().as_secs_f64() / 3600.0;
        if hours > self.max_hours && !self.expired {
            warn!("wall clock limit of {} hours exceeded", self.max_hours);
            self.expired = true;
        }
    }

    fn wants_terminate(&self) -> bool {
        self.expired
    }

    fn name(&self) -> &str {
        "WallClockLimit"
    }
}
