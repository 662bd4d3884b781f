use serde::{Deserialize, Serialize};

use fugacity_system::System;

use crate::{Criterion, TrialFactory};

/// Shared stepper configuration: cadence, output file, phase gating and
/// multistate mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepperOptions {
    pub trials_per_update: u64,
    pub trials_per_write: u64,
    /// empty writes to standard output
    pub file_name: String,
    pub append: bool,
    /// gate on the criterion's phase counter; negative disables
    pub start_after_phase: i64,
    pub stop_after_phase: i64,
    /// keep one accumulator per macrostate bin, written in one aggregated pass
    pub multistate: bool,
}

impl Default for StepperOptions {
    fn default() -> Self {
        StepperOptions {
            trials_per_update: 1,
            trials_per_write: 1,
            file_name: String::new(),
            append: true,
            start_after_phase: -1,
            stop_after_phase: -1,
            multistate: false,
        }
    }
}

impl StepperOptions {
    pub fn with_trials_per_update(mut self, trials: u64) -> StepperOptions {
        self.trials_per_update = trials;
        self
    }

    pub fn with_trials_per_write(mut self, trials: u64) -> StepperOptions {
        self.trials_per_write = trials;
        self
    }

    pub fn with_file_name(mut self, file_name: &str) -> StepperOptions {
        self.file_name = file_name.to_string();
        self
    }

    pub fn multistate(mut self) -> StepperOptions {
        self.multistate = true;
        self
    }

    fn is_phase_active(&self, phase: i64) -> bool {
        if self.start_after_phase >= 0 && phase <= self.start_after_phase {
            return false;
        }
        if self.stop_after_phase >= 0 && phase > self.stop_after_phase {
            return false;
        }
        true
    }
}

/// Per-stepper trial counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepperCounters {
    pub trials_since_update: u64,
    pub trials_since_write: u64,
    pub wrote_header: bool,
}

/// Read-only periodic action (writers, accumulators of observations).
pub trait Analyze: Send {
    fn options(&self) -> &StepperOptions;
    fn counters_mut(&mut self) -> &mut StepperCounters;

    /// Observe the committed state of the last trial
    fn update(&mut self, system: &System, criterion: &dyn Criterion, trials: &TrialFactory);

    /// Emit output; for multistate steppers one call walks all bins
    fn write(&mut self, system: &System, criterion: &dyn Criterion, trials: &TrialFactory);

    fn name(&self) -> &str;
}

/// State-mutating periodic action (tuners, checks, terminators).
pub trait Modify: Send {
    fn options(&self) -> &StepperOptions;
    fn counters_mut(&mut self) -> &mut StepperCounters;

    fn update(
        &mut self,
        system: &mut System,
        criterion: &mut Box<dyn Criterion>,
        trials: &mut TrialFactory,
    );

    fn write(
        &mut self,
        _system: &mut System,
        _criterion: &mut Box<dyn Criterion>,
        _trials: &mut TrialFactory,
    ) {
    }

    /// Signals the driver to stop after the current trial
    fn wants_terminate(&self) -> bool {
        false
    }

    fn name(&self) -> &str;
}

/// Advances an analyzer's counters after one trial and fires its actions.
pub fn step_analyze(
    analyze: &mut dyn Analyze,
    system: &System,
    criterion: &dyn Criterion,
    trials: &TrialFactory,
) {
    if !analyze.options().is_phase_active(criterion.phase() as i64) {
        return;
    }
    let trials_per_update = analyze.options().trials_per_update;
    let trials_per_write = analyze.options().trials_per_write;
    let counters = analyze.counters_mut();
    counters.trials_since_update += 1;
    let do_update = counters.trials_since_update >= trials_per_update;
    if do_update {
        counters.trials_since_update = 0;
    }
    counters.trials_since_write += 1;
    let do_write = counters.trials_since_write >= trials_per_write;
    if do_write {
        counters.trials_since_write = 0;
    }
    if do_update {
        analyze.update(system, criterion, trials);
    }
    if do_write {
        analyze.write(system, criterion, trials);
    }
}

/// Advances a modifier's counters after one trial and fires its actions.
pub fn step_modify(
    modify: &mut dyn Modify,
    system: &mut System,
    criterion: &mut Box<dyn Criterion>,
    trials: &mut TrialFactory,
) {
    if !modify.options().is_phase_active(criterion.phase() as i64) {
        return;
    }
    let trials_per_update = modify.options().trials_per_update;
    let trials_per_write = modify.options().trials_per_write;
    let counters = modify.counters_mut();
    counters.trials_since_update += 1;
    let do_update = counters.trials_since_update >= trials_per_update;
    if do_update {
        counters.trials_since_update = 0;
    }
    counters.trials_since_write += 1;
    let do_write = counters.trials_since_write >= trials_per_write;
    if do_write {
        counters.trials_since_write = 0;
    }
    if do_update {
        modify.update(system, criterion, trials);
    }
    if do_write {
        modify.write(system, criterion, trials);
    }
}
