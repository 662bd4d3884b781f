use std::io::Write;

use fugacity_configuration::{FileXyz, FileXyzEuler};
use fugacity_io::out_writer;
use fugacity_statistics::{Accumulator, Histogram};
use fugacity_system::System;

use crate::{Analyze, Criterion, StepperCounters, StepperOptions, TrialFactory};

/// Writes one status line per period: attempts, cached energy and per-trial
/// acceptance statistics.
pub struct Log {
    pub options: StepperOptions,
    counters: StepperCounters,
}

impl Log {
    pub fn new(options: StepperOptions) -> Log {
        Log { options, counters: StepperCounters::default() }
    }
}

impl Analyze for Log {
    fn options(&self) -> &StepperOptions {
        &self.options
    }

    fn counters_mut(&mut self) -> &mut StepperCounters {
        &mut self.counters
    }

    fn update(&mut self, _system: &System, _criterion: &dyn Criterion, _trials: &TrialFactory) {}

    fn write(&mut self, system: &System, criterion: &dyn Criterion, trials: &TrialFactory) {
        let mut out = out_writer(&self.options.file_name, self.options.append);
        if !self.counters.wrote_header {
            writeln!(out, "attempt,num_particles,energy{}", trials.status_header()).ok();
            self.counters.wrote_header = true;
        }
        writeln!(
            out,
            "{},{},{:.10}{}",
            trials.num_attempts(),
            system.configuration(0).num_particles(),
            criterion.current_energy(),
            trials.status()
        )
        .ok();
    }

    fn name(&self) -> &str {
        "Log"
    }
}

/// Appends an XYZ frame per period; oriented systems can opt into the
/// Euler-angle variant (which is write-only by design).
pub struct Movie {
    pub options: StepperOptions,
    counters: StepperCounters,
    writer: FileXyz,
    euler_writer: Option<FileXyzEuler>,
}

impl Movie {
    pub fn new(options: StepperOptions) -> Movie {
        assert!(!options.file_name.is_empty(), "Movie needs a file name");
        let mut writer = FileXyz::new();
        writer.append = false;
        Movie { options, counters: StepperCounters::default(), writer, euler_writer: None }
    }

    /// Writes `type x y z phi theta psi` lines instead of plain XYZ
    pub fn with_euler_angles(mut self) -> Movie {
        let mut writer = FileXyzEuler::new();
        writer.append = false;
        self.euler_writer = Some(writer);
        self
    }
}

impl Analyze for Movie {
    fn options(&self) -> &StepperOptions {
        &self.options
    }

    fn counters_mut(&mut self) -> &mut StepperCounters {
        &mut self.counters
    }

    fn update(&mut self, _system: &System, _criterion: &dyn Criterion, _trials: &TrialFactory) {}

    fn write(&mut self, system: &System, _criterion: &dyn Criterion, _trials: &TrialFactory) {
        match self.euler_writer.as_mut() {
            Some(writer) => {
                writer.write(&self.options.file_name, system.configuration(0));
                writer.append = true;
            }
            None => {
                self.writer.write(&self.options.file_name, system.configuration(0));
                self.writer.append = true;
            }
        }
    }

    fn name(&self) -> &str {
        "Movie"
    }
}

/// Writes the criterion's status block (lnpi tables for flat-histogram runs).
pub struct CriteriaWriter {
    pub options: StepperOptions,
    counters: StepperCounters,
}

impl CriteriaWriter {
    pub fn new(options: StepperOptions) -> CriteriaWriter {
        CriteriaWriter { options, counters: StepperCounters::default() }
    }
}

impl Analyze for CriteriaWriter {
    fn options(&self) -> &StepperOptions {
        &self.options
    }

    fn counters_mut(&mut self) -> &mut StepperCounters {
        &mut self.counters
    }

    fn update(&mut self, _system: &System, _criterion: &dyn Criterion, _trials: &TrialFactory) {}

    fn write(&mut self, _system: &System, criterion: &dyn Criterion, _trials: &TrialFactory) {
        let mut out = out_writer(&self.options.file_name, false);
        out.write_all(criterion.write().as_bytes()).ok();
    }

    fn name(&self) -> &str {
        "CriteriaWriter"
    }
}

/// Accumulates moments of the particle count, optionally per macrostate bin.
pub struct NumParticles {
    pub options: StepperOptions,
    counters: StepperCounters,
    particle_type: Option<usize>,
    accumulators: Vec<Accumulator>,
}

impl NumParticles {
    pub fn new(options: StepperOptions, particle_type: Option<usize>) -> NumParticles {
        NumParticles {
            options,
            counters: StepperCounters::default(),
            particle_type,
            accumulators: Vec::new(),
        }
    }

    pub fn average(&self) -> f64 {
        let count: f64 = self.accumulators.iter().map(|a| a.count()).sum();
        if count == 0.0 {
            return 0.0;
        }
        self.accumulators.iter().map(|a| a.sum_of_powers(1)).sum::<f64>() / count
    }

    fn state_index(&mut self, criterion: &dyn Criterion) -> usize {
        if !self.options.multistate {
            if self.accumulators.is_empty() {
                self.accumulators.push(Accumulator::new());
            }
            return 0;
        }
        let state = criterion.state().unwrap_or(0);
        while self.accumulators.len() <= state {
            self.accumulators.push(Accumulator::new());
        }
        state
    }
}

impl Analyze for NumParticles {
    fn options(&self) -> &StepperOptions {
        &self.options
    }

    fn counters_mut(&mut self) -> &mut StepperCounters {
        &mut self.counters
    }

    fn update(&mut self, system: &System, criterion: &dyn Criterion, _trials: &TrialFactory) {
        let n = match self.particle_type {
            Some(t) => system.configuration(0).num_particles_of_type(t),
            None => system.configuration(0).num_particles(),
        };
        let state = self.state_index(criterion);
        self.accumulators[state].accumulate(n as f64);
    }

    fn write(&mut self, _system: &System, _criterion: &dyn Criterion, _trials: &TrialFactory) {
        let mut out = out_writer(&self.options.file_name, self.options.append);
        if !self.counters.wrote_header {
            writeln!(out, "state,average,stdev,count").ok();
            self.counters.wrote_header = true;
        }
        for (state, acc) in self.accumulators.iter().enumerate() {
            writeln!(out, "{},{:.8},{:.8},{}", state, acc.average(), acc.stdev(), acc.count()).ok();
        }
    }

    fn name(&self) -> &str {
        "NumParticles"
    }
}

/// Histograms bond lengths and bending angles per bonded type.
pub struct AnalyzeBonds {
    pub options: StepperOptions,
    counters: StepperCounters,
    bond_histograms: Vec<Histogram>,
    angle_histograms: Vec<Histogram>,
    bond_moments: Vec<Accumulator>,
    angle_moments: Vec<Accumulator>,
}

impl AnalyzeBonds {
    pub fn new(options: StepperOptions) -> AnalyzeBonds {
        AnalyzeBonds {
            options,
            counters: StepperCounters::default(),
            bond_histograms: Vec::new(),
            angle_histograms: Vec::new(),
            bond_moments: Vec::new(),
            angle_moments: Vec::new(),
        }
    }

    fn grow(histograms: &mut Vec<Histogram>, moments: &mut Vec<Accumulator>, index: usize, max: f64) {
        while histograms.len() <= index {
            histograms.push(Histogram::new(0.0, max / 100.0, 100));
            moments.push(Accumulator::new());
        }
    }
}

impl Analyze for AnalyzeBonds {
    fn options(&self) -> &StepperOptions {
        &self.options
    }

    fn counters_mut(&mut self) -> &mut StepperCounters {
        &mut self.counters
    }

    fn update(&mut self, system: &System, _criterion: &dyn Criterion, _trials: &TrialFactory) {
        let config = system.configuration(0);
        for (_, particle) in config.physical_particles() {
            let ptype = config.particle_type(particle.type_index());
            for bond in &ptype.bonds {
                let (_, r2) = config.domain().separation(
                    particle.site(bond.sites[0]).position(),
                    particle.site(bond.sites[1]).position(),
                );
                let length = r2.sqrt();
                Self::grow(&mut self.bond_histograms, &mut self.bond_moments, bond.bond_type, 4.0);
                self.bond_histograms[bond.bond_type].add(length);
                self.bond_moments[bond.bond_type].accumulate(length);
            }
            for angle in &ptype.angles {
                let (v1, _) = config.domain().separation(
                    particle.site(angle.sites[0]).position(),
                    particle.site(angle.sites[1]).position(),
                );
                let (v2, _) = config.domain().separation(
                    particle.site(angle.sites[2]).position(),
                    particle.site(angle.sites[1]).position(),
                );
                let denom = v1.length() * v2.length();
                if denom <= 0.0 {
                    continue;
                }
                let theta = (v1.dot(&v2) / denom).clamp(-1.0, 1.0).acos();
                Self::grow(
                    &mut self.angle_histograms,
                    &mut self.angle_moments,
                    angle.angle_type,
                    std::f64::consts::PI,
                );
                self.angle_histograms[angle.angle_type].add(theta);
                self.angle_moments[angle.angle_type].accumulate(theta);
            }
        }
    }

    fn write(&mut self, _system: &System, _criterion: &dyn Criterion, _trials: &TrialFactory) {
        let mut out = out_writer(&self.options.file_name, self.options.append);
        for (t, acc) in self.bond_moments.iter().enumerate() {
            writeln!(out, "bond,{},{:.8},{:.8}", t, acc.average(), acc.stdev()).ok();
        }
        for (t, acc) in self.angle_moments.iter().enumerate() {
            writeln!(out, "angle,{},{:.8},{:.8}", t, acc.average(), acc.stdev()).ok();
        }
    }

    fn name(&self) -> &str {
        "AnalyzeBonds"
    }
}

/// Accumulates `$ \langle N^a U^c \rangle $` up to a given order at each
/// macrostate bin, for histogram reweighting of extensive quantities.
pub struct ExtensiveMoments {
    pub options: StepperOptions,
    counters: StepperCounters,
    particle_type: Option<usize>,
    max_order: usize,
    /// per state, per (a, c): running sum and count
    sums: Vec<Vec<Vec<f64>>>,
    counts: Vec<f64>,
}

impl ExtensiveMoments {
    pub fn new(options: StepperOptions, particle_type: Option<usize>, max_order: usize) -> ExtensiveMoments {
        ExtensiveMoments {
            options,
            counters: StepperCounters::default(),
            particle_type,
            max_order,
            sums: Vec::new(),
            counts: Vec::new(),
        }
    }

    pub fn moment(&self, state: usize, n_order: usize, u_order: usize) -> f64 {
        if self.counts.get(state).copied().unwrap_or(0.0) == 0.0 {
            return 0.0;
        }
        self.sums[state][n_order][u_order] / self.counts[state]
    }

    /// Per-state mean energy, the `$ \langle U \rangle(N) $` of adsorption analyses
    pub fn average_energy(&self, state: usize) -> f64 {
        self.moment(state, 0, 1)
    }
}

impl Analyze for ExtensiveMoments {
    fn options(&self) -> &StepperOptions {
        &self.options
    }

    fn counters_mut(&mut self) -> &mut StepperCounters {
        &mut self.counters
    }

    fn update(&mut self, system: &System, criterion: &dyn Criterion, _trials: &TrialFactory) {
        let state = if self.options.multistate { criterion.state().unwrap_or(0) } else { 0 };
        while self.sums.len() <= state {
            self.sums.push(vec![vec![0.0; self.max_order + 1]; self.max_order + 1]);
            self.counts.push(0.0);
        }
        let n = match self.particle_type {
            Some(t) => system.configuration(0).num_particles_of_type(t),
            None => system.configuration(0).num_particles(),
        } as f64;
        let u = criterion.current_energy();
        self.counts[state] += 1.0;
        let mut n_power = 1.0;
        for a in 0..=self.max_order {
            let mut u_power = 1.0;
            for c in 0..=self.max_order {
                self.sums[state][a][c] += n_power * u_power;
                u_power *= u;
            }
            n_power *= n;
        }
    }

    fn write(&mut self, _system: &System, _criterion: &dyn Criterion, _trials: &TrialFactory) {
        let mut out = out_writer(&self.options.file_name, self.options.append);
        if !self.counters.wrote_header {
            writeln!(out, "state,count,mean_n,mean_u,mean_nu").ok();
            self.counters.wrote_header = true;
        }
        for state in 0..self.sums.len() {
            writeln!(
                out,
                "{},{},{:.8},{:.8},{:.8}",
                state,
                self.counts[state],
                self.moment(state, 1, 0),
                self.moment(state, 0, 1),
                self.moment(state, 1, 1)
            )
            .ok();
        }
    }

    fn name(&self) -> &str {
        "ExtensiveMoments"
    }
}
