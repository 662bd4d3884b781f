use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use log::info;

use fugacity_configuration::{Configuration, Domain, FileXyz};
use fugacity_flathist::{
    Bias, FlatHistogram, Macrostate, TransitionMatrix, WangLandau, WangLandauTransitionMatrix,
};
use fugacity_montecarlo::{
    add_trial, remove_trial, rotate_trial, translate_trial, volume_trial, AnalyzeBonds, CheckEnergy,
    CriteriaUpdater, CriteriaWriter, ExtensiveMoments, IncrementPhase, Log, Metropolis, MonteCarlo,
    Movie, NumParticles, Run, StepperOptions, Trial, Tuner, WallClockLimit,
};
use fugacity_system::{Ewald, OneBodyModel, PairModel, Potential, System, ThermoParams};

use crate::{Arguments, Checkpoint};

/// One parsed directive: a class name and its key=value arguments.
#[derive(Clone, Debug)]
pub struct Directive {
    pub class: String,
    pub args: HashMap<String, String>,
}

/// Parses a directive script: one directive per line,
/// `ClassName key=value key=value`, `#` comments, blank lines ignored.
pub fn parse_directives(text: &str) -> Result<Vec<Directive>> {
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let mut fields = content.split_whitespace();
        let class = fields.next().unwrap().to_string();
        let mut args = HashMap::new();
        for field in fields {
            let (key, value) = field
                .split_once('=')
                .ok_or_else(|| anyhow!("line {}: `{}` is not key=value", lineno + 1, field))?;
            if args.insert(key.to_string(), value.to_string()).is_some() {
                bail!("line {}: duplicate key `{}`", lineno + 1, key);
            }
        }
        out.push(Directive { class, args });
    }
    Ok(out)
}

/// Executes an ordered directive list.
///
/// Order matters and is enforced: Configuration before Potential before
/// ThermoParams before the criterion before trials before Run. Unknown
/// classes and unused arguments abort immediately.
pub struct Interpreter {
    mc: Option<MonteCarlo>,
    config: Option<Configuration>,
    pending_potentials: Vec<Potential>,
    thermo: Option<ThermoParams>,
    seed: Option<u64>,
}

impl Interpreter {
    pub fn new(seed: Option<u64>) -> Interpreter {
        Interpreter { mc: None, config: None, pending_potentials: Vec::new(), thermo: None, seed }
    }

    pub fn monte_carlo(&self) -> Option<&MonteCarlo> {
        self.mc.as_ref()
    }

    pub fn run_script(&mut self, text: &str) -> Result<()> {
        for directive in parse_directives(text)? {
            self.execute(directive)?;
        }
        Ok(())
    }

    /// The driver the directives built so far, assembling it on first use
    fn driver(&mut self) -> Result<&mut MonteCarlo> {
        if self.mc.is_none() {
            let config = self
                .config
                .take()
                .ok_or_else(|| anyhow!("a Configuration directive must come first"))?;
            let mut system = System::new(config);
            if self.pending_potentials.is_empty() {
                bail!("at least one Potential directive must precede the simulation");
            }
            for potential in self.pending_potentials.drain(..) {
                system.add_potential(potential);
            }
            let thermo = self
                .thermo
                .take()
                .ok_or_else(|| anyhow!("a ThermoParams directive must precede the criterion"))?;
            system.set_thermo(thermo);
            let mut mc = MonteCarlo::new(system);
            if let Some(seed) = self.seed {
                mc.seed(seed);
            }
            self.mc = Some(mc);
        }
        Ok(self.mc.as_mut().unwrap())
    }

    pub fn execute(&mut self, directive: Directive) -> Result<()> {
        info!("directive: {} {:?}", directive.class, directive.args);
        let mut args = Arguments::new(&directive.class, directive.args);
        match directive.class.as_str() {
            "Configuration" => {
                if self.config.is_some() || self.mc.is_some() {
                    bail!("Configuration must appear exactly once, first");
                }
                let side: f64 = args.parse("cubic_side_length")?;
                let mut config = Configuration::new(Domain::cubic(side));
                if args.has("periodic_z") {
                    let periodic: bool = args.parse("periodic_z")?;
                    config.domain_mut().set_periodic(2, periodic);
                }
                let particle_file = args.str("particle_type")?;
                config.add_particle_type_from_file(&particle_file)?;
                if args.has("particle_type2") {
                    let second = args.str("particle_type2")?;
                    config.add_particle_type_from_file(&second)?;
                }
                if args.has("xyz_file") {
                    let fname = args.str("xyz_file")?;
                    FileXyz::new().load(&fname, &mut config)?;
                }
                if args.has("cell_list_min_edge") {
                    let edge: f64 = args.parse("cell_list_min_edge")?;
                    config.add_cell_list(edge, 0)?;
                }
                self.config = Some(config);
            }
            "Potential" => {
                if self.mc.is_some() {
                    bail!("Potential directives must precede the criterion and trials");
                }
                let model = args.str("model")?;
                let potential = match model.as_str() {
                    "lennard_jones" => Potential::pair(PairModel::LennardJones),
                    "mie" => {
                        let n: f64 = args.parse("n")?;
                        let m: f64 = args.parse("m")?;
                        Potential::pair(PairModel::Mie { n, m })
                    }
                    "hard_sphere" => Potential::pair(PairModel::HardSphere),
                    "square_well" => Potential::pair(PairModel::SquareWell),
                    "patch" => {
                        let chi: f64 = args.parse("patch_coverage")?;
                        let two_patch: bool = args.parse_or("two_patch", true)?;
                        Potential::pair(PairModel::Patch {
                            cos_patch_angle: 1.0 - 2.0 * chi,
                            two_patch,
                        })
                    }
                    "charge_screened" => {
                        let alpha: f64 = args.parse("alpha")?;
                        Potential::pair(PairModel::ChargeScreened { alpha })
                    }
                    "ewald" => {
                        let alpha: f64 = args.parse("alpha")?;
                        let kmax: i32 = args.parse("kmax")?;
                        Potential::ewald(Ewald::with_sphere_cut(alpha, kmax))
                    }
                    "lrc" => Potential::long_range_correction(),
                    "bonded" => Potential::bonded(),
                    "hard_slit" => {
                        let axis: usize = args.parse_or("axis", 2)?;
                        let half_width: f64 = args.parse("half_width")?;
                        Potential::one_body(OneBodyModel::HardSlit {
                            axis,
                            lower: -half_width,
                            upper: half_width,
                        })
                    }
                    "electric_field" => {
                        let axis: usize = args.parse_or("axis", 0)?;
                        let field: f64 = args.parse("field")?;
                        Potential::one_body(OneBodyModel::ElectricField { axis, field })
                    }
                    other => bail!("Potential: unknown model `{}`", other),
                };
                let potential = if args.parse_or("cell_list", false)? {
                    match potential.model() {
                        fugacity_system::PotentialModel::Pair(pair) => {
                            Potential::pair_with_cell_list(pair.clone(), 0)
                        }
                        _ => bail!("Potential: cell_list applies to pair models only"),
                    }
                } else {
                    potential
                };
                self.pending_potentials.push(potential);
            }
            "ThermoParams" => {
                if self.mc.is_some() {
                    bail!("ThermoParams must precede the criterion");
                }
                let beta: f64 = args.parse("beta")?;
                let mut thermo = ThermoParams::new(beta);
                if args.has("chemical_potential") {
                    let mu: f64 = args.parse("chemical_potential")?;
                    thermo = thermo.with_chemical_potential(mu);
                }
                if args.has("pressure") {
                    let p: f64 = args.parse("pressure")?;
                    thermo = thermo.with_pressure(p);
                }
                self.thermo = Some(thermo);
            }
            "Metropolis" => {
                let mc = self.driver()?;
                mc.set_criterion(Box::new(Metropolis::new()));
            }
            "FlatHistogram" => {
                let particle_type: i64 = args.parse_or("particle_type", -1)?;
                let ptype = if particle_type < 0 { None } else { Some(particle_type as usize) };
                let min: i64 = args.parse_or("min", 0)?;
                let max: i64 = args.parse("max")?;
                let macrostate = Macrostate::num_particles(ptype, min, max);
                let num_bins = macrostate.num_bins();
                let bias_name = args.str("bias")?;
                let bias: Box<dyn Bias> = match bias_name.as_str() {
                    "wang_landau" => {
                        let min_flatness: usize = args.parse_or("min_flatness", 20)?;
                        Box::new(WangLandau::new(num_bins, min_flatness))
                    }
                    "transition_matrix" => {
                        let min_sweeps: usize = args.parse_or("min_sweeps", 20)?;
                        Box::new(TransitionMatrix::new(num_bins, min_sweeps))
                    }
                    "wltm" => {
                        let collect: f64 = args.parse_or("collect_factor", 0.5)?;
                        let switch: f64 = args.parse_or("switch_factor", 1e-3)?;
                        let min_sweeps: usize = args.parse_or("min_sweeps", 20)?;
                        Box::new(WangLandauTransitionMatrix::new(num_bins, collect, switch, min_sweeps))
                    }
                    other => bail!("FlatHistogram: unknown bias `{}`", other),
                };
                let mc = self.driver()?;
                mc.set_criterion(Box::new(FlatHistogram::new(macrostate, bias)));
            }
            "TrialTranslate" => {
                let trial = translate_trial(None, args.parse_or("tunable_param", 0.1)?);
                self.add_weighted_trial(trial, &mut args)?;
            }
            "TrialRotate" => {
                let trial = rotate_trial(None, args.parse_or("tunable_param", 25.0)?);
                self.add_weighted_trial(trial, &mut args)?;
            }
            "TrialAdd" => {
                let trial = add_trial(args.parse_or("particle_type", 0)?);
                self.add_weighted_trial(trial, &mut args)?;
            }
            "TrialRemove" => {
                let trial = remove_trial(args.parse_or("particle_type", 0)?);
                self.add_weighted_trial(trial, &mut args)?;
            }
            "TrialTransfer" => {
                let t: usize = args.parse_or("particle_type", 0)?;
                let weight: f64 = args.parse_or("weight", 1.0)?;
                let (add, remove) = fugacity_montecarlo::transfer_trials(t, weight);
                let mc = self.driver()?;
                mc.add_trial(add);
                mc.add_trial(remove);
            }
            "TrialVolume" => {
                let trial = volume_trial(
                    args.parse_or("tunable_param", 0.05)?,
                    args.parse_or("uniform", false)?,
                );
                self.add_weighted_trial(trial, &mut args)?;
            }
            "RemoveTrial" => {
                let name = args.str("name")?;
                self.driver()?.remove_trial(&name);
            }
            "Log" => {
                let options = Self::stepper_options(&mut args)?;
                self.driver()?.add_analyze(Box::new(Log::new(options)));
            }
            "Movie" => {
                let euler: bool = args.parse_or("euler", false)?;
                let options = Self::stepper_options(&mut args)?;
                let movie = if euler { Movie::new(options).with_euler_angles() } else { Movie::new(options) };
                self.driver()?.add_analyze(Box::new(movie));
            }
            "CriteriaWriter" => {
                let options = Self::stepper_options(&mut args)?;
                self.driver()?.add_analyze(Box::new(CriteriaWriter::new(options)));
            }
            "NumParticles" => {
                let particle_type: i64 = args.parse_or("particle_type", -1)?;
                let ptype = if particle_type < 0 { None } else { Some(particle_type as usize) };
                let options = Self::stepper_options(&mut args)?;
                self.driver()?.add_analyze(Box::new(NumParticles::new(options, ptype)));
            }
            "AnalyzeBonds" => {
                let options = Self::stepper_options(&mut args)?;
                self.driver()?.add_analyze(Box::new(AnalyzeBonds::new(options)));
            }
            "ExtensiveMoments" => {
                let particle_type: i64 = args.parse_or("particle_type", -1)?;
                let ptype = if particle_type < 0 { None } else { Some(particle_type as usize) };
                let max_order: usize = args.parse_or("max_order", 2)?;
                let options = Self::stepper_options(&mut args)?;
                self.driver()?
                    .add_analyze(Box::new(ExtensiveMoments::new(options, ptype, max_order)));
            }
            "IncrementPhase" => {
                let after: u64 = args.parse("after_num_attempts")?;
                let options = Self::stepper_options(&mut args)?;
                self.driver()?.add_modify(Box::new(IncrementPhase::new(options, after)));
            }
            "CheckEnergy" => {
                let tolerance: f64 = args.parse_or("tolerance", 1e-9)?;
                let options = Self::stepper_options(&mut args)?;
                self.driver()?.add_modify(Box::new(CheckEnergy::new(options, tolerance)));
            }
            "Tune" => {
                let options = Self::stepper_options(&mut args)?;
                self.driver()?.add_modify(Box::new(Tuner::new(options)));
            }
            "CriteriaUpdater" => {
                let options = Self::stepper_options(&mut args)?;
                self.driver()?.add_modify(Box::new(CriteriaUpdater::new(options)));
            }
            "WallClockLimit" => {
                let max_hours: f64 = args.parse("max_hours")?;
                let options = Self::stepper_options(&mut args)?;
                self.driver()?.add_modify(Box::new(WallClockLimit::new(options, max_hours)));
            }
            "RemoveModify" => {
                let name = args.str("name")?;
                self.driver()?.remove_modify(&name);
            }
            "Run" => {
                let run = if args.has("num_attempts") {
                    Run::NumAttempts(args.parse("num_attempts")?)
                } else if args.has("for_hours") {
                    Run::ForHours(args.parse("for_hours")?)
                } else {
                    args.parse_or("until_complete", true)?;
                    Run::UntilComplete
                };
                run.run(self.driver()?);
            }
            "WriteCheckpoint" => {
                let fname = args.str("file_name")?;
                let mc = self.driver()?;
                Checkpoint::from_monte_carlo(mc).write(&fname)?;
            }
            "Checkpoint" => {
                let fname = args.str("file_name")?;
                if self.mc.is_some() {
                    bail!("Checkpoint must come before any other state-building directive");
                }
                self.mc = Some(Checkpoint::read(&fname)?.into_monte_carlo());
            }
            other => bail!("unknown directive class: `{}`", other),
        }
        args.check_all_used().context("directive arguments")?;
        Ok(())
    }

    fn add_weighted_trial(&mut self, trial: Trial, args: &mut Arguments) -> Result<()> {
        let weight: f64 = args.parse_or("weight", 1.0)?;
        self.driver()?.add_trial(trial.with_weight(weight));
        Ok(())
    }

    fn stepper_options(args: &mut Arguments) -> Result<StepperOptions> {
        let mut options = StepperOptions::default();
        options.trials_per_update = args.parse_or("trials_per_update", 1u64)?;
        options.trials_per_write = args.parse_or("trials_per_write", 1u64)?;
        options.file_name = args.str_or("file_name", "");
        options.append = args.parse_or("append", true)?;
        options.start_after_phase = args.parse_or("start_after_phase", -1i64)?;
        options.stop_after_phase = args.parse_or("stop_after_phase", -1i64)?;
        options.multistate = args.parse_or("multistate", false)?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_parse_into_ordered_directives() {
        let text = "# an NVT run\nConfiguration cubic_side_length=8 particle_type=lj.lmp\n\nRun num_attempts=100\n";
        let directives = parse_directives(text).unwrap();
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].class, "Configuration");
        assert_eq!(directives[0].args["cubic_side_length"], "8");
        assert_eq!(directives[1].class, "Run");
    }

    #[test]
    fn out_of_order_directives_fail() {
        let mut interp = Interpreter::new(Some(1));
        // a trial before any Configuration cannot assemble a driver
        let err = interp
            .run_script("TrialTranslate weight=1\n")
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Configuration"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut interp = Interpreter::new(Some(1));
        let err = interp
            .run_script("ThermoParams beta=1.0 bogus_key=3\n")
            .unwrap_err();
        assert!(format!("{:#}", err).contains("bogus_key"));
    }
}
