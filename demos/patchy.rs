use clap::Parser;

use fugacity_configuration::{Configuration, Domain, ParticleType, SiteTemplate};
use fugacity_flathist::{FlatHistogram, Macrostate, TransitionMatrix};
use fugacity_montecarlo::{
    add_trial_oriented, remove_trial, rotate_trial, translate_trial, CriteriaWriter, Log,
    MonteCarlo, StepperOptions,
};
use fugacity_numerical::Vec3;
use fugacity_system::{PairModel, Potential, System, ThermoParams};

#[derive(Parser, Debug)]
#[clap(name = "patchy")]
#[clap(version = "0.1")]
#[clap(about = "TMMC simulation of two-patch Kern-Frenkel colloids in two dimensions", long_about = None)]
struct Args {
    /// box edge
    #[clap(short, long, default_value_t = 40.0)]
    length: f64,
    /// patch coverage chi; the patch half-angle follows cos(theta) = 1 - 2 chi
    #[clap(long, default_value_t = 0.7)]
    chi: f64,
    /// reduced temperature
    #[clap(short, long, default_value_t = 0.1)]
    temperature: f64,
    /// chemical potential
    #[clap(short, long, default_value_t = -3.0)]
    mu: f64,
    /// largest particle count of the macrostate walk
    #[clap(long, default_value_t = 40)]
    max_particles: i64,
    /// transition-matrix sweeps required for completion
    #[clap(long, default_value_t = 10)]
    sweeps: usize,
    /// prefix for output file names
    #[clap(long, default_value = "")]
    prefix: String,
}

pub fn main() {
    env_logger::init();
    let args = Args::parse();

    // ---------- A 2-D square box of hard disks with two attractive patches
    let mut config = Configuration::new(Domain::square(args.length));
    config.add_particle_type(ParticleType {
        name: "patchy".to_string(),
        sites: vec![SiteTemplate {
            site_type: 0,
            position: Vec3::zero(),
            epsilon: 1.0,
            sigma: 1.0,
            cutoff: 1.05,
            charge: 0.0,
        }],
        bonds: vec![],
        angles: vec![],
        dihedrals: vec![],
        bond_types: vec![],
        angle_types: vec![],
        dihedral_types: vec![],
    });

    let mut system = System::new(config);
    system.add_potential(Potential::pair(PairModel::Patch {
        cos_patch_angle: 1.0 - 2.0 * args.chi,
        two_patch: true,
    }));
    system.set_thermo(ThermoParams::new(1.0 / args.temperature).with_chemical_potential(args.mu));

    // ---------- Flat-histogram walk over the particle count
    let macrostate = Macrostate::num_particles(None, 0, args.max_particles);
    let bias = TransitionMatrix::new(macrostate.num_bins(), args.sweeps);
    let criterion = FlatHistogram::new(macrostate, Box::new(bias));

    let mut mc = MonteCarlo::new(system);
    mc.set_criterion(Box::new(criterion));
    mc.add_trial(translate_trial(None, 0.3));
    mc.add_trial(rotate_trial(None, 30.0));
    mc.add_trial(add_trial_oriented(0).with_weight(2.0));
    mc.add_trial(remove_trial(0).with_weight(2.0));
    mc.add_analyze(Box::new(Log::new(
        StepperOptions::default()
            .with_trials_per_write(100_000)
            .with_file_name(&format!("{}patchy_log.csv", args.prefix)),
    )));
    mc.add_analyze(Box::new(CriteriaWriter::new(
        StepperOptions::default()
            .with_trials_per_write(1_000_000)
            .with_file_name(&format!("{}patchy_lnpi.csv", args.prefix)),
    )));

    // ---------- Walk until the requested number of sweeps
    mc.run_until_complete();
    println!("attempts: {}", mc.num_attempts());
    println!("final N: {}", mc.system().configuration(0).num_particles());
}
