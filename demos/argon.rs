use clap::Parser;

use fugacity_configuration::{Configuration, Domain, ParticleType, SiteTemplate};
use fugacity_montecarlo::{
    translate_trial, volume_trial, CheckEnergy, Log, Metropolis, MonteCarlo, Movie, StepperOptions,
    Tuner,
};
use fugacity_numerical::Vec3;
use fugacity_system::{PairModel, Potential, System, ThermoParams};

#[derive(Parser, Debug)]
#[clap(name = "argon")]
#[clap(version = "0.2")]
#[clap(about = "NVT or NPT simulation of argon fluid", long_about = None)]
struct Args {
    /// reduced density of the system
    #[clap(short, long, default_value_t = 0.4)]
    density: f64,
    /// temperature in Kelvins
    #[clap(short, long, default_value_t = 45.0)]
    temperature: f64,
    /// pressure of an NPT simulation; NVT when absent
    #[clap(short, long)]
    pressure: Option<f64>,
    /// number of atoms in the simulation
    #[clap(short, long, default_value_t = 216)]
    natoms: usize,
    /// Monte Carlo attempts
    #[clap(short, long, default_value_t = 1_000_000)]
    attempts: u64,
    /// prefix for output file names
    #[clap(long, default_value = "")]
    prefix: String,
}

/// Finds the edge of a cubic box holding `n_atoms` at a given reduced density
fn box_width(sigma: f64, n_atoms: usize, density: f64) -> f64 {
    (n_atoms as f64 * sigma.powi(3) / density).powf(1.0 / 3.0)
}

pub fn main() {
    // ---------- Parameters from:
    // John A. White "Lennard-Jones as a model for argon and test of extended
    // renormalization group calculations",
    // Journal of Chemical Physics 111 pp. 9352-9356 (1999)
    const EPSILON_BY_K: f64 = 125.7; // in Kelvins
    const SIGMA: f64 = 3.3345; // in Angstroms
    const CUTOFF: f64 = 10.0;

    env_logger::init();
    let args = Args::parse();
    let side = box_width(SIGMA, args.natoms, args.density);

    // ---------- Create the configuration with atoms on a cubic grid
    let mut config = Configuration::new(Domain::cubic(side));
    config.add_particle_type(ParticleType {
        name: "argon".to_string(),
        sites: vec![SiteTemplate {
            site_type: 0,
            position: Vec3::zero(),
            epsilon: EPSILON_BY_K,
            sigma: SIGMA,
            cutoff: CUTOFF,
            charge: 0.0,
        }],
        bonds: vec![],
        angles: vec![],
        dihedrals: vec![],
        bond_types: vec![],
        angle_types: vec![],
        dihedral_types: vec![],
    });
    let per_side = (args.natoms as f64).cbrt().ceil() as usize;
    let spacing = side / per_side as f64;
    let mut placed = 0;
    'fill: for ix in 0..per_side {
        for iy in 0..per_side {
            for iz in 0..per_side {
                if placed >= args.natoms {
                    break 'fill;
                }
                let p = config.add_particle_of_type(0);
                config.displace_particle(
                    p,
                    &Vec3::new(
                        (ix as f64 + 0.5) * spacing - side / 2.0,
                        (iy as f64 + 0.5) * spacing - side / 2.0,
                        (iz as f64 + 0.5) * spacing - side / 2.0,
                    ),
                );
                placed += 1;
            }
        }
    }

    // ---------- The energy: Lennard-Jones plus the tail beyond the cutoff
    let mut system = System::new(config);
    system.add_potential(Potential::pair(PairModel::LennardJones));
    system.add_potential(Potential::long_range_correction());
    let mut thermo = ThermoParams::new(1.0 / args.temperature);
    if let Some(pressure) = args.pressure {
        thermo = thermo.with_pressure(pressure);
    }
    system.set_thermo(thermo);

    // ---------- The driver: translations, adaptive step, periodic checks
    let mut mc = MonteCarlo::new(system);
    mc.set_criterion(Box::new(Metropolis::new()));
    mc.add_trial(translate_trial(None, 1.0));
    if args.pressure.is_some() {
        mc.add_trial(volume_trial(0.01, false).with_weight(0.1));
    }
    mc.add_modify(Box::new(Tuner::new(StepperOptions::default().with_trials_per_update(10_000))));
    mc.add_modify(Box::new(CheckEnergy::new(
        StepperOptions::default().with_trials_per_update(100_000),
        1e-9,
    )));
    mc.add_analyze(Box::new(Log::new(
        StepperOptions::default()
            .with_trials_per_write(10_000)
            .with_file_name(&format!("{}argon_log.csv", args.prefix)),
    )));
    mc.add_analyze(Box::new(Movie::new(
        StepperOptions::default()
            .with_trials_per_write(100_000)
            .with_file_name(&format!("{}argon_tra.xyz", args.prefix)),
    )));

    // ---------- Run the simulation!
    mc.run_num_attempts(args.attempts);
    println!(
        "final energy per atom: {:.4} K",
        mc.criterion().current_energy() / args.natoms as f64
    );
}
