use fugacity_configuration::{Configuration, Domain, ParticleType, SiteTemplate};
use fugacity_montecarlo::{
    add_trial, remove_trial, translate_trial, CheckEnergy, Metropolis, MonteCarlo, StepperOptions,
    Tuner,
};
use fugacity_numerical::Vec3;
use fugacity_system::{PairModel, Potential, System, ThermoParams};

fn lj_monomer() -> ParticleType {
    ParticleType {
        name: "lj".to_string(),
        sites: vec![SiteTemplate {
            site_type: 0,
            position: Vec3::zero(),
            epsilon: 1.0,
            sigma: 1.0,
            cutoff: 3.0,
            charge: 0.0,
        }],
        bonds: vec![],
        angles: vec![],
        dihedrals: vec![],
        bond_types: vec![],
        angle_types: vec![],
        dihedral_types: vec![],
    }
}

fn lj_system(n: usize, side: f64, beta: f64) -> System {
    let mut config = Configuration::new(Domain::cubic(side));
    config.add_particle_type(lj_monomer());
    // start from a simple cubic arrangement
    let per_side = (n as f64).powf(1.0 / 3.0).ceil() as usize;
    let spacing = side / per_side as f64;
    let mut placed = 0;
    'outer: for ix in 0..per_side {
        for iy in 0..per_side {
            for iz in 0..per_side {
                if placed >= n {
                    break 'outer;
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
    let mut system = System::new(config);
    system.add_potential(Potential::pair(PairModel::LennardJones));
    system.add_potential(Potential::long_range_correction());
    system.set_thermo(ThermoParams::new(beta));
    system
}

#[test]
fn nvt_lennard_jones_with_translations_only() {
    let mut mc = MonteCarlo::new(lj_system(50, 8.0, 1.2));
    mc.seed(42);
    mc.set_criterion(Box::new(Metropolis::new()));
    mc.add_trial(translate_trial(None, 0.3));
    mc.add_modify(Box::new(Tuner::new(StepperOptions::default().with_trials_per_update(1_000))));
    mc.add_modify(Box::new(CheckEnergy::new(
        StepperOptions::default().with_trials_per_update(10_000),
        1e-9,
    )));
    mc.run_num_attempts(50_000);

    let energy = mc.criterion().current_energy();
    let per_particle = energy / 50.0;
    assert!(per_particle < 0.0, "the fluid should be cohesive, got {}", per_particle);
    assert!(per_particle > -10.0, "unphysical energy {}", per_particle);

    // acceptance statistics are consistent
    let trial = mc.trials().trial(0);
    assert!(trial.num_success() <= trial.num_attempts());
    assert!(trial.acceptance_ratio() > 0.0);
}

#[test]
fn grand_canonical_attempt_ratios_follow_the_weights() {
    let mut mc = MonteCarlo::new(lj_system(20, 8.0, 1.2));
    mc.seed(7);
    mc.system_mut()
        .set_thermo(ThermoParams::new(1.2).with_chemical_potential(0.0));
    mc.set_criterion(Box::new(Metropolis::new()));
    // transfer trials carry four times the translate weight: 2:2:1
    mc.add_trial(translate_trial(None, 0.5));
    mc.add_trial(add_trial(0).with_weight(2.0));
    mc.add_trial(remove_trial(0).with_weight(2.0));
    mc.run_num_attempts(10_000);

    let total = mc.num_attempts() as f64;
    let translate_share = mc.trials().trial(0).num_attempts() as f64 / total;
    let add_share = mc.trials().trial(1).num_attempts() as f64 / total;
    let remove_share = mc.trials().trial(2).num_attempts() as f64 / total;
    assert!((translate_share - 0.2).abs() < 0.05, "translate share {}", translate_share);
    assert!((add_share - 0.4).abs() < 0.05, "add share {}", add_share);
    assert!((remove_share - 0.4).abs() < 0.05, "remove share {}", remove_share);

    // the particle reservoir did something
    let n = mc.system().configuration(0).num_particles();
    assert!(n > 0, "every particle evaporated");
}

#[test]
fn insertions_and_deletions_keep_the_energy_cache_honest() {
    let mut mc = MonteCarlo::new(lj_system(10, 8.0, 1.0));
    mc.seed(3);
    mc.system_mut()
        .set_thermo(ThermoParams::new(1.0).with_chemical_potential(-1.0));
    mc.set_criterion(Box::new(Metropolis::new()));
    mc.add_trial(translate_trial(None, 0.4));
    mc.add_trial(add_trial(0));
    mc.add_trial(remove_trial(0));
    mc.add_modify(Box::new(CheckEnergy::new(
        StepperOptions::default().with_trials_per_update(500),
        1e-8,
    )));
    // CheckEnergy panics on disagreement, so surviving the run is the test
    mc.run_num_attempts(5_000);
}

#[test]
fn slit_confinement_keeps_every_site_between_the_walls() {
    use fugacity_system::OneBodyModel;

    let mut config = Configuration::new(Domain::new(Vec3::new(12.0, 12.0, 30.0)).unwrap());
    config.domain_mut().set_periodic(2, false);
    config.add_particle_type(lj_monomer());
    let mut system = System::new(config);
    system.add_potential(Potential::pair(PairModel::LennardJones));
    system.add_potential(Potential::one_body(OneBodyModel::HardSlit {
        axis: 2,
        lower: -10.0,
        upper: 10.0,
    }));
    system.set_thermo(ThermoParams::new(1.0).with_chemical_potential(-2.5));

    let mut mc = MonteCarlo::new(system);
    mc.seed(99);
    mc.set_criterion(Box::new(Metropolis::new()));
    mc.add_trial(translate_trial(None, 0.5));
    mc.add_trial(add_trial(0).with_weight(2.0));
    mc.add_trial(remove_trial(0).with_weight(2.0));
    mc.run_num_attempts(20_000);

    let config = mc.system().configuration(0);
    let n = config.num_particles();
    assert!(n > 0, "the pore never filled");
    for (_, particle) in config.physical_particles() {
        for site in particle.sites() {
            assert!(
                site.position().z.abs() <= 10.0,
                "site escaped the slit: z = {}",
                site.position().z
            );
        }
    }
}

#[test]
fn burying_and_reviving_a_particle_restores_its_state() {
    let mut config = Configuration::new(Domain::cubic(8.0));
    config.add_particle_type(lj_monomer());
    let p = config.add_particle_of_type(0);
    config.displace_particle(p, &Vec3::new(1.25, -0.5, 3.0));
    let before = config.clone();

    config.bury(p);
    assert_eq!(config.num_particles(), 0);
    let revived = config.add_ghost(0);
    assert_eq!(revived, p);
    config.revive(revived);

    assert_eq!(config.num_particles(), 1);
    assert_eq!(
        config.particle(p).site(0).position(),
        before.particle(p).site(0).position()
    );
}
