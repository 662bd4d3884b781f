use fugacity_configuration::{Configuration, Domain, ParticleType, SiteTemplate};
use fugacity_flathist::{
    partition_windows, CollectionMatrixSplice, FlatHistogram, Macrostate, TransitionMatrix,
};
use fugacity_montecarlo::{add_trial, remove_trial, MonteCarlo};
use fugacity_numerical::Vec3;
use fugacity_system::{System, ThermoParams};

fn ideal_monomer() -> ParticleType {
    ParticleType {
        name: "ideal".to_string(),
        sites: vec![SiteTemplate {
            site_type: 0,
            position: Vec3::zero(),
            epsilon: 0.0,
            sigma: 0.0,
            cutoff: 0.0,
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

/// An ideal gas with activity chosen so that zV = 1: the grand-canonical
/// distribution is pi(N) = e/N! and ln pi(N+1) - ln pi(N) = -ln(N+1).
fn ideal_gas_window(side: f64, min_bin: usize, max_bin: usize, num_bins: i64, start_n: usize) -> MonteCarlo {
    let mut config = Configuration::new(Domain::cubic(side));
    config.add_particle_type(ideal_monomer());
    for _ in 0..start_n {
        config.add_particle_of_type(0);
    }
    let volume = side * side * side;
    let mut system = System::new(config);
    system.set_thermo(ThermoParams::new(1.0).with_chemical_potential(-volume.ln()));

    let mut macrostate = Macrostate::num_particles(None, 0, num_bins - 1);
    macrostate.set_soft_bounds(min_bin, max_bin);
    let bias = TransitionMatrix::new(num_bins as usize, 5);
    let criterion = FlatHistogram::new(macrostate, Box::new(bias));

    let mut mc = MonteCarlo::new(system);
    mc.seed(1234 + min_bin as u64);
    mc.set_criterion(Box::new(criterion));
    mc.add_trial(add_trial(0));
    mc.add_trial(remove_trial(0));
    mc
}

#[test]
fn transition_matrix_recovers_the_ideal_gas_distribution() {
    let mut mc = ideal_gas_window(8.0, 0, 5, 6, 0);
    let mut attempts: u64 = 0;
    while !mc.criterion().is_complete() && attempts < 2_000_000 {
        mc.run_num_attempts(10_000);
        attempts += 10_000;
    }
    assert!(mc.criterion().is_complete(), "TMMC never converged in {} attempts", attempts);

    let fh = mc.criterion().as_any().downcast_ref::<FlatHistogram>().unwrap();
    let lnpi = fh.bias().ln_prob();
    for n in 0..5usize {
        let measured = lnpi.value(n + 1) - lnpi.value(n);
        let exact = -((n + 1) as f64).ln();
        assert!(
            (measured - exact).abs() < 0.2,
            "ln pi({}) - ln pi({}) = {} but the ideal gas gives {}",
            n + 1,
            n,
            measured,
            exact
        );
    }
}

#[test]
fn rejected_walks_stay_inside_the_soft_window() {
    let mut mc = ideal_gas_window(8.0, 2, 4, 6, 3);
    mc.run_num_attempts(20_000);
    let n = mc.system().configuration(0).num_particles();
    assert!((2..=4).contains(&n), "walker escaped the soft window: N = {}", n);
}

#[test]
fn splice_windows_tile_and_stitch() {
    let windows = partition_windows(6, 2, 1.0);
    assert_eq!(windows.len(), 2);

    let mut splice = CollectionMatrixSplice::new(2, 0.001, "");
    splice.add(ideal_gas_window(8.0, windows[0].min_bin, windows[0].max_bin, 6, 0));
    splice.add(ideal_gas_window(8.0, windows[1].min_bin, windows[1].max_bin, 6, windows[1].min_bin));
    for _ in 0..10 {
        splice.window_mut(0).run_num_attempts(50_000);
        splice.window_mut(1).run_num_attempts(50_000);
        splice.adjust_bounds();
    }
    let global = splice.collection_matrix();
    assert_eq!(global.size(), 6);
    let lnpi = global.ln_prob();
    assert_eq!(lnpi.size(), 6);
    // the stitched distribution still decays towards large N
    assert!(lnpi.value(5) < lnpi.value(1));
}
