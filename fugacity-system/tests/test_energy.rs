use fugacity_configuration::{Configuration, Domain, ParticleType, SiteTemplate, Select};
use fugacity_numerical::Vec3;
use fugacity_system::{PairModel, Potential, System};

fn monomer(epsilon: f64, sigma: f64, cutoff: f64) -> ParticleType {
    ParticleType {
        name: "m".to_string(),
        sites: vec![SiteTemplate {
            site_type: 0,
            position: Vec3::zero(),
            epsilon,
            sigma,
            cutoff,
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

#[test]
fn lennard_jones_dimer_energy_is_analytic() {
    let mut config = Configuration::new(Domain::cubic(10.0));
    config.add_particle_type(monomer(1.0, 1.0, 3.0));
    let a = config.add_particle_of_type(0);
    let b = config.add_particle_of_type(0);
    config.displace_particle(b, &Vec3::new(1.5, 0.0, 0.0));
    let mut system = System::new(config);
    system.add_potential(Potential::pair(PairModel::LennardJones));
    system.precompute();

    let r6 = 1.5f64.powi(-6);
    let expected = 4.0 * (r6 * r6 - r6);
    assert!((system.energy(0) - expected).abs() < 1e-12);

    // the dimer's halves each see the whole pair energy
    let _ = a;
    let mut select = Select::new();
    select.add_site(b, 0);
    assert!((system.energy_select(0, &select) - expected).abs() < 1e-12);
}

#[test]
fn minimum_image_reaches_across_the_boundary() {
    let mut config = Configuration::new(Domain::cubic(10.0));
    config.add_particle_type(monomer(1.0, 1.0, 3.0));
    let _ = config.add_particle_of_type(0);
    let b = config.add_particle_of_type(0);
    // 1.5 apart through the boundary, 8.5 apart directly
    config.displace_particle(b, &Vec3::new(-4.25, 0.0, 0.0));
    let a = 0;
    config.displace_particle(a, &Vec3::new(4.25, 0.0, 0.0));
    let mut system = System::new(config);
    system.add_potential(Potential::pair(PairModel::LennardJones));
    system.precompute();

    let r6 = 1.5f64.powi(-6);
    let expected = 4.0 * (r6 * r6 - r6);
    assert!((system.energy(0) - expected).abs() < 1e-12);
}

#[test]
fn square_well_counts_its_well() {
    let mut config = Configuration::new(Domain::cubic(12.0));
    config.add_particle_type(monomer(1.0, 1.0, 1.5));
    let _ = config.add_particle_of_type(0);
    let b = config.add_particle_of_type(0);
    config.displace_particle(b, &Vec3::new(1.2, 0.0, 0.0));
    let mut system = System::new(config);
    system.add_potential(Potential::pair(PairModel::SquareWell));
    system.precompute();
    assert!((system.energy(0) + 1.0).abs() < 1e-12);
}
