use std::io::Write;

use fugacity_configuration::{Configuration, Domain, FileLmp, FileXyz, Group};
use fugacity_numerical::Vec3;

const WATER_LMP: &str = "\
spce water force field

3 atoms
2 bonds
1 angles
2 atom types
1 bond types
1 angle types

Pair Coeffs

1 0.650169 3.16555 10.0 -0.8476
2 0.0 0.0 10.0 0.4238

Bond Coeffs

1 rigid 1.0 0.0001

Angle Coeffs

1 rigid 109.47 0.0001

Atoms

1 1 0.0 0.0 0.0
2 2 1.0 0.0 0.0
3 2 -0.333313 0.942816 0.0

Bonds

1 1 1 2
2 1 1 3

Angles

1 1 2 1 3
";

fn write_temp(name: &str, content: &str) -> String {
    let path = std::env::temp_dir().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn water_template_builds_a_configuration() {
    let fname = write_temp("fugacity_spce.lmp", WATER_LMP);
    let ptype = FileLmp::load(&fname).unwrap();
    assert_eq!(ptype.num_sites(), 3);
    assert_eq!(ptype.bonds.len(), 2);
    assert_eq!(ptype.angles[0].sites, [1, 0, 2]);
    assert_eq!(ptype.bond_types[0].model, "rigid");

    let mut config = Configuration::new(Domain::cubic(20.0));
    config.add_particle_type(ptype);
    assert_eq!(config.num_site_types(), 2);
    // charges mix multiplicatively: q_OH = q_O * q_H
    let q_oh = config.model_params().charge().mixed_value(0, 1);
    assert!((q_oh - (-0.8476 * 0.4238)).abs() < 1e-10);

    let w = config.add_particle_of_type(0);
    assert_eq!(config.num_sites(), 3);
    config.displace_particle(w, &Vec3::new(3.0, -2.0, 1.0));
    let oxygen = config.particle(w).site(0).position();
    assert!((oxygen.x - 3.0).abs() < 1e-12);
    std::fs::remove_file(fname).ok();
}

#[test]
fn groups_select_by_site_type() {
    let fname = write_temp("fugacity_spce2.lmp", WATER_LMP);
    let mut config = Configuration::new(Domain::cubic(20.0));
    config.add_particle_type(FileLmp::load(&fname).unwrap());
    config.add_particle_of_type(0);
    let oxygens = config.add_group("oxygen", Group::all().with_site_types(vec![0]));
    let particle = config.particle(0);
    let group = config.group(oxygens);
    assert!(group.matches(particle, 0));
    assert!(!group.matches(particle, 1));
    std::fs::remove_file(fname).ok();
}

#[test]
fn xyz_round_trip_through_a_molecular_fluid() {
    let fname = write_temp("fugacity_spce3.lmp", WATER_LMP);
    let mut config = Configuration::new(Domain::cubic(20.0));
    config.add_particle_type(FileLmp::load(&fname).unwrap());
    for i in 0..3 {
        let w = config.add_particle_of_type(0);
        config.displace_particle(w, &Vec3::new(i as f64 * 3.0 - 3.0, 1.5, -2.0));
    }
    let traj = std::env::temp_dir().join("fugacity_water.xyz");
    let traj = traj.to_string_lossy().to_string();
    FileXyz::new().write(&traj, &config);

    let mut restored = Configuration::new(Domain::cubic(1.0));
    restored.add_particle_type(FileLmp::load(&fname).unwrap());
    FileXyz::new().load(&traj, &mut restored).unwrap();
    assert_eq!(restored.num_particles(), 3);
    assert_eq!(restored.num_sites(), 9);
    for p in 0..3 {
        for s in 0..3 {
            let a = config.particle(p).site(s).position();
            let b = restored.particle(p).site(s).position();
            assert!(a.distance(b) < 1e-7);
        }
    }
    std::fs::remove_file(traj).ok();
    std::fs::remove_file(fname).ok();
}

#[test]
fn cell_lists_stay_consistent_through_rescaling() {
    let fname = write_temp("fugacity_spce4.lmp", WATER_LMP);
    let mut config = Configuration::new(Domain::cubic(20.0));
    config.add_particle_type(FileLmp::load(&fname).unwrap());
    for i in 0..5 {
        let w = config.add_particle_of_type(0);
        config.displace_particle(w, &Vec3::new(i as f64 * 2.0 - 5.0, i as f64, -(i as f64)));
    }
    config.add_cell_list(5.0, 0).unwrap();
    config.check();
    config.rescale_volume(1.1);
    config.check();
    config.rescale_volume(1.0 / 1.1);
    config.check();
    std::fs::remove_file(fname).ok();
}
