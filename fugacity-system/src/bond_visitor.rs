use serde::{Deserialize, Serialize};

use fugacity_configuration::{Configuration, Select};
use fugacity_numerical::Vec3;

use crate::{AngleModel, BondModel, DihedralModel, OVERLAP_ENERGY};

/// The torsion angle along `r1 - r2 - r3 - r4`, in `[-pi, pi]`.
pub fn dihedral_angle(r1: &Vec3, r2: &Vec3, r3: &Vec3, r4: &Vec3) -> f64 {
    let b1 = *r2 - *r1;
    let b2 = *r3 - *r2;
    let b3 = *r4 - *r3;
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let m1 = n1.cross(&b2.normalized());
    let x = n1.dot(&n2);
    let y = m1.dot(&n2);
    y.atan2(x)
}

/// Computes the two-, three- and four-body intramolecular terms of every
/// molecule (or of a selection), dispatching each term to the model named by
/// its bonded type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BondVisitor;

impl BondVisitor {
    /// Bonded energy of the whole group
    pub fn energy_all(&self, config: &Configuration, group: usize) -> f64 {
        let g = config.group(group).clone();
        let mut en = 0.0;
        for (pi, particle) in config.physical_particles() {
            if !g.matches_particle(particle) {
                continue;
            }
            en += self.particle_energy(config, pi, None);
            if en >= OVERLAP_ENERGY {
                return OVERLAP_ENERGY;
            }
        }
        en
    }

    /// Bonded terms touching at least one mobile site of the selection
    pub fn energy_select(&self, config: &Configuration, select: &Select) -> f64 {
        let mut en = 0.0;
        for i in 0..select.num_particles() {
            let pi = select.particle_index(i);
            en += self.particle_energy(config, pi, Some(select.site_indices(i)));
            if en >= OVERLAP_ENERGY {
                return OVERLAP_ENERGY;
            }
        }
        en
    }

    fn particle_energy(&self, config: &Configuration, pi: usize, only_sites: Option<&Vec<usize>>) -> f64 {
        let particle = config.particle(pi);
        let ptype = config.particle_type(particle.type_index());
        let domain = config.domain();
        let touches = |sites: &[usize]| -> bool {
            match only_sites {
                None => true,
                Some(mobile) => sites.iter().any(|s| mobile.contains(s)),
            }
        };
        let mut en = 0.0;

        for bond in &ptype.bonds {
            if !touches(&bond.sites) {
                continue;
            }
            let bt = &ptype.bond_types[bond.bond_type];
            let model = BondModel::from_name(&bt.model);
            let (_, r2) = domain.separation(
                particle.site(bond.sites[0]).position(),
                particle.site(bond.sites[1]).position(),
            );
            en += model.energy(r2.sqrt(), bt);
            if en >= OVERLAP_ENERGY {
                return OVERLAP_ENERGY;
            }
        }

        for angle in &ptype.angles {
            if !touches(&angle.sites) {
                continue;
            }
            let at = &ptype.angle_types[angle.angle_type];
            let model = AngleModel::from_name(&at.model);
            let (v1, _) = domain.separation(
                particle.site(angle.sites[0]).position(),
                particle.site(angle.sites[1]).position(),
            );
            let (v2, _) = domain.separation(
                particle.site(angle.sites[2]).position(),
                particle.site(angle.sites[1]).position(),
            );
            let denom = v1.length() * v2.length();
            let theta = if denom > fugacity_numerical::NEAR_ZERO {
                (v1.dot(&v2) / denom).clamp(-1.0, 1.0).acos()
            } else {
                0.0
            };
            en += model.energy(theta, at);
            if en >= OVERLAP_ENERGY {
                return OVERLAP_ENERGY;
            }
        }

        for dihedral in &ptype.dihedrals {
            if !touches(&dihedral.sites) {
                continue;
            }
            let dt = &ptype.dihedral_types[dihedral.dihedral_type];
            let model = DihedralModel::from_name(&dt.model);
            // build min-image positions walking along the chain
            let r1 = *particle.site(dihedral.sites[0]).position();
            let (d21, _) = domain.separation(particle.site(dihedral.sites[1]).position(), &r1);
            let r2 = r1 + d21;
            let (d32, _) = domain.separation(particle.site(dihedral.sites[2]).position(), &r2);
            let r3 = r2 + d32;
            let (d43, _) = domain.separation(particle.site(dihedral.sites[3]).position(), &r3);
            let r4 = r3 + d43;
            let phi = dihedral_angle(&r1, &r2, &r3, &r4);
            en += model.energy(phi, dt);
            if en >= OVERLAP_ENERGY {
                return OVERLAP_ENERGY;
            }
        }
        en
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugacity_configuration::{Bond, BondedType, Domain, ParticleType, SiteTemplate};

    #[test]
    fn torsion_of_a_planar_chain_is_pi() {
        // a zig-zag lying flat in a plane is trans: phi = pi
        let r1 = Vec3::new(0.0, 1.0, 0.0);
        let r2 = Vec3::new(0.0, 0.0, 0.0);
        let r3 = Vec3::new(1.0, 0.0, 0.0);
        let r4 = Vec3::new(1.0, 1.0, 0.0);
        // r4 on the same side as r1 is cis (phi = 0)
        assert!(dihedral_angle(&r1, &r2, &r3, &r4).abs() < 1e-12);
        let r4_trans = Vec3::new(1.0, -1.0, 0.0);
        assert!((dihedral_angle(&r1, &r2, &r3, &r4_trans).abs() - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn harmonic_bond_energy_of_a_dimer() {
        let mut config = Configuration::new(Domain::cubic(10.0));
        config.add_particle_type(ParticleType {
            name: "dimer".to_string(),
            sites: vec![
                SiteTemplate {
                    site_type: 0,
                    position: Vec3::zero(),
                    epsilon: 0.0,
                    sigma: 0.0,
                    cutoff: 0.0,
                    charge: 0.0,
                },
                SiteTemplate {
                    site_type: 0,
                    position: Vec3::new(1.5, 0.0, 0.0),
                    epsilon: 0.0,
                    sigma: 0.0,
                    cutoff: 0.0,
                    charge: 0.0,
                },
            ],
            bonds: vec![Bond { sites: [0, 1], bond_type: 0 }],
            angles: vec![],
            dihedrals: vec![],
            bond_types: vec![BondedType::new("harmonic").with("k", 2.0).with("length", 1.0)],
            angle_types: vec![],
            dihedral_types: vec![],
        });
        config.add_particle_of_type(0);
        let visitor = BondVisitor;
        // stretched by 0.5 from l0 = 1: U = 2 * 0.25
        assert!((visitor.energy_all(&config, 0) - 0.5).abs() < 1e-12);
    }
}
