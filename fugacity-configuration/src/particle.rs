use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use fugacity_numerical::Vec3;

use crate::Site;

/// A bond between two sites of a particle type, given as site indices within
/// the particle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    pub sites: [usize; 2],
    pub bond_type: usize,
}

/// A three-site angle; `sites[1]` is the vertex.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Angle {
    pub sites: [usize; 3],
    pub angle_type: usize,
}

/// A four-site dihedral along the chain `sites[0]..sites[3]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dihedral {
    pub sites: [usize; 4],
    pub dihedral_type: usize,
}

/// Parameters of one bond/angle/dihedral type: the model name used for
/// dispatch plus its named scalar properties (e.g. `k`, `length`, `delta`).
///
/// The property map is consulted only at precompute and regrowth time, never
/// in pair-energy inner loops.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BondedType {
    pub model: String,
    pub properties: HashMap<String, f64>,
}

impl BondedType {
    pub fn new(model: &str) -> BondedType {
        BondedType { model: model.to_string(), properties: HashMap::new() }
    }

    pub fn with(mut self, name: &str, value: f64) -> BondedType {
        self.properties.insert(name.to_string(), value);
        self
    }

    pub fn property(&self, name: &str) -> f64 {
        match self.properties.get(name) {
            Some(v) => *v,
            None => panic!("bonded model `{}` has no property `{}`", self.model, name),
        }
    }

    pub fn property_or(&self, name: &str, default: f64) -> f64 {
        *self.properties.get(name).unwrap_or(&default)
    }
}

/// One site of a particle-type template: its global site type, position
/// relative to the first site, and the per-site-type model parameters read
/// from the force-field file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiteTemplate {
    pub site_type: usize,
    pub position: Vec3,
    pub epsilon: f64,
    pub sigma: f64,
    pub cutoff: f64,
    pub charge: f64,
}

/// A molecule class: the ordered sites and the fixed topology shared by all
/// of its instances. Topology never changes after the type is defined.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticleType {
    pub name: String,
    pub sites: Vec<SiteTemplate>,
    pub bonds: Vec<Bond>,
    pub angles: Vec<Angle>,
    pub dihedrals: Vec<Dihedral>,
    pub bond_types: Vec<BondedType>,
    pub angle_types: Vec<BondedType>,
    pub dihedral_types: Vec<BondedType>,
}

impl ParticleType {
    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    /// The bond connecting two given sites of this type
    pub fn bond_between(&self, site_a: usize, site_b: usize) -> Option<&Bond> {
        self.bonds
            .iter()
            .find(|b| (b.sites[0] == site_a && b.sites[1] == site_b) || (b.sites[0] == site_b && b.sites[1] == site_a))
    }

    /// The angle whose vertex and arms match the given sites in any arm order
    pub fn angle_at(&self, end_a: usize, vertex: usize, end_b: usize) -> Option<&Angle> {
        self.angles.iter().find(|a| {
            a.sites[1] == vertex
                && ((a.sites[0] == end_a && a.sites[2] == end_b) || (a.sites[0] == end_b && a.sites[2] == end_a))
        })
    }

    /// Sites within `exclude_bond_distance` bonds of `site`, including itself.
    ///
    /// Used by the intra-molecular visitor to skip pairs that interact through
    /// bonded terms instead.
    pub fn sites_within_bonds(&self, site: usize, exclude_bond_distance: usize) -> Vec<usize> {
        let mut frontier = vec![site];
        let mut seen = vec![site];
        for _ in 0..exclude_bond_distance {
            let mut next = Vec::new();
            for &s in &frontier {
                for b in &self.bonds {
                    let other = if b.sites[0] == s {
                        b.sites[1]
                    } else if b.sites[1] == s {
                        b.sites[0]
                    } else {
                        continue;
                    };
                    if !seen.contains(&other) {
                        seen.push(other);
                        next.push(other);
                    }
                }
            }
            frontier = next;
        }
        seen.sort_unstable();
        seen
    }
}

/// An instance of a [`ParticleType`]: the molecule type index and its sites.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    ptype: usize,
    sites: Vec<Site>,
}

impl Particle {
    /// Instantiates a particle from its type template, placed at the template positions
    pub fn from_type(type_index: usize, template: &ParticleType) -> Particle {
        let sites = template
            .sites
            .iter()
            .map(|s| Site::new(s.site_type, s.position))
            .collect();
        Particle { ptype: type_index, sites }
    }

    #[inline(always)]
    pub fn type_index(&self) -> usize {
        self.ptype
    }

    pub fn set_type_index(&mut self, t: usize) {
        self.ptype = t;
    }

    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    #[inline(always)]
    pub fn site(&self, i: usize) -> &Site {
        &self.sites[i]
    }

    pub fn site_mut(&mut self, i: usize) -> &mut Site {
        &mut self.sites[i]
    }

    pub fn sites(&self) -> &Vec<Site> {
        &self.sites
    }

    pub fn sites_mut(&mut self) -> &mut Vec<Site> {
        &mut self.sites
    }

    /// Geometric centre of the physical sites
    pub fn center(&self) -> Vec3 {
        let mut c = Vec3::zero();
        let mut n = 0.0;
        for s in &self.sites {
            c += *s.position();
            n += 1.0;
        }
        if n > 0.0 {
            c.scale(1.0 / n);
        }
        c
    }

    pub fn displace(&mut self, shift: &Vec3) {
        for s in self.sites.iter_mut() {
            s.displace(shift);
        }
    }

    pub fn set_physical(&mut self, physical: bool) {
        for s in self.sites.iter_mut() {
            s.set_physical(physical);
        }
    }

    pub fn is_physical(&self) -> bool {
        self.sites.iter().all(|s| s.is_physical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_trimer() -> ParticleType {
        ParticleType {
            name: "trimer".to_string(),
            sites: (0..3)
                .map(|i| SiteTemplate {
                    site_type: 0,
                    position: Vec3::new(i as f64, 0.0, 0.0),
                    epsilon: 1.0,
                    sigma: 1.0,
                    cutoff: 3.0,
                    charge: 0.0,
                })
                .collect(),
            bonds: vec![
                Bond { sites: [0, 1], bond_type: 0 },
                Bond { sites: [1, 2], bond_type: 0 },
            ],
            angles: vec![Angle { sites: [0, 1, 2], angle_type: 0 }],
            dihedrals: vec![],
            bond_types: vec![BondedType::new("harmonic").with("k", 600.0).with("length", 1.0)],
            angle_types: vec![BondedType::new("harmonic").with("k", 60.0).with("degrees", 114.0)],
            dihedral_types: vec![],
        }
    }

    #[test]
    fn bond_lookup_ignores_order() {
        let t = linear_trimer();
        assert!(t.bond_between(1, 0).is_some());
        assert!(t.bond_between(0, 2).is_none());
    }

    #[test]
    fn bond_distance_exclusions() {
        let t = linear_trimer();
        assert_eq!(t.sites_within_bonds(0, 1), vec![0, 1]);
        assert_eq!(t.sites_within_bonds(0, 2), vec![0, 1, 2]);
    }
}
