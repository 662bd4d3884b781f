use log::trace;
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use fugacity_configuration::Select;
use fugacity_system::{NeighborCriterion, System};

/// What a selector hands to the perturber: the mobile sites, the anchor
/// sites whose positions parameterize the perturbation, the selection
/// probability entering detailed balance, and the intramolecular energy
/// already consumed by candidate generation (excluded from Rosenbluth
/// weights to avoid double counting).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrialSelection {
    pub mobile: Select,
    pub anchor: Select,
    pub probability: f64,
    pub excluded_energy: f64,
    pub config_index: usize,
}

impl TrialSelection {
    pub fn new() -> TrialSelection {
        TrialSelection { probability: 1.0, ..Default::default() }
    }

    /// Snapshot positions for both sets from the configuration
    pub fn load_positions(&mut self, system: &System) {
        let config = system.configuration(self.config_index);
        for select in [&mut self.mobile, &mut self.anchor] {
            select.load_positions(|pi, s| {
                let site = config.particle(pi).site(s);
                (*site.position(), site.euler().copied())
            });
        }
    }
}

/// Chooses the subset of sites a trial acts on.
///
/// Selectors resolve their topology (bond/angle/dihedral types) at
/// `precompute` and attach the type indices as selection properties so
/// perturbers can look up force constants without re-deriving them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrialSelector {
    /// a particle drawn uniformly from a type (or from everything)
    Particle { particle_type: Option<usize> },
    /// an unphysical particle from the ghost pool, for insertions
    Ghost { particle_type: usize },
    /// fixed mobile/anchor site pair on a random molecule of a type
    Bond { particle_type: usize, mobile_site: usize, anchor_site: usize },
    /// mobile site plus (vertex, arm) anchors
    Angle { particle_type: usize, mobile_site: usize, anchor_site: usize, anchor_site2: usize },
    /// mobile site plus three chain anchors
    Dihedral {
        particle_type: usize,
        mobile_site: usize,
        anchor_site: usize,
        anchor_site2: usize,
        anchor_site3: usize,
    },
    /// a terminal segment of a chain molecule, up to `max_length` sites
    EndSegment { particle_type: usize, max_length: usize },
    /// the whole chain, for reptation; the slide direction is drawn here
    Reptate { particle_type: usize },
    /// a random physical site of a given site type
    SiteOfType { site_type: usize },
    /// a connected component of the energy map, chosen uniformly
    Cluster { criterion: NeighborCriterion },
    /// aggregation-volume-bias: a particle inside (or outside) the shell of
    /// a random anchor
    AvbTarget { criterion: NeighborCriterion, particle_type: usize, inside: bool },
}

impl TrialSelector {
    /// Validates topology against the configuration's particle types.
    pub fn precompute(&self, system: &System) {
        let config = system.configuration(0);
        match self {
            TrialSelector::Bond { particle_type, mobile_site, anchor_site } => {
                assert!(
                    config.particle_type(*particle_type).bond_between(*mobile_site, *anchor_site).is_some(),
                    "no bond between sites {} and {} of particle type {}",
                    mobile_site,
                    anchor_site,
                    particle_type
                );
            }
            TrialSelector::Angle { particle_type, mobile_site, anchor_site, anchor_site2 } => {
                assert!(
                    config
                        .particle_type(*particle_type)
                        .angle_at(*mobile_site, *anchor_site, *anchor_site2)
                        .is_some(),
                    "no angle ({}, {}, {}) in particle type {}",
                    mobile_site,
                    anchor_site,
                    anchor_site2,
                    particle_type
                );
            }
            TrialSelector::Dihedral { particle_type, mobile_site, .. } => {
                assert!(
                    !config.particle_type(*particle_type).dihedrals.is_empty(),
                    "particle type {} has no dihedrals for mobile site {}",
                    particle_type,
                    mobile_site
                );
            }
            _ => {}
        }
    }

    /// Builds a selection, or `None` when nothing is eligible (an automatic
    /// rejection, not an error).
    pub fn select(&self, system: &mut System, rng: &mut SmallRng) -> Option<TrialSelection> {
        self.select_in(system, rng, 0)
    }

    /// Same as [`select`](TrialSelector::select) against a chosen
    /// configuration (Gibbs transfers address two of them).
    pub fn select_in(&self, system: &mut System, rng: &mut SmallRng, cfg: usize) -> Option<TrialSelection> {
        let mut out = TrialSelection::new();
        out.config_index = cfg;
        match self {
            TrialSelector::Particle { particle_type } => {
                let config = system.configuration_mut(cfg);
                let group = match particle_type {
                    Some(t) => config.particle_type_to_group(*t),
                    None => 0,
                };
                let (pi, count) = config.random_particle_in_group(group, rng)?;
                let n = config.particle(pi).num_sites();
                out.mobile.add_particle(pi, (0..n).collect());
                out.probability = 1.0 / count as f64;
            }
            TrialSelector::Ghost { particle_type } => {
                let config = system.configuration_mut(cfg);
                let pi = config.add_ghost(*particle_type);
                let n = config.particle(pi).num_sites();
                out.mobile.add_particle(pi, (0..n).collect());
            }
            TrialSelector::Bond { particle_type, mobile_site, anchor_site } => {
                let pi = self.random_of_type(system, cfg, *particle_type, rng, &mut out.probability)?;
                out.mobile.add_site(pi, *mobile_site);
                out.anchor.add_site(pi, *anchor_site);
                let ptype = system.configuration(cfg).particle_type(*particle_type);
                let bond = ptype.bond_between(*mobile_site, *anchor_site).unwrap();
                out.mobile.set_property("bond_type", bond.bond_type as f64);
            }
            TrialSelector::Angle { particle_type, mobile_site, anchor_site, anchor_site2 } => {
                let pi = self.random_of_type(system, cfg, *particle_type, rng, &mut out.probability)?;
                out.mobile.add_site(pi, *mobile_site);
                out.anchor.add_site(pi, *anchor_site);
                out.anchor.add_site(pi, *anchor_site2);
                let ptype = system.configuration(cfg).particle_type(*particle_type);
                let bond = ptype.bond_between(*mobile_site, *anchor_site).unwrap();
                let angle = ptype.angle_at(*mobile_site, *anchor_site, *anchor_site2).unwrap();
                out.mobile.set_property("bond_type", bond.bond_type as f64);
                out.mobile.set_property("angle_type", angle.angle_type as f64);
            }
            TrialSelector::Dihedral { particle_type, mobile_site, anchor_site, anchor_site2, anchor_site3 } => {
                let pi = self.random_of_type(system, cfg, *particle_type, rng, &mut out.probability)?;
                out.mobile.add_site(pi, *mobile_site);
                out.anchor.add_site(pi, *anchor_site);
                out.anchor.add_site(pi, *anchor_site2);
                out.anchor.add_site(pi, *anchor_site3);
                let ptype = system.configuration(cfg).particle_type(*particle_type);
                let bond = ptype.bond_between(*mobile_site, *anchor_site).unwrap();
                out.mobile.set_property("bond_type", bond.bond_type as f64);
                if let Some(angle) = ptype.angle_at(*mobile_site, *anchor_site, *anchor_site2) {
                    out.mobile.set_property("angle_type", angle.angle_type as f64);
                }
                let dihedral = ptype
                    .dihedrals
                    .iter()
                    .find(|d| d.sites[0] == *mobile_site || d.sites[3] == *mobile_site)
                    .expect("no dihedral terminates at the mobile site");
                out.mobile.set_property("dihedral_type", dihedral.dihedral_type as f64);
            }
            TrialSelector::EndSegment { particle_type, max_length } => {
                let pi = self.random_of_type(system, cfg, *particle_type, rng, &mut out.probability)?;
                let n = system.configuration(cfg).particle(pi).num_sites();
                if n < 2 {
                    return None;
                }
                let length = rng.gen_range(1..=(*max_length).min(n - 1));
                let from_tail = rng.gen_bool(0.5);
                let sites: Vec<usize> = if from_tail {
                    (n - length..n).collect()
                } else {
                    (0..length).rev().collect()
                };
                let anchor_site = if from_tail { n - length - 1 } else { length };
                out.mobile.add_particle(pi, sites);
                out.anchor.add_site(pi, anchor_site);
            }
            TrialSelector::Reptate { particle_type } => {
                let pi = self.random_of_type(system, cfg, *particle_type, rng, &mut out.probability)?;
                let n = system.configuration(cfg).particle(pi).num_sites();
                if n < 2 {
                    return None;
                }
                out.mobile.add_particle(pi, (0..n).collect());
                let forward = rng.gen_bool(0.5);
                out.mobile.set_property("forward", if forward { 1.0 } else { 0.0 });
            }
            TrialSelector::SiteOfType { site_type } => {
                let config = system.configuration(cfg);
                let sites: Vec<(usize, usize)> = config
                    .physical_particles()
                    .flat_map(|(pi, p)| {
                        (0..p.num_sites())
                            .filter(move |&s| p.site(s).site_type() == *site_type && p.site(s).is_physical())
                            .map(move |s| (pi, s))
                    })
                    .collect();
                if sites.is_empty() {
                    return None;
                }
                let (pi, s) = sites[rng.gen_range(0..sites.len())];
                out.mobile.add_site(pi, s);
                out.probability = 1.0 / sites.len() as f64;
            }
            TrialSelector::Cluster { criterion } => {
                let map = system.build_energy_map(cfg, criterion.potential_index);
                let config = system.configuration(cfg);
                let particles: Vec<usize> = config.physical_particles().map(|(i, _)| i).collect();
                if particles.is_empty() {
                    return None;
                }
                let mut seen: Vec<bool> = vec![false; config.num_stored()];
                let mut components: Vec<Vec<usize>> = Vec::new();
                for &p in &particles {
                    if seen[p] {
                        continue;
                    }
                    let component: Vec<usize> = map
                        .cluster(p, criterion)
                        .into_iter()
                        .filter(|&m| config.particle(m).is_physical())
                        .collect();
                    for &m in &component {
                        seen[m] = true;
                    }
                    components.push(component);
                }
                let component = &components[rng.gen_range(0..components.len())];
                for &pi in component {
                    let n = config.particle(pi).num_sites();
                    out.mobile.add_particle(pi, (0..n).collect());
                }
                out.probability = 1.0 / components.len() as f64;
            }
            TrialSelector::AvbTarget { criterion, particle_type, inside } => {
                let map = system.build_energy_map(cfg, criterion.potential_index);
                let config = system.configuration(cfg);
                let particles: Vec<usize> = config.physical_particles().map(|(i, _)| i).collect();
                if particles.len() < 2 {
                    return None;
                }
                let anchor = particles[rng.gen_range(0..particles.len())];
                let neighbors: Vec<usize> = map
                    .neighbors_of(anchor, criterion)
                    .into_iter()
                    .filter(|&m| {
                        m != anchor
                            && config.particle(m).is_physical()
                            && config.particle(m).type_index() == *particle_type
                    })
                    .collect();
                let target = if *inside {
                    if neighbors.is_empty() {
                        return None;
                    }
                    let t = neighbors[rng.gen_range(0..neighbors.len())];
                    out.probability = 1.0 / neighbors.len() as f64;
                    t
                } else {
                    let outsiders: Vec<usize> = particles
                        .iter()
                        .copied()
                        .filter(|&m| {
                            m != anchor
                                && !neighbors.contains(&m)
                                && config.particle(m).type_index() == *particle_type
                        })
                        .collect();
                    if outsiders.is_empty() {
                        return None;
                    }
                    let t = outsiders[rng.gen_range(0..outsiders.len())];
                    out.probability = 1.0 / outsiders.len() as f64;
                    t
                };
                let n = config.particle(target).num_sites();
                let shell_volume = if config.dimension() == 3 {
                    4.0 / 3.0
                        * std::f64::consts::PI
                        * (criterion.maximum_distance.powi(3) - criterion.minimum_distance.powi(3))
                } else {
                    std::f64::consts::PI
                        * (criterion.maximum_distance.powi(2) - criterion.minimum_distance.powi(2))
                };
                out.mobile.add_particle(target, (0..n).collect());
                out.anchor.add_site(anchor, 0);
                out.mobile.set_property("shell_volume", shell_volume);
                out.mobile.set_property("num_in_shell", neighbors.len() as f64);
                out.mobile.set_property("anchor_particle", anchor as f64);
            }
        }
        out.load_positions(system);
        trace!("selected {} particles with probability {}", out.mobile.num_particles(), out.probability);
        Some(out)
    }

    fn random_of_type(
        &self,
        system: &mut System,
        cfg: usize,
        particle_type: usize,
        rng: &mut SmallRng,
        probability: &mut f64,
    ) -> Option<usize> {
        let config = system.configuration_mut(cfg);
        let group = config.particle_type_to_group(particle_type);
        let (pi, count) = config.random_particle_in_group(group, rng)?;
        *probability = 1.0 / count as f64;
        Some(pi)
    }
}
