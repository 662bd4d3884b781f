use serde::{Deserialize, Serialize};

use fugacity_configuration::{Configuration, Select};
use fugacity_numerical::{Matrix3, Vec3};

use crate::{EnergyMap, PairModel, OVERLAP_ENERGY};

/// How a pair visitor enumerates site pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisitStrategy {
    /// every pair in the group, brute force
    AllPairs,
    /// outer loop over cells, inner over neighboring cells
    Cell { list_index: usize },
    /// same-molecule pairs separated by more than `exclude_bond_distance` bonds
    Intra { exclude_bond_distance: usize },
}

/// Iterates the site pairs a strategy selects and accumulates a pair model's
/// energy, optionally recording every visited pair into an [`EnergyMap`].
///
/// Inter-molecular strategies never visit same-particle pairs; those belong
/// to the `Intra` strategy and the bonded terms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Visitor {
    strategy: VisitStrategy,
    track_map: bool,
    map: EnergyMap,
}

/// The patch director of an oriented site: the site's Euler rotation applied
/// to the laboratory z axis (x axis and an in-plane rotation in 2-D).
pub fn site_director(config: &Configuration, particle: usize, site: usize) -> Option<Vec3> {
    config.particle(particle).site(site).euler().map(|e| {
        if config.dimension() == 2 {
            Matrix3::about_z(e.phi).apply(&Vec3::new(1.0, 0.0, 0.0))
        } else {
            e.rotation_matrix().apply(&Vec3::new(0.0, 0.0, 1.0))
        }
    })
}

impl Visitor {
    pub fn new(strategy: VisitStrategy) -> Visitor {
        Visitor { strategy, track_map: false, map: EnergyMap::new() }
    }

    pub fn with_energy_map(mut self) -> Visitor {
        self.track_map = true;
        self
    }

    pub fn strategy(&self) -> VisitStrategy {
        self.strategy
    }

    pub fn energy_map(&self) -> &EnergyMap {
        &self.map
    }

    fn pair_energy(
        &self,
        model: &PairModel,
        config: &Configuration,
        pi: usize,
        si: usize,
        pj: usize,
        sj: usize,
    ) -> (f64, f64) {
        let a = config.particle(pi).site(si);
        let b = config.particle(pj).site(sj);
        let (rij, r2) = config.domain().separation(a.position(), b.position());
        let (t1, t2) = (a.site_type(), b.site_type());
        let energy = if model.is_anisotropic() {
            let di = site_director(config, pi, si);
            let dj = site_director(config, pj, sj);
            model.energy_aniso(&rij, r2, di.as_ref(), dj.as_ref(), t1, t2, config.model_params())
        } else {
            model.energy(r2, t1, t2, config.model_params())
        };
        (energy, r2)
    }

    fn record(&mut self, config: &Configuration, pi: usize, si: usize, pj: usize, sj: usize, energy: f64, r2: f64) {
        if self.track_map {
            let t1 = config.particle(pi).site(si).site_type();
            let t2 = config.particle(pj).site(sj).site_type();
            self.map.insert(pi, pj, si, sj, t1, t2, energy, r2);
        }
    }

    /// Sites of the group, as (particle, site) pairs
    fn group_sites(config: &Configuration, group: usize) -> Vec<(usize, usize)> {
        let g = config.group(group).clone();
        config
            .physical_particles()
            .flat_map(|(pi, p)| (0..p.num_sites()).map(move |s| (pi, s)))
            .filter(|(pi, s)| g.matches(config.particle(*pi), *s))
            .collect()
    }

    /// Total energy of the group under this strategy.
    pub fn energy_all(&mut self, model: &PairModel, config: &Configuration, group: usize) -> f64 {
        if self.track_map {
            self.map.clear();
        }
        match self.strategy {
            VisitStrategy::AllPairs => self.energy_all_pairs(model, config, group),
            VisitStrategy::Cell { list_index } => self.energy_all_cell(model, config, list_index),
            VisitStrategy::Intra { exclude_bond_distance } => {
                self.energy_all_intra(model, config, group, exclude_bond_distance)
            }
        }
    }

    fn energy_all_pairs(&mut self, model: &PairModel, config: &Configuration, group: usize) -> f64 {
        let sites = Self::group_sites(config, group);
        let mut en = 0.0;
        for i in 0..sites.len() {
            for j in i + 1..sites.len() {
                let (pi, si) = sites[i];
                let (pj, sj) = sites[j];
                if pi == pj {
                    continue;
                }
                let (e, r2) = self.pair_energy(model, config, pi, si, pj, sj);
                if e >= OVERLAP_ENERGY {
                    return OVERLAP_ENERGY;
                }
                self.record(config, pi, si, pj, sj, e, r2);
                en += e;
            }
        }
        en
    }

    fn energy_all_cell(&mut self, model: &PairModel, config: &Configuration, list_index: usize) -> f64 {
        let list = config.cell_list(list_index);
        let mut en = 0.0;
        for cell in 0..list.num_cells() {
            for &neighbor in list.neighbors_of(cell) {
                if neighbor < cell {
                    continue;
                }
                let members = list.members(cell);
                let others = list.members(neighbor);
                for (a, &(pi, si)) in members.iter().enumerate() {
                    let start = if neighbor == cell { a + 1 } else { 0 };
                    for &(pj, sj) in others.iter().skip(start) {
                        if pi == pj {
                            continue;
                        }
                        let (e, r2) = self.pair_energy(model, config, pi, si, pj, sj);
                        if e >= OVERLAP_ENERGY {
                            return OVERLAP_ENERGY;
                        }
                        self.record(config, pi, si, pj, sj, e, r2);
                        en += e;
                    }
                }
            }
        }
        en
    }

    fn energy_all_intra(
        &mut self,
        model: &PairModel,
        config: &Configuration,
        group: usize,
        exclude_bond_distance: usize,
    ) -> f64 {
        let g = config.group(group).clone();
        let mut en = 0.0;
        let indices: Vec<usize> = config.physical_particles().map(|(i, _)| i).collect();
        for pi in indices {
            let particle = config.particle(pi);
            if !g.matches_particle(particle) {
                continue;
            }
            let ptype = config.particle_type(particle.type_index());
            for si in 0..particle.num_sites() {
                let excluded = ptype.sites_within_bonds(si, exclude_bond_distance);
                for sj in si + 1..particle.num_sites() {
                    if excluded.contains(&sj) {
                        continue;
                    }
                    let (e, r2) = self.pair_energy(model, config, pi, si, pi, sj);
                    if e >= OVERLAP_ENERGY {
                        return OVERLAP_ENERGY;
                    }
                    self.record(config, pi, si, pi, sj, e, r2);
                    en += e;
                }
            }
        }
        en
    }

    /// Energy between the selection and the rest of the group (plus pairs
    /// inside the selection, each counted once). Positions are read from the
    /// configuration, so the caller decides old-versus-new by when it asks.
    pub fn energy_select(
        &mut self,
        model: &PairModel,
        config: &Configuration,
        select: &Select,
        group: usize,
    ) -> f64 {
        match self.strategy {
            VisitStrategy::Intra { exclude_bond_distance } => {
                return self.energy_select_intra(model, config, select, exclude_bond_distance);
            }
            _ => {}
        }
        // ordinal of every selected site, for single counting inside the selection
        let mut ordinals: Vec<((usize, usize), usize)> = Vec::new();
        for i in 0..select.num_particles() {
            for &s in select.site_indices(i) {
                ordinals.push(((select.particle_index(i), s), ordinals.len()));
            }
        }
        let ordinal_of = |pi: usize, si: usize| -> Option<usize> {
            ordinals.iter().find(|((p, s), _)| *p == pi && *s == si).map(|(_, o)| *o)
        };

        let mut en = 0.0;
        for (&(pi, si), my_ordinal) in ordinals.iter().map(|(k, o)| (k, *o)) {
            if !config.particle(pi).site(si).is_physical() {
                continue;
            }
            let partners: Vec<(usize, usize)> = match self.strategy {
                VisitStrategy::AllPairs => Self::group_sites(config, group),
                VisitStrategy::Cell { list_index } => {
                    let list = config.cell_list(list_index);
                    let cell = list.locate(config.domain(), config.particle(pi).site(si).position());
                    let mut out = Vec::new();
                    for &neighbor in list.neighbors_of(cell) {
                        out.extend(list.members(neighbor).iter().copied());
                    }
                    out
                }
                VisitStrategy::Intra { .. } => unreachable!(),
            };
            for (pj, sj) in partners {
                if pj == pi {
                    continue;
                }
                if !config.particle(pj).site(sj).is_physical() {
                    continue;
                }
                if let Some(other) = ordinal_of(pj, sj) {
                    if other <= my_ordinal {
                        continue;
                    }
                }
                let (e, _) = self.pair_energy(model, config, pi, si, pj, sj);
                if e >= OVERLAP_ENERGY {
                    return OVERLAP_ENERGY;
                }
                en += e;
            }
        }
        en
    }

    fn energy_select_intra(
        &mut self,
        model: &PairModel,
        config: &Configuration,
        select: &Select,
        exclude_bond_distance: usize,
    ) -> f64 {
        let mut en = 0.0;
        for i in 0..select.num_particles() {
            let pi = select.particle_index(i);
            let particle = config.particle(pi);
            let ptype = config.particle_type(particle.type_index());
            let mobile = select.site_indices(i);
            for (k, &si) in mobile.iter().enumerate() {
                let excluded = ptype.sites_within_bonds(si, exclude_bond_distance);
                for sj in 0..particle.num_sites() {
                    if sj == si || excluded.contains(&sj) {
                        continue;
                    }
                    if !particle.site(sj).is_physical() {
                        continue;
                    }
                    // count mobile-mobile pairs once
                    if let Some(other) = mobile.iter().position(|&m| m == sj) {
                        if other <= k {
                            continue;
                        }
                    }
                    let (e, _) = self.pair_energy(model, config, pi, si, pi, sj);
                    if e >= OVERLAP_ENERGY {
                        return OVERLAP_ENERGY;
                    }
                    en += e;
                }
            }
        }
        en
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugacity_configuration::{Domain, ParticleType, SiteTemplate};

    fn lj_config(side: f64, positions: &[Vec3]) -> Configuration {
        let mut config = Configuration::new(Domain::cubic(side));
        config.add_particle_type(ParticleType {
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
        });
        for p in positions {
            let i = config.add_particle_of_type(0);
            config.displace_particle(i, p);
        }
        config
    }

    #[test]
    fn cell_list_agrees_with_brute_force() {
        let positions: Vec<Vec3> = (0..20)
            .map(|i| {
                let f = i as f64;
                Vec3::new((f * 0.67).sin() * 4.0, (f * 1.3).cos() * 4.0, (f * 0.41).sin() * 4.0)
            })
            .collect();
        let mut config = lj_config(12.0, &positions);
        config.add_cell_list(3.0, 0).unwrap();
        let mut brute = Visitor::new(VisitStrategy::AllPairs);
        let mut celled = Visitor::new(VisitStrategy::Cell { list_index: 0 });
        let e1 = brute.energy_all(&PairModel::LennardJones, &config, 0);
        let e2 = celled.energy_all(&PairModel::LennardJones, &config, 0);
        assert!((e1 - e2).abs() < 1e-10, "{} vs {}", e1, e2);
    }

    #[test]
    fn select_energy_is_the_particles_share() {
        let positions =
            vec![Vec3::zero(), Vec3::new(1.2, 0.0, 0.0), Vec3::new(0.0, 1.3, 0.0), Vec3::new(4.0, 4.0, 4.0)];
        let config = lj_config(12.0, &positions);
        let mut visitor = Visitor::new(VisitStrategy::AllPairs);
        let model = PairModel::LennardJones;
        let total = visitor.energy_all(&model, &config, 0);

        // removing particle 0's share leaves the energy of the remaining trio
        let mut select = fugacity_configuration::Select::new();
        select.add_site(0, 0);
        let share = visitor.energy_select(&model, &config, &select, 0);
        let remaining = lj_config(12.0, &positions[1..]);
        let mut fresh = Visitor::new(VisitStrategy::AllPairs);
        let e_rest = fresh.energy_all(&model, &remaining, 0);
        assert!((total - share - e_rest).abs() < 1e-10);
    }

    #[test]
    fn overlap_short_circuits() {
        let config = lj_config(12.0, &[Vec3::zero(), Vec3::new(0.01, 0.0, 0.0)]);
        let mut visitor = Visitor::new(VisitStrategy::AllPairs);
        let e = visitor.energy_all(&PairModel::HardSphere, &config, 0);
        assert!(e >= OVERLAP_ENERGY);
    }
}
