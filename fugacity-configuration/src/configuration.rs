use std::collections::VecDeque;
use std::path::Path;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use fugacity_numerical::Vec3;

use crate::{
    CellList, ConfigurationError, Domain, FileLmp, Group, Particle, ParticleType, Select,
};

/// Owns the particle store, the domain, the model parameters, named groups,
/// the ghost pool and the cell-list registry.
///
/// Lifecycle invariants
/// * ghost indices are reused first-in-first-out, per particle type;
/// * every physical site is a member of exactly one cell per active cell
///   list, the cell containing its wrapped position;
/// * after a rejected trial the store is restored byte-for-byte (modulo
///   counters) by replaying the selection's original positions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    particle_types: Vec<ParticleType>,
    particles: Vec<Particle>,
    domain: Domain,
    model_params: crate::ModelParams,
    group_names: Vec<String>,
    groups: Vec<Group>,
    /// per particle type, indices of buried particles awaiting reuse
    ghosts: Vec<VecDeque<usize>>,
    cell_lists: Vec<CellList>,
    num_physical_of_type: Vec<usize>,
}

impl Configuration {
    pub fn new(domain: Domain) -> Configuration {
        Configuration {
            particle_types: Vec::new(),
            particles: Vec::new(),
            domain,
            model_params: crate::ModelParams::new(),
            group_names: vec!["all".to_string()],
            groups: vec![Group::all()],
            ghosts: Vec::new(),
            cell_lists: Vec::new(),
            num_physical_of_type: Vec::new(),
        }
    }

    // ---------- particle types

    /// Registers a particle type, offsetting its site types to follow all
    /// previously added types.
    pub fn add_particle_type(&mut self, mut ptype: ParticleType) {
        let offset = self.model_params.size();
        for site in ptype.sites.iter_mut() {
            site.site_type += offset;
        }
        self.model_params.add_particle_type(&ptype);
        self.particle_types.push(ptype);
        self.ghosts.push(VecDeque::new());
        self.num_physical_of_type.push(0);
    }

    /// Reads a particle type template from a LAMMPS-style data file
    /// (or its JSON form when the extension is `.json`).
    pub fn add_particle_type_from_file(&mut self, fname: &str) -> Result<(), ConfigurationError> {
        let ptype = if Path::new(fname).extension().map(|e| e == "json").unwrap_or(false) {
            FileLmp::load_json(fname)?
        } else {
            FileLmp::load(fname)?
        };
        self.add_particle_type(ptype);
        Ok(())
    }

    pub fn num_particle_types(&self) -> usize {
        self.particle_types.len()
    }

    pub fn particle_type(&self, t: usize) -> &ParticleType {
        &self.particle_types[t]
    }

    pub fn num_site_types(&self) -> usize {
        self.model_params.size()
    }

    // ---------- domain & model parameters

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn domain_mut(&mut self) -> &mut Domain {
        &mut self.domain
    }

    pub fn dimension(&self) -> usize {
        self.domain.dimension()
    }

    pub fn model_params(&self) -> &crate::ModelParams {
        &self.model_params
    }

    pub fn model_params_mut(&mut self) -> &mut crate::ModelParams {
        &mut self.model_params
    }

    // ---------- groups

    pub fn add_group(&mut self, name: &str, group: Group) -> usize {
        self.group_names.push(name.to_string());
        self.groups.push(group);
        self.groups.len() - 1
    }

    pub fn group(&self, index: usize) -> &Group {
        &self.groups[index]
    }

    pub fn group_index(&self, name: &str) -> Result<usize, ConfigurationError> {
        self.group_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ConfigurationError::UnknownGroup(name.to_string()))
    }

    /// The index of a group holding exactly one particle type, creating it on demand
    pub fn particle_type_to_group(&mut self, particle_type: usize) -> usize {
        let name = format!("type{}", particle_type);
        if let Ok(i) = self.group_index(&name) {
            return i;
        }
        self.add_group(&name, Group::all().with_particle_types(vec![particle_type]))
    }

    // ---------- particle store

    /// Total number of particles in storage, ghosts included
    pub fn num_stored(&self) -> usize {
        self.particles.len()
    }

    /// Number of physical particles
    pub fn num_particles(&self) -> usize {
        self.num_physical_of_type.iter().sum()
    }

    pub fn num_particles_of_type(&self, t: usize) -> usize {
        self.num_physical_of_type[t]
    }

    /// Number of physical particles matched by a group
    pub fn num_particles_in_group(&self, group: usize) -> usize {
        let g = &self.groups[group];
        self.physical_particles().filter(|(_, p)| g.matches_particle(p)).count()
    }

    pub fn num_sites(&self) -> usize {
        self.physical_particles().map(|(_, p)| p.num_sites()).sum()
    }

    pub fn particle(&self, i: usize) -> &Particle {
        &self.particles[i]
    }

    /// Iterates (index, particle) over physical particles
    pub fn physical_particles(&self) -> impl Iterator<Item = (usize, &Particle)> {
        self.particles.iter().enumerate().filter(|(_, p)| p.is_physical())
    }

    pub fn site_position(&self, particle: usize, site: usize) -> &Vec3 {
        self.particles[particle].site(site).position()
    }

    /// Creates (or revives from the ghost pool) an unphysical particle of a
    /// given type. The particle is invisible to visitors until
    /// [`revive`](Configuration::revive) is called.
    pub fn add_ghost(&mut self, t: usize) -> usize {
        if let Some(index) = self.ghosts[t].pop_front() {
            debug!("reusing ghost {} of type {}", index, t);
            return index;
        }
        let mut particle = Particle::from_type(t, &self.particle_types[t]);
        particle.set_physical(false);
        self.particles.push(particle);
        self.particles.len() - 1
    }

    /// Returns an unused ghost to the front of its pool (a trial grabbed it
    /// but never revived it)
    pub fn requeue_ghost(&mut self, index: usize) {
        assert!(!self.particles[index].is_physical(), "particle {} is not a ghost", index);
        let t = self.particles[index].type_index();
        self.ghosts[t].push_front(index);
    }

    /// Makes a ghost physical and registers its sites with every cell list
    pub fn revive(&mut self, index: usize) {
        assert!(!self.particles[index].is_physical(), "particle {} is already physical", index);
        self.particles[index].set_physical(true);
        self.num_physical_of_type[self.particles[index].type_index()] += 1;
        self.register_in_cells(index);
    }

    /// Marks a particle unphysical and queues its index for reuse
    pub fn bury(&mut self, index: usize) {
        assert!(self.particles[index].is_physical(), "particle {} is already a ghost", index);
        self.unregister_from_cells(index);
        let t = self.particles[index].type_index();
        assert!(self.num_physical_of_type[t] > 0, "negative particle count for type {}", t);
        self.num_physical_of_type[t] -= 1;
        self.particles[index].set_physical(false);
        self.ghosts[t].push_back(index);
    }

    /// Adds a physical particle of a given type at the template coordinates
    pub fn add_particle_of_type(&mut self, t: usize) -> usize {
        let index = self.add_ghost(t);
        // reset a reused ghost to the template geometry
        let template = &self.particle_types[t];
        for (site, st) in template.sites.iter().enumerate() {
            self.particles[index].site_mut(site).set_position(st.position);
            self.particles[index].site_mut(site).set_euler(None);
        }
        self.revive(index);
        index
    }

    /// Swaps a particle's type in place (morph move); site count must match
    pub fn morph(&mut self, index: usize, new_type: usize) {
        let old_type = self.particles[index].type_index();
        if old_type == new_type {
            return;
        }
        assert_eq!(
            self.particle_types[old_type].num_sites(),
            self.particle_types[new_type].num_sites(),
            "morphing requires equal site counts"
        );
        let was_physical = self.particles[index].is_physical();
        if was_physical {
            self.num_physical_of_type[old_type] -= 1;
            self.num_physical_of_type[new_type] += 1;
        }
        self.particles[index].set_type_index(new_type);
        for (site, st) in self.particle_types[new_type].sites.iter().enumerate() {
            self.particles[index].site_mut(site).set_site_type(st.site_type);
        }
    }

    // ---------- position updates

    /// Writes a selection's proposed positions into the store.
    ///
    /// The whole molecule is wrapped based on its first selected site so
    /// intramolecular geometry survives the periodic boundary, and cell
    /// memberships are refreshed for every touched site.
    pub fn update_positions(&mut self, select: &Select) {
        for i in 0..select.num_particles() {
            let pi = select.particle_index(i);
            // wrap shift from the first site
            let first = select.position(i, 0);
            let mut wrapped = *first;
            self.domain.wrap(&mut wrapped);
            let shift = wrapped - *first;
            for (k, &site) in select.site_indices(i).iter().enumerate() {
                let new_pos = *select.position(i, k) + shift;
                self.move_site(pi, site, new_pos);
                self.particles[pi].site_mut(site).set_euler(select.euler(i, k).copied());
            }
        }
    }

    /// Restores a selection's original positions (trial rejection path)
    pub fn revert_positions(&mut self, select: &Select) {
        for i in 0..select.num_particles() {
            let pi = select.particle_index(i);
            for (k, &site) in select.site_indices(i).iter().enumerate() {
                self.move_site(pi, site, *select.original_position(i, k));
                self.particles[pi]
                    .site_mut(site)
                    .set_euler(select.original_eulers()[i][k]);
            }
        }
    }

    fn move_site(&mut self, particle: usize, site: usize, position: Vec3) {
        let physical = self.particles[particle].site(site).is_physical();
        for (li, list) in self.cell_lists.iter_mut().enumerate() {
            if !physical || !self.groups[list.group_index()].matches(&self.particles[particle], site) {
                continue;
            }
            let old_cell = self.particles[particle].site(site).cell(li);
            let new_cell = list.locate(&self.domain, &position);
            list.update(old_cell, new_cell, particle, site);
            self.particles[particle].site_mut(site).set_cell(li, new_cell);
        }
        self.particles[particle].site_mut(site).set_position(position);
    }

    /// Writes one site position directly, refreshing cell membership
    pub fn set_position(&mut self, particle: usize, site: usize, position: Vec3) {
        self.move_site(particle, site, position);
    }

    /// Rewrites a site's type (reptation composition slide)
    pub fn set_site_type(&mut self, particle: usize, site: usize, site_type: usize) {
        self.particles[particle].site_mut(site).set_site_type(site_type);
    }

    /// Rewrites a site's orientation
    pub fn set_euler(&mut self, particle: usize, site: usize, euler: Option<fugacity_numerical::Euler>) {
        self.particles[particle].site_mut(site).set_euler(euler);
    }

    /// Replaces the domain wholesale (volume-move revert); cell lists must be
    /// rebuilt by the caller.
    pub fn set_domain(&mut self, domain: Domain) {
        self.domain = domain;
    }

    /// Displaces every site of a particle and refreshes cell membership
    pub fn displace_particle(&mut self, particle: usize, shift: &Vec3) {
        for site in 0..self.particles[particle].num_sites() {
            let new_pos = *self.particles[particle].site(site).position() + *shift;
            self.move_site(particle, site, new_pos);
        }
    }

    /// Rescales the box and every molecule's centre (volume move); bonds and
    /// angles are untouched because each molecule moves rigidly.
    pub fn rescale_volume(&mut self, factor: f64) {
        self.domain.rescale(factor);
        let indices: Vec<usize> = self.physical_particles().map(|(i, _)| i).collect();
        for i in indices {
            let center = self.particles[i].center();
            let shift = center * (factor - 1.0);
            self.displace_particle(i, &shift);
        }
        self.rebuild_cell_lists();
    }

    // ---------- cell lists

    /// Registers a cell list over a group; returns its index
    pub fn add_cell_list(&mut self, min_edge: f64, group_index: usize) -> Result<usize, ConfigurationError> {
        let list = CellList::build(&self.domain, min_edge, group_index)?;
        self.cell_lists.push(list);
        let li = self.cell_lists.len() - 1;
        self.fill_cell_list(li);
        Ok(li)
    }

    pub fn num_cell_lists(&self) -> usize {
        self.cell_lists.len()
    }

    pub fn cell_list(&self, i: usize) -> &CellList {
        &self.cell_lists[i]
    }

    fn fill_cell_list(&mut self, li: usize) {
        self.cell_lists[li].clear();
        let group_index = self.cell_lists[li].group_index();
        for pi in 0..self.particles.len() {
            if !self.particles[pi].is_physical() {
                continue;
            }
            for site in 0..self.particles[pi].num_sites() {
                if !self.groups[group_index].matches(&self.particles[pi], site) {
                    continue;
                }
                let cell = self.cell_lists[li].locate(&self.domain, self.particles[pi].site(site).position());
                self.cell_lists[li].add(cell, pi, site);
                self.particles[pi].site_mut(site).set_cell(li, cell);
            }
        }
    }

    /// Rebuilds every cell list from scratch (after a box resize)
    pub fn rebuild_cell_lists(&mut self) {
        for li in 0..self.cell_lists.len() {
            let min_edge = self.cell_lists[li].min_edge();
            let group_index = self.cell_lists[li].group_index();
            self.cell_lists[li] = CellList::build(&self.domain, min_edge, group_index)
                .expect("box shrank below the cell-list minimum edge");
            self.fill_cell_list(li);
        }
    }

    fn register_in_cells(&mut self, particle: usize) {
        for site in 0..self.particles[particle].num_sites() {
            for li in 0..self.cell_lists.len() {
                let group_index = self.cell_lists[li].group_index();
                if !self.groups[group_index].matches(&self.particles[particle], site) {
                    continue;
                }
                let cell = self.cell_lists[li].locate(&self.domain, self.particles[particle].site(site).position());
                self.cell_lists[li].add(cell, particle, site);
                self.particles[particle].site_mut(site).set_cell(li, cell);
            }
        }
    }

    fn unregister_from_cells(&mut self, particle: usize) {
        for site in 0..self.particles[particle].num_sites() {
            for li in 0..self.cell_lists.len() {
                let group_index = self.cell_lists[li].group_index();
                if !self.groups[group_index].matches(&self.particles[particle], site) {
                    continue;
                }
                let cell = self.particles[particle].site(site).cell(li);
                self.cell_lists[li].remove(cell, particle, site);
            }
        }
    }

    // ---------- random selection

    /// A physical particle drawn uniformly from a group, with the count used
    /// for the selection probability
    pub fn random_particle_in_group<R: Rng>(&self, group: usize, rng: &mut R) -> Option<(usize, usize)> {
        let g = &self.groups[group];
        let matching: Vec<usize> = self
            .physical_particles()
            .filter(|(_, p)| g.matches_particle(p))
            .map(|(i, _)| i)
            .collect();
        if matching.is_empty() {
            return None;
        }
        let pick = matching[rng.gen_range(0..matching.len())];
        Some((pick, matching.len()))
    }

    // ---------- invariants

    /// Recomputes every site's cell from its position and panics on mismatch.
    pub fn check(&self) {
        for (li, list) in self.cell_lists.iter().enumerate() {
            let mut counted = 0;
            for (pi, particle) in self.physical_particles() {
                for site in 0..particle.num_sites() {
                    if !self.groups[list.group_index()].matches(particle, site) {
                        continue;
                    }
                    counted += 1;
                    let expected = list.locate(&self.domain, particle.site(site).position());
                    let stored = particle.site(site).cell(li);
                    assert_eq!(
                        expected, stored,
                        "Configuration::check: cell list {} holds site ({}, {}) in cell {} but its position maps to {}",
                        li, pi, site, stored, expected
                    );
                }
            }
            let total: usize = (0..list.num_cells()).map(|c| list.members(c).len()).sum();
            assert_eq!(counted, total, "Configuration::check: cell list {} tracks {} sites, expected {}", li, total, counted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BondedType, SiteTemplate};

    pub fn lj_monomer() -> ParticleType {
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
            bond_types: Vec::<BondedType>::new(),
            angle_types: vec![],
            dihedral_types: vec![],
        }
    }

    #[test]
    fn ghosts_are_reused_fifo() {
        let mut config = Configuration::new(Domain::cubic(8.0));
        config.add_particle_type(lj_monomer());
        let a = config.add_particle_of_type(0);
        let b = config.add_particle_of_type(0);
        let c = config.add_particle_of_type(0);
        assert_eq!(config.num_particles(), 3);
        config.bury(a);
        config.bury(c);
        assert_eq!(config.num_particles(), 1);
        assert_eq!(config.add_ghost(0), a);
        assert_eq!(config.add_ghost(0), c);
        let _ = b;
    }

    #[test]
    fn cell_membership_follows_moves() {
        let mut config = Configuration::new(Domain::cubic(9.0));
        config.add_particle_type(lj_monomer());
        let p = config.add_particle_of_type(0);
        config.add_cell_list(3.0, 0).unwrap();
        config.check();
        config.displace_particle(p, &Vec3::new(4.0, 4.0, 4.0));
        config.check();
        config.displace_particle(p, &Vec3::new(13.0, -2.0, 0.5));
        config.check();
    }

    #[test]
    fn site_types_are_offset_per_particle_type() {
        let mut config = Configuration::new(Domain::cubic(8.0));
        config.add_particle_type(lj_monomer());
        config.add_particle_type(lj_monomer());
        assert_eq!(config.num_site_types(), 2);
        assert_eq!(config.particle_type(1).sites[0].site_type, 1);
    }
}
