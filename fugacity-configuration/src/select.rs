use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use fugacity_numerical::{Euler, Vec3};

/// What a trial intends to do with a selection; criteria and visitors use it
/// to decide which sites count as "existing".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialState {
    #[default]
    None,
    /// energies of the configuration before the perturbation
    Old,
    /// sites moved in place
    Move,
    /// sites being inserted
    Add,
    /// sites being deleted
    Remove,
}

/// A set of particles and sites addressed by a trial, together with proposed
/// positions and the originals needed for revert.
///
/// The proposal lives in `positions`/`eulers`; a perturber mutates these and
/// pushes them into the configuration, while `original_*` keeps the
/// pre-attempt state byte-for-byte.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Select {
    particles: Vec<usize>,
    /// per selected particle, the participating site indices
    sites: Vec<Vec<usize>>,
    positions: Vec<Vec<Vec3>>,
    eulers: Vec<Vec<Option<Euler>>>,
    original_positions: Vec<Vec<Vec3>>,
    original_eulers: Vec<Vec<Option<Euler>>>,
    trial_state: TrialState,
    /// scalar tags attached by selectors (e.g. `bond_type`)
    properties: HashMap<String, f64>,
}

impl Select {
    pub fn new() -> Select {
        Select::default()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.sites.clear();
        self.positions.clear();
        self.eulers.clear();
        self.original_positions.clear();
        self.original_eulers.clear();
        self.trial_state = TrialState::None;
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn num_sites(&self) -> usize {
        self.sites.iter().map(|s| s.len()).sum()
    }

    pub fn particle_index(&self, i: usize) -> usize {
        self.particles[i]
    }

    pub fn particle_indices(&self) -> &Vec<usize> {
        &self.particles
    }

    pub fn site_indices(&self, i: usize) -> &Vec<usize> {
        &self.sites[i]
    }

    /// Registers a (particle, site) pair without loading positions
    pub fn add_site(&mut self, particle: usize, site: usize) {
        if let Some(at) = self.particles.iter().position(|&p| p == particle) {
            self.sites[at].push(site);
        } else {
            self.particles.push(particle);
            self.sites.push(vec![site]);
        }
    }

    /// Registers a whole particle with an explicit site list
    pub fn add_particle(&mut self, particle: usize, sites: Vec<usize>) {
        self.particles.push(particle);
        self.sites.push(sites);
    }

    /// Re-points the selection at a different particle, keeping site indices
    pub fn set_particle(&mut self, i: usize, particle: usize) {
        self.particles[i] = particle;
    }

    pub fn trial_state(&self) -> TrialState {
        self.trial_state
    }

    pub fn set_trial_state(&mut self, state: TrialState) {
        self.trial_state = state;
    }

    /// Snapshots positions/orientations for the registered sites.
    ///
    /// `loader` maps (particle, site) to the configuration's current values.
    pub fn load_positions<F>(&mut self, mut loader: F)
    where
        F: FnMut(usize, usize) -> (Vec3, Option<Euler>),
    {
        self.positions.clear();
        self.eulers.clear();
        for (pi, sites) in self.particles.iter().zip(self.sites.iter()) {
            let mut pos_row = Vec::with_capacity(sites.len());
            let mut eul_row = Vec::with_capacity(sites.len());
            for &s in sites {
                let (p, e) = loader(*pi, s);
                pos_row.push(p);
                eul_row.push(e);
            }
            self.positions.push(pos_row);
            self.eulers.push(eul_row);
        }
        self.original_positions = self.positions.clone();
        self.original_eulers = self.eulers.clone();
    }

    pub fn position(&self, particle: usize, site: usize) -> &Vec3 {
        &self.positions[particle][site]
    }

    pub fn position_mut(&mut self, particle: usize, site: usize) -> &mut Vec3 {
        &mut self.positions[particle][site]
    }

    pub fn positions(&self) -> &Vec<Vec<Vec3>> {
        &self.positions
    }

    pub fn euler(&self, particle: usize, site: usize) -> Option<&Euler> {
        self.eulers[particle][site].as_ref()
    }

    pub fn set_euler(&mut self, particle: usize, site: usize, euler: Option<Euler>) {
        self.eulers[particle][site] = euler;
    }

    pub fn eulers(&self) -> &Vec<Vec<Option<Euler>>> {
        &self.eulers
    }

    pub fn original_position(&self, particle: usize, site: usize) -> &Vec3 {
        &self.original_positions[particle][site]
    }

    pub fn original_positions(&self) -> &Vec<Vec<Vec3>> {
        &self.original_positions
    }

    pub fn original_eulers(&self) -> &Vec<Vec<Option<Euler>>> {
        &self.original_eulers
    }

    /// Replaces the whole proposal (configurational-bias candidate replay)
    pub fn set_proposal(&mut self, positions: Vec<Vec<Vec3>>, eulers: Vec<Vec<Option<Euler>>>) {
        self.positions = positions;
        self.eulers = eulers;
    }

    /// Discards the proposal, restoring the stored originals
    pub fn restore_original(&mut self) {
        self.positions = self.original_positions.clone();
        self.eulers = self.original_eulers.clone();
    }

    pub fn displace(&mut self, shift: &Vec3) {
        for row in self.positions.iter_mut() {
            for p in row.iter_mut() {
                *p += *shift;
            }
        }
    }

    pub fn set_property(&mut self, name: &str, value: f64) {
        self.properties.insert(name.to_string(), value);
    }

    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }

    /// Appends another selection (used by acceptance records to track all
    /// perturbed sites of a multi-stage trial)
    pub fn extend_from(&mut self, other: &Select) {
        for (i, pi) in other.particles.iter().enumerate() {
            self.particles.push(*pi);
            self.sites.push(other.sites[i].clone());
            if i < other.positions.len() {
                self.positions.push(other.positions[i].clone());
                self.eulers.push(other.eulers[i].clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_site_groups_by_particle() {
        let mut s = Select::new();
        s.add_site(4, 0);
        s.add_site(4, 2);
        s.add_site(7, 1);
        assert_eq!(s.num_particles(), 2);
        assert_eq!(s.site_indices(0), &vec![0, 2]);
        assert_eq!(s.num_sites(), 3);
    }

    #[test]
    fn restore_discards_the_proposal() {
        let mut s = Select::new();
        s.add_site(0, 0);
        s.load_positions(|_, _| (Vec3::new(1.0, 2.0, 3.0), None));
        *s.position_mut(0, 0) = Vec3::zero();
        s.restore_original();
        assert_eq!(*s.position(0, 0), Vec3::new(1.0, 2.0, 3.0));
    }
}
