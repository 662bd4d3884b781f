use log::debug;
use serde::{Deserialize, Serialize};

use fugacity_configuration::{Configuration, Select};

use crate::{PotentialFactory, ThermoParams};

/// The system facade: one or more configurations, the full potential, an
/// optional optimized variant and any number of cheaper reference potentials
/// (for dual-cutoff configurational bias), plus the thermodynamic state.
///
/// Per-move energy queries go through `energy_select`/`reference_energy`;
/// `finalize`/`revert` must each be called exactly once per trial, on the
/// accept and reject paths respectively.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct System {
    configurations: Vec<Configuration>,
    /// one full-potential factory per configuration
    potentials: Vec<PotentialFactory>,
    /// optimized stand-in for the full potential of configuration 0, if any
    optimized: Option<PotentialFactory>,
    /// reference potentials of configuration 0, for staged trials
    references: Vec<PotentialFactory>,
    thermo: ThermoParams,
}

impl System {
    pub fn new(config: Configuration) -> System {
        System {
            configurations: vec![config],
            potentials: vec![PotentialFactory::new()],
            optimized: None,
            references: Vec::new(),
            thermo: ThermoParams::new(1.0),
        }
    }

    // ---------- configurations

    pub fn add_configuration(&mut self, config: Configuration) {
        self.configurations.push(config);
        self.potentials.push(PotentialFactory::new());
    }

    pub fn num_configurations(&self) -> usize {
        self.configurations.len()
    }

    pub fn configuration(&self, i: usize) -> &Configuration {
        &self.configurations[i]
    }

    pub fn configuration_mut(&mut self, i: usize) -> &mut Configuration {
        &mut self.configurations[i]
    }

    pub fn dimension(&self) -> usize {
        self.configurations[0].dimension()
    }

    // ---------- potentials

    pub fn add_potential(&mut self, potential: crate::Potential) {
        self.potentials[0].add(potential);
    }

    pub fn add_potential_to(&mut self, config_index: usize, potential: crate::Potential) {
        self.potentials[config_index].add(potential);
    }

    pub fn set_optimized(&mut self, factory: PotentialFactory) {
        self.optimized = Some(factory);
    }

    pub fn add_reference(&mut self, factory: PotentialFactory) {
        self.references.push(factory);
    }

    pub fn num_references(&self) -> usize {
        self.references.len()
    }

    pub fn potentials(&self, config_index: usize) -> &PotentialFactory {
        &self.potentials[config_index]
    }

    pub fn potentials_mut(&mut self, config_index: usize) -> &mut PotentialFactory {
        &mut self.potentials[config_index]
    }

    /// Run every factory's one-time setup against its configuration
    pub fn precompute(&mut self) {
        for (i, factory) in self.potentials.iter_mut().enumerate() {
            factory.precompute(&mut self.configurations[i]);
        }
        if let Some(optimized) = &mut self.optimized {
            optimized.precompute(&mut self.configurations[0]);
        }
        for reference in self.references.iter_mut() {
            reference.precompute(&mut self.configurations[0]);
        }
    }

    // ---------- thermodynamic state

    pub fn thermo(&self) -> &ThermoParams {
        &self.thermo
    }

    pub fn set_thermo(&mut self, thermo: ThermoParams) {
        self.thermo = thermo;
    }

    pub fn beta(&self) -> f64 {
        self.thermo.beta()
    }

    // ---------- energies

    /// Total energy of a configuration, recomputed from scratch
    pub fn energy(&mut self, config_index: usize) -> f64 {
        let e = self.potentials[config_index].energy_all(&self.configurations[config_index]);
        debug!("system energy[{}] = {}", config_index, e);
        e
    }

    /// Per-term profile of the last total-energy evaluation
    pub fn energy_profile(&self, config_index: usize) -> Vec<f64> {
        self.potentials[config_index].last_profile().clone()
    }

    /// The selection's interaction energy with the rest of the system (plus
    /// internal pairs), using current positions; call before and after a
    /// perturbation for old/new energies.
    pub fn energy_select(&mut self, config_index: usize, select: &Select) -> f64 {
        if select.is_empty() {
            return 0.0;
        }
        self.potentials[config_index].energy_select(&self.configurations[config_index], select)
    }

    /// Same as [`energy_select`](System::energy_select) through a reference potential
    pub fn reference_energy(&mut self, reference_index: usize, select: &Select) -> f64 {
        self.references[reference_index].energy_select(&self.configurations[0], select)
    }

    /// Per-particle share of the total, for the consistency invariant
    /// `$ \sum_i E_i = 2 E_{pair} $` (one-body terms count once).
    pub fn energy_of_particle(&mut self, config_index: usize, particle: usize) -> f64 {
        let mut select = Select::new();
        let n = self.configurations[config_index].particle(particle).num_sites();
        select.add_particle(particle, (0..n).collect());
        self.energy_select(config_index, &select)
    }

    /// Rebuilds and returns the energy map of one potential term; cluster and
    /// AVB selectors call this to find bound neighborhoods.
    pub fn build_energy_map(&mut self, config_index: usize, potential_index: usize) -> crate::EnergyMap {
        let config = &self.configurations[config_index];
        self.potentials[config_index]
            .potential_mut(potential_index)
            .build_energy_map(config)
            .clone()
    }

    // ---------- trial lifecycle

    /// Folds an accepted trial into potential caches
    pub fn finalize(&mut self, config_index: usize, select: &Select) {
        self.potentials[config_index].finalize(&self.configurations[config_index], select);
        if let Some(optimized) = &mut self.optimized {
            optimized.finalize(&self.configurations[0], select);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PairModel, Potential};
    use fugacity_configuration::{Domain, ParticleType, SiteTemplate};
    use fugacity_numerical::Vec3;

    fn lj_system(n: usize, side: f64) -> System {
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
        for i in 0..n {
            let p = config.add_particle_of_type(0);
            let f = i as f64;
            config.displace_particle(
                p,
                &Vec3::new((f * 1.7).sin() * 3.0, (f * 0.9).cos() * 3.0, (f * 2.3).sin() * 3.0),
            );
        }
        let mut system = System::new(config);
        system.add_potential(Potential::pair(PairModel::LennardJones));
        system.precompute();
        system
    }

    #[test]
    fn partial_energies_sum_to_twice_the_total() {
        let mut system = lj_system(12, 9.0);
        let total = system.energy(0);
        let mut partial_sum = 0.0;
        for p in 0..12 {
            partial_sum += system.energy_of_particle(0, p);
        }
        assert!(
            (partial_sum - 2.0 * total).abs() < 1e-10,
            "sum of per-particle shares {} vs twice the total {}",
            partial_sum,
            2.0 * total
        );
    }
}
