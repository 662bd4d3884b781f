use serde::{Deserialize, Serialize};

use fugacity_configuration::{Configuration, Select};

use crate::{
    BondVisitor, Ewald, LongRangeCorrection, OneBodyModel, PairModel, Visitor, VisitStrategy,
    OVERLAP_ENERGY,
};

/// One term of the total potential: a model bound to the iteration strategy
/// that feeds it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PotentialModel {
    Pair(PairModel),
    OneBody(OneBodyModel),
    Ewald(Ewald),
    LongRangeCorrection(LongRangeCorrection),
    Bonded(BondVisitor),
}

/// A potential term: model + visitor + the group it applies to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Potential {
    model: PotentialModel,
    visitor: Visitor,
    group_index: usize,
}

impl Potential {
    /// A pair potential over the all-inclusive group, brute force
    pub fn pair(model: PairModel) -> Potential {
        Potential {
            model: PotentialModel::Pair(model),
            visitor: Visitor::new(VisitStrategy::AllPairs),
            group_index: 0,
        }
    }

    /// A pair potential iterated through a cell list
    pub fn pair_with_cell_list(model: PairModel, list_index: usize) -> Potential {
        Potential {
            model: PotentialModel::Pair(model),
            visitor: Visitor::new(VisitStrategy::Cell { list_index }),
            group_index: 0,
        }
    }

    /// An intramolecular pair potential skipping sites within
    /// `exclude_bond_distance` bonds of each other
    pub fn intra(model: PairModel, exclude_bond_distance: usize) -> Potential {
        Potential {
            model: PotentialModel::Pair(model),
            visitor: Visitor::new(VisitStrategy::Intra { exclude_bond_distance }),
            group_index: 0,
        }
    }

    pub fn one_body(model: OneBodyModel) -> Potential {
        Potential {
            model: PotentialModel::OneBody(model),
            visitor: Visitor::new(VisitStrategy::AllPairs),
            group_index: 0,
        }
    }

    pub fn ewald(ewald: Ewald) -> Potential {
        Potential {
            model: PotentialModel::Ewald(ewald),
            visitor: Visitor::new(VisitStrategy::AllPairs),
            group_index: 0,
        }
    }

    pub fn long_range_correction() -> Potential {
        Potential {
            model: PotentialModel::LongRangeCorrection(LongRangeCorrection),
            visitor: Visitor::new(VisitStrategy::AllPairs),
            group_index: 0,
        }
    }

    pub fn bonded() -> Potential {
        Potential {
            model: PotentialModel::Bonded(BondVisitor),
            visitor: Visitor::new(VisitStrategy::AllPairs),
            group_index: 0,
        }
    }

    pub fn with_group(mut self, group_index: usize) -> Potential {
        self.group_index = group_index;
        self
    }

    /// Enables pair recording for cluster/AVB moves
    pub fn with_energy_map(mut self) -> Potential {
        self.visitor = self.visitor.with_energy_map();
        self
    }

    pub fn model(&self) -> &PotentialModel {
        &self.model
    }

    pub fn visitor(&self) -> &Visitor {
        &self.visitor
    }

    /// One-time setup: k-vector enumeration, cutoff checks, tabulation
    pub fn precompute(&mut self, config: &mut Configuration) {
        let max_cutoff = config.model_params().max_cutoff();
        config.domain_mut().check_cutoff(max_cutoff);
        if let PotentialModel::Ewald(ewald) = &mut self.model {
            ewald.precompute(config);
        }
    }

    pub fn energy_all(&mut self, config: &Configuration) -> f64 {
        match &mut self.model {
            PotentialModel::Pair(model) => self.visitor.energy_all(model, config, self.group_index),
            PotentialModel::OneBody(model) => {
                let g = config.group(self.group_index).clone();
                let mut en = 0.0;
                for (pi, particle) in config.physical_particles() {
                    for s in 0..particle.num_sites() {
                        if !g.matches(config.particle(pi), s) {
                            continue;
                        }
                        let site = particle.site(s);
                        en += model.energy(site.position(), site.site_type(), config.model_params());
                        if en >= OVERLAP_ENERGY {
                            return OVERLAP_ENERGY;
                        }
                    }
                }
                en
            }
            PotentialModel::Ewald(ewald) => ewald.energy_all(config),
            PotentialModel::LongRangeCorrection(lrc) => lrc.energy_all(config),
            PotentialModel::Bonded(bv) => bv.energy_all(config, self.group_index),
        }
    }

    pub fn energy_select(&mut self, config: &Configuration, select: &Select) -> f64 {
        match &mut self.model {
            PotentialModel::Pair(model) => {
                self.visitor.energy_select(model, config, select, self.group_index)
            }
            PotentialModel::OneBody(model) => {
                let mut en = 0.0;
                for i in 0..select.num_particles() {
                    let pi = select.particle_index(i);
                    for &s in select.site_indices(i) {
                        let site = config.particle(pi).site(s);
                        if !site.is_physical() {
                            continue;
                        }
                        en += model.energy(site.position(), site.site_type(), config.model_params());
                        if en >= OVERLAP_ENERGY {
                            return OVERLAP_ENERGY;
                        }
                    }
                }
                en
            }
            PotentialModel::Ewald(ewald) => ewald.energy_select(config, select),
            PotentialModel::LongRangeCorrection(lrc) => lrc.energy_select(config, select),
            PotentialModel::Bonded(bv) => bv.energy_select(config, select),
        }
    }

    /// Folds an accepted move into internal caches (Ewald structure factors)
    pub fn finalize(&mut self, config: &Configuration, select: &Select) {
        if let PotentialModel::Ewald(ewald) = &mut self.model {
            ewald.finalize(config, select);
        }
    }

    /// Rebuilds this term's energy map and returns it
    pub fn build_energy_map(&mut self, config: &Configuration) -> &crate::EnergyMap {
        self.visitor = self.visitor.clone().with_energy_map();
        if let PotentialModel::Pair(model) = &self.model.clone() {
            self.visitor.energy_all(model, config, self.group_index);
        }
        self.visitor.energy_map()
    }
}

/// The ordered list of potential terms making up one energy surface, with
/// the per-term profile of the last evaluation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PotentialFactory {
    potentials: Vec<Potential>,
    last_profile: Vec<f64>,
}

impl PotentialFactory {
    pub fn new() -> PotentialFactory {
        PotentialFactory::default()
    }

    pub fn add(&mut self, potential: Potential) {
        self.potentials.push(potential);
        self.last_profile.push(0.0);
    }

    pub fn num(&self) -> usize {
        self.potentials.len()
    }

    pub fn potential(&self, i: usize) -> &Potential {
        &self.potentials[i]
    }

    pub fn potential_mut(&mut self, i: usize) -> &mut Potential {
        &mut self.potentials[i]
    }

    pub fn precompute(&mut self, config: &mut Configuration) {
        for p in self.potentials.iter_mut() {
            p.precompute(config);
        }
    }

    /// Per-term energies of the last evaluation
    pub fn last_profile(&self) -> &Vec<f64> {
        &self.last_profile
    }

    pub fn energy_all(&mut self, config: &Configuration) -> f64 {
        let mut total = 0.0;
        for (i, p) in self.potentials.iter_mut().enumerate() {
            let e = p.energy_all(config);
            self.last_profile[i] = e;
            total += e;
            if total >= OVERLAP_ENERGY {
                return OVERLAP_ENERGY;
            }
        }
        total
    }

    pub fn energy_select(&mut self, config: &Configuration, select: &Select) -> f64 {
        let mut total = 0.0;
        for (i, p) in self.potentials.iter_mut().enumerate() {
            let e = p.energy_select(config, select);
            self.last_profile[i] = e;
            total += e;
            if total >= OVERLAP_ENERGY {
                return OVERLAP_ENERGY;
            }
        }
        total
    }

    pub fn finalize(&mut self, config: &Configuration, select: &Select) {
        for p in self.potentials.iter_mut() {
            p.finalize(config, select);
        }
    }
}
