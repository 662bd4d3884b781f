use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Defines when two sites count as "neighbors" for cluster detection and
/// aggregation-volume-bias moves: a distance band, an energy ceiling, and an
/// optional site-type pair restriction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeighborCriterion {
    pub minimum_distance: f64,
    pub maximum_distance: f64,
    /// pairs with energy above this do not bind (default 0: attractive only)
    pub energy_maximum: f64,
    pub site_types: Option<(usize, usize)>,
    /// which potential's energy map to consult
    pub potential_index: usize,
}

impl NeighborCriterion {
    pub fn new(minimum_distance: f64, maximum_distance: f64) -> NeighborCriterion {
        NeighborCriterion {
            minimum_distance,
            maximum_distance,
            energy_maximum: 0.0,
            site_types: None,
            potential_index: 0,
        }
    }

    pub fn is_satisfied(&self, entry: &MapEntry) -> bool {
        let r2 = entry.r2;
        if r2 < self.minimum_distance * self.minimum_distance
            || r2 > self.maximum_distance * self.maximum_distance
        {
            return false;
        }
        if entry.energy > self.energy_maximum {
            return false;
        }
        if let Some((a, b)) = self.site_types {
            let pair = (entry.site_type_i, entry.site_type_j);
            if pair != (a, b) && pair != (b, a) {
                return false;
            }
        }
        true
    }
}

/// One recorded pair interaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub neighbor: usize,
    pub site_i: usize,
    pub site_j: usize,
    pub site_type_i: usize,
    pub site_type_j: usize,
    pub energy: f64,
    pub r2: f64,
}

/// Pairwise interaction records keyed by particle, filled by a visitor while
/// it accumulates energies; cluster moves walk it to find connected
/// components under a [`NeighborCriterion`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyMap {
    entries: HashMap<usize, Vec<MapEntry>>,
}

impl EnergyMap {
    pub fn new() -> EnergyMap {
        EnergyMap::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records a pair symmetrically under both participants
    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        &mut self,
        particle_i: usize,
        particle_j: usize,
        site_i: usize,
        site_j: usize,
        site_type_i: usize,
        site_type_j: usize,
        energy: f64,
        r2: f64,
    ) {
        self.entries.entry(particle_i).or_default().push(MapEntry {
            neighbor: particle_j,
            site_i,
            site_j,
            site_type_i,
            site_type_j,
            energy,
            r2,
        });
        self.entries.entry(particle_j).or_default().push(MapEntry {
            neighbor: particle_i,
            site_i: site_j,
            site_j: site_i,
            site_type_i: site_type_j,
            site_type_j: site_type_i,
            energy,
            r2,
        });
    }

    /// Particles bound to `particle` under the criterion
    pub fn neighbors_of(&self, particle: usize, criterion: &NeighborCriterion) -> Vec<usize> {
        let mut out = Vec::new();
        if let Some(entries) = self.entries.get(&particle) {
            for e in entries {
                if criterion.is_satisfied(e) && !out.contains(&e.neighbor) {
                    out.push(e.neighbor);
                }
            }
        }
        out
    }

    /// Count of particles bound to `particle` (the `$N^{AV}$` of AVB moves)
    pub fn num_neighbors_of(&self, particle: usize, criterion: &NeighborCriterion) -> usize {
        self.neighbors_of(particle, criterion).len()
    }

    /// The connected component containing `seed`, in breadth-first order
    pub fn cluster(&self, seed: usize, criterion: &NeighborCriterion) -> Vec<usize> {
        let mut component = vec![seed];
        let mut frontier = vec![seed];
        while let Some(p) = frontier.pop() {
            for n in self.neighbors_of(p, criterion) {
                if !component.contains(&n) {
                    component.push(n);
                    frontier.push(n);
                }
            }
        }
        component.sort_unstable();
        component
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(map: &mut EnergyMap, a: usize, b: usize, energy: f64, r2: f64) {
        map.insert(a, b, 0, 0, 0, 0, energy, r2);
    }

    #[test]
    fn clusters_follow_the_criterion() {
        let mut map = EnergyMap::new();
        entry(&mut map, 0, 1, -1.0, 1.1);
        entry(&mut map, 1, 2, -1.0, 1.2);
        entry(&mut map, 3, 4, -1.0, 1.0);
        // repulsive contact does not bind
        entry(&mut map, 2, 3, 0.5, 1.0);
        let criterion = NeighborCriterion::new(0.0, 2.0);
        assert_eq!(map.cluster(0, &criterion), vec![0, 1, 2]);
        assert_eq!(map.cluster(4, &criterion), vec![3, 4]);
        assert_eq!(map.num_neighbors_of(1, &criterion), 2);
    }

    #[test]
    fn distance_band_excludes_far_pairs() {
        let mut map = EnergyMap::new();
        entry(&mut map, 0, 1, -1.0, 9.0);
        let criterion = NeighborCriterion::new(0.0, 2.0);
        assert!(map.neighbors_of(0, &criterion).is_empty());
    }
}
