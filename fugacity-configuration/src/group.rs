use serde::{Deserialize, Serialize};

use crate::Particle;

/// A predicate over site and particle types that selects a subset of a
/// configuration for visitor iteration.
///
/// Empty type lists match everything; group 0 of every configuration is the
/// all-inclusive group.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    site_types: Vec<usize>,
    particle_types: Vec<usize>,
}

impl Group {
    /// The group matching every physical site
    pub fn all() -> Group {
        Group::default()
    }

    pub fn with_site_types(mut self, site_types: Vec<usize>) -> Group {
        self.site_types = site_types;
        self
    }

    pub fn with_particle_types(mut self, particle_types: Vec<usize>) -> Group {
        self.particle_types = particle_types;
        self
    }

    pub fn matches_particle(&self, particle: &Particle) -> bool {
        self.particle_types.is_empty() || self.particle_types.contains(&particle.type_index())
    }

    pub fn matches_site_type(&self, site_type: usize) -> bool {
        self.site_types.is_empty() || self.site_types.contains(&site_type)
    }

    /// True when the site belongs to the group and is physical
    pub fn matches(&self, particle: &Particle, site: usize) -> bool {
        self.matches_particle(particle)
            && particle.site(site).is_physical()
            && self.matches_site_type(particle.site(site).site_type())
    }
}
