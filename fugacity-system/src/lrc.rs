use serde::{Deserialize, Serialize};

use fugacity_configuration::{Configuration, Select};

/// Closed-form Lennard-Jones tail correction beyond the cutoff.
///
/// For each site-type pair,
/// `$ U_{tail} = \frac{8}{3}\pi \epsilon \sigma^3
///   [\frac{1}{3}(\sigma/r_c)^9 - (\sigma/r_c)^3]\, n_i n_j / V $`.
/// Counts update through the selection-energy path: a selection's share is
/// the difference between the full tail and the tail with the selection's
/// sites removed, so insertions and deletions change the total by exactly
/// the count delta without recomputing any sums.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LongRangeCorrection;

impl LongRangeCorrection {
    fn site_type_counts(config: &Configuration) -> Vec<f64> {
        let mut counts = vec![0.0; config.num_site_types()];
        for (_, particle) in config.physical_particles() {
            for site in particle.sites() {
                if site.is_physical() {
                    counts[site.site_type()] += 1.0;
                }
            }
        }
        counts
    }

    fn energy_of_counts(config: &Configuration, counts: &[f64]) -> f64 {
        let params = config.model_params();
        let volume = config.domain().volume();
        let mut en = 0.0;
        for t1 in 0..counts.len() {
            for t2 in 0..counts.len() {
                let cutoff = params.cutoff().mixed_value(t1, t2);
                if cutoff <= 0.0 {
                    continue;
                }
                let sigma = params.sigma().mixed_value(t1, t2);
                let epsilon = params.epsilon().mixed_value(t1, t2);
                if sigma == 0.0 || epsilon == 0.0 {
                    continue;
                }
                let s3 = (sigma / cutoff).powi(3);
                let s9 = s3 * s3 * s3;
                en += 8.0 / 3.0 * std::f64::consts::PI
                    * epsilon
                    * sigma.powi(3)
                    * (s9 / 3.0 - s3)
                    * counts[t1]
                    * counts[t2]
                    / volume;
            }
        }
        en
    }

    pub fn energy_all(&self, config: &Configuration) -> f64 {
        Self::energy_of_counts(config, &Self::site_type_counts(config))
    }

    /// The selection's share of the tail: `$ U(n) - U(n - n_{sel}) $`
    pub fn energy_select(&self, config: &Configuration, select: &Select) -> f64 {
        let counts = Self::site_type_counts(config);
        let mut without = counts.clone();
        for i in 0..select.num_particles() {
            let pi = select.particle_index(i);
            for &s in select.site_indices(i) {
                let site = config.particle(pi).site(s);
                if site.is_physical() {
                    without[site.site_type()] -= 1.0;
                }
            }
        }
        Self::energy_of_counts(config, &counts) - Self::energy_of_counts(config, &without)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugacity_configuration::{Domain, ParticleType, SiteTemplate};
    use fugacity_numerical::Vec3;

    fn lj_config(n: usize) -> Configuration {
        let mut config = Configuration::new(Domain::cubic(8.0));
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
        for _ in 0..n {
            config.add_particle_of_type(0);
        }
        config
    }

    #[test]
    fn tail_is_negative_and_quadratic_in_n() {
        let lrc = LongRangeCorrection;
        let e10 = lrc.energy_all(&lj_config(10));
        let e20 = lrc.energy_all(&lj_config(20));
        assert!(e10 < 0.0);
        assert!((e20 / e10 - 4.0).abs() < 1e-12);
    }

    #[test]
    fn selection_share_is_the_count_delta() {
        let config = lj_config(10);
        let lrc = LongRangeCorrection;
        let mut select = Select::new();
        select.add_site(0, 0);
        let share = lrc.energy_select(&config, &select);
        let e10 = lrc.energy_all(&config);
        let e9 = lrc.energy_all(&lj_config(9));
        assert!((share - (e10 - e9)).abs() < 1e-12);
    }
}
