use serde::{Deserialize, Serialize};

use fugacity_configuration::{Configuration, Select, TrialState};
use fugacity_numerical::Vec3;

use crate::pair_model::erfc;

fn erf(x: f64) -> f64 {
    1.0 - erfc(x)
}

/// Reciprocal-space part of the Ewald decomposition, with the self-energy and
/// intramolecular screening corrections.
///
/// `$ U_{rec} = \sum_k \frac{2\pi}{V k^2} e^{-k^2/4\alpha^2} |S_k|^2 $` with
/// `$ S_k = \sum_i q_i e^{i k r_i} $`, `$ U_{self} = -\frac{\alpha}{\sqrt\pi}\sum_i q_i^2 $`,
/// and for every same-molecule pair the spurious k-space interaction is
/// removed by `$ -q_iq_j\,\mathrm{erf}(\alpha r)/r $`.
///
/// Selection energies return the *total* reciprocal energy of the current
/// positions; acceptance only ever uses new-minus-old differences and
/// Rosenbluth ratios, where the common rest-of-system part cancels. The
/// structure factors are cached and updated incrementally on finalize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ewald {
    alpha: f64,
    /// explicit integer ranges; a sphere cut may zero out corner vectors
    kmax: [i32; 3],
    /// squared cut on `$ |k|^2 $` in units of `$ (2\pi/L_i)^2 $` integers, if any
    kmax_squared: Option<f64>,
    #[serde(skip)]
    kvecs: Vec<Kvec>,
    sk_real: Vec<f64>,
    sk_imag: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Kvec {
    k: Vec3,
    prefactor: f64,
}

impl Ewald {
    /// Sphere-cut constructor: all k with `$ |n|^2 \le n^2_{max} $`
    pub fn with_sphere_cut(alpha: f64, num_max: i32) -> Ewald {
        Ewald {
            alpha,
            kmax: [num_max; 3],
            kmax_squared: Some((num_max * num_max) as f64),
            kvecs: Vec::new(),
            sk_real: Vec::new(),
            sk_imag: Vec::new(),
        }
    }

    /// Explicit per-axis integer ranges
    pub fn with_ranges(alpha: f64, kx: i32, ky: i32, kz: i32) -> Ewald {
        Ewald {
            alpha,
            kmax: [kx, ky, kz],
            kmax_squared: None,
            kvecs: Vec::new(),
            sk_real: Vec::new(),
            sk_imag: Vec::new(),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn num_kvectors(&self) -> usize {
        self.kvecs.len()
    }

    /// Enumerates the k vectors for the current box and refreshes the cache.
    pub fn precompute(&mut self, config: &Configuration) {
        assert!(!config.domain().is_tilted(), "Ewald supports orthorhombic domains only");
        assert_eq!(config.dimension(), 3, "Ewald requires a 3-D domain");
        let side = config.domain().side();
        let volume = config.domain().volume();
        let two_pi = 2.0 * std::f64::consts::PI;
        self.kvecs.clear();
        for nx in -self.kmax[0]..=self.kmax[0] {
            for ny in -self.kmax[1]..=self.kmax[1] {
                for nz in -self.kmax[2]..=self.kmax[2] {
                    if nx == 0 && ny == 0 && nz == 0 {
                        continue;
                    }
                    if let Some(n2max) = self.kmax_squared {
                        let n2 = (nx * nx + ny * ny + nz * nz) as f64;
                        if n2 > n2max {
                            continue;
                        }
                    }
                    let k = Vec3::new(
                        two_pi * nx as f64 / side.x,
                        two_pi * ny as f64 / side.y,
                        two_pi * nz as f64 / side.z,
                    );
                    let k2 = k.length_squared();
                    let prefactor = two_pi / volume * (-k2 / (4.0 * self.alpha * self.alpha)).exp() / k2;
                    self.kvecs.push(Kvec { k, prefactor });
                }
            }
        }
        self.refresh_structure_factors(config);
    }

    /// Recomputes the structure factors from scratch
    pub fn refresh_structure_factors(&mut self, config: &Configuration) {
        self.sk_real = vec![0.0; self.kvecs.len()];
        self.sk_imag = vec![0.0; self.kvecs.len()];
        for (_, particle) in config.physical_particles() {
            for site in particle.sites() {
                if !site.is_physical() {
                    continue;
                }
                let q = config.model_params().charge().value(site.site_type());
                if q == 0.0 {
                    continue;
                }
                for (ik, kv) in self.kvecs.iter().enumerate() {
                    let phase = kv.k.dot(site.position());
                    self.sk_real[ik] += q * phase.cos();
                    self.sk_imag[ik] += q * phase.sin();
                }
            }
        }
    }

    fn reciprocal_energy_of(&self, sk_real: &[f64], sk_imag: &[f64]) -> f64 {
        self.kvecs
            .iter()
            .enumerate()
            .map(|(ik, kv)| kv.prefactor * (sk_real[ik] * sk_real[ik] + sk_imag[ik] * sk_imag[ik]))
            .sum()
    }

    fn self_and_intra_energy(&self, config: &Configuration) -> f64 {
        let params = config.model_params();
        let mut en = 0.0;
        for (_, particle) in config.physical_particles() {
            let sites = particle.sites();
            for (si, site) in sites.iter().enumerate() {
                if !site.is_physical() {
                    continue;
                }
                let qi = params.charge().value(site.site_type());
                if qi == 0.0 {
                    continue;
                }
                en -= self.alpha / std::f64::consts::PI.sqrt() * qi * qi;
                for other in sites.iter().skip(si + 1) {
                    if !other.is_physical() {
                        continue;
                    }
                    let qj = params.charge().value(other.site_type());
                    if qj == 0.0 {
                        continue;
                    }
                    let (_, r2) = config.domain().separation(site.position(), other.position());
                    let r = r2.sqrt();
                    en -= qi * qj * erf(self.alpha * r) / r;
                }
            }
        }
        en
    }

    /// Total reciprocal + self + intra energy recomputed from the current
    /// physical positions.
    pub fn energy_all(&mut self, config: &Configuration) -> f64 {
        self.refresh_structure_factors(config);
        self.reciprocal_energy_of(&self.sk_real.clone(), &self.sk_imag.clone())
            + self.self_and_intra_energy(config)
    }

    /// See the struct docs: returns the same total as [`energy_all`](Ewald::energy_all)
    /// but without touching the cache.
    pub fn energy_select(&self, config: &Configuration, _select: &Select) -> f64 {
        let mut sk_real = vec![0.0; self.kvecs.len()];
        let mut sk_imag = vec![0.0; self.kvecs.len()];
        for (_, particle) in config.physical_particles() {
            for site in particle.sites() {
                if !site.is_physical() {
                    continue;
                }
                let q = config.model_params().charge().value(site.site_type());
                if q == 0.0 {
                    continue;
                }
                for (ik, kv) in self.kvecs.iter().enumerate() {
                    let phase = kv.k.dot(site.position());
                    sk_real[ik] += q * phase.cos();
                    sk_imag[ik] += q * phase.sin();
                }
            }
        }
        self.reciprocal_energy_of(&sk_real, &sk_imag) + self.self_and_intra_energy(config)
    }

    /// Folds an accepted selection into the cached structure factors:
    /// moved sites swap their old phase for the new one, additions only add,
    /// removals only subtract.
    pub fn finalize(&mut self, config: &Configuration, select: &Select) {
        if self.kvecs.is_empty() {
            return;
        }
        for i in 0..select.num_particles() {
            let pi = select.particle_index(i);
            for (k, &site) in select.site_indices(i).iter().enumerate() {
                let site_ref = config.particle(pi).site(site);
                let q = config.model_params().charge().value(site_ref.site_type());
                if q == 0.0 {
                    continue;
                }
                match select.trial_state() {
                    TrialState::Add => {
                        self.add_site_contribution(q, site_ref.position(), 1.0);
                    }
                    TrialState::Remove => {
                        self.add_site_contribution(q, site_ref.position(), -1.0);
                    }
                    _ => {
                        self.add_site_contribution(q, select.original_position(i, k), -1.0);
                        self.add_site_contribution(q, site_ref.position(), 1.0);
                    }
                }
            }
        }
    }

    fn add_site_contribution(&mut self, q: f64, position: &Vec3, sign: f64) {
        for (ik, kv) in self.kvecs.iter().enumerate() {
            let phase = kv.k.dot(position);
            self.sk_real[ik] += sign * q * phase.cos();
            self.sk_imag[ik] += sign * q * phase.sin();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugacity_configuration::{Domain, ParticleType, SiteTemplate};

    fn two_charge_config() -> Configuration {
        let mut config = Configuration::new(Domain::cubic(10.0));
        for q in [1.0, -1.0] {
            config.add_particle_type(ParticleType {
                name: format!("q{}", q),
                sites: vec![SiteTemplate {
                    site_type: 0,
                    position: Vec3::zero(),
                    epsilon: 0.0,
                    sigma: 0.0,
                    cutoff: 5.0,
                    charge: q,
                }],
                bonds: vec![],
                angles: vec![],
                dihedrals: vec![],
                bond_types: vec![],
                angle_types: vec![],
                dihedral_types: vec![],
            });
        }
        config
    }

    #[test]
    fn incremental_update_matches_recompute() {
        let mut config = two_charge_config();
        let a = config.add_particle_of_type(0);
        let b = config.add_particle_of_type(1);
        config.displace_particle(b, &Vec3::new(1.5, 0.0, 0.0));
        let mut ewald = Ewald::with_sphere_cut(5.0 / 10.0, 5);
        ewald.precompute(&config);
        let before = ewald.energy_all(&config);

        // move particle a and fold the move into the cache
        let mut select = Select::new();
        select.add_site(a, 0);
        select.load_positions(|pi, s| (*config.particle(pi).site(s).position(), None));
        config.displace_particle(a, &Vec3::new(0.3, -0.2, 0.1));
        ewald.finalize(&config, &select);

        let cached = ewald.reciprocal_energy_of(&ewald.sk_real.clone(), &ewald.sk_imag.clone());
        let recomputed = ewald.energy_all(&config) - ewald.self_and_intra_energy(&config);
        assert!((cached - recomputed).abs() < 1e-9, "{} vs {}", cached, recomputed);
        assert!(before.is_finite());
    }
}
