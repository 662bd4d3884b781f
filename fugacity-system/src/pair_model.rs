use serde::{Deserialize, Serialize};

use fugacity_configuration::ModelParams;
use fugacity_numerical::Vec3;

/// Energies above this value are treated as a hard-core overlap; trials see
/// them as an automatic rejection rather than an error.
pub const OVERLAP_ENERGY: f64 = 1e30;

/// Isotropic (and one anisotropic) pair interactions, evaluated from the
/// squared separation and the mixed per-type parameters.
///
/// Every variant returns [`OVERLAP_ENERGY`] on hard-core violation so the
/// caller can auto-reject without special cases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PairModel {
    /// `$ 4\epsilon[(\sigma/r)^{12} - (\sigma/r)^6] $`, truncated at the mixed cutoff
    LennardJones,
    /// Generalized (n, m) form with the analytic prefactor
    /// `$ \frac{n}{n-m}(n/m)^{m/(n-m)} $`; reduces to Lennard-Jones at (12, 6)
    Mie { n: f64, m: f64 },
    /// Infinite inside the mixed sigma, zero outside
    HardSphere,
    /// Hard core at sigma, well of depth epsilon out to the cutoff
    SquareWell,
    /// Kern-Frenkel patches: square-well attraction only when both patch
    /// directors align with the pair axis within the patch half-angle.
    /// `two_patch` puts a second patch at the antipode.
    Patch { cos_patch_angle: f64, two_patch: bool },
    /// Real-space screened Coulomb term of an Ewald decomposition:
    /// `$ q_i q_j \,\mathrm{erfc}(\alpha r)/r $`
    ChargeScreened { alpha: f64 },
    /// Linear interpolation in `$r^2$` of a precomputed table (see
    /// [`PairModel::tabulate`])
    Tabulated {
        inner: Box<PairModel>,
        num_points: usize,
        /// per type pair, energies at evenly spaced r2 in (0, cutoff^2]
        tables: Vec<Vec<Vec<f64>>>,
    },
}

/// Abramowitz & Stegun 7.1.26 rational approximation of erfc, accurate to
/// about 1.5e-7, which is ample for a screened real-space tail.
pub(crate) fn erfc(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592 + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    let erf = 1.0 - poly * (-x * x).exp();
    if sign < 0.0 {
        1.0 + erf
    } else {
        1.0 - erf
    }
}

impl PairModel {
    /// True when the energy depends on site orientations
    pub fn is_anisotropic(&self) -> bool {
        matches!(self, PairModel::Patch { .. })
    }

    /// Pair energy from the squared separation for site types `t1`, `t2`.
    pub fn energy(&self, r2: f64, t1: usize, t2: usize, params: &ModelParams) -> f64 {
        let cutoff = params.cutoff().mixed_value(t1, t2);
        if r2 > cutoff * cutoff {
            return 0.0;
        }
        match self {
            PairModel::LennardJones => {
                let sigma = params.sigma().mixed_value(t1, t2);
                let epsilon = params.epsilon().mixed_value(t1, t2);
                let s2 = sigma * sigma / r2;
                let s6 = s2 * s2 * s2;
                4.0 * epsilon * (s6 * s6 - s6)
            }
            PairModel::Mie { n, m } => {
                let sigma = params.sigma().mixed_value(t1, t2);
                let epsilon = params.epsilon().mixed_value(t1, t2);
                let prefactor = n / (n - m) * (n / m).powf(m / (n - m));
                let r = r2.sqrt();
                prefactor * epsilon * ((sigma / r).powf(*n) - (sigma / r).powf(*m))
            }
            PairModel::HardSphere => {
                let sigma = params.sigma().mixed_value(t1, t2);
                if r2 < sigma * sigma {
                    OVERLAP_ENERGY
                } else {
                    0.0
                }
            }
            PairModel::SquareWell => {
                let sigma = params.sigma().mixed_value(t1, t2);
                let epsilon = params.epsilon().mixed_value(t1, t2);
                if r2 < sigma * sigma {
                    OVERLAP_ENERGY
                } else {
                    -epsilon
                }
            }
            PairModel::Patch { .. } => {
                // isotropic part: the hard core only; the well needs directors
                let sigma = params.sigma().mixed_value(t1, t2);
                if r2 < sigma * sigma {
                    OVERLAP_ENERGY
                } else {
                    0.0
                }
            }
            PairModel::ChargeScreened { alpha } => {
                let q = params.charge().mixed_value(t1, t2);
                if q == 0.0 {
                    return 0.0;
                }
                let r = r2.sqrt();
                q * erfc(alpha * r) / r
            }
            PairModel::Tabulated { tables, num_points, inner } => {
                let table = &tables[t1][t2];
                if table.is_empty() {
                    return inner.energy(r2, t1, t2, params);
                }
                let cutoff2 = cutoff * cutoff;
                let dz = cutoff2 / (*num_points - 1) as f64;
                let frac = r2 / dz;
                let i = (frac.floor() as usize).min(num_points - 2);
                let w = frac - i as f64;
                let e = table[i] * (1.0 - w) + table[i + 1] * w;
                if e >= OVERLAP_ENERGY {
                    OVERLAP_ENERGY
                } else {
                    e
                }
            }
        }
    }

    /// Full (possibly anisotropic) pair energy.
    ///
    /// `rij` points from site `j` to site `i`; directors come from each
    /// site's Euler orientation applied to the laboratory z axis.
    pub fn energy_aniso(
        &self,
        rij: &Vec3,
        r2: f64,
        director_i: Option<&Vec3>,
        director_j: Option<&Vec3>,
        t1: usize,
        t2: usize,
        params: &ModelParams,
    ) -> f64 {
        match self {
            PairModel::Patch { cos_patch_angle, two_patch } => {
                let sigma = params.sigma().mixed_value(t1, t2);
                if r2 < sigma * sigma {
                    return OVERLAP_ENERGY;
                }
                let cutoff = params.cutoff().mixed_value(t1, t2);
                if r2 > cutoff * cutoff {
                    return 0.0;
                }
                let (ni, nj) = match (director_i, director_j) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return 0.0,
                };
                let r = r2.sqrt();
                // alignment of each director with the axis towards the partner
                let mut cos_i = -(ni.dot(rij)) / r;
                let mut cos_j = nj.dot(rij) / r;
                if *two_patch {
                    cos_i = cos_i.abs();
                    cos_j = cos_j.abs();
                }
                if cos_i >= *cos_patch_angle && cos_j >= *cos_patch_angle {
                    -params.epsilon().mixed_value(t1, t2)
                } else {
                    0.0
                }
            }
            _ => self.energy(r2, t1, t2, params),
        }
    }

    /// Replaces this model by a linear-in-`$r^2$` table of `num_points`
    /// samples per type pair; panics if the table misrepresents the analytic
    /// form anywhere on the grid by more than `tolerance`.
    pub fn tabulate(self, params: &ModelParams, num_points: usize, tolerance: f64) -> PairModel {
        assert!(num_points >= 2);
        assert!(!self.is_anisotropic(), "anisotropic models cannot be tabulated on r2 alone");
        let n = params.size();
        let mut tables = vec![vec![Vec::new(); n]; n];
        for t1 in 0..n {
            for t2 in 0..n {
                let cutoff = params.cutoff().mixed_value(t1, t2);
                if cutoff <= 0.0 {
                    continue;
                }
                let cutoff2 = cutoff * cutoff;
                let dz = cutoff2 / (num_points - 1) as f64;
                let table: Vec<f64> = (0..num_points)
                    .map(|i| {
                        let r2 = (i as f64 * dz).max(1e-12);
                        self.energy(r2, t1, t2, params).min(OVERLAP_ENERGY)
                    })
                    .collect();
                tables[t1][t2] = table;
            }
        }
        let tabulated = PairModel::Tabulated { inner: Box::new(self.clone()), num_points, tables };
        // verify the interpolation against the analytic form on a shifted grid
        for t1 in 0..n {
            for t2 in 0..n {
                let cutoff = params.cutoff().mixed_value(t1, t2);
                if cutoff <= 0.0 {
                    continue;
                }
                let cutoff2 = cutoff * cutoff;
                for k in 1..num_points {
                    let r2 = cutoff2 * (k as f64 + 0.5) / num_points as f64;
                    let exact = self.energy(r2, t1, t2, params);
                    if exact >= OVERLAP_ENERGY {
                        continue;
                    }
                    let approx = tabulated.energy(r2, t1, t2, params);
                    assert!(
                        (exact - approx).abs() <= tolerance,
                        "tabulated pair energy off by {} at r2 = {} for types ({}, {})",
                        (exact - approx).abs(),
                        r2,
                        t1,
                        t2
                    );
                }
            }
        }
        tabulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugacity_configuration::{ModelParams, ParticleType, SiteTemplate};
    use fugacity_numerical::Vec3;

    fn params(epsilon: f64, sigma: f64, cutoff: f64) -> ModelParams {
        let mut p = ModelParams::new();
        p.add_particle_type(&ParticleType {
            name: "m".to_string(),
            sites: vec![SiteTemplate {
                site_type: 0,
                position: Vec3::zero(),
                epsilon,
                sigma,
                cutoff,
                charge: 0.0,
            }],
            bonds: vec![],
            angles: vec![],
            dihedrals: vec![],
            bond_types: vec![],
            angle_types: vec![],
            dihedral_types: vec![],
        });
        p
    }

    #[test]
    fn lennard_jones_minimum() {
        let p = params(1.0, 1.0, 3.0);
        let r2_min = 2f64.powf(1.0 / 3.0); // r = 2^(1/6)
        let e = PairModel::LennardJones.energy(r2_min, 0, 0, &p);
        assert!((e + 1.0).abs() < 1e-12, "{}", e);
        assert_eq!(PairModel::LennardJones.energy(10.0, 0, 0, &p), 0.0);
    }

    #[test]
    fn mie_12_6_matches_lennard_jones() {
        let p = params(0.7, 1.1, 3.0);
        for r2 in [1.0, 1.5, 2.0, 4.0] {
            let lj = PairModel::LennardJones.energy(r2, 0, 0, &p);
            let mie = PairModel::Mie { n: 12.0, m: 6.0 }.energy(r2, 0, 0, &p);
            assert!((lj - mie).abs() < 1e-10, "r2={}: {} vs {}", r2, lj, mie);
        }
    }

    #[test]
    fn hard_sphere_overlaps() {
        let p = params(1.0, 1.0, 1.0);
        assert!(PairModel::HardSphere.energy(0.81, 0, 0, &p) >= OVERLAP_ENERGY);
        assert_eq!(PairModel::HardSphere.energy(1.21, 0, 0, &p), 0.0);
    }

    #[test]
    fn patch_needs_mutual_alignment() {
        let p = params(1.0, 1.0, 1.5);
        let model = PairModel::Patch { cos_patch_angle: 0.9, two_patch: false };
        // site i sits at +x of site j, so rij = ri - rj points along +x
        let rij = Vec3::new(1.2, 0.0, 0.0);
        let minus_x = Vec3::new(-1.0, 0.0, 0.0);
        let plus_x = Vec3::new(1.0, 0.0, 0.0);
        // patch of i looks back at j, patch of j looks forward at i: bonded
        let e_bonded = model.energy_aniso(&rij, 1.44, Some(&minus_x), Some(&plus_x), 0, 0, &p);
        assert!((e_bonded + 1.0).abs() < 1e-12);
        // patch of i looks away from j: no well
        let e_miss = model.energy_aniso(&rij, 1.44, Some(&plus_x), Some(&plus_x), 0, 0, &p);
        assert_eq!(e_miss, 0.0);
    }

    #[test]
    fn tabulated_matches_analytic() {
        let p = params(1.0, 1.0, 3.0);
        let table = PairModel::LennardJones.tabulate(&p, 100_000, 1e-4);
        for r2 in [1.0, 1.44, 2.0, 5.0, 8.9] {
            let exact = PairModel::LennardJones.energy(r2, 0, 0, &p);
            let approx = table.energy(r2, 0, 0, &p);
            assert!((exact - approx).abs() < 1e-4, "r2={}", r2);
        }
    }

    #[test]
    fn erfc_matches_reference_values() {
        // reference values from tables of the complementary error function
        assert!((erfc(0.5) - 0.4795001).abs() < 1e-6);
        assert!((erfc(1.0) - 0.1572992).abs() < 1e-6);
        assert!((erfc(2.0) - 0.0046777).abs() < 1e-6);
    }
}
