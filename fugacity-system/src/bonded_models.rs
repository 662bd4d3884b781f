use rand::Rng;
use serde::{Deserialize, Serialize};

use fugacity_configuration::BondedType;

use crate::OVERLAP_ENERGY;

const MAX_REJECTION_ATTEMPTS: usize = 1_000_000;

/// Rejection sampling of `p(x) ∝ f(x)` on `[lo, hi]`, with the envelope
/// estimated from a coarse scan.
fn sample_by_rejection<R: Rng, F: Fn(f64) -> f64>(rng: &mut R, lo: f64, hi: f64, f: F) -> f64 {
    let n = 512;
    let mut fmax: f64 = 0.0;
    for i in 0..=n {
        let x = lo + (hi - lo) * i as f64 / n as f64;
        fmax = fmax.max(f(x));
    }
    assert!(fmax > 0.0, "rejection sampler given a vanishing density on [{}, {}]", lo, hi);
    fmax *= 1.05;
    for _ in 0..MAX_REJECTION_ATTEMPTS {
        let x = rng.gen_range(lo..hi);
        if rng.gen_range(0.0..1.0) < f(x) / fmax {
            return x;
        }
    }
    panic!("rejection sampling failed to accept after {} attempts", MAX_REJECTION_ATTEMPTS);
}

/// Two-body intramolecular models, dispatched by the model name carried in a
/// [`BondedType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondModel {
    /// `$ U = k(l - l_0)^2 $`
    Harmonic,
    /// Dirac bond of a fixed `length`, honored within `delta`
    Rigid,
    /// free in `[minimum, maximum]`, infinite outside
    SquareWell,
}

impl BondModel {
    pub fn from_name(name: &str) -> BondModel {
        match name {
            "harmonic" => BondModel::Harmonic,
            "rigid" => BondModel::Rigid,
            "square_well" => BondModel::SquareWell,
            other => panic!("unknown bond model: {}", other),
        }
    }

    pub fn energy(&self, length: f64, bt: &BondedType) -> f64 {
        match self {
            BondModel::Harmonic => {
                let l0 = bt.property("length");
                let k = bt.property("k");
                k * (length - l0) * (length - l0)
            }
            BondModel::Rigid => {
                let l0 = bt.property("length");
                let delta = bt.property_or("delta", 1e-5);
                if (length - l0).abs() > delta {
                    OVERLAP_ENERGY
                } else {
                    0.0
                }
            }
            BondModel::SquareWell => {
                if length < bt.property("minimum") || length > bt.property("maximum") {
                    OVERLAP_ENERGY
                } else {
                    0.0
                }
            }
        }
    }

    /// Draws a length from `$ p(l) \propto l^{d-1} e^{-\beta U(l)} $`.
    pub fn random_length<R: Rng>(&self, bt: &BondedType, beta: f64, dimension: usize, rng: &mut R) -> f64 {
        let d = dimension as f64;
        match self {
            BondModel::Rigid => bt.property("length"),
            BondModel::SquareWell => {
                let min = bt.property("minimum");
                let max = bt.property("maximum");
                // inverse CDF of l^(d-1) on [min, max]
                let u = rng.gen_range(0.0..1.0);
                (u * (max.powf(d) - min.powf(d)) + min.powf(d)).powf(1.0 / d)
            }
            BondModel::Harmonic => {
                let l0 = bt.property("length");
                let k = bt.property("k");
                let spread = 4.0 / (2.0 * beta * k).sqrt();
                let lo = (l0 - spread).max(0.0);
                let hi = l0 + spread;
                sample_by_rejection(rng, lo, hi, |l| {
                    l.powf(d - 1.0) * (-beta * k * (l - l0) * (l - l0)).exp()
                })
            }
        }
    }
}

/// Three-body angle models; angles are in radians at the evaluation surface,
/// while file parameters are given in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngleModel {
    /// `$ U = k(\theta - \theta_0)^2 $`
    Harmonic,
    Rigid,
    SquareWell,
}

impl AngleModel {
    pub fn from_name(name: &str) -> AngleModel {
        match name {
            "harmonic" => AngleModel::Harmonic,
            "rigid" => AngleModel::Rigid,
            "square_well" => AngleModel::SquareWell,
            other => panic!("unknown angle model: {}", other),
        }
    }

    pub fn energy(&self, theta: f64, bt: &BondedType) -> f64 {
        match self {
            AngleModel::Harmonic => {
                let theta0 = bt.property("degrees").to_radians();
                let k = bt.property("k");
                k * (theta - theta0) * (theta - theta0)
            }
            AngleModel::Rigid => {
                let theta0 = bt.property("degrees").to_radians();
                let delta = bt.property_or("delta", 1e-5);
                if (theta - theta0).abs() > delta {
                    OVERLAP_ENERGY
                } else {
                    0.0
                }
            }
            AngleModel::SquareWell => {
                let min = bt.property("minimum").to_radians();
                let max = bt.property("maximum").to_radians();
                if theta < min || theta > max {
                    OVERLAP_ENERGY
                } else {
                    0.0
                }
            }
        }
    }

    /// Draws an angle from `$ p(\theta) \propto \sin\theta\, e^{-\beta U} $`
    /// (the sine factor is dropped in 2-D).
    pub fn random_angle<R: Rng>(&self, bt: &BondedType, beta: f64, dimension: usize, rng: &mut R) -> f64 {
        match self {
            AngleModel::Rigid => bt.property("degrees").to_radians(),
            _ => {
                let sine_power = if dimension == 3 { 1.0 } else { 0.0 };
                sample_by_rejection(rng, 0.0, std::f64::consts::PI, |theta| {
                    let u = self.energy(theta, bt);
                    if u >= OVERLAP_ENERGY {
                        0.0
                    } else {
                        theta.sin().powf(sine_power) * (-beta * u).exp()
                    }
                })
            }
        }
    }
}

/// Four-body torsion models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DihedralModel {
    /// TraPPE cosine series:
    /// `$ U = c_0 + c_1(1+\cos\phi) + c_2(1-\cos 2\phi) + c_3(1+\cos 3\phi) $`
    Trappe,
    SquareWell,
}

impl DihedralModel {
    pub fn from_name(name: &str) -> DihedralModel {
        match name {
            "trappe" | "cosine_series" => DihedralModel::Trappe,
            "square_well" => DihedralModel::SquareWell,
            other => panic!("unknown dihedral model: {}", other),
        }
    }

    pub fn energy(&self, phi: f64, bt: &BondedType) -> f64 {
        match self {
            DihedralModel::Trappe => {
                bt.property("c0")
                    + bt.property("c1") * (1.0 + phi.cos())
                    + bt.property("c2") * (1.0 - (2.0 * phi).cos())
                    + bt.property("c3") * (1.0 + (3.0 * phi).cos())
            }
            DihedralModel::SquareWell => {
                let min = bt.property("minimum").to_radians();
                let max = bt.property("maximum").to_radians();
                if phi < min || phi > max {
                    OVERLAP_ENERGY
                } else {
                    0.0
                }
            }
        }
    }

    /// Draws a torsion from `$ p(\phi) \propto e^{-\beta U(\phi)} $` on `[-\pi, \pi]`
    pub fn random_dihedral<R: Rng>(&self, bt: &BondedType, beta: f64, rng: &mut R) -> f64 {
        sample_by_rejection(rng, -std::f64::consts::PI, std::f64::consts::PI, |phi| {
            let u = self.energy(phi, bt);
            if u >= OVERLAP_ENERGY {
                0.0
            } else {
                (-beta * u).exp()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn harmonic_bond_mean_obeys_the_boltzmann_law() {
        let bt = BondedType::new("harmonic").with("k", 100.0).with("length", 1.0);
        let beta = 2.0;
        let mut rng = SmallRng::seed_from_u64(7);
        let n = 50_000;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let l = BondModel::Harmonic.random_length(&bt, beta, 3, &mut rng);
            sum += l;
            sum_sq += l * l;
        }
        let mean = sum / n as f64;
        // analytic mean of l^2 exp(-beta k (l-1)^2) near 1 with sigma^2 = 1/(2 beta k)
        let sigma2 = 1.0 / (2.0 * beta * 100.0);
        let expected = 1.0 + 2.0 * sigma2; // first-order correction from the l^2 weight
        let stdev_of_mean = (sum_sq / n as f64 - mean * mean).sqrt() / (n as f64).sqrt();
        assert!(
            (mean - expected).abs() < 3.0 * stdev_of_mean + 1e-3,
            "mean {} expected {}",
            mean,
            expected
        );
    }

    #[test]
    fn square_well_bond_stays_in_the_well() {
        let bt = BondedType::new("square_well").with("minimum", 0.9).with("maximum", 1.1);
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..1000 {
            let l = BondModel::SquareWell.random_length(&bt, 1.0, 3, &mut rng);
            assert!((0.9..=1.1).contains(&l));
        }
    }

    #[test]
    fn rigid_angle_returns_the_set_point() {
        let bt = BondedType::new("rigid").with("degrees", 109.47);
        let mut rng = SmallRng::seed_from_u64(1);
        let theta = AngleModel::Rigid.random_angle(&bt, 1.0, 3, &mut rng);
        assert!((theta - 109.47f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn trappe_dihedral_prefers_low_energy() {
        let bt = BondedType::new("trappe")
            .with("c0", 0.0)
            .with("c1", 2.0)
            .with("c2", 0.0)
            .with("c3", 0.0);
        let mut rng = SmallRng::seed_from_u64(3);
        // with c1 > 0 the minimum is at phi = pi; the sampler should favor it
        let mut near_pi = 0;
        let n = 10_000;
        for _ in 0..n {
            let phi = DihedralModel::Trappe.random_dihedral(&bt, 2.0, &mut rng);
            if phi.abs() > std::f64::consts::FRAC_PI_2 {
                near_pi += 1;
            }
        }
        assert!(near_pi as f64 / n as f64 > 0.8, "{} of {}", near_pi, n);
    }
}
