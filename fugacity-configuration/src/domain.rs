use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use fugacity_numerical::Vec3;

use crate::ConfigurationError;

/// The simulation cell: three side lengths, three tilt factors defining a
/// triclinic box, and a periodic flag per dimension.
///
/// Positions are kept wrapped into `[-L/2, +L/2)` along every periodic axis.
/// Non-periodic axes never wrap; confining one-body fields are responsible
/// for keeping particles inside them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    side: Vec3,
    xy: f64,
    xz: f64,
    yz: f64,
    periodic: [bool; 3],
    dimension: usize,
    #[serde(default)]
    cutoff_warned: bool,
}

impl Domain {
    /// A cubic, fully periodic 3-D box
    pub fn cubic(side_length: f64) -> Domain {
        Domain::new(Vec3::from_float(side_length)).unwrap()
    }

    /// A square, fully periodic 2-D box
    pub fn square(side_length: f64) -> Domain {
        let mut d = Domain::new(Vec3::new(side_length, side_length, 0.0)).unwrap();
        d.periodic = [true, true, false];
        d
    }

    /// An orthorhombic box; a zero `z` side selects a 2-D domain
    pub fn new(side: Vec3) -> Result<Domain, ConfigurationError> {
        let dimension = if side.z == 0.0 { 2 } else { 3 };
        if side.x <= 0.0 || side.y <= 0.0 || (dimension == 3 && side.z <= 0.0) {
            return Err(ConfigurationError::BadDomain(format!("{}", side)));
        }
        Ok(Domain {
            side,
            xy: 0.0,
            xz: 0.0,
            yz: 0.0,
            periodic: [true, true, dimension == 3],
            dimension,
            cutoff_warned: false,
        })
    }

    pub fn with_tilts(mut self, xy: f64, xz: f64, yz: f64) -> Domain {
        self.xy = xy;
        self.xz = xz;
        self.yz = yz;
        self
    }

    /// Disables wrapping along one axis (0 = x, 1 = y, 2 = z)
    pub fn set_periodic(&mut self, dim: usize, periodic: bool) {
        self.periodic[dim] = periodic;
    }

    pub fn is_periodic(&self, dim: usize) -> bool {
        self.periodic[dim]
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn side(&self) -> &Vec3 {
        &self.side
    }

    pub fn side_length(&self, dim: usize) -> f64 {
        self.side[dim]
    }

    pub fn is_tilted(&self) -> bool {
        self.xy != 0.0 || self.xz != 0.0 || self.yz != 0.0
    }

    pub fn tilts(&self) -> (f64, f64, f64) {
        (self.xy, self.xz, self.yz)
    }

    pub fn volume(&self) -> f64 {
        if self.dimension == 2 {
            self.side.x * self.side.y
        } else {
            self.side.x * self.side.y * self.side.z
        }
    }

    pub fn min_side_length(&self) -> f64 {
        if self.dimension == 2 {
            self.side.x.min(self.side.y)
        } else {
            self.side.x.min(self.side.y).min(self.side.z)
        }
    }

    pub fn max_side_length(&self) -> f64 {
        self.side.x.max(self.side.y).max(self.side.z)
    }

    /// Rescales every side by `factor` (volume moves)
    pub fn rescale(&mut self, factor: f64) {
        self.side.scale(factor);
        self.xy *= factor;
        self.xz *= factor;
        self.yz *= factor;
    }

    /// Warns (once) if an interaction cutoff exceeds half the minimum side.
    pub fn check_cutoff(&mut self, cutoff: f64) {
        if cutoff > 0.5 * self.min_side_length() && !self.cutoff_warned {
            warn!(
                "cutoff {} exceeds half the minimum side length {}; minimum image may miss pairs",
                cutoff,
                self.min_side_length()
            );
            self.cutoff_warned = true;
        }
    }

    /// Wraps a position into the central cell, honoring tilts and periodic flags.
    ///
    /// The triclinic wrap subtracts integer multiples of the oblique lattice
    /// vectors in the z, y, x order, so each later axis sees the shifts
    /// introduced by the earlier ones.
    pub fn wrap(&self, pos: &mut Vec3) {
        if self.periodic[2] && self.side.z > 0.0 {
            let k = (pos.z / self.side.z).round();
            pos.z -= k * self.side.z;
            pos.y -= k * self.yz;
            pos.x -= k * self.xz;
        }
        if self.periodic[1] {
            let k = (pos.y / self.side.y).round();
            pos.y -= k * self.side.y;
            pos.x -= k * self.xy;
        }
        if self.periodic[0] {
            let k = (pos.x / self.side.x).round();
            pos.x -= k * self.side.x;
        }
    }

    /// The minimum-image separation `a - b` together with its squared length.
    #[inline(always)]
    pub fn separation(&self, a: &Vec3, b: &Vec3) -> (Vec3, f64) {
        let mut d = *a - *b;
        self.wrap(&mut d);
        let r2 = d.length_squared();
        (d, r2)
    }

    /// Squared minimum-image distance; avoids materializing the vector when
    /// the box is orthogonal.
    #[inline(always)]
    pub fn distance_squared(&self, a: &Vec3, b: &Vec3) -> f64 {
        if self.is_tilted() {
            return self.separation(a, b).1;
        }
        let mut d = a.x - b.x;
        if self.periodic[0] {
            d -= (d / self.side.x).round() * self.side.x;
        }
        let mut r2 = d * d;
        d = a.y - b.y;
        if self.periodic[1] {
            d -= (d / self.side.y).round() * self.side.y;
        }
        r2 += d * d;
        if self.dimension == 3 {
            d = a.z - b.z;
            if self.periodic[2] {
                d -= (d / self.side.z).round() * self.side.z;
            }
            r2 += d * d;
        }
        r2
    }

    /// A position drawn uniformly from the box
    pub fn random_position<R: Rng>(&self, rng: &mut R) -> Vec3 {
        let z = if self.dimension == 3 {
            self.side.z * (rng.gen_range(0.0..1.0) - 0.5)
        } else {
            0.0
        };
        Vec3::new(
            self.side.x * (rng.gen_range(0.0..1.0) - 0.5),
            self.side.y * (rng.gen_range(0.0..1.0) - 0.5),
            z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Domain;
    use fugacity_numerical::Vec3;

    #[test]
    fn wrap_into_central_cell() {
        let domain = Domain::cubic(10.0);
        let mut p = Vec3::new(6.0, -7.0, 12.0);
        domain.wrap(&mut p);
        assert_eq!(p, Vec3::new(-4.0, 3.0, 2.0));
    }

    #[test]
    fn minimum_image_distance() {
        let domain = Domain::cubic(10.0);
        let a = Vec3::new(4.9, 0.0, 0.0);
        let b = Vec3::new(-4.9, 0.0, 0.0);
        let r2 = domain.distance_squared(&a, &b);
        assert!((r2 - 0.04).abs() < 1e-12);
    }

    #[test]
    fn non_periodic_axis_never_wraps() {
        let mut domain = Domain::new(Vec3::new(30.0, 30.0, 90.0)).unwrap();
        domain.set_periodic(2, false);
        let mut p = Vec3::new(0.0, 0.0, 60.0);
        domain.wrap(&mut p);
        assert_eq!(p.z, 60.0);
    }

    #[test]
    fn triclinic_wrap_applies_tilt() {
        let domain = Domain::cubic(10.0).with_tilts(2.0, 0.0, 0.0);
        let mut p = Vec3::new(0.0, 11.0, 0.0);
        domain.wrap(&mut p);
        // one y-lattice vector (2, 10, 0) is subtracted
        assert!((p.y - 1.0).abs() < 1e-12);
        assert!((p.x + 2.0).abs() < 1e-12);
    }
}
