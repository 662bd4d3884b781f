use serde::{Deserialize, Serialize};

use fugacity_configuration::ModelParams;
use fugacity_numerical::Vec3;

use crate::OVERLAP_ENERGY;

/// External one-body fields: confining barriers and uniform fields.
///
/// Barriers return [`OVERLAP_ENERGY`] outside their bounds, so a site placed
/// beyond a hard wall auto-rejects the trial. Confinement along an axis only
/// makes sense when that axis is non-periodic and the walls sit at least a
/// cutoff inside the box edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OneBodyModel {
    /// Hard walls at `lower` and `upper` along `axis`
    HardSlit { axis: usize, lower: f64, upper: f64 },
    /// Hard slit with a square well of `depth` within `well_width` of either wall
    SquareWellSlit { axis: usize, lower: f64, upper: f64, well_width: f64, depth: f64 },
    /// Hard cylinder of `radius` about `axis`, with a square well at the wall
    SquareWellCylinder { axis: usize, radius: f64, well_width: f64, depth: f64 },
    /// Structureless 9-3 Lennard-Jones walls at `lower` and `upper`:
    /// `$ \epsilon[\frac{2}{15}(\sigma/d)^9 - (\sigma/d)^3] $` per wall
    LjSlit { axis: usize, lower: f64, upper: f64, epsilon: f64, sigma: f64 },
    /// Uniform electric field along `axis`: `$ -qEx $`
    ElectricField { axis: usize, field: f64 },
}

impl OneBodyModel {
    pub fn energy(&self, position: &Vec3, site_type: usize, params: &ModelParams) -> f64 {
        match self {
            OneBodyModel::HardSlit { axis, lower, upper } => {
                let x = position[*axis];
                if x < *lower || x > *upper {
                    OVERLAP_ENERGY
                } else {
                    0.0
                }
            }
            OneBodyModel::SquareWellSlit { axis, lower, upper, well_width, depth } => {
                let x = position[*axis];
                if x < *lower || x > *upper {
                    OVERLAP_ENERGY
                } else if x < lower + well_width || x > upper - well_width {
                    -depth
                } else {
                    0.0
                }
            }
            OneBodyModel::SquareWellCylinder { axis, radius, well_width, depth } => {
                let mut r2 = 0.0;
                for dim in 0..3 {
                    if dim != *axis {
                        r2 += position[dim] * position[dim];
                    }
                }
                let r = r2.sqrt();
                if r > *radius {
                    OVERLAP_ENERGY
                } else if r > radius - well_width {
                    -depth
                } else {
                    0.0
                }
            }
            OneBodyModel::LjSlit { axis, lower, upper, epsilon, sigma } => {
                let x = position[*axis];
                if x <= *lower || x >= *upper {
                    return OVERLAP_ENERGY;
                }
                let mut en = 0.0;
                for d in [x - lower, upper - x] {
                    let s3 = (sigma / d).powi(3);
                    let s9 = s3 * s3 * s3;
                    en += epsilon * (2.0 / 15.0 * s9 - s3);
                }
                en
            }
            OneBodyModel::ElectricField { axis, field } => {
                -params.charge().value(site_type) * field * position[*axis]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugacity_configuration::ModelParams;

    #[test]
    fn hard_slit_confines() {
        let wall = OneBodyModel::HardSlit { axis: 2, lower: -15.0, upper: 15.0 };
        let params = ModelParams::new();
        assert_eq!(wall.energy(&Vec3::new(0.0, 0.0, 10.0), 0, &params), 0.0);
        assert!(wall.energy(&Vec3::new(0.0, 0.0, 15.5), 0, &params) >= OVERLAP_ENERGY);
    }

    #[test]
    fn square_well_slit_wells_near_walls() {
        let wall = OneBodyModel::SquareWellSlit {
            axis: 2,
            lower: -5.0,
            upper: 5.0,
            well_width: 1.0,
            depth: 2.0,
        };
        let params = ModelParams::new();
        assert_eq!(wall.energy(&Vec3::new(0.0, 0.0, 0.0), 0, &params), 0.0);
        assert_eq!(wall.energy(&Vec3::new(0.0, 0.0, 4.5), 0, &params), -2.0);
        assert_eq!(wall.energy(&Vec3::new(0.0, 0.0, -4.5), 0, &params), -2.0);
    }
}
