use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::{Matrix3, Vec3};

/// Fills `point` with a position drawn uniformly from a cube of a given edge,
/// centred on the origin.
///
/// For `dimension == 2` the z component is set to zero.
pub fn position_in_cube<R: Rng>(rng: &mut R, dimension: usize, edge: f64, point: &mut Vec3) {
    let half = edge / 2.0;
    point.x = rng.gen_range(-half..half);
    point.y = rng.gen_range(-half..half);
    point.z = if dimension == 3 { rng.gen_range(-half..half) } else { 0.0 };
}

/// Draws a point uniformly on the surface of the unit sphere (or unit circle in 2-D).
pub fn unit_sphere_surface<R: Rng>(rng: &mut R, dimension: usize, point: &mut Vec3) {
    if dimension == 2 {
        let theta = rng.gen_range(0.0..2.0 * std::f64::consts::PI);
        point.x = theta.cos();
        point.y = theta.sin();
        point.z = 0.0;
        return;
    }
    // normal deviates projected back to the sphere
    loop {
        point.x = StandardNormal.sample(rng);
        point.y = StandardNormal.sample(rng);
        point.z = StandardNormal.sample(rng);
        let l = point.length();
        if l > crate::NEAR_ZERO {
            point.scale(1.0 / l);
            return;
        }
    }
}

/// Draws a uniformly random rotation axis.
pub fn random_unit_axis<R: Rng>(rng: &mut R) -> Vec3 {
    let mut v = Vec3::zero();
    unit_sphere_surface(rng, 3, &mut v);
    v
}

/// A rotation by an angle uniform in `[-max_angle, max_angle]` about a random axis
/// (3-D) or about z (2-D).
pub fn random_rotation<R: Rng>(rng: &mut R, dimension: usize, max_angle: f64) -> Matrix3 {
    let angle = rng.gen_range(-max_angle..max_angle);
    if dimension == 2 {
        Matrix3::about_z(angle)
    } else {
        Matrix3::from_axis_angle(&random_unit_axis(rng), angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn sphere_points_lie_on_the_sphere() {
        let mut rng = SmallRng::seed_from_u64(17);
        let mut v = Vec3::zero();
        for _ in 0..100 {
            unit_sphere_surface(&mut rng, 3, &mut v);
            assert!((v.length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn sphere_mean_converges_to_zero() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut v = Vec3::zero();
        let mut sum = Vec3::zero();
        let n = 100_000;
        for _ in 0..n {
            unit_sphere_surface(&mut rng, 3, &mut v);
            sum += v;
        }
        sum.scale(1.0 / n as f64);
        // 3 sigma of the mean of a coordinate is about 3/sqrt(3 n)
        assert!(sum.length() < 0.01, "residual mean {}", sum);
    }

    #[test]
    fn cube_positions_respect_the_edge() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut v = Vec3::zero();
        for _ in 0..100 {
            position_in_cube(&mut rng, 2, 3.0, &mut v);
            assert!(v.x.abs() <= 1.5 && v.y.abs() <= 1.5);
            assert_eq!(v.z, 0.0);
        }
    }
}
