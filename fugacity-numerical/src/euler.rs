use serde::{Deserialize, Serialize};

use crate::{Matrix3, NEAR_ZERO};

/// Orientation as Euler angles in the x-convention: Rz(phi) * Rx(theta) * Rz(psi).
///
/// Angle ranges follow the usual convention: `phi` and `psi` in `[-pi, pi]`,
/// `theta` in `[0, pi]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Euler {
    pub phi: f64,
    pub theta: f64,
    pub psi: f64,
}

impl Euler {
    pub fn new(phi: f64, theta: f64, psi: f64) -> Euler {
        Euler { phi, theta, psi }
    }

    /// Builds the rotation matrix for these angles
    pub fn rotation_matrix(&self) -> Matrix3 {
        let (s1, c1) = self.phi.sin_cos();
        let (s2, c2) = self.theta.sin_cos();
        let (s3, c3) = self.psi.sin_cos();
        Matrix3::from_rows(
            [c3 * c1 - c2 * s1 * s3, c3 * s1 + c2 * c1 * s3, s3 * s2],
            [-s3 * c1 - c2 * s1 * c3, -s3 * s1 + c2 * c1 * c3, c3 * s2],
            [s2 * s1, -s2 * c1, c2],
        )
    }

    /// Recovers angles from a rotation matrix produced by [`rotation_matrix`](Euler::rotation_matrix).
    ///
    /// In the gimbal-locked case (`theta` equal to 0 or pi) `psi` is set to zero and
    /// the whole in-plane rotation is assigned to `phi`.
    pub fn from_rotation_matrix(rot: &Matrix3) -> Euler {
        let m = &rot.m;
        let theta = m[2][2].clamp(-1.0, 1.0).acos();
        if theta.sin().abs() > NEAR_ZERO.sqrt() {
            let psi = m[0][2].atan2(m[1][2]);
            let phi = m[2][0].atan2(-m[2][1]);
            Euler { phi, theta, psi }
        } else {
            // theta = 0 or pi: only phi + psi (or phi - psi) is determined
            let phi = m[0][1].atan2(m[0][0]);
            Euler { phi, theta, psi: 0.0 }
        }
    }

    /// True when every angle matches `other` within `tolerance`
    pub fn is_equal(&self, other: &Euler, tolerance: f64) -> bool {
        (self.phi - other.phi).abs() < tolerance
            && (self.theta - other.theta).abs() < tolerance
            && (self.psi - other.psi).abs() < tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::Euler;

    #[test]
    fn angles_survive_a_matrix_round_trip() {
        let e = Euler::new(0.3, 1.1, -2.0);
        let rot = e.rotation_matrix();
        let back = Euler::from_rotation_matrix(&rot);
        assert!(e.is_equal(&back, 1e-10), "{:?} != {:?}", e, back);
    }

    #[test]
    fn rotation_matrix_is_orthogonal() {
        let e = Euler::new(-1.9, 2.6, 0.4);
        let rot = e.rotation_matrix();
        let should_be_identity = rot * rot.transposed();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((should_be_identity.m[i][j] - expected).abs() < 1e-12);
            }
        }
    }
}
