use std::ops::Mul;

use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Row-major 3x3 matrix used for rotations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix3 {
    pub m: [[f64; 3]; 3],
}

impl Matrix3 {
    pub fn identity() -> Matrix3 {
        Matrix3 { m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]] }
    }

    pub fn from_rows(r0: [f64; 3], r1: [f64; 3], r2: [f64; 3]) -> Matrix3 {
        Matrix3 { m: [r0, r1, r2] }
    }

    /// Rotation by `angle` radians about a unit `axis` (Rodrigues form)
    pub fn from_axis_angle(axis: &Vec3, angle: f64) -> Matrix3 {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);
        Matrix3 {
            m: [
                [t * x * x + c, t * x * y - s * z, t * x * z + s * y],
                [t * x * y + s * z, t * y * y + c, t * y * z - s * x],
                [t * x * z - s * y, t * y * z + s * x, t * z * z + c],
            ],
        }
    }

    /// In-plane rotation about the z axis; the 2-D counterpart of [`from_axis_angle`](Matrix3::from_axis_angle)
    pub fn about_z(angle: f64) -> Matrix3 {
        let (s, c) = angle.sin_cos();
        Matrix3 { m: [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]] }
    }

    pub fn transposed(&self) -> Matrix3 {
        let mut t = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                t[i][j] = self.m[j][i];
            }
        }
        Matrix3 { m: t }
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Applies this rotation to a vector
    pub fn apply(&self, v: &Vec3) -> Vec3 {
        Vec3::new(
            self.m[0][0] * v.x + self.m[0][1] * v.y + self.m[0][2] * v.z,
            self.m[1][0] * v.x + self.m[1][1] * v.y + self.m[1][2] * v.z,
            self.m[2][0] * v.x + self.m[2][1] * v.y + self.m[2][2] * v.z,
        )
    }

    pub fn apply_mut(&self, v: &mut Vec3) {
        let out = self.apply(v);
        *v = out;
    }
}

impl Mul for Matrix3 {
    type Output = Matrix3;
    fn mul(self, rhs: Matrix3) -> Matrix3 {
        let mut out = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                for (k, rhs_row) in rhs.m.iter().enumerate() {
                    out[i][j] += self.m[i][k] * rhs_row[j];
                }
            }
        }
        Matrix3 { m: out }
    }
}

#[cfg(test)]
mod tests {
    use super::Matrix3;
    use crate::Vec3;

    #[test]
    fn axis_angle_rotation_preserves_length() {
        let axis = Vec3::new(1.0, 1.0, 1.0).normalized();
        let rot = Matrix3::from_axis_angle(&axis, 1.234);
        let v = Vec3::new(0.3, -0.7, 2.1);
        let w = rot.apply(&v);
        assert!((v.length() - w.length()).abs() < 1e-12);
        assert!((rot.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn quarter_turn_about_z() {
        let rot = Matrix3::about_z(std::f64::consts::FRAC_PI_2);
        let v = rot.apply(&Vec3::new(1.0, 0.0, 0.0));
        assert!(v.x.abs() < 1e-12 && (v.y - 1.0).abs() < 1e-12);
    }
}
