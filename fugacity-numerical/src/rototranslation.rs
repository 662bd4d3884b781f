use crate::{Matrix3, Vec3};

/// A rotation about an arbitrary axis passing through a given point.
///
/// The transform moves a point `p` to `origin + R * (p - origin)`; it is the
/// workhorse of pivot, crankshaft and angle-type perturbations.
#[derive(Clone, Copy, Debug)]
pub struct Rototranslation {
    origin: Vec3,
    rotation: Matrix3,
}

impl Rototranslation {
    /// Creates a rotation by `angle` radians about the axis from `begin` to `end`
    pub fn around_axis(begin: &Vec3, end: &Vec3, angle: f64) -> Rototranslation {
        let axis = (*end - *begin).normalized();
        Rototranslation {
            origin: *begin,
            rotation: Matrix3::from_axis_angle(&axis, angle),
        }
    }

    /// Creates a rotation about an axis direction anchored at `origin`
    pub fn around_axis_vector(origin: &Vec3, axis: &Vec3, angle: f64) -> Rototranslation {
        Rototranslation {
            origin: *origin,
            rotation: Matrix3::from_axis_angle(&axis.normalized(), angle),
        }
    }

    pub fn origin(&self) -> &Vec3 {
        &self.origin
    }

    pub fn rotation(&self) -> &Matrix3 {
        &self.rotation
    }

    pub fn apply(&self, point: &Vec3) -> Vec3 {
        self.rotation.apply(&(*point - self.origin)) + self.origin
    }

    pub fn apply_mut(&self, point: &mut Vec3) {
        *point = self.apply(point);
    }

    /// Applies the inverse transform; `apply_inverse(apply(p)) == p`
    pub fn apply_inverse(&self, point: &Vec3) -> Vec3 {
        self.rotation.transposed().apply(&(*point - self.origin)) + self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::Rototranslation;
    use crate::Vec3;

    #[test]
    fn half_turn_about_a_diagonal_axis() {
        let begin = Vec3::new(1.0, 1.0, 1.0);
        let end = Vec3::new(5.0, 5.0, 5.0);
        let roto = Rototranslation::around_axis(&begin, &end, std::f64::consts::PI);
        let p = Vec3::new(1.0, 2.0, 3.0);
        let q = roto.apply(&p);
        // a point on the axis is invariant
        let on_axis = Vec3::new(2.0, 2.0, 2.0);
        let still = roto.apply(&on_axis);
        assert!(on_axis.distance(&still) < 1e-12);
        // the inverse restores the original point
        let back = roto.apply_inverse(&q);
        assert!(p.distance(&back) < 1e-12);
    }
}
