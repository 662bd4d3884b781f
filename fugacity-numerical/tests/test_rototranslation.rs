use fugacity_numerical::{assert_eq_float, assert_eq_vec3, Euler, Matrix3, Rototranslation, Vec3};

#[test]
fn rotation_about_a_body_diagonal() {
    let begin = Vec3::new(1.0, 1.0, 1.0);
    let end = Vec3::new(5.0, 5.0, 5.0);
    let angle = std::f64::consts::PI;
    let roto = Rototranslation::around_axis(&begin, &end, angle);

    // a half turn about the diagonal swaps coordinates symmetric about it
    let p = Vec3::new(1.0, 2.0, 3.0);
    let q = roto.apply(&p);
    let back = roto.apply(&q);
    assert_eq_vec3!(p, back, 1e-12);

    // distances to the axis are preserved
    let axis_point = Vec3::new(2.0, 2.0, 2.0);
    assert_eq_float!(p.distance(&axis_point), q.distance(&axis_point), 1e-12);
}

#[test]
fn euler_matrices_compose_like_rotations() {
    let e1 = Euler::new(0.4, 0.9, -1.3);
    let e2 = Euler::new(-2.0, 0.3, 0.7);
    let combined = e1.rotation_matrix() * e2.rotation_matrix();
    let v = Vec3::new(0.1, -0.2, 0.3);
    let direct = combined.apply(&v);
    let stepwise = e1.rotation_matrix().apply(&e2.rotation_matrix().apply(&v));
    assert_eq_vec3!(direct, stepwise, 1e-12);
}

#[test]
fn axis_angle_inverse_is_the_transpose() {
    let axis = Vec3::new(0.3, -0.5, 0.8).normalized();
    let rot = Matrix3::from_axis_angle(&axis, 0.77);
    let v = Vec3::new(1.0, 2.0, 3.0);
    let back = rot.transposed().apply(&rot.apply(&v));
    assert_eq_vec3!(v, back, 1e-12);
}
