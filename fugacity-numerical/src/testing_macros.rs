/// Asserts that two floating point values agree within a given tolerance
#[macro_export]
macro_rules! assert_eq_float {
    ($lhs:expr, $rhs:expr, $tolerance:expr) => {
        assert!(
            ($lhs - $rhs).abs() < $tolerance,
            "{} and {} differ by more than {}",
            $lhs,
            $rhs,
            $tolerance
        );
    };
}

/// Asserts that two [`Vec3`](crate::Vec3) values agree component-wise within a tolerance
#[macro_export]
macro_rules! assert_eq_vec3 {
    ($lhs:expr, $rhs:expr, $tolerance:expr) => {
        $crate::assert_eq_float!($lhs.x, $rhs.x, $tolerance);
        $crate::assert_eq_float!($lhs.y, $rhs.y, $tolerance);
        $crate::assert_eq_float!($lhs.z, $rhs.z, $tolerance);
    };
}
