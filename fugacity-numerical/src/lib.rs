//! Core numerical types used across the fugacity workspace.
//!
//! The crate provides the 3D vector and rotation machinery that the
//! configuration and Monte Carlo layers are built on, together with
//! the random-geometry helpers shared by perturbers and samplers.

mod vec3;
mod matrix;
mod euler;
mod rototranslation;
mod random_geometry;
mod testing_macros;

pub use vec3::*;
pub use matrix::*;
pub use euler::*;
pub use rototranslation::*;
pub use random_geometry::*;

/// Values closer than this to zero are treated as zero by geometric predicates.
pub const NEAR_ZERO: f64 = 1e-15;
