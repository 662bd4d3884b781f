//! The fugacity engine's user-facing surface: the directive interpreter that
//! drives a simulation from a text script, and the checkpoint glue.
//!
//! The member crates carry the actual machinery:
//! geometry and particles in `fugacity-configuration`, potentials and the
//! system facade in `fugacity-system`, the trial loop in
//! `fugacity-montecarlo`, and the flat-histogram layer in
//! `fugacity-flathist`.

mod arguments;
mod checkpoint;
mod directives;

pub use arguments::*;
pub use checkpoint::*;
pub use directives::*;
