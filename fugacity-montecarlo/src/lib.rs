//! The trial-move framework and driver loop: selectors pick a subset of
//! sites, perturbers propose new coordinates, computes assemble the
//! Metropolis log-ratio (with configurational-bias staging), a criterion
//! decides, and steppers act every so many trials.

mod acceptance;
mod tunable;
mod criterion;
mod trial_select;
mod perturb;
mod trial_stage;
mod trial_compute;
mod trial;
mod trial_factory;
mod trials;
mod stepper;
mod analyzers;
mod modifiers;
mod monte_carlo;
mod run;

pub use acceptance::*;
pub use tunable::*;
pub use criterion::*;
pub use trial_select::*;
pub use perturb::*;
pub use trial_stage::*;
pub use trial_compute::*;
pub use trial::*;
pub use trial_factory::*;
pub use trials::*;
pub use stepper::*;
pub use analyzers::*;
pub use modifiers::*;
pub use monte_carlo::*;
pub use run::*;
