//! The potential-evaluation pipeline: pair, bonded and one-body models, the
//! visitor strategies that iterate site tuples, Ewald electrostatics, tail
//! corrections, and the [`System`] facade that caches per-move energies.

mod thermo_params;
mod pair_model;
mod one_body;
mod bonded_models;
mod ewald;
mod lrc;
mod energy_map;
mod visit_model;
mod bond_visitor;
mod potential;
mod system;

pub use thermo_params::*;
pub use pair_model::*;
pub use one_body::*;
pub use bonded_models::*;
pub use ewald::*;
pub use lrc::*;
pub use energy_map::*;
pub use visit_model::*;
pub use bond_visitor::*;
pub use potential::*;
pub use system::*;
