//! The configuration layer of the fugacity engine: sites and particles, the
//! periodic (possibly triclinic) domain, cell lists, per-site-type model
//! parameters with mixing rules, and the file formats that feed them.

mod site;
mod particle;
mod select;
mod group;
mod domain;
mod cell_list;
mod model_params;
mod configuration;
mod file_lmp;
mod file_xyz;
mod errors;

pub use site::*;
pub use particle::*;
pub use select::*;
pub use group::*;
pub use domain::*;
pub use cell_list::*;
pub use model_params::*;
pub use configuration::*;
pub use file_lmp::*;
pub use file_xyz::*;
pub use errors::*;
