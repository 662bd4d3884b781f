//! I/O utilities shared by the fugacity crates: stream-or-file writers,
//! transparently decompressed readers and small parsing helpers.

mod utils;

pub use utils::*;
