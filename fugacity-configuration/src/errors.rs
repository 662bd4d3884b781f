use thiserror::Error;

use fugacity_io::ParsingError;

/// Errors raised while building or mutating a configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    Parsing(#[from] ParsingError),
    #[error("{fname}: unknown section `{section}`")]
    UnknownSection { fname: String, section: String },
    #[error("{fname}: section `{section}` expects {expected} entries, found {found}")]
    SectionCount { fname: String, section: String, expected: usize, found: usize },
    #[error("unknown particle type index: {0}")]
    UnknownParticleType(usize),
    #[error("unknown group: {0}")]
    UnknownGroup(String),
    #[error("domain side lengths must be positive: {0}")]
    BadDomain(String),
    #[error("cell list needs at least 3 cells per dimension; {side} / {min_edge} admits {cells}")]
    TooFewCells { side: f64, min_edge: f64, cells: usize },
    #[error("{0}")]
    Input(String),
}
