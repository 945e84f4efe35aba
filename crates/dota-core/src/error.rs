use thiserror::Error;

/// Errors produced by the region algebra, automaton model, and inclusion engine.
///
/// `Parse` and `Precondition` are the only variants a caller can hit through
/// normal use; both are fatal, see the crate-level docs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("could not parse interval from \"{0}\"")]
    Parse(String),
    #[error("precondition violated: {0}")]
    Precondition(String),
}

pub type Result<T> = std::result::Result<T, Error>;
