use thiserror::Error;

use dota_core::{Automaton, Error as CoreError};

/// Errors produced by the observation-table learner.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("membership- or equivalence-query budget exhausted after {steps} step(s)")]
    BudgetExceeded { steps: usize, candidate: Option<Automaton> },

    #[error("solver reports UNSAT with state_num = {state_num}, which already covers every non-sink row: {debug_dump}")]
    UnsatisfiableTable { state_num: usize, debug_dump: String },
}

pub type Result<T> = std::result::Result<T, Error>;
