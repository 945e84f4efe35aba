use thiserror::Error;

use dota_core::Error as CoreError;

use crate::model::Ocmm;

/// Errors produced while building, running, or learning a one-clock Mealy
/// machine.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("learning stopped: no reset guess is satisfiable with {state_num} state(s) in S ({debug_dump})")]
    UnsatisfiableTable { state_num: usize, debug_dump: String },

    #[error("learning stopped: exceeded the {steps}-step query budget")]
    BudgetExceeded { steps: usize, candidate: Option<Ocmm> },
}

pub type Result<T> = std::result::Result<T, Error>;
