//! One-clock Mealy machines (OCMM): the output-producing analogue of the
//! acceptor automata in `dota-core`, plus a region-abstraction engine for
//! checking two machines produce the same output on every timed input.

pub mod equivalence;
pub mod error;
pub mod learner;
pub mod model;

pub use equivalence::{test_equivalent, OcmmEquivalence};
pub use error::{Error, Result};
pub use learner::{build_candidate, find_reset, learn, EncodeOutcome, LearnerConfig, LearnerStats, ObservationTable, Row};
pub use model::{build_assistant, IoTimedWord, Ocmm, OcmmTransition, VOID};
