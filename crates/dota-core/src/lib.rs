//! Region abstraction, automaton model, letter-word abstraction, and
//! inclusion/equivalence engine for nondeterministic one-clock timed
//! automata.

pub mod automaton;
pub mod error;
pub mod inclusion;
pub mod interval;
pub mod letterword;
pub mod round;
pub mod word;

pub use automaton::{build_assistant, Automaton, Location, RunResult, Transition};
pub use error::{Error, Result};
pub use inclusion::{ota_equivalent, ota_inclusion, Inclusion};
pub use interval::{complement_intervals, intervals_partition, Interval, Region, UpperBound};
pub use letterword::{init_letterword, Letter, LetterWord, Side};
pub use round::round_div_2;
pub use word::TimedWord;
