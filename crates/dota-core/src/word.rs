//! Timed words: finite sequences of `(action, delay)` pairs.

use std::fmt;

use rust_decimal::Decimal;

/// A single `(action, delay)` step of a timed word.
///
/// `delay` is the amount of time elapsed since the previous step (or since
/// the start of the run, for the first step), never negative.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimedWord {
    pub action: String,
    pub delay: Decimal,
}

impl TimedWord {
    pub fn new(action: impl Into<String>, delay: Decimal) -> Self {
        TimedWord {
            action: action.into(),
            delay,
        }
    }
}

impl fmt::Display for TimedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.action, self.delay)
    }
}

/// Convenience alias: most of the crate passes timed words around as an
/// owned, cloneable sequence rather than a borrowed slice, since rows and
/// counterexamples need to extend and prepend to them freely.
pub type TimedWordSeq = Vec<TimedWord>;

/// Renders a sequence of timed words the way the teacher's `OTA.__str__`
/// prints a transition: comma-separated `(action,delay)` pairs.
pub fn display_seq(tws: &[TimedWord]) -> String {
    tws.iter()
        .map(|tw| tw.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
