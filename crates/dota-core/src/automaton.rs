//! Nondeterministic one-clock timed automata: locations, guarded
//! transitions, and the three-valued timed-word run semantics.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;

use crate::interval::{complement_intervals, Interval};
use crate::word::TimedWord;

/// A location, identified by name, with its init/accept/sink flags baked in
/// so transitions and queries never need a side lookup table to classify it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub name: String,
    pub init: bool,
    pub accept: bool,
    pub sink: bool,
}

impl Location {
    pub fn new(name: impl Into<String>) -> Self {
        Location { name: name.into(), init: false, accept: false, sink: false }
    }

    pub fn init(mut self) -> Self {
        self.init = true;
        self
    }

    pub fn accept(mut self) -> Self {
        self.accept = true;
        self
    }

    pub fn sink(mut self) -> Self {
        self.sink = true;
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A guarded transition: fires on `action` when the elapsed clock value
/// lies in `guard`, optionally resetting the clock to zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transition {
    pub source: String,
    pub action: String,
    pub guard: Interval,
    pub reset: bool,
    pub target: String,
}

impl Transition {
    pub fn new(
        source: impl Into<String>,
        action: impl Into<String>,
        guard: Interval,
        reset: bool,
        target: impl Into<String>,
    ) -> Self {
        Transition {
            source: source.into(),
            action: action.into(),
            guard,
            reset,
            target: target.into(),
        }
    }

    fn is_pass(&self, source: &str, action: &str, elapsed: Decimal) -> bool {
        self.source == source && self.action == action && self.guard.contains_point(elapsed)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.source, self.action, self.target, self.guard, self.reset
        )
    }
}

/// The result of running a timed word against an automaton: the run either
/// reaches an accepting location, a non-accepting one, or falls off every
/// enabled transition (equivalently lands on the sink location).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    Accept,
    Reject,
    Sink,
}

/// A nondeterministic one-clock timed automaton.
///
/// `run_timed_word` memoizes its result per input word on the automaton
/// instance: repeated queries during learning and inclusion checking hit
/// the same prefixes over and over, and the automaton itself, not some
/// caller-managed table, is the natural owner of that cache.
#[derive(Debug, Clone)]
pub struct Automaton {
    pub name: String,
    pub alphabet: Vec<String>,
    pub locations: Vec<Location>,
    pub transitions: Vec<Transition>,
    pub init_location: String,
    pub accept_locations: Vec<String>,
    pub sink_name: Option<String>,
    query_cache: RefCell<HashMap<Vec<TimedWord>, RunResult>>,
}

impl Automaton {
    pub fn new(
        name: impl Into<String>,
        alphabet: Vec<String>,
        locations: Vec<Location>,
        transitions: Vec<Transition>,
        init_location: impl Into<String>,
        accept_locations: Vec<String>,
        sink_name: Option<String>,
    ) -> Self {
        Automaton {
            name: name.into(),
            alphabet,
            locations,
            transitions,
            init_location: init_location.into(),
            accept_locations,
            sink_name,
            query_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name == name)
    }

    pub fn is_accept(&self, location: &str) -> bool {
        self.accept_locations.iter().any(|l| l == location)
    }

    pub fn is_sink(&self, location: &str) -> bool {
        self.sink_name.as_deref() == Some(location)
    }

    /// The number of distinct timed words asked of this automaton so far,
    /// i.e. the number of genuine membership queries (repeats hit the
    /// cache and don't count again).
    pub fn query_count(&self) -> usize {
        self.query_cache.borrow().len()
    }

    /// Runs `tws` from the initial location, following the first enabled
    /// transition at each step (the automaton may be nondeterministic; this
    /// picks a single witness run, matching the deterministic candidates
    /// produced by the learner).
    pub fn run_timed_word(&self, tws: &[TimedWord]) -> RunResult {
        if let Some(cached) = self.query_cache.borrow().get(tws) {
            return *cached;
        }
        let mut cur_location = self.init_location.clone();
        let mut cur_time = Decimal::ZERO;
        let mut stuck = false;
        for tw in tws {
            let elapsed = cur_time + tw.delay;
            match self
                .transitions
                .iter()
                .find(|t| t.is_pass(&cur_location, &tw.action, elapsed))
            {
                Some(tran) => {
                    cur_location = tran.target.clone();
                    cur_time = if tran.reset { Decimal::ZERO } else { elapsed };
                }
                None => {
                    stuck = true;
                    break;
                }
            }
        }
        let result = if stuck || self.is_sink(&cur_location) {
            RunResult::Sink
        } else if self.is_accept(&cur_location) {
            RunResult::Accept
        } else {
            RunResult::Reject
        };
        self.query_cache.borrow_mut().insert(tws.to_vec(), result);
        result
    }
}

impl fmt::Display for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "automaton: {}", self.name)?;
        writeln!(f, "alphabet: {:?}", self.alphabet)?;
        for l in &self.locations {
            writeln!(f, "location: {l} (init={}, accept={}, sink={})", l.init, l.accept, l.sink)?;
        }
        for t in &self.transitions {
            writeln!(f, "{t}")?;
        }
        writeln!(f, "init: {}", self.init_location)?;
        writeln!(f, "accept: {:?}", self.accept_locations)
    }
}

/// Completes `ota` with an explicit sink location: for every location and
/// action, the complement of the already-covered guards routes to the sink
/// on a resetting transition, and the sink self-loops on every action with
/// the unbounded guard. Accepts `ota`'s own language unchanged.
pub fn build_assistant(ota: &Automaton) -> Automaton {
    let sink_name = format!("{}_sink", ota.name);
    let mut new_transitions = Vec::new();

    for loc in &ota.locations {
        for action in &ota.alphabet {
            let guards: Vec<Interval> = ota
                .transitions
                .iter()
                .filter(|t| t.source == loc.name && &t.action == action)
                .map(|t| t.guard)
                .collect();
            let uncovered = if guards.is_empty() {
                vec![Interval::unbounded()]
            } else {
                complement_intervals(&guards)
            };
            for guard in uncovered {
                new_transitions.push(Transition::new(&loc.name, action.clone(), guard, true, &sink_name));
            }
        }
    }

    if new_transitions.is_empty() {
        return Automaton::new(
            ota.name.clone(),
            ota.alphabet.clone(),
            ota.locations.clone(),
            ota.transitions.clone(),
            ota.init_location.clone(),
            ota.accept_locations.clone(),
            ota.sink_name.clone(),
        );
    }

    let mut locations = ota.locations.clone();
    locations.push(Location::new(sink_name.clone()).sink());

    let mut transitions = ota.transitions.clone();
    transitions.append(&mut new_transitions);
    for action in &ota.alphabet {
        transitions.push(Transition::new(&sink_name, action.clone(), Interval::unbounded(), true, &sink_name));
    }

    Automaton::new(
        format!("assist_{}", ota.name),
        ota.alphabet.clone(),
        locations,
        transitions,
        ota.init_location.clone(),
        ota.accept_locations.clone(),
        Some(sink_name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn sample_ota() -> Automaton {
        // s1 --a, [0,1), reset--> s2 (accept); everything else falls off the edge.
        Automaton::new(
            "a",
            vec!["a".to_string()],
            vec![Location::new("s1").init(), Location::new("s2").accept()],
            vec![Transition::new("s1", "a", "[0,1)".parse().unwrap(), true, "s2")],
            "s1",
            vec!["s2".to_string()],
            None,
        )
    }

    #[test]
    fn accepts_within_guard() {
        let ota = sample_ota();
        let word = vec![TimedWord::new("a", dec("0.5"))];
        assert_eq!(ota.run_timed_word(&word), RunResult::Accept);
    }

    #[test]
    fn falls_to_sink_outside_guard() {
        let ota = sample_ota();
        let word = vec![TimedWord::new("a", dec("1"))];
        assert_eq!(ota.run_timed_word(&word), RunResult::Sink);
    }

    #[test]
    fn query_cache_is_consistent_on_repeat() {
        let ota = sample_ota();
        let word = vec![TimedWord::new("a", dec("0.5"))];
        assert_eq!(ota.run_timed_word(&word), ota.run_timed_word(&word));
    }

    #[test]
    fn build_assistant_preserves_acceptance() {
        let ota = sample_ota();
        let assist = build_assistant(&ota);
        for (action, delay) in [("a", "0.5"), ("a", "1"), ("a", "2")] {
            let word = vec![TimedWord::new(action, dec(delay))];
            let orig = ota.run_timed_word(&word);
            let completed = assist.run_timed_word(&word);
            match orig {
                RunResult::Accept => assert_eq!(completed, RunResult::Accept),
                RunResult::Reject | RunResult::Sink => assert_eq!(completed, RunResult::Sink),
            }
        }
    }
}
