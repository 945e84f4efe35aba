//! One-clock Mealy machines: guarded transitions labelled with an output,
//! and the deterministic run semantics over timed input words.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;

use dota_core::{complement_intervals, Interval, Location, TimedWord};

/// A timed word over both an input and an output action, used when a
/// membership query needs to state the expected output alongside the time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IoTimedWord {
    pub input: String,
    pub output: String,
    pub time: Decimal,
}

impl IoTimedWord {
    pub fn new(input: impl Into<String>, output: impl Into<String>, time: Decimal) -> Self {
        IoTimedWord { input: input.into(), output: output.into(), time }
    }
}

impl fmt::Display for IoTimedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.input, self.output, self.time)
    }
}

/// A guarded transition in a one-clock Mealy machine: fires on `input`
/// while the clock lies in `constraint`, producing `output`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OcmmTransition {
    pub source: String,
    pub input: String,
    pub output: String,
    pub constraint: Interval,
    pub reset: bool,
    pub target: String,
}

impl OcmmTransition {
    pub fn new(
        source: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
        constraint: Interval,
        reset: bool,
        target: impl Into<String>,
    ) -> Self {
        OcmmTransition {
            source: source.into(),
            input: input.into(),
            output: output.into(),
            constraint,
            reset,
            target: target.into(),
        }
    }

    fn pass_input(&self, source: &str, input: &str, time: Decimal) -> Option<&str> {
        if self.source == source && self.input == input && self.constraint.contains_point(time) {
            Some(&self.output)
        } else {
            None
        }
    }
}

impl fmt::Display for OcmmTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.source, self.input, self.output, self.target, self.constraint, self.reset
        )
    }
}

/// The `void` output produced when every transition falls off the edge.
pub const VOID: &str = "void";

/// A deterministic one-clock Mealy machine.
///
/// `run_input_timed_word` memoizes its result per input word, the same way
/// [`dota_core::Automaton`] does: repeated queries during learning hit the
/// same prefixes over and over.
#[derive(Debug, Clone)]
pub struct Ocmm {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub locations: Vec<Location>,
    pub transitions: Vec<OcmmTransition>,
    pub init_state: String,
    pub sink_name: Option<String>,
    query_cache: RefCell<HashMap<Vec<TimedWord>, Vec<String>>>,
}

impl Ocmm {
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<String>,
        outputs: Vec<String>,
        locations: Vec<Location>,
        transitions: Vec<OcmmTransition>,
        init_state: impl Into<String>,
        sink_name: Option<String>,
    ) -> Self {
        Ocmm {
            name: name.into(),
            inputs,
            outputs,
            locations,
            transitions,
            init_state: init_state.into(),
            sink_name,
            query_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Runs `itws` (timed words over inputs only) and returns the output
    /// produced at each step; a step with no enabled transition emits
    /// [`VOID`] for that step and every step after it.
    pub fn run_input_timed_word(&self, itws: &[TimedWord]) -> Vec<String> {
        if let Some(cached) = self.query_cache.borrow().get(itws) {
            return cached.clone();
        }
        let mut outputs = Vec::with_capacity(itws.len());
        let mut cur_state = self.init_state.clone();
        let mut cur_time = Decimal::ZERO;
        for itw in itws {
            let elapsed = cur_time + itw.delay;
            let hit = self
                .transitions
                .iter()
                .find_map(|tran| tran.pass_input(&cur_state, &itw.action, elapsed).map(|out| (out.to_string(), tran)));
            match hit {
                Some((output, tran)) => {
                    outputs.push(output);
                    cur_state = tran.target.clone();
                    cur_time = if tran.reset { Decimal::ZERO } else { elapsed };
                }
                None => outputs.push(VOID.to_string()),
            }
        }
        self.query_cache.borrow_mut().insert(itws.to_vec(), outputs.clone());
        outputs
    }

    /// The number of distinct timed words asked of this machine so far.
    pub fn query_count(&self) -> usize {
        self.query_cache.borrow().len()
    }
}

impl fmt::Display for Ocmm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ocmm: {}", self.name)?;
        writeln!(f, "inputs: {:?}", self.inputs)?;
        writeln!(f, "outputs: {:?}", self.outputs)?;
        for l in &self.locations {
            writeln!(f, "location: {l}")?;
        }
        for t in &self.transitions {
            writeln!(f, "{t}")?;
        }
        writeln!(f, "init: {}", self.init_state)
    }
}

/// Completes `ocmm` with an explicit sink location: uncovered guards on
/// every location/input pair route to the sink on a resetting transition
/// with output [`VOID`], which self-loops on every input thereafter.
pub fn build_assistant(ocmm: &Ocmm) -> Ocmm {
    let sink_name = format!("{}_sink", ocmm.name);
    let mut new_trans = Vec::new();

    for loc in &ocmm.locations {
        for input in &ocmm.inputs {
            let guards: Vec<Interval> = ocmm
                .transitions
                .iter()
                .filter(|t| t.source == loc.name && &t.input == input)
                .map(|t| t.constraint)
                .collect();
            let uncovered = if guards.is_empty() {
                vec![Interval::unbounded()]
            } else {
                complement_intervals(&guards)
            };
            for guard in uncovered {
                new_trans.push(OcmmTransition::new(&loc.name, input.clone(), VOID, guard, true, &sink_name));
            }
        }
    }

    if new_trans.is_empty() {
        return Ocmm::new(
            ocmm.name.clone(),
            ocmm.inputs.clone(),
            ocmm.outputs.clone(),
            ocmm.locations.clone(),
            ocmm.transitions.clone(),
            ocmm.init_state.clone(),
            ocmm.sink_name.clone(),
        );
    }

    let mut locations = ocmm.locations.clone();
    locations.push(Location::new(sink_name.clone()).sink());

    let mut outputs = ocmm.outputs.clone();
    if !outputs.iter().any(|o| o == VOID) {
        outputs.push(VOID.to_string());
    }

    let mut transitions = ocmm.transitions.clone();
    transitions.append(&mut new_trans);
    for input in &ocmm.inputs {
        transitions.push(OcmmTransition::new(&sink_name, input.clone(), VOID, Interval::unbounded(), true, &sink_name));
    }

    Ocmm::new(
        format!("assist_{}", ocmm.name),
        ocmm.inputs.clone(),
        outputs,
        locations,
        transitions,
        ocmm.init_state.clone(),
        Some(sink_name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn sample_ocmm() -> Ocmm {
        Ocmm::new(
            "m",
            vec!["a".to_string()],
            vec!["x".to_string()],
            vec![Location::new("s1").init(), Location::new("s2")],
            vec![OcmmTransition::new("s1", "a", "x", "[0,1)".parse().unwrap(), true, "s2")],
            "s1",
            None,
        )
    }

    #[test]
    fn produces_output_within_guard() {
        let ocmm = sample_ocmm();
        let word = vec![TimedWord::new("a", dec("0.5"))];
        assert_eq!(ocmm.run_input_timed_word(&word), vec!["x".to_string()]);
    }

    #[test]
    fn falls_to_void_outside_guard() {
        let ocmm = sample_ocmm();
        let word = vec![TimedWord::new("a", dec("1"))];
        assert_eq!(ocmm.run_input_timed_word(&word), vec![VOID.to_string()]);
    }

    #[test]
    fn build_assistant_keeps_behavior_inside_the_guard() {
        let ocmm = sample_ocmm();
        let assist = build_assistant(&ocmm);
        let word = vec![TimedWord::new("a", dec("0.5"))];
        assert_eq!(assist.run_input_timed_word(&word), vec!["x".to_string()]);
        let word_outside = vec![TimedWord::new("a", dec("2"))];
        assert_eq!(assist.run_input_timed_word(&word_outside), vec![VOID.to_string()]);
    }
}
