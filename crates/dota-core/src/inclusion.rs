//! BFS worklist engine for timed-language inclusion and equivalence between
//! two nondeterministic one-clock timed automata.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::automaton::Automaton;
use crate::letterword::{init_letterword, LetterWord};
use crate::word::TimedWord;

/// The result of an inclusion check: either `L(B) <= L(A)` holds, or it
/// fails with a timed word accepted by B but not by A.
#[derive(Debug, Clone)]
pub enum Inclusion {
    Holds,
    Fails(Vec<TimedWord>),
}

impl Inclusion {
    pub fn holds(&self) -> bool {
        matches!(self, Inclusion::Holds)
    }
}

fn explored_dominated(explored: &[Rc<LetterWord>], w: &LetterWord) -> bool {
    explored.iter().any(|v| v.can_dominate(w))
}

/// Determines whether `L(ota_b) <= L(ota_a)`.
///
/// Explores the letter-word graph breadth-first from the joint initial
/// configuration. A configuration where B accepts but A does not is an
/// immediate counterexample; a configuration dominated by one already
/// explored is pruned, since anything reachable from it is reachable (up to
/// domination) from the dominator too.
pub fn ota_inclusion(max_time_value: u32, ota_a: &Automaton, ota_b: &Automaton) -> Inclusion {
    let w0 = init_letterword(ota_a, ota_b);
    let mut to_explore: VecDeque<Rc<LetterWord>> = VecDeque::from([w0]);
    let mut explored: Vec<Rc<LetterWord>> = Vec::new();

    loop {
        let Some(mut w) = to_explore.pop_front() else {
            return Inclusion::Holds;
        };
        if w.is_bad(ota_a, ota_b) {
            return Inclusion::Fails(w.find_path());
        }

        while explored_dominated(&explored, &w) {
            let Some(next) = to_explore.pop_front() else {
                return Inclusion::Holds;
            };
            w = next;
            if w.is_bad(ota_a, ota_b) {
                return Inclusion::Fails(w.find_path());
            }
        }

        let wsucc = w.compute_wsucc(max_time_value, ota_a, ota_b);
        for nw in wsucc {
            if !to_explore.iter().any(|e| e.as_ref() == &nw) {
                to_explore.push_back(Rc::new(nw));
            }
        }
        if !explored.iter().any(|e| e.as_ref() == w.as_ref()) {
            explored.push(w);
        }
    }
}

/// Determines whether `L(ota_a) == L(ota_b)`, by checking inclusion in
/// both directions.
pub fn ota_equivalent(max_time_value: u32, ota_a: &Automaton, ota_b: &Automaton) -> Inclusion {
    match ota_inclusion(max_time_value, ota_a, ota_b) {
        Inclusion::Fails(ctx) => return Inclusion::Fails(ctx),
        Inclusion::Holds => {}
    }
    ota_inclusion(max_time_value, ota_b, ota_a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{Location, Transition};
    use crate::interval::Interval;

    fn single_guard_ota(name: &str, guard: Interval) -> Automaton {
        Automaton::new(
            name,
            vec!["a".to_string()],
            vec![Location::new("s1").init(), Location::new("s2").accept()],
            vec![Transition::new("s1", "a", guard, true, "s2")],
            "s1",
            vec!["s2".to_string()],
            None,
        )
    }

    #[test]
    fn identical_automata_are_equivalent() {
        let a = single_guard_ota("a", "[0,1)".parse().unwrap());
        let b = single_guard_ota("b", "[0,1)".parse().unwrap());
        assert!(ota_equivalent(4, &a, &b).holds());
    }

    #[test]
    fn wider_guard_is_not_included_in_narrower() {
        // B accepts on [0,2), A only on [0,1): L(B) is not <= L(A).
        let a = single_guard_ota("a", "[0,1)".parse().unwrap());
        let b = single_guard_ota("b", "[0,2)".parse().unwrap());
        match ota_inclusion(4, &a, &b) {
            Inclusion::Fails(ctx) => assert_eq!(ctx.len(), 1),
            Inclusion::Holds => panic!("expected inclusion to fail"),
        }
    }

    #[test]
    fn narrower_guard_is_included_in_wider() {
        let a = single_guard_ota("a", "[0,2)".parse().unwrap());
        let b = single_guard_ota("b", "[0,1)".parse().unwrap());
        assert!(ota_inclusion(4, &a, &b).holds());
    }
}
