//! The letter-word abstraction used by the inclusion engine: a symbolic
//! configuration of both automata being compared, closed under delay and
//! tracked up to region equivalence rather than exact clock value.

use std::collections::BTreeSet;
use std::rc::Rc;

use rust_decimal::Decimal;

use crate::automaton::Automaton;
use crate::interval::Interval;
use crate::round::round_div_2;
use crate::word::TimedWord;

/// Which of the two automata being compared a [`Letter`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    A,
    B,
}

impl Side {
    fn label(self) -> char {
        match self {
            Side::A => 'A',
            Side::B => 'B',
        }
    }
}

/// One component of a letter-word: a location on one side, tagged with the
/// region its clock currently occupies.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Letter {
    pub side: Side,
    pub location: String,
    pub region: Interval,
}

impl Letter {
    pub fn new(side: Side, location: impl Into<String>, region: Interval) -> Self {
        Letter { side, location: location.into(), region }
    }

    fn zero(side: Side, location: impl Into<String>) -> Self {
        Letter::new(side, location, Interval::point(0))
    }
}

impl std::fmt::Display for Letter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{},{}", self.side.label(), self.location, self.region)
    }
}

/// How a letter-word was reached from its predecessor.
///
/// A `Delay` node's `pre` always points to the configuration *before any
/// delay* (not to the previous delay step), with the Decimal holding the
/// *cumulative* elapsed time — this lets [`LetterWord::find_path`] walk the
/// history two hops at a time (action, then total delay) regardless of how
/// many region crossings the delay took internally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    Root,
    Delay(Decimal),
    Action(String),
}

/// A symbolic configuration: an ordered list of letter sets (later sets
/// hold strictly larger fractional clock values than earlier ones) plus the
/// fractional time offset recorded for each set.
///
/// Restricted to exactly two automata being compared, so across all sets
/// there are always exactly two letters total (one per side), split into
/// one or two sets depending on whether the two clocks currently share a
/// fractional part.
#[derive(Debug, Clone)]
pub struct LetterWord {
    pub sets: Vec<BTreeSet<Letter>>,
    pub frac_times: Vec<Decimal>,
    pub pre: Option<Rc<LetterWord>>,
    pub provenance: Provenance,
}

impl PartialEq for LetterWord {
    fn eq(&self, other: &Self) -> bool {
        self.sets == other.sets && self.frac_times == other.frac_times
    }
}
impl Eq for LetterWord {}

impl std::hash::Hash for LetterWord {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for set in &self.sets {
            for letter in set {
                letter.hash(state);
            }
            0u8.hash(state); // set separator
        }
        for t in &self.frac_times {
            t.hash(state);
        }
    }
}

fn assert_letterword_shape(sets: &[BTreeSet<Letter>]) {
    debug_assert!(sets.len() <= 2, "letter-word has more than 2 sets: {sets:?}");
    debug_assert_eq!(
        sets.iter().map(|s| s.len()).sum::<usize>(),
        2,
        "letter-word does not have exactly 2 letters total: {sets:?}"
    );
}

fn is_all_inf(sets: &[BTreeSet<Letter>]) -> bool {
    sets.iter().all(|set| set.iter().all(|l| l.region.is_inf_region()))
}

/// Delays for the minimal amount that changes the configuration: either the
/// first set crosses from its point region into its fractional successor,
/// or the last set's fractional clock reaches the next integer and rotates
/// to the front.
fn delay_one_step(
    sets: &[BTreeSet<Letter>],
    frac_times: &[Decimal],
    max_time_value: u32,
) -> (Vec<BTreeSet<Letter>>, Vec<Decimal>, Decimal) {
    let first_is_point = sets[0].iter().any(|l| l.region.is_point_region());
    if first_is_point {
        debug_assert_eq!(frac_times[0], Decimal::ZERO, "delay_one: inconsistent frac_times");
        let increment = round_div_2(Decimal::ONE - frac_times[frac_times.len() - 1]);
        let new_frac_times: Vec<Decimal> = frac_times.iter().map(|v| v + increment).collect();

        let new_first: BTreeSet<Letter> = sets[0]
            .iter()
            .map(|l| Letter::new(l.side, l.location.clone(), l.region.next_region(max_time_value)))
            .collect();

        let mut new_sets = vec![new_first];
        new_sets.extend(sets[1..].iter().cloned());
        (new_sets, new_frac_times, increment)
    } else {
        let increment = Decimal::ONE - frac_times[frac_times.len() - 1];
        let mut new_frac_times = vec![Decimal::ZERO];
        for v in &frac_times[..frac_times.len() - 1] {
            new_frac_times.push(*v + increment);
        }

        let new_first: BTreeSet<Letter> = sets[sets.len() - 1]
            .iter()
            .map(|l| Letter::new(l.side, l.location.clone(), l.region.next_region(max_time_value)))
            .collect();

        let mut new_sets = vec![new_first];
        new_sets.extend(sets[..sets.len() - 1].iter().cloned());
        (new_sets, new_frac_times, increment)
    }
}

impl LetterWord {
    pub fn new(sets: Vec<BTreeSet<Letter>>, frac_times: Vec<Decimal>) -> Self {
        assert_letterword_shape(&sets);
        LetterWord { sets, frac_times, pre: None, provenance: Provenance::Root }
    }

    pub fn is_all_inf(&self) -> bool {
        is_all_inf(&self.sets)
    }

    /// The sequence of configurations reachable from `self` by pure delay,
    /// from `self` itself (delay `0`) up to and including the first
    /// all-infinite-region configuration.
    ///
    /// Every entry's `pre` points directly back to `self`, with the
    /// provenance holding the *total* elapsed delay, not the delay of the
    /// last region crossing — see [`Provenance`].
    pub fn delay_seq(self: &Rc<Self>, max_time_value: u32) -> Vec<Rc<LetterWord>> {
        let mut results = vec![Rc::new(LetterWord {
            sets: self.sets.clone(),
            frac_times: self.frac_times.clone(),
            pre: Some(Rc::clone(self)),
            provenance: Provenance::Delay(Decimal::ZERO),
        })];

        let mut cur_sets = self.sets.clone();
        let mut cur_frac_times = self.frac_times.clone();
        let mut cumulative = Decimal::ZERO;
        while !is_all_inf(&cur_sets) {
            let (next_sets, next_frac_times, step) = delay_one_step(&cur_sets, &cur_frac_times, max_time_value);
            cumulative += step;
            results.push(Rc::new(LetterWord {
                sets: next_sets.clone(),
                frac_times: next_frac_times.clone(),
                pre: Some(Rc::clone(self)),
                provenance: Provenance::Delay(cumulative),
            }));
            cur_sets = next_sets;
            cur_frac_times = next_frac_times;
        }
        results
    }

    /// Whether `self` dominates `other` (`other <= self`): every set of
    /// `self`, in order, is a subset of some later-or-equal set of `other`.
    pub fn can_dominate(&self, other: &LetterWord) -> bool {
        let mut id2 = 0;
        let mut matched = 0;
        for set in &self.sets {
            for (i, other_set) in other.sets.iter().enumerate().skip(id2) {
                if set.is_subset(other_set) {
                    id2 = i + 1;
                    matched += 1;
                    break;
                }
            }
        }
        matched == self.sets.len()
    }

    /// Whether B accepts at this configuration while A does not — a
    /// witness that `L(B) <= L(A)` fails.
    pub fn is_bad(&self, ota_a: &Automaton, ota_b: &Automaton) -> bool {
        let mut a_accept = false;
        let mut b_accept = false;
        for set in &self.sets {
            for letter in set {
                match letter.side {
                    Side::A if ota_a.is_accept(&letter.location) => a_accept = true,
                    Side::B if ota_b.is_accept(&letter.location) => b_accept = true,
                    _ => {}
                }
            }
        }
        b_accept && !a_accept
    }

    /// All configurations reachable by firing `action` immediately (no
    /// further delay) from every letter in `self`.
    pub fn immediate_asucc(self: &Rc<Self>, ota_a: &Automaton, ota_b: &Automaton) -> Vec<LetterWord> {
        let mut all_res = Vec::new();

        for action in &ota_a.alphabet {
            let mut a_reset: Vec<Letter> = Vec::new();
            let mut b_reset: Vec<Letter> = Vec::new();
            let mut a_noreset: Vec<Vec<Letter>> = vec![Vec::new(); self.sets.len()];
            let mut b_noreset: Vec<Vec<Letter>> = vec![Vec::new(); self.sets.len()];

            for (i, set) in self.sets.iter().enumerate() {
                for letter in set {
                    match letter.side {
                        Side::A => {
                            for tran in ota_a.transitions.iter().filter(|t| t.source == letter.location && &t.action == action) {
                                if tran.guard.contains_interval(&letter.region) {
                                    if tran.reset {
                                        a_reset.push(Letter::zero(Side::A, tran.target.clone()));
                                    } else {
                                        a_noreset[i].push(Letter::new(Side::A, tran.target.clone(), letter.region));
                                    }
                                }
                            }
                        }
                        Side::B => {
                            for tran in ota_b.transitions.iter().filter(|t| t.source == letter.location && &t.action == action) {
                                if tran.guard.contains_interval(&letter.region) {
                                    if tran.reset {
                                        b_reset.push(Letter::zero(Side::B, tran.target.clone()));
                                    } else {
                                        b_noreset[i].push(Letter::new(Side::B, tran.target.clone(), letter.region));
                                    }
                                }
                            }
                        }
                    }
                }
            }

            for b in &b_reset {
                let reset_list: Vec<Letter> = a_reset.iter().cloned().chain(std::iter::once(b.clone())).collect();
                let (sets, frac_times) = self.make_lst(&reset_list, &a_noreset);
                all_res.push(LetterWord::child(sets, frac_times, Rc::clone(self), Provenance::Action(action.clone())));
            }

            for (i, b_noresets) in b_noreset.iter().enumerate() {
                for b in b_noresets {
                    let mut noreset_list = a_noreset.clone();
                    noreset_list[i].push(b.clone());
                    let (sets, frac_times) = self.make_lst(&a_reset, &noreset_list);
                    all_res.push(LetterWord::child(sets, frac_times, Rc::clone(self), Provenance::Action(action.clone())));
                }
            }
        }

        all_res
    }

    fn child(sets: Vec<BTreeSet<Letter>>, frac_times: Vec<Decimal>, pre: Rc<LetterWord>, provenance: Provenance) -> Self {
        assert_letterword_shape(&sets);
        LetterWord { sets, frac_times, pre: Some(pre), provenance }
    }

    /// Assembles a new letter-word from the reset letters (all at region
    /// `[0,0]`) and the per-set non-reset letters, folding the reset set
    /// into set 0 when it already holds a point region.
    fn make_lst(&self, reset_list: &[Letter], noreset_list: &[Vec<Letter>]) -> (Vec<BTreeSet<Letter>>, Vec<Decimal>) {
        let mut new_sets = Vec::new();
        let mut new_frac_times = Vec::new();

        if !reset_list.is_empty() {
            let has_point_region = noreset_list[0].iter().any(|l| l.region.is_point_region());

            let mut first_set: BTreeSet<Letter> = reset_list.iter().cloned().collect();
            if has_point_region {
                first_set.extend(noreset_list[0].iter().cloned());
                new_sets.push(first_set);
                new_frac_times.push(Decimal::ZERO);
            } else {
                new_sets.push(first_set);
                new_frac_times.push(Decimal::ZERO);
                if !noreset_list[0].is_empty() {
                    new_sets.push(noreset_list[0].iter().cloned().collect());
                    new_frac_times.push(self.frac_times[0]);
                }
            }

            for i in 1..self.sets.len() {
                if !noreset_list[i].is_empty() {
                    new_sets.push(noreset_list[i].iter().cloned().collect());
                    new_frac_times.push(self.frac_times[i]);
                }
            }
        } else {
            for i in 0..self.sets.len() {
                if !noreset_list[i].is_empty() {
                    new_sets.push(noreset_list[i].iter().cloned().collect());
                    new_frac_times.push(self.frac_times[i]);
                }
            }
        }

        (new_sets, new_frac_times)
    }

    /// All configurations reachable by some delay followed by one action.
    pub fn compute_wsucc(self: &Rc<Self>, max_time_value: u32, ota_a: &Automaton, ota_b: &Automaton) -> Vec<LetterWord> {
        let mut results: Vec<LetterWord> = Vec::new();
        for delay in self.delay_seq(max_time_value) {
            for asucc in delay.immediate_asucc(ota_a, ota_b) {
                if !results.contains(&asucc) {
                    results.push(asucc);
                }
            }
        }
        results
    }

    /// Reconstructs the timed word that reaches `self` from the initial
    /// letter-word, by walking `pre` links back two hops at a time: an
    /// action step, then the delay step (holding cumulative elapsed time)
    /// that preceded it.
    pub fn find_path(self: &Rc<Self>) -> Vec<TimedWord> {
        let mut tws = Vec::new();
        let mut current = Rc::clone(self);
        loop {
            let action = match &current.provenance {
                Provenance::Action(action) => action.clone(),
                Provenance::Root => break,
                Provenance::Delay(_) => unreachable!("find_path: expected an action step"),
            };
            let delay_node = current.pre.clone().expect("find_path: action step has no predecessor");
            let delay = match &delay_node.provenance {
                Provenance::Delay(d) => *d,
                Provenance::Root => Decimal::ZERO,
                Provenance::Action(_) => unreachable!("find_path: expected a delay step"),
            };
            tws.push(TimedWord::new(action, delay));
            current = delay_node.pre.clone().expect("find_path: delay step has no predecessor");
        }
        tws.reverse();
        tws
    }
}

/// The initial letter-word for determining `L(B) <= L(A)`: both automata at
/// their initial locations, clocks both at zero.
pub fn init_letterword(ota_a: &Automaton, ota_b: &Automaton) -> Rc<LetterWord> {
    let set: BTreeSet<Letter> = [
        Letter::zero(Side::A, ota_a.init_location.clone()),
        Letter::zero(Side::B, ota_b.init_location.clone()),
    ]
    .into_iter()
    .collect();
    Rc::new(LetterWord::new(vec![set], vec![Decimal::ZERO]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{Automaton, Location, Transition};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn delay_seq_length_matches_worked_example() {
        let lw = Rc::new(LetterWord::new(
            vec![
                [Letter::new(Side::A, "s1", Interval::point(0))].into_iter().collect(),
                [Letter::new(Side::B, "q1", Interval::frac(0))].into_iter().collect(),
            ],
            vec![dec("0"), dec("0")],
        ));
        assert_eq!(lw.delay_seq(4).len(), 17);
    }

    #[test]
    fn can_dominate_identical_is_true() {
        let ota_a = Automaton::new("a", vec!["a".into()], vec![Location::new("s1").init()], vec![], "s1", vec![], None);
        let ota_b = Automaton::new("b", vec!["a".into()], vec![Location::new("q1").init()], vec![], "q1", vec![], None);
        let init = init_letterword(&ota_a, &ota_b);
        assert!(init.can_dominate(&init));
    }

    #[test]
    fn immediate_asucc_follows_matching_transitions() {
        let ota_a = Automaton::new(
            "a",
            vec!["a".into()],
            vec![Location::new("s1").init(), Location::new("s2").accept()],
            vec![Transition::new("s1", "a", Interval::unbounded(), true, "s2")],
            "s1",
            vec!["s2".into()],
            None,
        );
        let ota_b = Automaton::new(
            "b",
            vec!["a".into()],
            vec![Location::new("q1").init(), Location::new("q2").accept()],
            vec![Transition::new("q1", "a", Interval::unbounded(), true, "q2")],
            "q1",
            vec!["q2".into()],
            None,
        );
        let init = init_letterword(&ota_a, &ota_b);
        let succs = init.immediate_asucc(&ota_a, &ota_b);
        assert_eq!(succs.len(), 1);
        assert!(succs[0].is_bad(&ota_a, &ota_b) == false);
    }
}
