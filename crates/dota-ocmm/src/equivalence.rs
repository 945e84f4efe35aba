//! Output-equivalence checking between two deterministic one-clock Mealy
//! machines: a region-abstraction BFS akin to [`dota_core::ota_inclusion`],
//! but comparing produced outputs at every step instead of acceptance.

use std::collections::VecDeque;
use std::rc::Rc;

use rust_decimal::Decimal;

use dota_core::{round_div_2, Interval, TimedWord};

use crate::model::Ocmm;

/// A region is encoded the way the reference engine does: `2n` is the point
/// region `[n,n]`, `2n+1` is `(n,n+1)`, and `2*max_value+1` is the final
/// unbounded region `(max_value, +inf)`.
fn region_interval(code: u32, max_value: u32) -> Interval {
    if code == 2 * max_value + 1 {
        Interval::inf(max_value)
    } else if code % 2 == 0 {
        Interval::point(code / 2)
    } else {
        Interval::frac(code / 2)
    }
}

fn is_inf(code: u32, max_value: u32) -> bool {
    code == 2 * max_value + 1
}

fn is_point(code: u32) -> bool {
    code % 2 == 0
}

#[derive(Debug, Clone)]
enum Provenance {
    Root,
    Delay(Decimal),
    Action(String),
}

/// A joint configuration of both machines: a location and region on each
/// side, the most recent output each side produced, and which of the two
/// sides currently has the smaller fractional part (tracked as an ordering
/// rather than the literal fraction, matching the reference engine's
/// region-only bookkeeping).
#[derive(Debug, Clone)]
pub struct Configuration {
    loc_a: String,
    region_a: u32,
    output_a: Option<String>,
    loc_b: String,
    region_b: u32,
    output_b: Option<String>,
    frac_a: Decimal,
    frac_b: Decimal,
    pre: Option<Rc<Configuration>>,
    provenance: Provenance,
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.loc_a == other.loc_a
            && self.region_a == other.region_a
            && self.loc_b == other.loc_b
            && self.region_b == other.region_b
            && self.output_a == other.output_a
            && self.output_b == other.output_b
            && frac_order(self.frac_a, self.frac_b) == frac_order(other.frac_a, other.frac_b)
    }
}
impl Eq for Configuration {}

impl std::hash::Hash for Configuration {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.loc_a.hash(state);
        self.region_a.hash(state);
        self.loc_b.hash(state);
        self.region_b.hash(state);
        self.output_a.hash(state);
        self.output_b.hash(state);
        frac_order(self.frac_a, self.frac_b).hash(state);
    }
}

#[derive(PartialEq, Eq, Hash, Clone, Copy)]
enum FracOrder {
    Less,
    Equal,
    Greater,
}

fn frac_order(a: Decimal, b: Decimal) -> FracOrder {
    match a.cmp(&b) {
        std::cmp::Ordering::Less => FracOrder::Less,
        std::cmp::Ordering::Equal => FracOrder::Equal,
        std::cmp::Ordering::Greater => FracOrder::Greater,
    }
}

fn init_config(ocmm_a: &Ocmm, ocmm_b: &Ocmm) -> Rc<Configuration> {
    Rc::new(Configuration {
        loc_a: ocmm_a.init_state.clone(),
        region_a: 0,
        output_a: None,
        loc_b: ocmm_b.init_state.clone(),
        region_b: 0,
        output_b: None,
        frac_a: Decimal::ZERO,
        frac_b: Decimal::ZERO,
        pre: None,
        provenance: Provenance::Root,
    })
}

/// The minimal-delay successor of `c`, and the time increment it took.
fn delay_one(c: &Configuration, max_value: u32) -> (Configuration, Decimal) {
    let half = Decimal::new(5, 1);
    let one = Decimal::ONE;
    let a_inf = is_inf(c.region_a, max_value);
    let b_inf = is_inf(c.region_b, max_value);
    let a_point = is_point(c.region_a);
    let b_point = is_point(c.region_b);

    let base = |region_a, frac_a, region_b, frac_b| Configuration {
        loc_a: c.loc_a.clone(),
        region_a,
        output_a: c.output_a.clone(),
        loc_b: c.loc_b.clone(),
        region_b,
        output_b: c.output_b.clone(),
        frac_a,
        frac_b,
        pre: None,
        provenance: Provenance::Root,
    };

    if a_inf {
        if b_point {
            (base(c.region_a, Decimal::ZERO, c.region_b + 1, half), half)
        } else {
            let inc = one - c.frac_b;
            (base(c.region_a, Decimal::ZERO, c.region_b + 1, Decimal::ZERO), inc)
        }
    } else if b_inf {
        if a_point {
            (base(c.region_a + 1, half, c.region_b, Decimal::ZERO), half)
        } else {
            let inc = one - c.frac_a;
            (base(c.region_a + 1, Decimal::ZERO, c.region_b, Decimal::ZERO), inc)
        }
    } else if a_point && b_point {
        (base(c.region_a + 1, half, c.region_b + 1, half), half)
    } else if a_point {
        // B is a fraction region.
        let inc = round_div_2(one - c.frac_b);
        (base(c.region_a + 1, inc, c.region_b, c.frac_b + inc), inc)
    } else if b_point {
        // A is a fraction region.
        let inc = round_div_2(one - c.frac_a);
        (base(c.region_a, c.frac_a + inc, c.region_b + 1, inc), inc)
    } else if c.frac_a == c.frac_b {
        let inc = one - c.frac_a;
        (base(c.region_a + 1, Decimal::ZERO, c.region_b + 1, Decimal::ZERO), inc)
    } else if c.frac_a < c.frac_b {
        let inc = one - c.frac_b;
        (base(c.region_a, c.frac_a + inc, c.region_b + 1, Decimal::ZERO), inc)
    } else {
        let inc = one - c.frac_a;
        (base(c.region_a + 1, Decimal::ZERO, c.region_b, c.frac_b + inc), inc)
    }
}

/// Every configuration reachable from `c` by letting time elapse, up to
/// (and including) the point where both sides sit in their final
/// unbounded region.
fn delay_seq(c: &Rc<Configuration>, max_value: u32) -> Vec<Rc<Configuration>> {
    let mut results = vec![Rc::new(Configuration {
        pre: Some(Rc::clone(c)),
        provenance: Provenance::Delay(Decimal::ZERO),
        ..(**c).clone()
    })];
    let mut cur = (**c).clone();
    let mut inc_total = Decimal::ZERO;
    while !(is_inf(cur.region_a, max_value) && is_inf(cur.region_b, max_value)) {
        let (next, inc) = delay_one(&cur, max_value);
        inc_total += inc;
        cur = next;
        results.push(Rc::new(Configuration {
            pre: Some(Rc::clone(c)),
            provenance: Provenance::Delay(inc_total),
            ..cur.clone()
        }));
    }
    results
}

fn is_bad(c: &Configuration) -> bool {
    c.output_a != c.output_b
}

fn immediate_asucc(c: &Rc<Configuration>, input: &str, ocmm_a: &Ocmm, ocmm_b: &Ocmm, max_value: u32) -> Configuration {
    let a_region = region_interval(c.region_a, max_value);
    let b_region = region_interval(c.region_b, max_value);

    let a_tran = ocmm_a
        .transitions
        .iter()
        .find(|t| t.source == c.loc_a && t.input == input && t.constraint.contains_interval(&a_region))
        .expect("immediate_asucc: no enabled transition on the A side");
    let b_tran = ocmm_b
        .transitions
        .iter()
        .find(|t| t.source == c.loc_b && t.input == input && t.constraint.contains_interval(&b_region))
        .expect("immediate_asucc: no enabled transition on the B side");

    let (new_region_a, new_frac_a) = if a_tran.reset { (0, Decimal::ZERO) } else { (c.region_a, c.frac_a) };
    let (new_region_b, new_frac_b) = if b_tran.reset { (0, Decimal::ZERO) } else { (c.region_b, c.frac_b) };

    Configuration {
        loc_a: a_tran.target.clone(),
        region_a: new_region_a,
        output_a: Some(a_tran.output.clone()),
        loc_b: b_tran.target.clone(),
        region_b: new_region_b,
        output_b: Some(b_tran.output.clone()),
        frac_a: new_frac_a,
        frac_b: new_frac_b,
        pre: Some(Rc::clone(c)),
        provenance: Provenance::Action(input.to_string()),
    }
}

fn compute_wsucc(c: &Rc<Configuration>, ocmm_a: &Ocmm, ocmm_b: &Ocmm, max_value: u32) -> Vec<Configuration> {
    let mut results: Vec<Configuration> = Vec::new();
    for delay in delay_seq(c, max_value) {
        for input in &ocmm_a.inputs {
            let succ = immediate_asucc(&delay, input, ocmm_a, ocmm_b, max_value);
            if !results.contains(&succ) {
                results.push(succ);
            }
        }
    }
    results
}

/// Walks `c`'s predecessor chain back to the root, two hops at a time
/// (an action step, then the delay step it followed), reconstructing the
/// timed input word that reaches it.
fn find_path(c: Configuration) -> Vec<TimedWord> {
    let mut tws = Vec::new();
    let mut node = Rc::new(c);
    loop {
        let input = match &node.provenance {
            Provenance::Action(a) => a.clone(),
            Provenance::Root => break,
            Provenance::Delay(_) => unreachable!("find_path: expected an action step"),
        };
        let pre = node.pre.clone().expect("find_path: action step must have a predecessor");
        let time = match pre.provenance {
            Provenance::Delay(t) => t,
            _ => unreachable!("find_path: expected a delay step"),
        };
        let grand = pre.pre.clone().expect("find_path: delay step must have a predecessor");
        tws.push(TimedWord::new(input, time));
        node = grand;
    }
    tws.reverse();
    tws
}

/// The result of checking two machines for output equivalence.
#[derive(Debug, Clone)]
pub enum OcmmEquivalence {
    Holds,
    Fails(Vec<TimedWord>),
}

impl OcmmEquivalence {
    pub fn holds(&self) -> bool {
        matches!(self, OcmmEquivalence::Holds)
    }
}

/// Checks whether `ocmm_a` and `ocmm_b` produce the same output on every
/// timed input word, up to clock values bounded by `max_value`.
pub fn test_equivalent(max_value: u32, ocmm_a: &Ocmm, ocmm_b: &Ocmm) -> OcmmEquivalence {
    assert_eq!(ocmm_a.inputs, ocmm_b.inputs, "test_equivalent: machines must share an input alphabet");

    let init = init_config(ocmm_a, ocmm_b);
    let mut to_explore: VecDeque<Rc<Configuration>> = VecDeque::from([init]);
    let mut explored: Vec<Rc<Configuration>> = Vec::new();

    while let Some(c) = to_explore.pop_front() {
        if explored.iter().any(|e| e.as_ref() == c.as_ref()) {
            continue;
        }
        for nw in compute_wsucc(&c, ocmm_a, ocmm_b, max_value) {
            if is_bad(&nw) {
                return OcmmEquivalence::Fails(find_path(nw));
            }
            if !explored.iter().any(|e| e.as_ref() == &nw) {
                to_explore.push_back(Rc::new(nw));
            }
        }
        explored.push(c);
    }
    OcmmEquivalence::Holds
}

#[cfg(test)]
mod tests {
    use super::*;
    use dota_core::Location;

    use crate::model::OcmmTransition;

    fn single_guard_ocmm(name: &str, guard: Interval, output: &str) -> Ocmm {
        Ocmm::new(
            name,
            vec!["a".to_string()],
            vec![output.to_string()],
            vec![Location::new("s1").init(), Location::new("s2")],
            vec![OcmmTransition::new("s1", "a", output, guard, true, "s2")],
            "s1",
            None,
        )
    }

    #[test]
    fn identical_machines_are_equivalent() {
        let a = single_guard_ocmm("a", "[0,1)".parse().unwrap(), "x");
        let b = single_guard_ocmm("b", "[0,1)".parse().unwrap(), "x");
        assert!(test_equivalent(4, &a, &b).holds());
    }

    #[test]
    fn differing_output_is_a_counterexample() {
        let a = single_guard_ocmm("a", "[0,1)".parse().unwrap(), "x");
        let b = single_guard_ocmm("b", "[0,1)".parse().unwrap(), "y");
        match test_equivalent(4, &a, &b) {
            OcmmEquivalence::Fails(path) => assert_eq!(path.len(), 1),
            OcmmEquivalence::Holds => panic!("expected a counterexample"),
        }
    }
}
