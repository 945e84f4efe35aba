//! Integer-bounded closed/open intervals over the non-negative reals, and the
//! region equivalence classes built from them.
//!
//! `Interval` is the general guard type (what a transition is labelled
//! with); `Region` is the three-case tagged variant used by the letter-word
//! abstraction, where `next_region` must be a total, trivially-exhaustive
//! function.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The upper bound of an [`Interval`]: either a finite integer with an
/// open/closed flag, or positive infinity (always open).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpperBound {
    Finite(u32, bool),
    Infinite,
}

/// A closed/open interval with integer endpoints, or an integer lower bound
/// and an unbounded upper end.
///
/// Invariant: if the upper bound is infinite, it is open; the lower bound is
/// never greater than a finite upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub lo: u32,
    pub lo_closed: bool,
    pub hi: UpperBound,
}

impl Interval {
    /// Builds `[n, n]`.
    pub fn point(n: u32) -> Self {
        Interval {
            lo: n,
            lo_closed: true,
            hi: UpperBound::Finite(n, true),
        }
    }

    /// Builds `(n, n+1)`.
    pub fn frac(n: u32) -> Self {
        Interval {
            lo: n,
            lo_closed: false,
            hi: UpperBound::Finite(n + 1, false),
        }
    }

    /// Builds `(n, +inf)`.
    pub fn inf(n: u32) -> Self {
        Interval {
            lo: n,
            lo_closed: false,
            hi: UpperBound::Infinite,
        }
    }

    /// Builds `[0, +inf)`: the universal guard used for sink self-loops.
    pub fn unbounded() -> Self {
        Interval {
            lo: 0,
            lo_closed: true,
            hi: UpperBound::Infinite,
        }
    }

    pub fn is_point_region(&self) -> bool {
        matches!(self.hi, UpperBound::Finite(hi, true) if hi == self.lo) && self.lo_closed
    }

    pub fn is_frac_region(&self) -> bool {
        matches!(self.hi, UpperBound::Finite(hi, false) if hi == self.lo + 1) && !self.lo_closed
    }

    pub fn is_inf_region(&self) -> bool {
        matches!(self.hi, UpperBound::Infinite) && !self.lo_closed
    }

    /// The region immediately after `self`, given the clock bound `max_time_value`.
    ///
    /// Total: every region maps to a successor, and `(M, +inf)` is its own
    /// fixed point.
    pub fn next_region(&self, max_time_value: u32) -> Interval {
        if self.is_point_region() {
            if self.lo == max_time_value {
                Interval::inf(self.lo)
            } else {
                Interval::frac(self.lo)
            }
        } else if self.is_frac_region() {
            Interval::point(self.lo + 1)
        } else if self.is_inf_region() {
            Interval::inf(self.lo)
        } else {
            unreachable!("next_region called on a non-region interval {self:?}")
        }
    }

    /// Whether `t` lies within `self`.
    pub fn contains_point(&self, t: rust_decimal::Decimal) -> bool {
        let above_lo = if self.lo_closed {
            t >= rust_decimal::Decimal::from(self.lo)
        } else {
            t > rust_decimal::Decimal::from(self.lo)
        };
        if !above_lo {
            return false;
        }
        match self.hi {
            UpperBound::Infinite => true,
            UpperBound::Finite(hi, closed) => {
                let hi = rust_decimal::Decimal::from(hi);
                if closed { t <= hi } else { t < hi }
            }
        }
    }

    /// Whether `other` is a subset of `self`.
    pub fn contains_interval(&self, other: &Interval) -> bool {
        let lo_ok = self.lo < other.lo || (self.lo == other.lo && (self.lo_closed || !other.lo_closed));
        if !lo_ok {
            return false;
        }
        match (self.hi, other.hi) {
            (UpperBound::Infinite, _) => true,
            (UpperBound::Finite(_, _), UpperBound::Infinite) => false,
            (UpperBound::Finite(a, a_closed), UpperBound::Finite(b, b_closed)) => {
                a > b || (a == b && (a_closed || !b_closed))
            }
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let left = if self.lo_closed { '[' } else { '(' };
        write!(f, "{left}{},", self.lo)?;
        match self.hi {
            UpperBound::Infinite => write!(f, "+)"),
            UpperBound::Finite(hi, closed) => {
                let right = if closed { ']' } else { ')' };
                write!(f, "{hi}{right}")
            }
        }
    }
}

impl FromStr for Interval {
    type Err = Error;

    /// Parses the `<left><lo>,<hi><right>` text syntax, e.g. `[1,5)` or `(0,+)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || Error::Parse(s.to_string());
        let mut chars = s.chars();
        let left = chars.next().ok_or_else(bad)?;
        let lo_closed = match left {
            '[' => true,
            '(' => false,
            _ => return Err(bad()),
        };
        let rest = &s[1..];
        let right = rest.chars().next_back().ok_or_else(bad)?;
        let hi_closed = match right {
            ']' => true,
            ')' => false,
            _ => return Err(bad()),
        };
        let body = &rest[..rest.len() - right.len_utf8()];
        let (lo_str, hi_str) = body.split_once(',').ok_or_else(bad)?;
        let lo: u32 = lo_str.parse().map_err(|_| bad())?;
        let hi = if hi_str == "+" {
            if hi_closed {
                return Err(bad());
            }
            UpperBound::Infinite
        } else {
            let hi: u32 = hi_str.parse().map_err(|_| bad())?;
            UpperBound::Finite(hi, hi_closed)
        };
        Ok(Interval { lo, lo_closed, hi })
    }
}

/// The region equivalence class of a single clock valuation.
///
/// Kept alongside [`Interval`] (rather than as the sole representation) so
/// that `next_region` can be written as an exhaustive match instead of
/// re-deriving which of the three cases an `Interval` happens to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    /// `[n, n]`.
    Point(u32),
    /// `(n, n+1)`.
    Frac(u32),
    /// `(n, +inf)`, where `n` is the automaton's clock bound.
    Inf(u32),
}

impl Region {
    pub fn as_interval(&self) -> Interval {
        match *self {
            Region::Point(n) => Interval::point(n),
            Region::Frac(n) => Interval::frac(n),
            Region::Inf(n) => Interval::inf(n),
        }
    }

    pub fn next_region(&self, max_time_value: u32) -> Region {
        match *self {
            Region::Point(n) if n < max_time_value => Region::Frac(n),
            Region::Point(n) => Region::Inf(n),
            Region::Frac(n) => Region::Point(n + 1),
            Region::Inf(n) => Region::Inf(n),
        }
    }

    pub fn is_point_region(&self) -> bool {
        matches!(self, Region::Point(_))
    }

    pub fn is_frac_region(&self) -> bool {
        matches!(self, Region::Frac(_))
    }

    pub fn is_inf_region(&self) -> bool {
        matches!(self, Region::Inf(_))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_interval())
    }
}

/// Whether a breakpoint value should be folded into the atom ending there
/// (`left`), start a fresh atom (`right`), or both/neither (a genuine
/// conflict between two input intervals' boundaries at the same integer,
/// which we resolve by giving the value its own singleton atom).
#[derive(Default, Clone, Copy)]
struct BreakpointDemand {
    closed_left: bool,
    closed_right: bool,
}

/// Returns the ordered partition of `[0, +inf)` whose atoms refine every
/// interval in `intervals`: the coarsest partition such that each input
/// interval is expressible as a union of consecutive atoms.
pub fn intervals_partition(intervals: &[Interval]) -> Vec<Interval> {
    use std::collections::BTreeMap;

    let mut demands: BTreeMap<u32, BreakpointDemand> = BTreeMap::new();
    for iv in intervals {
        let lo_entry = demands.entry(iv.lo).or_default();
        if iv.lo_closed {
            lo_entry.closed_right = true;
        } else {
            lo_entry.closed_left = true;
        }
        if let UpperBound::Finite(hi, hi_closed) = iv.hi {
            let hi_entry = demands.entry(hi).or_default();
            if hi_closed {
                hi_entry.closed_left = true;
            } else {
                hi_entry.closed_right = true;
            }
        }
    }

    if demands.is_empty() {
        return vec![Interval::unbounded()];
    }

    let mut result = Vec::new();
    let mut cur_lo = 0u32;
    let mut cur_lo_closed = true;

    for (&v, demand) in &demands {
        // A genuine conflict (both sides of v want to claim it) resolves to
        // a standalone point atom.
        let joins_left = demand.closed_left && !demand.closed_right;
        let is_isolated_point = demand.closed_left && demand.closed_right;

        if is_isolated_point {
            if v > cur_lo || !cur_lo_closed {
                result.push(Interval {
                    lo: cur_lo,
                    lo_closed: cur_lo_closed,
                    hi: UpperBound::Finite(v, false),
                });
            }
            result.push(Interval::point(v));
            cur_lo = v;
            cur_lo_closed = false;
        } else if joins_left {
            result.push(Interval {
                lo: cur_lo,
                lo_closed: cur_lo_closed,
                hi: UpperBound::Finite(v, true),
            });
            cur_lo = v;
            cur_lo_closed = false;
        } else {
            // closed_right: v starts a fresh atom, previous one ends open before v.
            if v > cur_lo || !cur_lo_closed {
                result.push(Interval {
                    lo: cur_lo,
                    lo_closed: cur_lo_closed,
                    hi: UpperBound::Finite(v, false),
                });
            }
            cur_lo = v;
            cur_lo_closed = true;
        }
    }

    result.push(Interval {
        lo: cur_lo,
        lo_closed: cur_lo_closed,
        hi: UpperBound::Infinite,
    });

    result
}

/// Returns the atoms of `[0, +inf)` not contained in any interval of
/// `intervals`, merging adjacent atoms whose open/closed flags meet
/// (`[a,b) ∪ [b,c]` becomes `[a,c]`).
pub fn complement_intervals(intervals: &[Interval]) -> Vec<Interval> {
    let partition = intervals_partition(intervals);
    let mut atoms: Vec<Interval> = partition
        .into_iter()
        .filter(|atom| !intervals.iter().any(|iv| iv.contains_interval(atom)))
        .collect();

    let mut merged: Vec<Interval> = Vec::with_capacity(atoms.len());
    atoms.reverse();
    while let Some(atom) = atoms.pop() {
        if let Some(last) = merged.last_mut() {
            if can_merge(last, &atom) {
                *last = merge(last, &atom);
                continue;
            }
        }
        merged.push(atom);
    }
    merged
}

fn can_merge(a: &Interval, b: &Interval) -> bool {
    match a.hi {
        UpperBound::Finite(hi, hi_closed) => hi == b.lo && (hi_closed || b.lo_closed) && !(hi_closed && b.lo_closed),
        UpperBound::Infinite => false,
    }
}

fn merge(a: &Interval, b: &Interval) -> Interval {
    Interval {
        lo: a.lo,
        lo_closed: a.lo_closed,
        hi: b.hi,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_frac_inf_classification() {
        assert!(Interval::point(3).is_point_region());
        assert!(Interval::frac(3).is_frac_region());
        assert!(Interval::inf(3).is_inf_region());
        assert!(!Interval::point(3).is_frac_region());
    }

    #[test]
    fn next_region_totality() {
        assert_eq!(Region::Point(3).next_region(4), Region::Frac(3));
        assert_eq!(Region::Point(4).next_region(4), Region::Inf(4));
        assert_eq!(Region::Frac(3).next_region(4), Region::Point(4));
        assert_eq!(Region::Inf(4).next_region(4), Region::Inf(4));
    }

    #[test]
    fn parse_roundtrip() {
        for s in ["[0,+)", "[1,2]", "(3,5)", "(4,6)", "[0,0]"] {
            let iv: Interval = s.parse().unwrap();
            assert_eq!(iv.to_string(), s);
        }
    }

    #[test]
    fn parse_rejects_closed_infinity() {
        assert!("[0,+]".parse::<Interval>().is_err());
    }

    #[test]
    fn partition_example() {
        // {[1,2], (3,5), (4,6)} -> [0,1), [1,2], (2,3], (3,4], (4,5), [5,6), [6,+)
        let intervals = vec![
            Interval::from_str("[1,2]").unwrap(),
            Interval::from_str("(3,5)").unwrap(),
            Interval::from_str("(4,6)").unwrap(),
        ];
        let partition = intervals_partition(&intervals);
        let expected: Vec<Interval> = ["[0,1)", "[1,2]", "(2,3]", "(3,4]", "(4,5)", "[5,6)", "[6,+)"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        assert_eq!(partition, expected);
    }

    #[test]
    fn complement_example() {
        let intervals = vec![
            Interval::from_str("[1,2]").unwrap(),
            Interval::from_str("(3,5)").unwrap(),
            Interval::from_str("(4,6)").unwrap(),
        ];
        let complement = complement_intervals(&intervals);
        let expected: Vec<Interval> = ["[0,1)", "(2,3]", "[6,+)"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        assert_eq!(complement, expected);
    }
}
