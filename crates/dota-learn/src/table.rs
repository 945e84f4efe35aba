//! The observation table: `R`, `S`, `E`, and the per-row lazily-memoised
//! suffix results used to decide whether two rows are distinguishable.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use dota_core::{Automaton, RunResult, TimedWord};

/// Whether `t1` and `t2` fall in the same region: equal, or both strictly
/// between the same pair of consecutive integers.
pub fn is_same_region(t1: Decimal, t2: Decimal) -> bool {
    t1 == t2 || (t1.fract() != Decimal::ZERO && t2.fract() != Decimal::ZERO && t1.trunc() == t2.trunc())
}

/// A single row of the table: the timed word that reaches it, its
/// accept/sink classification, and a cache of suffix membership results
/// keyed by the *unshifted* suffix (two comparisons against rows at
/// different clock values may populate this with results computed under
/// different shifts — this mirrors the reference table's memoisation and is
/// harmless since the per-word cache on [`Automaton`] is the source of
/// truth).
#[derive(Debug)]
pub struct Row {
    pub tws: Vec<TimedWord>,
    pub is_accept: bool,
    pub is_sink: bool,
    suffix_cache: RefCell<HashMap<Vec<TimedWord>, RunResult>>,
}

impl Row {
    pub fn new(tws: Vec<TimedWord>, result: RunResult) -> Self {
        Row {
            tws,
            is_accept: matches!(result, RunResult::Accept),
            is_sink: matches!(result, RunResult::Sink),
            suffix_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Queries `automaton` on `self.tws` followed by `suffix`, whose first
    /// delay is increased by `shift` to align the clock with a row reaching
    /// a later time value.
    pub fn test_suffix(&self, automaton: &Automaton, suffix: &[TimedWord], shift: Decimal) -> RunResult {
        assert!(!suffix.is_empty(), "test_suffix: expected a nonempty suffix");
        if let Some(cached) = self.suffix_cache.borrow().get(suffix) {
            return *cached;
        }
        let mut shifted = suffix.to_vec();
        if shift > Decimal::ZERO {
            shifted[0] = TimedWord::new(shifted[0].action.clone(), shifted[0].delay + shift);
        }
        let mut full = self.tws.clone();
        full.extend(shifted);
        let result = automaton.run_timed_word(&full);
        self.suffix_cache.borrow_mut().insert(suffix.to_vec(), result);
        result
    }

    /// The clock value at the end of `self.tws` under a choice of resets:
    /// walks backward from the last action, stopping at the most recent
    /// reset (or accumulating the whole word if none resets).
    pub fn time_val(&self, resets: &HashMap<Vec<TimedWord>, bool>) -> Decimal {
        get_time_val(&self.tws, resets)
    }
}

pub fn get_time_val(tws: &[TimedWord], resets: &HashMap<Vec<TimedWord>, bool>) -> Decimal {
    let mut cur_time = Decimal::ZERO;
    for i in (0..tws.len()).rev() {
        let prefix = tws[..=i].to_vec();
        if *resets.get(&prefix).unwrap_or(&false) {
            return cur_time;
        }
        cur_time += tws[i].delay;
    }
    cur_time
}

/// The observation table owned by the learner: `R`, `S`, the discriminator
/// list `E`, and `extra_S`, the pool of witness rows discovered by the
/// search schedule but not yet promoted into `S`.
pub struct ObservationTable {
    pub r: BTreeMap<Vec<TimedWord>, Row>,
    pub s: BTreeMap<Vec<TimedWord>, Row>,
    pub e: Vec<Vec<TimedWord>>,
    pub extra_s: Vec<Vec<TimedWord>>,
    pub actions: Vec<String>,
}

impl ObservationTable {
    pub fn new(teacher: &Automaton) -> Self {
        let mut table = ObservationTable {
            r: BTreeMap::new(),
            s: BTreeMap::new(),
            e: Vec::new(),
            extra_s: Vec::new(),
            actions: teacher.alphabet.clone(),
        };
        table.add_path(teacher, &[]);
        table.add_to_s(teacher, &[]);
        table
    }

    /// Adds `tws` and every prefix of it to `R`, stopping early once a
    /// prefix reaches the sink (every longer continuation would too).
    pub fn add_path(&mut self, teacher: &Automaton, tws: &[TimedWord]) {
        for i in 0..=tws.len() {
            let prefix = tws[..i].to_vec();
            let result = teacher.run_timed_word(&prefix);
            if !self.s.contains_key(&prefix) && !self.r.contains_key(&prefix) {
                self.r.insert(prefix.clone(), Row::new(prefix, result));
            }
            if matches!(result, RunResult::Sink) {
                break;
            }
        }
    }

    /// Promotes `tws` from `R` to `S`, then adds `tws ++ (a, 0)` to `R` for
    /// every action `a`, unless `tws` itself leads to the sink.
    pub fn add_to_s(&mut self, teacher: &Automaton, tws: &[TimedWord]) {
        let row = self.r.remove(tws).expect("add_to_s: tws must be in R");
        let leads_to_sink = row.is_sink;
        self.s.insert(tws.to_vec(), row);

        if !leads_to_sink {
            for action in self.actions.clone() {
                let mut ext = tws.to_vec();
                ext.push(TimedWord::new(action, Decimal::ZERO));
                if !self.r.contains_key(&ext) && !self.s.contains_key(&ext) {
                    let result = teacher.run_timed_word(&ext);
                    self.r.insert(ext.clone(), Row::new(ext, result));
                }
            }
        }
    }

    pub fn row(&self, tws: &[TimedWord]) -> Option<&Row> {
        self.s.get(tws).or_else(|| self.r.get(tws))
    }

    pub fn non_sink_r(&self) -> impl Iterator<Item = (&Vec<TimedWord>, &Row)> {
        self.r.iter().filter(|(_, row)| !row.is_sink)
    }

    /// Returns the distinguishing suffix for `row1` vs `row2` under `resets`,
    /// `None` if `E` (plus the accept/sink flags) does not distinguish them,
    /// `Some(empty)` if the flags alone already do.
    pub fn find_distinguishing_suffix(
        &self,
        teacher: &Automaton,
        row1: &Row,
        row2: &Row,
        resets: &HashMap<Vec<TimedWord>, bool>,
    ) -> Option<Vec<TimedWord>> {
        if row1.is_accept != row2.is_accept || row1.is_sink != row2.is_sink {
            return Some(Vec::new());
        }

        let time1 = row1.time_val(resets);
        let time2 = row2.time_val(resets);

        for suffix in &self.e {
            let (res1, res2) = if time1 == time2 {
                (row1.test_suffix(teacher, suffix, Decimal::ZERO), row2.test_suffix(teacher, suffix, Decimal::ZERO))
            } else if time1 < time2 {
                (row1.test_suffix(teacher, suffix, time2 - time1), row2.test_suffix(teacher, suffix, Decimal::ZERO))
            } else {
                (row1.test_suffix(teacher, suffix, Decimal::ZERO), row2.test_suffix(teacher, suffix, time1 - time2))
            };
            if res1 != res2 {
                return Some(suffix.clone());
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_region_matches_integer_and_fraction_cases() {
        let dec = |s: &str| -> Decimal { s.parse().unwrap() };
        assert!(is_same_region(dec("1"), dec("1")));
        assert!(is_same_region(dec("1.2"), dec("1.7")));
        assert!(!is_same_region(dec("1.2"), dec("2.2")));
        assert!(!is_same_region(dec("1"), dec("1.5")));
    }

    #[test]
    fn get_time_val_stops_at_most_recent_reset() {
        let tws = vec![
            TimedWord::new("a", dec_helper("1")),
            TimedWord::new("b", dec_helper("2")),
            TimedWord::new("c", dec_helper("3")),
        ];
        let mut resets = HashMap::new();
        resets.insert(tws.clone(), false);
        resets.insert(tws[..2].to_vec(), true);
        resets.insert(tws[..1].to_vec(), false);
        // reset happens right after "b": only "c"'s delay (3) should count.
        assert_eq!(get_time_val(&tws, &resets), dec_helper("3"));
    }

    fn dec_helper(s: &str) -> Decimal {
        s.parse().unwrap()
    }
}
