//! Observation-table learner for one-clock Mealy machines.
//!
//! Reuses the region/reset-pair machinery from `dota-learn` unchanged; the
//! one thing that differs from the DOTA learner is what "two rows behave
//! identically" means — here it's "produce the same output word", not
//! "reach the same accept/reject/sink verdict", so [`Row`] and
//! [`ObservationTable`] are their own (smaller) types rather than a reuse
//! of `dota_learn::table`'s.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use z3::ast::{Ast, Bool, Int};
use z3::{Config, Context, SatResult, Solver};

use dota_core::TimedWord;
use dota_learn::{get_time_val, is_same_region};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{build_assistant, Ocmm, VOID};

/// A row of the table: the timed word reaching it, and the output word it
/// produced getting there (the Mealy analogue of [`dota_core::RunResult`]).
#[derive(Debug)]
pub struct Row {
    pub tws: Vec<TimedWord>,
    pub output_word: Vec<String>,
    suffix_cache: RefCell<HashMap<Vec<TimedWord>, Vec<String>>>,
}

impl Row {
    fn new(tws: Vec<TimedWord>, output_word: Vec<String>) -> Self {
        Row { tws, output_word, suffix_cache: RefCell::new(HashMap::new()) }
    }

    /// Whether this row has fallen into the sink: once a Mealy machine
    /// produces `"void"` every further output stays `"void"` too, so the
    /// last produced output alone tells us.
    pub fn is_sink(&self) -> bool {
        self.output_word.last().map(|o| o == VOID).unwrap_or(false)
    }

    /// The output word produced by `suffix` (only, not prefixed with
    /// `self.output_word`), run from the end of `self.tws` with the
    /// suffix's first delay shifted by `shift`.
    pub fn test_suffix(&self, teacher: &Ocmm, suffix: &[TimedWord], shift: Decimal) -> Vec<String> {
        assert!(!suffix.is_empty(), "test_suffix: expected a nonempty suffix");
        if let Some(cached) = self.suffix_cache.borrow().get(suffix) {
            return cached.clone();
        }
        let mut shifted = suffix.to_vec();
        if shift > Decimal::ZERO {
            shifted[0] = TimedWord::new(shifted[0].action.clone(), shifted[0].delay + shift);
        }
        let mut full = self.tws.clone();
        full.extend(shifted);
        let full_output = teacher.run_input_timed_word(&full);
        let result = full_output[self.tws.len()..].to_vec();
        self.suffix_cache.borrow_mut().insert(suffix.to_vec(), result.clone());
        result
    }

    pub fn time_val(&self, resets: &HashMap<Vec<TimedWord>, bool>) -> Decimal {
        get_time_val(&self.tws, resets)
    }
}

/// `R`, `S`, and the discriminator suffix list `E`, exactly as in
/// `dota_learn::table::ObservationTable`, but rows carry output words.
pub struct ObservationTable {
    pub r: BTreeMap<Vec<TimedWord>, Row>,
    pub s: BTreeMap<Vec<TimedWord>, Row>,
    pub e: Vec<Vec<TimedWord>>,
    pub inputs: Vec<String>,
}

impl ObservationTable {
    pub fn new(teacher: &Ocmm) -> Self {
        let mut table = ObservationTable { r: BTreeMap::new(), s: BTreeMap::new(), e: Vec::new(), inputs: teacher.inputs.clone() };
        table.add_path(teacher, &[]);
        table.add_to_s(teacher, &[]);
        table
    }

    pub fn add_path(&mut self, teacher: &Ocmm, tws: &[TimedWord]) {
        for i in 0..=tws.len() {
            let prefix = tws[..i].to_vec();
            let output_word = teacher.run_input_timed_word(&prefix);
            let sink = output_word.last().map(|o| o == VOID).unwrap_or(false);
            if !self.s.contains_key(&prefix) && !self.r.contains_key(&prefix) {
                self.r.insert(prefix.clone(), Row::new(prefix, output_word));
            }
            if sink {
                break;
            }
        }
    }

    pub fn add_to_s(&mut self, teacher: &Ocmm, tws: &[TimedWord]) {
        let row = self.r.remove(tws).expect("add_to_s: tws must be in R");
        let leads_to_sink = row.is_sink();
        self.s.insert(tws.to_vec(), row);

        if !leads_to_sink {
            for input in self.inputs.clone() {
                let mut ext = tws.to_vec();
                ext.push(TimedWord::new(input, Decimal::ZERO));
                if !self.r.contains_key(&ext) && !self.s.contains_key(&ext) {
                    let output_word = teacher.run_input_timed_word(&ext);
                    self.r.insert(ext.clone(), Row::new(ext, output_word));
                }
            }
        }
    }

    pub fn row(&self, tws: &[TimedWord]) -> Option<&Row> {
        self.s.get(tws).or_else(|| self.r.get(tws))
    }

    pub fn non_sink_r(&self) -> impl Iterator<Item = (&Vec<TimedWord>, &Row)> {
        self.r.iter().filter(|(_, row)| !row.is_sink())
    }

    /// The output-word analogue of `dota_learn::table::find_distinguishing_suffix`:
    /// two rows are distinguished by `E` if any discriminator suffix, run
    /// from both (clock-shifted to a shared reading), produces a different
    /// output word.
    pub fn find_distinguishing_suffix(
        &self,
        teacher: &Ocmm,
        row1: &Row,
        row2: &Row,
        resets: &HashMap<Vec<TimedWord>, bool>,
    ) -> Option<Vec<TimedWord>> {
        if row1.is_sink() != row2.is_sink() {
            return Some(Vec::new());
        }
        let time1 = row1.time_val(resets);
        let time2 = row2.time_val(resets);
        for suffix in &self.e {
            let (o1, o2) = if time1 == time2 {
                (row1.test_suffix(teacher, suffix, Decimal::ZERO), row2.test_suffix(teacher, suffix, Decimal::ZERO))
            } else if time1 < time2 {
                (row1.test_suffix(teacher, suffix, time2 - time1), row2.test_suffix(teacher, suffix, Decimal::ZERO))
            } else {
                (row1.test_suffix(teacher, suffix, Decimal::ZERO), row2.test_suffix(teacher, suffix, time1 - time2))
            };
            if o1 != o2 {
                return Some(suffix.clone());
            }
        }
        None
    }
}

/// The outcome of one reset/state guess search, mirroring
/// `dota_learn::EncodeOutcome`.
pub enum EncodeOutcome {
    Progress { resets: HashMap<Vec<TimedWord>, bool>, states: HashMap<Vec<TimedWord>, i64> },
    Inconsistent { new_suffix: Vec<TimedWord> },
    NeedsMoreStates { promote: Vec<TimedWord> },
}

fn is_prefix(short: &[TimedWord], long: &[TimedWord]) -> bool {
    short.len() <= long.len() && short.iter().zip(long.iter()).all(|(a, b)| a == b)
}

fn all_prefixes_reset_free(ctx: &Context, row: &[TimedWord], reset_vars: &HashMap<Vec<TimedWord>, Bool>) -> Bool<'_> {
    let bools: Vec<Bool> = (0..row.len())
        .filter_map(|i| reset_vars.get(&row[..=i].to_vec()).map(|b| b.not()))
        .collect();
    if bools.is_empty() {
        return Bool::from_bool(ctx, true);
    }
    let refs: Vec<&Bool> = bools.iter().collect();
    Bool::and(ctx, &refs)
}

fn block(ctx: &Context, solver: &Solver, reset_vars: &HashMap<Vec<TimedWord>, Bool>, resets_model: &HashMap<Vec<TimedWord>, bool>) {
    let lits: Vec<Bool> = resets_model
        .iter()
        .map(|(row, val)| {
            let var = &reset_vars[row];
            if *val {
                var.clone()
            } else {
                var.not()
            }
        })
        .collect();
    if lits.is_empty() {
        return;
    }
    let refs: Vec<&Bool> = lits.iter().collect();
    solver.assert(&Bool::and(ctx, &refs).not());
}

/// C2: for `u·(a,t1)` and `v·(a,t2)` landing in the same found-row, the
/// same region under `resets`, the two extensions' reset bits must agree.
fn check_forbidden_pairs(table: &ObservationTable, rows: &[Vec<TimedWord>], resets: &HashMap<Vec<TimedWord>, bool>) -> Option<HashMap<Vec<TimedWord>, bool>> {
    for tw1 in rows {
        for tw2 in rows {
            if tw1.is_empty() || tw2.is_empty() || tw1 == tw2 || tw1.last().unwrap().action != tw2.last().unwrap().action {
                continue;
            }
            if resets.get(tw1) == resets.get(tw2) {
                continue;
            }
            let prefix1 = &tw1[..tw1.len() - 1];
            let prefix2 = &tw2[..tw2.len() - 1];
            let (Some(row1), Some(row2)) = (table.row(prefix1), table.row(prefix2)) else { continue };
            let t1 = row1.time_val(resets) + tw1.last().unwrap().delay;
            let t2 = row2.time_val(resets) + tw2.last().unwrap().delay;
            if is_same_region(t1, t2) {
                return Some(resets.clone());
            }
        }
    }
    None
}

/// C3: two rows sharing a prefix whose last action lands in the same
/// region under `resets` must not themselves disagree on falling into
/// the sink (the OCMM analogue of the DOTA accept/sink-flag check).
fn check_invalid_row(table: &ObservationTable, rows: &[Vec<TimedWord>], resets: &HashMap<Vec<TimedWord>, bool>) -> Option<HashMap<Vec<TimedWord>, bool>> {
    for tw1 in rows {
        for tw2 in rows {
            if tw1.is_empty() || tw2.is_empty() || tw1 == tw2 {
                continue;
            }
            if tw1[..tw1.len() - 1] != tw2[..tw2.len() - 1] || tw1.last().unwrap().action != tw2.last().unwrap().action {
                continue;
            }
            let prefix = &tw1[..tw1.len() - 1];
            let Some(prefix_row) = table.row(prefix) else { continue };
            let t1 = prefix_row.time_val(resets) + tw1.last().unwrap().delay;
            let t2 = prefix_row.time_val(resets) + tw2.last().unwrap().delay;
            if !is_same_region(t1, t2) {
                continue;
            }
            let row1 = table.row(tw1).unwrap();
            let row2 = table.row(tw2).unwrap();
            if row1.is_sink() != row2.is_sink() {
                return Some(resets.clone());
            }
        }
    }
    None
}

/// C4: for every pair of rows sharing a found-state prefix whose last
/// action lands in the same region, either they stay equated or a new
/// discriminator suffix is returned to force them apart.
fn check_consistent(table: &ObservationTable, teacher: &Ocmm, rows: &[Vec<TimedWord>], resets: &HashMap<Vec<TimedWord>, bool>) -> Option<Vec<TimedWord>> {
    for tw1 in rows {
        for tw2 in rows {
            if tw1.is_empty() || tw2.is_empty() || tw1 == tw2 || tw1.last().unwrap().action != tw2.last().unwrap().action {
                continue;
            }
            let prefix1 = &tw1[..tw1.len() - 1];
            let prefix2 = &tw2[..tw2.len() - 1];
            let (Some(row_p1), Some(row_p2)) = (table.row(prefix1), table.row(prefix2)) else { continue };
            if table.find_distinguishing_suffix(teacher, row_p1, row_p2, resets).is_some() {
                continue;
            }
            let t1 = row_p1.time_val(resets) + tw1.last().unwrap().delay;
            let t2 = row_p2.time_val(resets) + tw2.last().unwrap().delay;
            if !is_same_region(t1, t2) {
                continue;
            }
            let row1 = table.row(tw1).unwrap();
            let row2 = table.row(tw2).unwrap();
            if let Some(suffix) = table.find_distinguishing_suffix(teacher, row1, row2, resets) {
                let mut new_e = vec![TimedWord::new(tw1.last().unwrap().action.clone(), tw1.last().unwrap().delay.min(tw2.last().unwrap().delay))];
                new_e.extend(suffix);
                if !table.e.contains(&new_e) {
                    return Some(new_e);
                }
            }
        }
    }
    None
}

/// Solves for a reset/state assignment consistent with `table`, the same
/// iterative structure as `dota_learn::encoder::find_reset` (C1-C4), with
/// C3's accept/sink-flag check narrowed to sink-only since OCMM rows have
/// no accept flag.
pub fn find_reset(table: &ObservationTable, teacher: &Ocmm) -> EncodeOutcome {
    let mut rows: Vec<Vec<TimedWord>> = table.s.keys().cloned().chain(table.non_sink_r().map(|(k, _)| k.clone())).collect();
    rows.sort();
    let num_guess = rows.len() as i64;

    let cfg = Config::new();
    let ctx = Context::new(&cfg);
    let solver = Solver::new(&ctx);

    let mut reset_vars: HashMap<Vec<TimedWord>, Bool> = HashMap::new();
    let mut state_vars: HashMap<Vec<TimedWord>, Int> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        reset_vars.insert(row.clone(), Bool::new_const(&ctx, format!("b_{i}")));
        state_vars.insert(row.clone(), Int::new_const(&ctx, format!("s_{i}")));
    }
    for st in state_vars.values() {
        solver.assert(&st.ge(&Int::from_i64(&ctx, 1)));
        solver.assert(&st.le(&Int::from_i64(&ctx, num_guess)));
    }
    if let Some(init_state) = state_vars.get(&Vec::new()) {
        solver.assert(&init_state._eq(&Int::from_i64(&ctx, 1)));
    }

    let non_reset_baseline: HashMap<Vec<TimedWord>, bool> = HashMap::new();
    let mut any_c1 = false;
    for r_i in &rows {
        for r_j in &rows {
            if r_i == r_j || !is_prefix(r_i, r_j) || r_i.len() == r_j.len() {
                continue;
            }
            let row_i = table.row(r_i).unwrap();
            let row_j = table.row(r_j).unwrap();
            if table.find_distinguishing_suffix(teacher, row_i, row_j, &non_reset_baseline).is_some() {
                any_c1 = true;
                let reset_free = all_prefixes_reset_free(&ctx, r_j, &reset_vars);
                let distinct = state_vars[r_i]._eq(&state_vars[r_j]).not();
                solver.assert(&reset_free.implies(&distinct));
            }
        }
    }
    if !any_c1 {
        for b in reset_vars.values() {
            solver.assert(&b.not());
        }
    }

    loop {
        if solver.check() != SatResult::Sat {
            return needs_more_states(table, teacher, &rows);
        }
        let model = solver.get_model().expect("sat implies a model");
        let resets_model: HashMap<Vec<TimedWord>, bool> = rows
            .iter()
            .map(|r| (r.clone(), model.eval(&reset_vars[r], true).and_then(|v| v.as_bool()).unwrap_or(false)))
            .collect();

        if let Some(blocking) = check_forbidden_pairs(table, &rows, &resets_model) {
            block(&ctx, &solver, &reset_vars, &blocking);
            continue;
        }
        if let Some(blocking) = check_invalid_row(table, &rows, &resets_model) {
            block(&ctx, &solver, &reset_vars, &blocking);
            continue;
        }
        if let Some(new_suffix) = check_consistent(table, teacher, &rows, &resets_model) {
            return EncodeOutcome::Inconsistent { new_suffix };
        }

        for (idx, r_i) in rows.iter().enumerate() {
            for r_j in &rows[idx + 1..] {
                let row_i = table.row(r_i).unwrap();
                let row_j = table.row(r_j).unwrap();
                if table.find_distinguishing_suffix(teacher, row_i, row_j, &resets_model).is_some() {
                    solver.assert(&state_vars[r_i]._eq(&state_vars[r_j]).not());
                } else {
                    solver.assert(&state_vars[r_i]._eq(&state_vars[r_j]));
                }
            }
        }

        if solver.check() != SatResult::Sat {
            return needs_more_states(table, teacher, &rows);
        }
        let model = solver.get_model().expect("sat implies a model");
        let resets: HashMap<Vec<TimedWord>, bool> = rows
            .iter()
            .map(|r| (r.clone(), model.eval(&reset_vars[r], true).and_then(|v| v.as_bool()).unwrap_or(false)))
            .collect();
        let states: HashMap<Vec<TimedWord>, i64> = rows
            .iter()
            .map(|r| (r.clone(), model.eval(&state_vars[r], true).and_then(|v| v.as_i64()).expect("every row's state must be assigned")))
            .collect();
        return EncodeOutcome::Progress { resets, states };
    }
}

fn needs_more_states(table: &ObservationTable, teacher: &Ocmm, rows: &[Vec<TimedWord>]) -> EncodeOutcome {
    let baseline: HashMap<Vec<TimedWord>, bool> = HashMap::new();
    let mut best: Option<(Vec<TimedWord>, usize)> = None;
    for r in rows {
        if table.s.contains_key(r) {
            continue;
        }
        let row = table.row(r).unwrap();
        let count = table
            .s
            .keys()
            .filter(|s_key| table.find_distinguishing_suffix(teacher, row, table.row(s_key).unwrap(), &baseline).is_none())
            .count();
        if best.as_ref().map(|(_, c)| count < *c).unwrap_or(true) {
            best = Some((r.clone(), count));
        }
    }
    EncodeOutcome::NeedsMoreStates { promote: best.map(|(r, _)| r).unwrap_or_default() }
}

/// Builds a candidate `Ocmm` from a solved reset/state assignment, the
/// output-producing analogue of `dota_learn::candidate::build_candidate`.
pub fn build_candidate(table: &ObservationTable, resets: &HashMap<Vec<TimedWord>, bool>, states: &HashMap<Vec<TimedWord>, i64>) -> Ocmm {
    use dota_core::{Interval, Location, UpperBound};
    use rust_decimal::prelude::ToPrimitive;

    use crate::model::OcmmTransition;

    let state_num = states.values().copied().collect::<std::collections::BTreeSet<_>>().len() as i64;
    let sink_name = (state_num + 1).to_string();

    let mut loc_of: HashMap<Vec<TimedWord>, String> = HashMap::new();
    for (tw, row) in table.s.iter().chain(table.r.iter()) {
        let name = if row.is_sink() { sink_name.clone() } else { states[tw].to_string() };
        loc_of.insert(tw.clone(), name);
    }

    let mut trans_map: BTreeMap<String, BTreeMap<String, BTreeMap<Decimal, (bool, String, String)>>> = BTreeMap::new();
    for i in 1..=state_num + 1 {
        let entry = trans_map.entry(i.to_string()).or_default();
        for input in &table.inputs {
            entry.entry(input.clone()).or_default();
        }
    }

    let mut all_tws: Vec<&Vec<TimedWord>> = table.s.keys().chain(table.r.keys()).collect();
    all_tws.sort();
    for tw in all_tws {
        if tw.is_empty() {
            continue;
        }
        let prefix = &tw[..tw.len() - 1];
        let prefix_row = table.row(prefix).expect("R/S must be prefix closed");
        let prefix_loc = loc_of[prefix].clone();
        let last = tw.last().unwrap();
        let trans_time = prefix_row.time_val(resets) + last.delay;

        let row = table.row(tw).unwrap();
        let output = row.output_word.last().cloned().unwrap_or_else(|| VOID.to_string());
        let (cur_reset, cur_loc) = if row.is_sink() { (true, sink_name.clone()) } else { (*resets.get(tw).unwrap_or(&false), loc_of[tw].clone()) };

        trans_map.entry(prefix_loc).or_default().entry(last.action.clone()).or_default().insert(trans_time, (cur_reset, cur_loc, output));
    }

    for input in &table.inputs {
        trans_map
            .entry(sink_name.clone())
            .or_default()
            .entry(input.clone())
            .or_default()
            .insert(Decimal::ZERO, (true, sink_name.clone(), VOID.to_string()));
    }

    let mut transitions = Vec::new();
    for (source, per_input) in &trans_map {
        for (input, by_time) in per_input {
            let entries: Vec<(Decimal, bool, String, String)> = by_time.iter().map(|(t, (r, tgt, o))| (*t, *r, tgt.clone(), o.clone())).collect();
            if entries.is_empty() {
                continue;
            }
            let mut deduped = vec![entries[0].clone()];
            for e in &entries[1..] {
                let last = deduped.last().unwrap();
                if e.1 != last.1 || e.2 != last.2 || e.3 != last.3 {
                    deduped.push(e.clone());
                }
            }
            for (i, (time, reset, target, output)) in deduped.iter().enumerate() {
                let lo = time.trunc().to_u32().expect("transition time fits in u32");
                let lo_closed = time.fract() == Decimal::ZERO;
                let hi = if i + 1 < deduped.len() {
                    let time2 = deduped[i + 1].0;
                    UpperBound::Finite(time2.trunc().to_u32().expect("transition time fits in u32"), time2.fract() != Decimal::ZERO)
                } else {
                    UpperBound::Infinite
                };
                transitions.push(OcmmTransition::new(source.clone(), input.clone(), output.clone(), Interval { lo, lo_closed, hi }, *reset, target.clone()));
            }
        }
    }

    let mut outputs: Vec<String> = table
        .s
        .values()
        .chain(table.r.values())
        .flat_map(|row| row.output_word.iter().cloned())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    if !outputs.iter().any(|o| o == VOID) {
        outputs.push(VOID.to_string());
    }

    let mut locations: Vec<Location> = (1..=state_num)
        .map(|i| {
            let mut loc = Location::new(i.to_string());
            if i == 1 {
                loc = loc.init();
            }
            loc
        })
        .collect();
    locations.push(Location::new(sink_name.clone()).sink());

    Ocmm::new("candidate", table.inputs.clone(), outputs, locations, transitions, "1", Some(sink_name))
}

/// Tuning knobs for [`learn`], mirroring `dota_learn::LearnerConfig`.
#[derive(Debug, Clone)]
pub struct LearnerConfig {
    pub max_steps: usize,
    pub max_time_value: u32,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        LearnerConfig { max_steps: 50, max_time_value: 10 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LearnerStats {
    pub steps: usize,
    pub membership_queries: usize,
    pub equivalence_queries: usize,
}

/// Learns a one-clock Mealy machine output-equivalent to `teacher`.
pub fn learn(teacher: &Ocmm, config: &LearnerConfig) -> Result<(Ocmm, LearnerStats)> {
    let mut table = ObservationTable::new(teacher);
    let assist = build_assistant(teacher);
    let mut stats = LearnerStats::default();
    let mut best_candidate: Option<Ocmm> = None;

    for step in 1..=config.max_steps {
        stats.steps = step;
        debug!(step, "ocmm learner: solving observation table");

        match find_reset(&table, teacher) {
            EncodeOutcome::NeedsMoreStates { promote } => {
                let shortest_new_prefix = (0..=promote.len()).map(|i| promote[..i].to_vec()).find(|p| !table.s.contains_key(p));
                match shortest_new_prefix {
                    Some(prefix) => {
                        info!(prefix = %dota_core::word::display_seq(&prefix), "no consistent reset guess, promoting row to S");
                        table.add_to_s(teacher, &prefix);
                    }
                    None => {
                        stats.membership_queries = teacher.query_count();
                        return Err(Error::UnsatisfiableTable {
                            state_num: table.s.len(),
                            debug_dump: "no unpromoted prefix available to add to S".to_string(),
                        });
                    }
                }
            }
            EncodeOutcome::Inconsistent { new_suffix } => {
                debug!(suffix = %dota_core::word::display_seq(&new_suffix), "table inconsistent, adding discriminator");
                if !table.e.contains(&new_suffix) {
                    table.e.push(new_suffix);
                }
            }
            EncodeOutcome::Progress { resets, states } => {
                let candidate = build_candidate(&table, &resets, &states);
                stats.equivalence_queries += 1;
                match crate::equivalence::test_equivalent(config.max_time_value, &assist, &candidate) {
                    crate::equivalence::OcmmEquivalence::Holds => {
                        info!(steps = step, "ocmm learner converged");
                        stats.membership_queries = teacher.query_count();
                        return Ok((candidate, stats));
                    }
                    crate::equivalence::OcmmEquivalence::Fails(ctx_path) => {
                        debug!(path = %dota_core::word::display_seq(&ctx_path), "counterexample found, adding path to R");
                        table.add_path(teacher, &ctx_path);
                        best_candidate = Some(candidate);
                    }
                }
            }
        }
    }

    stats.membership_queries = teacher.query_count();
    Err(Error::BudgetExceeded { steps: config.max_steps, candidate: best_candidate })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dota_core::Location;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn one_guard_ocmm() -> Ocmm {
        Ocmm::new(
            "t",
            vec!["a".to_string()],
            vec!["x".to_string()],
            vec![Location::new("s1").init(), Location::new("s2")],
            vec![crate::model::OcmmTransition::new("s1", "a", "x", "[0,1)".parse().unwrap(), true, "s2")],
            "s1",
            None,
        )
    }

    #[test]
    fn add_to_s_extends_r_with_every_input() {
        let teacher = one_guard_ocmm();
        let table = ObservationTable::new(&teacher);
        assert!(table.s.contains_key(&Vec::new()));
        assert!(table.r.contains_key(&vec![TimedWord::new("a", Decimal::ZERO)]));
    }

    #[test]
    fn find_reset_succeeds_on_a_trivial_machine() {
        let teacher = Ocmm::new(
            "t",
            vec!["a".to_string()],
            vec!["x".to_string()],
            vec![Location::new("s1").init()],
            vec![],
            "s1",
            None,
        );
        let table = ObservationTable::new(&teacher);
        match find_reset(&table, &teacher) {
            EncodeOutcome::Progress { states, .. } => assert_eq!(states[&Vec::new()], 1),
            _ => panic!("expected a satisfying assignment on a single-state machine"),
        }
    }

    #[test]
    fn distinguishing_suffix_flags_output_mismatch_alone() {
        let teacher = one_guard_ocmm();
        let mut table = ObservationTable::new(&teacher);
        table.e.push(vec![TimedWord::new("a", dec("0"))]);
        let row_empty = table.row(&[]).unwrap();
        let row_a = table.row(&[TimedWord::new("a", Decimal::ZERO)]).unwrap();
        let baseline: HashMap<Vec<TimedWord>, bool> = HashMap::new();
        assert!(table.find_distinguishing_suffix(&teacher, row_empty, row_a, &baseline).is_some());
    }

    #[test]
    fn learner_converges_on_a_single_guarded_transition() {
        let teacher = one_guard_ocmm();
        let config = LearnerConfig::default();
        let (candidate, stats) = learn(&teacher, &config).expect("learning should converge");
        assert!(stats.steps >= 1);
        let word = vec![TimedWord::new("a", dec("0.5"))];
        assert_eq!(candidate.run_input_timed_word(&word), teacher.run_input_timed_word(&word));
        let word_outside = vec![TimedWord::new("a", dec("2"))];
        assert_eq!(candidate.run_input_timed_word(&word_outside), vec![VOID.to_string()]);
    }
}
