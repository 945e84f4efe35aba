//! The top-level active-learning loop: solve the table, build a candidate,
//! check it against the teacher, and refine on counterexample or on a
//! stuck guess search.

use dota_core::{build_assistant, ota_equivalent, Automaton, Inclusion, TimedWord};
use tracing::{debug, info};

use crate::candidate::build_candidate;
use crate::encoder::{find_reset, EncodeOutcome};
use crate::error::{Error, Result};
use crate::table::ObservationTable;

/// Tuning knobs for [`learn`].
#[derive(Debug, Clone)]
pub struct LearnerConfig {
    /// Hard cap on learning-loop iterations (one membership+equivalence
    /// round each), guarding against a non-terminating search.
    pub max_steps: usize,
    /// The bound used when checking candidate/teacher inclusion in both
    /// directions: region successors beyond this clock value collapse to
    /// a single unbounded region.
    pub max_time_value: u32,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        LearnerConfig { max_steps: 50, max_time_value: 10 }
    }
}

/// Counters surfaced alongside the learned automaton, mostly useful for
/// tests and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct LearnerStats {
    pub steps: usize,
    pub membership_queries: usize,
    pub equivalence_queries: usize,
}

/// Learns a deterministic one-clock timed automaton equivalent to
/// `teacher`, by alternating row/state guesses with equivalence checks
/// against `teacher`'s completion.
pub fn learn(teacher: &Automaton, config: &LearnerConfig) -> Result<(Automaton, LearnerStats)> {
    let mut table = ObservationTable::new(teacher);
    let assist = build_assistant(teacher);
    let mut stats = LearnerStats::default();
    let mut best_candidate: Option<Automaton> = None;

    for step in 1..=config.max_steps {
        stats.steps = step;
        debug!(step, "learner: solving observation table");

        match find_reset(&table, teacher) {
            EncodeOutcome::NeedsMoreStates { promote } => {
                let shortest_new_prefix = (0..=promote.len())
                    .map(|i| promote[..i].to_vec())
                    .find(|p| !table.s.contains_key(p));
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

                match ota_equivalent(config.max_time_value, &assist, &candidate) {
                    Inclusion::Holds => {
                        info!(steps = step, "learner converged");
                        stats.membership_queries = teacher.query_count();
                        return Ok((candidate, stats));
                    }
                    Inclusion::Fails(ctx_a) => {
                        handle_counterexample(&mut table, teacher, &candidate, ctx_a);
                        best_candidate = Some(candidate);
                    }
                }
            }
        }
    }

    stats.membership_queries = teacher.query_count();
    Err(Error::BudgetExceeded { steps: config.max_steps, candidate: best_candidate })
}

fn handle_counterexample(table: &mut ObservationTable, teacher: &Automaton, candidate: &Automaton, ctx_path: Vec<TimedWord>) {
    let teacher_result = teacher.run_timed_word(&ctx_path);
    let candidate_result = candidate.run_timed_word(&ctx_path);
    debug!(
        path = %dota_core::word::display_seq(&ctx_path),
        ?teacher_result,
        ?candidate_result,
        "counterexample found, adding path to R"
    );
    table.add_path(teacher, &ctx_path);
}
