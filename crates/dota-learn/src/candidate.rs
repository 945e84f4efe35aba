//! Builds a deterministic candidate automaton from a solved observation
//! table: one location per distinct guessed state, transitions read off
//! the prefix structure of `R` and `S`.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use dota_core::{Automaton, Interval, Location, Transition, TimedWord, UpperBound};

use crate::table::ObservationTable;

/// Builds the candidate from a [`crate::encoder::EncodeOutcome::Progress`]
/// payload: `resets` decides where the candidate's transitions reset the
/// clock, `states` assigns each row to one of the candidate's locations.
pub fn build_candidate(
    table: &ObservationTable,
    resets: &HashMap<Vec<TimedWord>, bool>,
    states: &HashMap<Vec<TimedWord>, i64>,
) -> Automaton {
    let state_num = states.values().copied().collect::<std::collections::BTreeSet<_>>().len() as i64;
    let sink_name = (state_num + 1).to_string();

    let mut loc_of: HashMap<Vec<TimedWord>, String> = HashMap::new();
    for (tw, row) in table.s.iter().chain(table.r.iter()) {
        let name = if row.is_sink {
            sink_name.clone()
        } else {
            states[tw].to_string()
        };
        loc_of.insert(tw.clone(), name);
    }

    let mut accept_of_state: HashMap<String, bool> = HashMap::new();
    for (tw, row) in table.s.iter().chain(table.r.iter()) {
        if row.is_sink {
            continue;
        }
        let entry = accept_of_state.entry(loc_of[tw].clone()).or_insert(false);
        *entry |= row.is_accept;
    }

    // location, action, time -> (reset, target)
    let mut trans_map: BTreeMap<String, BTreeMap<String, BTreeMap<Decimal, (bool, String)>>> = BTreeMap::new();
    for i in 1..=state_num + 1 {
        let entry = trans_map.entry(i.to_string()).or_default();
        for action in &table.actions {
            entry.entry(action.clone()).or_default();
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
        let (cur_reset, cur_loc) = if row.is_sink {
            (true, sink_name.clone())
        } else {
            (*resets.get(tw).unwrap_or(&false), loc_of[tw].clone())
        };

        trans_map
            .entry(prefix_loc)
            .or_default()
            .entry(last.action.clone())
            .or_default()
            .insert(trans_time, (cur_reset, cur_loc));
    }

    for action in &table.actions {
        trans_map
            .entry(sink_name.clone())
            .or_default()
            .entry(action.clone())
            .or_default()
            .insert(Decimal::ZERO, (true, sink_name.clone()));
    }

    let mut transitions = Vec::new();
    for (source, per_action) in &trans_map {
        for (action, by_time) in per_action {
            let entries: Vec<(Decimal, bool, String)> = by_time.iter().map(|(t, (r, tgt))| (*t, *r, tgt.clone())).collect();
            if entries.is_empty() {
                continue;
            }
            let mut deduped: Vec<(Decimal, bool, String)> = vec![entries[0].clone()];
            for e in &entries[1..] {
                let last = deduped.last().unwrap();
                if e.1 != last.1 || e.2 != last.2 {
                    deduped.push(e.clone());
                }
            }
            for (i, (time, reset, target)) in deduped.iter().enumerate() {
                let (lo, lo_closed) = (
                    time.trunc().to_u32().expect("transition time fits in u32"),
                    time.fract() == Decimal::ZERO,
                );
                let hi = if i + 1 < deduped.len() {
                    let time2 = deduped[i + 1].0;
                    let hi_val = time2.trunc().to_u32().expect("transition time fits in u32");
                    let hi_closed = time2.fract() != Decimal::ZERO;
                    UpperBound::Finite(hi_val, hi_closed)
                } else {
                    UpperBound::Infinite
                };
                transitions.push(Transition::new(source.clone(), action.clone(), Interval { lo, lo_closed, hi }, *reset, target.clone()));
            }
        }
    }

    let mut locations = Vec::new();
    for i in 1..=state_num {
        let name = i.to_string();
        let mut loc = Location::new(name.clone());
        if i == 1 {
            loc = loc.init();
        }
        if *accept_of_state.get(&name).unwrap_or(&false) {
            loc = loc.accept();
        }
        locations.push(loc);
    }
    locations.push(Location::new(sink_name.clone()).sink());

    let accept_locations: Vec<String> = (1..=state_num)
        .map(|i| i.to_string())
        .filter(|n| *accept_of_state.get(n).unwrap_or(&false))
        .collect();

    Automaton::new(
        "candidate",
        table.actions.clone(),
        locations,
        transitions,
        "1",
        accept_locations,
        Some(sink_name),
    )
}
