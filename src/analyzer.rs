//! This module provides functions for analyzing machine descriptions to detect likely mistakes
//! before execution: states the start state cannot reach, a start state without transitions,
//! states that are entered but have no transitions, and machines that never stop.
//!
//! Findings are advisory. Every machine the parser accepts can be run.

use crate::{definition::Machine, symbol::Symbol, types::StateLabel};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Represents the issues the analyzer can report.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Finding {
    /// States with transitions that no path from state 0 reaches.
    UnreachableStates(Vec<u32>),
    /// State 0 has no transitions, so every run rejects after one step.
    StartWithoutTransitions,
    /// States some transition enters that have no transitions of their own; entering one
    /// rejects on the next step.
    MissingTransitions(Vec<u32>),
    /// No transition enters a terminal state, so no run ever stops by itself.
    NoTerminalState,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::UnreachableStates(states) => {
                write!(f, "Unreachable states: {}", join(states))
            }
            Finding::StartWithoutTransitions => write!(f, "Start state 0 has no transitions"),
            Finding::MissingTransitions(states) => {
                write!(f, "States without transitions (implicit reject): {}", join(states))
            }
            Finding::NoTerminalState => write!(f, "No transition enters y, n or h"),
        }
    }
}

fn join(states: &[u32]) -> String {
    states
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Analyzes a machine and returns every finding, in a fixed order.
///
/// # Returns
///
/// * An empty vector if nothing looks suspicious.
pub fn analyze<S: Symbol>(machine: &Machine<S>) -> Vec<Finding> {
    let checks: [fn(&Machine<S>) -> Option<Finding>; 4] = [
        check_start_state,
        check_unreachable_states,
        check_missing_transitions,
        check_terminal_state,
    ];

    checks.iter().filter_map(|check| check(machine)).collect()
}

/// Checks that state 0 has at least one transition.
fn check_start_state<S: Symbol>(machine: &Machine<S>) -> Option<Finding> {
    let start = StateLabel::START.ordinary()?;

    machine
        .transitions()
        .from_state(start)
        .next()
        .is_none()
        .then_some(Finding::StartWithoutTransitions)
}

/// Checks that every state with transitions can be reached from state 0.
fn check_unreachable_states<S: Symbol>(machine: &Machine<S>) -> Option<Finding> {
    let mut visited = HashSet::new();
    let mut queue = vec![0];

    while let Some(state) = queue.pop() {
        if !visited.insert(state) {
            continue;
        }

        for transition in machine.transitions().from_state(state) {
            if let Some(next) = transition.next_state.ordinary() {
                if !visited.contains(&next) {
                    queue.push(next);
                }
            }
        }
    }

    let unreachable: Vec<u32> = sources(machine)
        .into_iter()
        .filter(|state| !visited.contains(state))
        .collect();

    (!unreachable.is_empty()).then_some(Finding::UnreachableStates(unreachable))
}

/// Checks that every entered ordinary state has transitions.
fn check_missing_transitions<S: Symbol>(machine: &Machine<S>) -> Option<Finding> {
    let sources = sources(machine);
    let missing: Vec<u32> = machine
        .transitions()
        .iter()
        .filter_map(|transition| transition.next_state.ordinary())
        .filter(|state| !sources.contains(state))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    (!missing.is_empty()).then_some(Finding::MissingTransitions(missing))
}

/// Checks that at least one transition enters a terminal state.
fn check_terminal_state<S: Symbol>(machine: &Machine<S>) -> Option<Finding> {
    let stops = machine
        .transitions()
        .iter()
        .any(|transition| transition.next_state.is_terminal());

    (!stops && !machine.transitions().is_empty()).then_some(Finding::NoTerminalState)
}

/// States that have transitions, in ascending order.
fn sources<S: Symbol>(machine: &Machine<S>) -> BTreeSet<u32> {
    machine.transitions().iter().map(|t| t.state).collect()
}
