//! Checking [linearizability](https://en.wikipedia.org/wiki/Linearizability)
//! of recorded histories.
//!
//! A history is linearizable when every operation can be assigned a single
//! instant between its call and response such that the resulting sequential
//! execution is valid under the object's [`Specification`].
use std::collections::HashSet;
use std::marker::PhantomData;

use crate::linearizability::history::{Entry, History};
use crate::specifications::Specification;

pub mod history;

/// A linearizability checker.
///
/// Implements the algorithm of Wing and Gong
/// [\[WG93\]](https://www.cs.cmu.edu/~wing/publications/WingGong93.pdf) with
/// the memoization introduced by Lowe
/// [\[L17\]](http://www.cs.ox.ac.uk/people/gavin.lowe/LinearizabiltyTesting/):
/// operations are linearized greedily as early as possible, backtracking
/// when no minimal operation can be applied, and pruning any search state
/// (set of linearized operations plus object state) that has been explored
/// before.
///
/// # Examples
///
/// A timestamped register accepts a concurrent read that overlaps the write
/// it observes:
///
/// ```
/// use swsr_utils::specifications::register::RegisterOperation::{Read, Write};
/// use swsr_utils::specifications::register::TimestampedRegisterSpecification;
/// use swsr_utils::{Action, History, WglChecker};
///
/// type Checker = WglChecker<TimestampedRegisterSpecification<u64>>;
///
/// // W |--------------|   Write(5, 1)
/// // R    |---|           Read(Some((5, 1)))
/// let history = History::from_actions(vec![
///     (0, Action::Call(Write(5, 1))),
///     (1, Action::Call(Read(None))),
///     (1, Action::Response(Read(Some((5, 1))))),
///     (0, Action::Response(Write(5, 1))),
/// ]);
/// assert!(Checker::is_linearizable(history));
///
/// // A read that returns a value after a later one was readable is not
/// // linearizable:
/// // W |---|  |---|        Write(5, 1)  Write(6, 2)
/// // R              |---|  Read(Some((5, 1)))
/// let history = History::from_actions(vec![
///     (0, Action::Call(Write(5, 1))),
///     (0, Action::Response(Write(5, 1))),
///     (0, Action::Call(Write(6, 2))),
///     (0, Action::Response(Write(6, 2))),
///     (1, Action::Call(Read(None))),
///     (1, Action::Response(Read(Some((5, 1))))),
/// ]);
/// assert!(!Checker::is_linearizable(history));
/// ```
pub struct WglChecker<S: Specification> {
    specification: PhantomData<S>,
}

type LiftedPair<S> = (
    Entry<<S as Specification>::Operation>,
    Entry<<S as Specification>::Operation>,
);

impl<S: Specification> WglChecker<S> {
    /// Returns whether the history has a valid linearization.
    pub fn is_linearizable(mut history: History<S::Operation>) -> bool {
        let mut state = S::init();
        let mut linearized = vec![false; history.len()];
        // Linearized pairs in order, with the state each one replaced.
        let mut calls: Vec<(LiftedPair<S>, S::State)> = Vec::new();
        let mut seen: HashSet<(Vec<bool>, S::State)> = HashSet::new();
        let mut current = 0;
        loop {
            if history.is_empty() {
                return true;
            }
            match &history[current] {
                Entry::Call(call) => {
                    let (is_valid, next_state) =
                        match &history[history.index_of_id(call.response)] {
                            Entry::Response(response) => S::apply(&response.operation, &state),
                            Entry::Call(_) => panic!("call entry linked to a call entry"),
                        };
                    let is_new = is_valid && {
                        let mut attempt = linearized.clone();
                        attempt[call.id] = true;
                        seen.insert((attempt, next_state.clone()))
                    };
                    if is_new {
                        // Provisionally linearize this operation first.
                        linearized[call.id] = true;
                        let pair = history.lift(current);
                        calls.push((pair, state));
                        state = next_state;
                        current = 0;
                    } else {
                        current += 1;
                    }
                }
                // Reaching a response means its call could not be
                // linearized before it: undo the most recent provisional
                // choice, or give up if there is none.
                Entry::Response(_) => match calls.pop() {
                    None => return false,
                    Some(((call, response), previous_state)) => {
                        state = previous_state;
                        linearized[call.id()] = false;
                        let (call_index, _) = history.unlift(call, response);
                        current = call_index + 1;
                    }
                },
            }
        }
    }
}
