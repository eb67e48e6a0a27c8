//! Test doubles for reducers.
//!
//! [`RecordingReducer`] wraps any reducer and keeps a history of every
//! transition it performed, so tests can assert on the exact sequence of
//! actions a Store reduced and on the states in between.

use crate::{Effect, Reducer};
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One reduced action together with the state before and after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S, A> {
    pub action: A,
    pub old_state: S,
    pub new_state: S,
}

/// Shared view on the history of a [`RecordingReducer`].
pub struct Recorder<S, A> {
    transitions: Arc<Mutex<Vec<Transition<S, A>>>>,
}

impl<S, A> Clone for Recorder<S, A> {
    fn clone(&self) -> Self {
        Recorder {
            transitions: self.transitions.clone(),
        }
    }
}

impl<S: Clone, A: Clone> Recorder<S, A> {
    fn lock(&self) -> MutexGuard<'_, Vec<Transition<S, A>>> {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn transitions(&self) -> Vec<Transition<S, A>> {
        self.lock().clone()
    }

    /// Reduced actions, oldest first.
    pub fn actions(&self) -> Vec<A> {
        self.lock().iter().map(|t| t.action.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Actions reduced after the first `mark` transitions.
    pub fn actions_since(&self, mark: usize) -> Vec<A> {
        self.lock()
            .iter()
            .skip(mark)
            .map(|t| t.action.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Reducer wrapper recording every transition of the reducer it wraps.
pub struct RecordingReducer<R: Reducer> {
    inner: R,
    recorder: Recorder<R::State, R::Action>,
}

impl<R: Reducer> RecordingReducer<R>
where
    R::Action: Clone,
{
    pub fn new(inner: R) -> (Self, Recorder<R::State, R::Action>) {
        let recorder = Recorder {
            transitions: Arc::new(Mutex::new(Vec::new())),
        };
        let reducer = RecordingReducer {
            inner,
            recorder: recorder.clone(),
        };
        (reducer, recorder)
    }
}

impl<R: Reducer> Reducer for RecordingReducer<R>
where
    R::Action: Clone,
{
    type State = R::State;
    type Action = R::Action;

    fn reduce(&self, state: &mut Self::State, action: Self::Action) -> Effect<Self::Action> {
        let old_state = state.clone();
        let effect = self.inner.reduce(state, action.clone());
        self.recorder.lock().push(Transition {
            action,
            old_state,
            new_state: state.clone(),
        });
        effect
    }
}

/// Assertion helpers over a [`Recorder`].
pub mod assert {
    use super::*;

    /// Asserts the reduced actions are exactly `expected`, in order.
    pub fn assert_action_sequence<S, A>(recorder: &Recorder<S, A>, expected: &[A])
    where
        S: Clone,
        A: Clone + PartialEq + Debug,
    {
        let actions = recorder.actions();
        assert_eq!(
            actions.as_slice(),
            expected,
            "reduced actions do not match the expected sequence"
        );
    }

    /// Asserts `expected` was reduced at some point.
    pub fn assert_action_reduced<S, A>(recorder: &Recorder<S, A>, expected: &A)
    where
        S: Clone,
        A: Clone + PartialEq + Debug,
    {
        let actions = recorder.actions();
        assert!(
            actions.contains(expected),
            "action {:?} was never reduced, got {:?}",
            expected,
            actions
        );
    }

    pub fn assert_transition_count<S, A>(recorder: &Recorder<S, A>, expected: usize)
    where
        S: Clone,
        A: Clone + Debug,
    {
        let actions = recorder.actions();
        assert_eq!(
            actions.len(),
            expected,
            "expected {} transitions, got {:?}",
            expected,
            actions
        );
    }

    /// Asserts no transition after the first `mark` changed the state.
    pub fn assert_state_unchanged_since<S, A>(recorder: &Recorder<S, A>, mark: usize)
    where
        S: Clone + PartialEq + Debug,
        A: Clone + Debug,
    {
        for transition in recorder.transitions().iter().skip(mark) {
            assert_eq!(
                transition.old_state, transition.new_state,
                "{:?} mutated the state",
                transition.action
            );
        }
    }

    /// Asserts the state went from `from` to `to` in a single transition.
    pub fn assert_state_transition<S, A>(recorder: &Recorder<S, A>, from: &S, to: &S)
    where
        S: Clone + PartialEq + Debug,
        A: Clone,
    {
        let found = recorder
            .transitions()
            .iter()
            .any(|t| &t.old_state == from && &t.new_state == to);
        assert!(found, "no transition from {:?} to {:?}", from, to);
    }
}
