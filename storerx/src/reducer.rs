use crate::{Action, Effect, State};
use std::marker::PhantomData;

/// Transition function of a Store.
///
/// `reduce` runs synchronously and must not fail: it mutates `state` in place and
/// describes any follow-up work as an [`Effect`]. Collaborators are only ever
/// touched from inside the returned effect.
pub trait Reducer: Send + Sync + 'static {
    type State: State;
    type Action: Action;

    fn reduce(&self, state: &mut Self::State, action: Self::Action) -> Effect<Self::Action>;
}

/// A [`Reducer`] backed by a closure. Built with [`reducer_fn`].
pub struct FnReducer<S, A, F> {
    f: F,
    _marker: PhantomData<fn(&mut S, A)>,
}

pub fn reducer_fn<S, A, F>(f: F) -> FnReducer<S, A, F>
where
    S: State,
    A: Action,
    F: Fn(&mut S, A) -> Effect<A> + Send + Sync + 'static,
{
    FnReducer {
        f,
        _marker: PhantomData,
    }
}

impl<S, A, F> Reducer for FnReducer<S, A, F>
where
    S: State,
    A: Action,
    F: Fn(&mut S, A) -> Effect<A> + Send + Sync + 'static,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: &mut S, action: A) -> Effect<A> {
        (self.f)(state, action)
    }
}
