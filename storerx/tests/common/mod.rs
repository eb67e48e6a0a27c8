#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;
use storerx::{reducer_fn, Action, Effect, Loadable, Reducer, State};

storerx::cancel_ids! { pub Lookup }

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LookupState {
    pub query: String,
    pub result: Loadable<Vec<String>>,
}

impl State for LookupState {}

#[derive(Clone, Debug, PartialEq)]
pub enum LookupAction {
    QueryChanged(String),
    Found(Loadable<Vec<String>>),
}

impl Action for LookupAction {}

/// Pretend backend that remembers every query it was asked.
#[derive(Clone, Default)]
pub struct Backend {
    queries: Arc<Mutex<Vec<String>>>,
}

impl Backend {
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub async fn lookup(&self, query: String) -> Result<Vec<String>, String> {
        self.queries.lock().unwrap().push(query.clone());
        if query == "boom" {
            return Err("backend unavailable".to_string());
        }
        Ok(vec![format!("{query} 1"), format!("{query} 2")])
    }
}

pub fn lookup_reducer(
    backend: Backend,
    delay: Duration,
) -> impl Reducer<State = LookupState, Action = LookupAction> {
    reducer_fn(move |state: &mut LookupState, action| match action {
        LookupAction::QueryChanged(query) => {
            state.query = query.clone();
            if query.is_empty() {
                state.result = Loadable::Idle;
                return Effect::cancel(Lookup);
            }
            state.result = Loadable::loading();
            let backend = backend.clone();
            Effect::debounce(Lookup, delay, move |sender| async move {
                let result = Loadable::load(backend.lookup(query)).await;
                sender.send(LookupAction::Found(result)).await;
            })
        }
        LookupAction::Found(result) => {
            state.result = result;
            Effect::none()
        }
    })
}
