use crate::{Action, Loadable, State};

mod store_test;

crate::cancel_ids! { Fetch, Ticker }

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Counter {
    pub value: i64,
}

impl State for Counter {}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TestState {
    pub log: Vec<String>,
    pub data: Loadable<String>,
    pub counter: Counter,
}

impl State for TestState {}

#[derive(Clone, Debug, PartialEq)]
pub enum CounterAction {
    Add(i64),
    AddLater(i64),
}

impl Action for CounterAction {}

#[derive(Clone, Debug, PartialEq)]
pub enum TestAction {
    Trigger(u32),
    Stop,
    Push(String),
    Loaded(Loadable<String>),
    Counter(CounterAction),
}

impl Action for TestAction {}

impl TestState {
    /// Applies the actions whose meaning is the same in every test.
    pub fn apply(&mut self, action: TestAction) {
        match action {
            TestAction::Push(entry) => self.log.push(entry),
            TestAction::Loaded(loadable) => self.data = loadable,
            TestAction::Counter(CounterAction::Add(amount)) => self.counter.value += amount,
            _ => {}
        }
    }
}

pub fn push(entry: &str) -> TestAction {
    TestAction::Push(entry.to_string())
}
