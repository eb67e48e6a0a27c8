use crate::unit_tests::{push, Fetch, Ticker, TestAction, TestState};
use crate::{reducer_fn, Effect, Store};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test]
async fn test_store_initialization() {
    let initial_state = TestState {
        log: vec!["initial".to_string()],
        ..TestState::default()
    };
    let store = Store::new(
        reducer_fn(|state: &mut TestState, action| {
            state.apply(action);
            Effect::none()
        }),
        initial_state.clone(),
    );

    assert_eq!(store.state(), initial_state);
    assert_eq!(store.with_state(|state| state.log.len()), 1);
}

// send applies the transition before returning
#[tokio::test]
async fn test_send_reduces_synchronously() {
    let store = Store::new(
        reducer_fn(|state: &mut TestState, action| {
            state.apply(action);
            Effect::none()
        }),
        TestState::default(),
    );

    store.send(push("a"));
    store.send(push("b"));
    assert_eq!(store.state().log, vec!["a", "b"]);
}

#[tokio::test]
async fn test_effect_send_lands_on_a_later_turn() {
    let store = Store::new(
        reducer_fn(|state: &mut TestState, action| match action {
            TestAction::Trigger(_) => {
                state.log.push("now".to_string());
                Effect::send(push("later"))
            }
            other => {
                state.apply(other);
                Effect::none()
            }
        }),
        TestState::default(),
    );

    store.send(TestAction::Trigger(0));
    assert_eq!(store.state().log, vec!["now"]);

    let state = store.wait_for(|state| state.log.len() == 2).await;
    assert_eq!(state.log, vec!["now", "later"]);
}

#[tokio::test]
async fn test_run_preserves_emission_order() {
    let store = Store::new(
        reducer_fn(|state: &mut TestState, action| match action {
            TestAction::Trigger(count) => Effect::run(move |sender| async move {
                for i in 0..count {
                    sender.send(TestAction::Push(i.to_string())).await;
                }
            }),
            other => {
                state.apply(other);
                Effect::none()
            }
        }),
        TestState::default(),
    );

    store.send(TestAction::Trigger(5));
    let state = store.wait_for(|state| state.log.len() == 5).await;
    assert_eq!(state.log, vec!["0", "1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_cancel_in_flight_keeps_only_the_last_unit() {
    let store = Store::new(
        reducer_fn(|state: &mut TestState, action| match action {
            TestAction::Trigger(n) => Effect::run(move |sender| async move {
                sleep(Duration::from_millis(50)).await;
                sender.send(TestAction::Push(n.to_string())).await;
            })
            .cancellable(Fetch, true),
            other => {
                state.apply(other);
                Effect::none()
            }
        }),
        TestState::default(),
    );

    store.send(TestAction::Trigger(1));
    store.send(TestAction::Trigger(2));
    store.send(TestAction::Trigger(3));
    assert_eq!(store.registry().in_flight(Fetch), 1);

    store.wait_for(|state| !state.log.is_empty()).await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(store.state().log, vec!["3"]);
    assert!(!store.registry().is_registered(Fetch));
}

#[tokio::test]
async fn test_cancel_effect_stops_a_running_unit() {
    let store = Store::new(
        reducer_fn(|state: &mut TestState, action| match action {
            TestAction::Trigger(_) => Effect::run(|sender| async move {
                let mut tick = 0;
                while !sender.is_cancelled() {
                    sender.send(TestAction::Push(format!("tick {tick}"))).await;
                    tick += 1;
                    sleep(Duration::from_millis(5)).await;
                }
            })
            .cancellable(Ticker, false),
            TestAction::Stop => Effect::cancel(Ticker),
            other => {
                state.apply(other);
                Effect::none()
            }
        }),
        TestState::default(),
    );

    store.send(TestAction::Trigger(0));
    store.wait_for(|state| state.log.len() >= 3).await;
    store.send(TestAction::Stop);
    assert!(!store.registry().is_registered(Ticker));

    let stopped_at = store.state().log.len();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(store.state().log.len(), stopped_at);
}

// An action already queued by a unit is discarded once the unit is cancelled.
#[tokio::test]
async fn test_queued_action_from_cancelled_unit_is_dropped() {
    let store = Store::new(
        reducer_fn(|state: &mut TestState, action| match action {
            TestAction::Trigger(_) => Effect::merge([
                Effect::send(TestAction::Stop),
                Effect::run(|sender| async move {
                    sender.send(push("late")).await;
                })
                .cancellable(Fetch, false),
            ]),
            TestAction::Stop => {
                state.log.push("stopped".to_string());
                Effect::cancel(Fetch)
            }
            other => {
                state.apply(other);
                Effect::none()
            }
        }),
        TestState::default(),
    );

    store.send(TestAction::Trigger(0));
    store.wait_for(|state| !state.log.is_empty()).await;
    sleep(Duration::from_millis(30)).await;
    assert_eq!(store.state().log, vec!["stopped"]);
}

#[tokio::test]
async fn test_cancel_all() {
    let store = Store::new(
        reducer_fn(|_: &mut TestState, action| match action {
            TestAction::Trigger(_) => Effect::merge([
                Effect::run(|sender| async move { sender.cancelled().await })
                    .cancellable(Fetch, false),
                Effect::run(|sender| async move { sender.cancelled().await })
                    .cancellable(Ticker, false),
            ]),
            _ => Effect::none(),
        }),
        TestState::default(),
    );

    store.send(TestAction::Trigger(0));
    assert!(store.registry().is_registered(Fetch));
    assert!(store.registry().is_registered(Ticker));

    store.cancel_all();
    assert!(!store.registry().is_registered(Fetch));
    assert!(!store.registry().is_registered(Ticker));
}

#[tokio::test]
async fn test_to_stream_sees_every_settled_state() {
    use crate::StoreStreamExt;
    use futures::StreamExt;

    let store = Store::new(
        reducer_fn(|state: &mut TestState, action| {
            state.apply(action);
            Effect::none()
        }),
        TestState::default(),
    );

    let sizes: Vec<usize> = store
        .to_stream()
        .take(1)
        .map(|state| state.log.len())
        .collect()
        .await;
    assert_eq!(sizes, vec![0]);

    store.send(push("x"));
    let last = store
        .to_stream()
        .stop_if(|state| state.log.len() == 1)
        .fold(None, |_, state| async move { Some(state) })
        .await;
    assert_eq!(last.map(|state| state.log), Some(vec!["x".to_string()]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scheduled_sends_keep_their_order_across_workers() {
    let store = Store::new(
        reducer_fn(|state: &mut TestState, action| match action {
            TestAction::Trigger(n) => Effect::send(push(&format!("early {n}"))),
            TestAction::Stop => Effect::concatenate([
                Effect::cancel(Fetch),
                Effect::send(push("late")),
            ]),
            other => {
                state.apply(other);
                Effect::none()
            }
        }),
        TestState::default(),
    );

    for n in 0..200 {
        store.send(TestAction::Trigger(n));
        store.send(TestAction::Stop);
        let expected = 2 * (n as usize + 1);
        let state = store.wait_for(|state| state.log.len() == expected).await;
        assert_eq!(state.log[expected - 2], format!("early {n}"));
        assert_eq!(state.log[expected - 1], "late");
    }
}

#[tokio::test]
async fn test_dropping_the_store_ends_running_units() {
    let (_tx, rx) = futures::channel::mpsc::unbounded::<String>();
    let rx = std::sync::Mutex::new(Some(rx));
    let store = Store::new(
        reducer_fn(move |state: &mut TestState, action| match action {
            TestAction::Trigger(_) => match rx.lock().unwrap().take() {
                Some(rx) => Effect::observe(Ticker, rx, TestAction::Push),
                None => Effect::none(),
            },
            other => {
                state.apply(other);
                Effect::none()
            }
        }),
        TestState::default(),
    );

    store.send(TestAction::Trigger(0));
    let registry = store.registry().clone();
    assert!(registry.is_registered(Ticker));

    drop(store);
    sleep(Duration::from_millis(20)).await;
    assert!(!registry.is_registered(Ticker));
}

#[tokio::test]
async fn test_scoped_store_keeps_units_alive() {
    let store = Store::new(
        reducer_fn(|_: &mut TestState, action| match action {
            TestAction::Trigger(_) => {
                Effect::run(|sender| async move { sender.cancelled().await })
                    .cancellable(Fetch, false)
            }
            _ => Effect::none(),
        }),
        TestState::default(),
    );
    let registry = store.registry().clone();
    let scoped = store.scope(|state: &TestState| state.counter.clone(), TestAction::Counter);

    store.send(TestAction::Trigger(0));
    drop(store);
    sleep(Duration::from_millis(20)).await;
    assert!(registry.is_registered(Fetch));

    drop(scoped);
    sleep(Duration::from_millis(20)).await;
    assert!(!registry.is_registered(Fetch));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_send_from_a_plain_thread() {
    let store = Store::new(
        reducer_fn(|state: &mut TestState, action| match action {
            TestAction::Trigger(_) => Effect::send(push("from effect")),
            other => {
                state.apply(other);
                Effect::none()
            }
        }),
        TestState::default(),
    );

    let remote = store.clone();
    std::thread::spawn(move || remote.send(TestAction::Trigger(0)))
        .join()
        .unwrap();

    let state = store.wait_for(|state| !state.log.is_empty()).await;
    assert_eq!(state.log, vec!["from effect"]);
}
