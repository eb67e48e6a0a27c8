mod common;

use anime_screens::search::{SearchAction, SearchDebounce, SearchReducer, SearchState};
use anime_screens::settings::SEARCHED_ITEMS;
use anime_screens::{SearchConfig, SettingsExt};
use common::{naruto, Fixture};
use std::time::Duration;
use storerx::mock::{assert, RecordingReducer};
use storerx::{Loadable, Store};
use tokio::time::sleep;

const DEBOUNCE: Duration = Duration::from_millis(30);

fn config() -> SearchConfig {
    SearchConfig {
        debounce: DEBOUNCE,
        ..SearchConfig::default()
    }
}

fn search_store(fixture: &Fixture) -> Store<SearchState, SearchAction> {
    Store::new(
        SearchReducer::with_config(fixture.env(), config()),
        SearchState::default(),
    )
}

fn tap(store: &Store<SearchState, SearchAction>, query: &str) {
    store.send(SearchAction::QueryChanged(query.to_string()));
    store.send(SearchAction::OnAnimeTapped(naruto()));
}

#[tokio::test]
async fn test_typing_sends_only_the_last_query() {
    let fixture = Fixture::new();
    let (reducer, recorder) =
        RecordingReducer::new(SearchReducer::with_config(fixture.env(), config()));
    let store = Store::new(reducer, SearchState::default());

    let typed = ["n", "na", "nar", "naru", "naruto"];
    for query in typed {
        store.send(SearchAction::QueryChanged(query.to_string()));
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(store.state().results, Loadable::Loading);

    let state = store.wait_for(|state| state.results.is_finished()).await;
    assert_eq!(fixture.client.search_queries(), vec!["naruto"]);

    let titles: Vec<&str> = state
        .results
        .value()
        .map(|animes| animes.iter().map(|anime| anime.title.as_str()).collect())
        .unwrap_or_default();
    assert_eq!(titles, vec!["Naruto", "Naruto Shippuden"]);

    let mut expected: Vec<SearchAction> = typed
        .iter()
        .map(|query| SearchAction::QueryChanged(query.to_string()))
        .collect();
    expected.push(SearchAction::SearchResult(state.results.clone()));
    assert::assert_action_sequence(&recorder, &expected);
}

#[tokio::test]
async fn test_empty_query_resets_and_cancels() {
    let fixture = Fixture::new();
    let store = search_store(&fixture);

    store.send(SearchAction::QueryChanged("bleach".to_string()));
    assert!(store.registry().is_registered(SearchDebounce));

    store.send(SearchAction::QueryChanged(String::new()));
    assert!(!store.registry().is_registered(SearchDebounce));
    assert_eq!(store.state().results, Loadable::Idle);

    sleep(DEBOUNCE * 3).await;
    assert!(fixture.client.search_queries().is_empty());
    assert_eq!(store.state().results, Loadable::Idle);
}

#[tokio::test]
async fn test_same_query_twice_restarts_the_debounce() {
    let fixture = Fixture::new();
    let store = search_store(&fixture);

    store.send(SearchAction::QueryChanged("bleach".to_string()));
    sleep(DEBOUNCE / 2).await;
    store.send(SearchAction::QueryChanged("bleach".to_string()));

    store.wait_for(|state| state.results.is_finished()).await;
    sleep(DEBOUNCE * 2).await;
    assert_eq!(fixture.client.search_queries(), vec!["bleach"]);
}

#[tokio::test]
async fn test_history_is_loaded_on_appear() {
    let fixture = Fixture::new();
    let saved = vec!["one piece".to_string(), "bleach".to_string()];
    fixture.settings.store(&SEARCHED_ITEMS, &saved).unwrap();
    let store = search_store(&fixture);

    store.send(SearchAction::OnAppear);
    let state = store.wait_for(|state| !state.history.is_empty()).await;
    assert_eq!(state.history, saved);
}

#[tokio::test]
async fn test_history_is_capped_and_deduplicated() {
    let fixture = Fixture::new();
    let store = search_store(&fixture);

    for n in 0..12 {
        tap(&store, &format!("query {n}"));
    }
    let history = store.state().history;
    assert_eq!(history.len(), 10);
    assert_eq!(history.first().map(String::as_str), Some("query 11"));
    assert_eq!(history.last().map(String::as_str), Some("query 2"));

    tap(&store, "query 5");
    let history = store.state().history;
    assert_eq!(history.len(), 10);
    assert_eq!(history.first().map(String::as_str), Some("query 5"));
    assert_eq!(history.iter().filter(|entry| *entry == "query 5").count(), 1);

    sleep(Duration::from_millis(10)).await;
    assert_eq!(fixture.settings.load(&SEARCHED_ITEMS), history);
}

#[tokio::test]
async fn test_clear_history_persists() {
    let fixture = Fixture::new();
    let store = search_store(&fixture);

    tap(&store, "bleach");
    sleep(Duration::from_millis(10)).await;
    assert_eq!(fixture.settings.load(&SEARCHED_ITEMS), vec!["bleach".to_string()]);

    store.send(SearchAction::ClearSearchHistory);
    assert!(store.state().history.is_empty());
    sleep(Duration::from_millis(10)).await;
    assert!(fixture.settings.load(&SEARCHED_ITEMS).is_empty());
}

#[tokio::test]
async fn test_failed_history_write_does_not_affect_state() {
    let fixture = Fixture::new();
    fixture.settings.reject_writes(true);
    let store = search_store(&fixture);

    tap(&store, "bleach");
    sleep(Duration::from_millis(10)).await;
    assert_eq!(store.state().history, vec!["bleach".to_string()]);
    assert!(fixture.settings.load(&SEARCHED_ITEMS).is_empty());
}

#[tokio::test]
async fn test_tap_with_empty_query_is_remembered() {
    let fixture = Fixture::new();
    let store = search_store(&fixture);

    tap(&store, "bleach");
    store.send(SearchAction::QueryChanged(String::new()));
    store.send(SearchAction::OnAnimeTapped(naruto()));

    let history = store.state().history;
    assert_eq!(history, vec![String::new(), "bleach".to_string()]);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(fixture.settings.load(&SEARCHED_ITEMS), history);
}
