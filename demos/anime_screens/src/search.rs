use crate::models::Anime;
use crate::settings::SEARCHED_ITEMS;
use crate::{Environment, SearchConfig, SettingsExt};
use storerx::{Action, Effect, Loadable, Reducer, State};

storerx::cancel_ids! { pub SearchDebounce }

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub results: Loadable<Vec<Anime>>,
    /// Recent queries, newest first.
    pub history: Vec<String>,
}

impl State for SearchState {}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchAction {
    OnAppear,
    QueryChanged(String),
    SearchResult(Loadable<Vec<Anime>>),
    SearchHistory(Vec<String>),
    ClearSearchHistory,
    OnAnimeTapped(Anime),
}

impl Action for SearchAction {}

pub struct SearchReducer {
    env: Environment,
    config: SearchConfig,
}

impl SearchReducer {
    pub fn new(env: Environment) -> Self {
        Self::with_config(env, SearchConfig::default())
    }

    pub fn with_config(env: Environment, config: SearchConfig) -> Self {
        SearchReducer { env, config }
    }

    fn persist_history(&self, state: &SearchState) -> Effect<SearchAction> {
        let settings = self.env.settings.clone();
        let history = state.history.clone();
        Effect::fire_and_forget(async move { settings.store(&SEARCHED_ITEMS, &history) })
    }
}

/// Moves `query` to the front of `history`, keeping at most `limit` entries.
fn remember(history: &mut Vec<String>, query: &str, limit: usize) {
    history.retain(|entry| entry != query);
    while !history.is_empty() && history.len() >= limit {
        history.pop();
    }
    history.insert(0, query.to_string());
}

impl Reducer for SearchReducer {
    type State = SearchState;
    type Action = SearchAction;

    fn reduce(&self, state: &mut SearchState, action: SearchAction) -> Effect<SearchAction> {
        match action {
            SearchAction::OnAppear => {
                let settings = self.env.settings.clone();
                Effect::run(move |sender| async move {
                    let history = settings.load(&SEARCHED_ITEMS);
                    sender.send(SearchAction::SearchHistory(history)).await;
                })
            }
            SearchAction::SearchHistory(history) => {
                state.history = history;
                Effect::none()
            }
            SearchAction::QueryChanged(query) => {
                state.query = query.clone();
                if query.is_empty() {
                    state.results = Loadable::Idle;
                    return Effect::cancel(SearchDebounce);
                }
                state.results = Loadable::loading();

                let client = self.env.anime.clone();
                Effect::debounce(SearchDebounce, self.config.debounce, move |sender| async move {
                    let results = Loadable::load(client.search_animes(query)).await;
                    sender.send(SearchAction::SearchResult(results)).await;
                })
            }
            SearchAction::SearchResult(results) => {
                state.results = results;
                Effect::none()
            }
            SearchAction::OnAnimeTapped(_) => {
                remember(&mut state.history, &state.query, self.config.history_limit);
                self.persist_history(state)
            }
            SearchAction::ClearSearchHistory => {
                state.history.clear();
                self.persist_history(state)
            }
        }
    }
}
