//! Streaming-provider picker embedded in the detail screen.

use crate::models::{AnimeId, StreamingProvider};
use crate::AnimeClient;
use std::collections::BTreeMap;
use std::sync::Arc;
use storerx::{Action, Effect, Loadable, Reducer, State};

storerx::cancel_ids! { pub FetchEpisodes }

#[derive(Debug, Clone, PartialEq)]
pub struct StreamState {
    pub anime_id: AnimeId,
    pub available_providers: Vec<String>,
    pub selected_provider: Option<String>,
    pub streaming_providers: BTreeMap<String, Loadable<StreamingProvider>>,
}

impl State for StreamState {}

impl StreamState {
    /// Starts with the first of `available_providers` selected.
    pub fn new(anime_id: AnimeId, available_providers: Vec<String>) -> Self {
        StreamState {
            anime_id,
            selected_provider: available_providers.first().cloned(),
            available_providers,
            streaming_providers: BTreeMap::new(),
        }
    }

    /// Episodes of the selected provider, if one is selected.
    pub fn selected(&self) -> Option<&Loadable<StreamingProvider>> {
        let name = self.selected_provider.as_ref()?;
        self.streaming_providers.get(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamAction {
    Initialize,
    SelectProvider(String),
    FetchedProvider(String, Loadable<StreamingProvider>),
    Destroy,
}

impl Action for StreamAction {}

pub struct StreamReducer {
    client: Arc<dyn AnimeClient>,
}

impl StreamReducer {
    pub fn new(client: Arc<dyn AnimeClient>) -> Self {
        StreamReducer { client }
    }

    /// Fetches `name` unless it is already loaded. A newer fetch replaces an older one.
    fn fetch(&self, state: &mut StreamState, name: String) -> Effect<StreamAction> {
        if state
            .streaming_providers
            .get(&name)
            .is_some_and(Loadable::is_success)
        {
            return Effect::none();
        }
        state
            .streaming_providers
            .insert(name.clone(), Loadable::loading());

        let client = self.client.clone();
        let anime_id = state.anime_id;
        let provider = name.clone();
        Effect::task(
            async move { client.get_episodes(anime_id, provider).await },
            move |loadable| StreamAction::FetchedProvider(name, loadable),
        )
        .cancellable(FetchEpisodes, true)
    }
}

impl Reducer for StreamReducer {
    type State = StreamState;
    type Action = StreamAction;

    fn reduce(&self, state: &mut StreamState, action: StreamAction) -> Effect<StreamAction> {
        match action {
            StreamAction::Initialize => match state.selected_provider.clone() {
                Some(name) => self.fetch(state, name),
                None => Effect::none(),
            },
            StreamAction::SelectProvider(name) => {
                if !state.available_providers.contains(&name) {
                    return Effect::none();
                }
                state.selected_provider = Some(name.clone());
                self.fetch(state, name)
            }
            StreamAction::FetchedProvider(name, loadable) => {
                state.streaming_providers.insert(name, loadable);
                Effect::none()
            }
            StreamAction::Destroy => Effect::cancel(FetchEpisodes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{AnimeCall, MockAnimeClient};
    use crate::models::Episode;
    use storerx::Store;

    fn providers() -> Vec<String> {
        vec!["gogo".to_string(), "zoro".to_string()]
    }

    fn client() -> MockAnimeClient {
        MockAnimeClient::new()
            .with_episodes("gogo", vec![Episode::new(1, "Pilot")])
            .with_episodes("zoro", vec![Episode::new(1, "Pilot"), Episode::new(2, "Two")])
    }

    #[tokio::test]
    async fn test_initialize_loads_the_selected_provider() {
        let client = client();
        let store = Store::new(
            StreamReducer::new(Arc::new(client.clone())),
            StreamState::new(5, providers()),
        );

        store.send(StreamAction::Initialize);
        assert_eq!(store.state().selected(), Some(&Loadable::Loading));

        let state = store
            .wait_for(|state| state.selected().is_some_and(Loadable::is_finished))
            .await;
        let episodes = state.selected().and_then(Loadable::value).map(|p| p.episodes.len());
        assert_eq!(episodes, Some(1));
        assert_eq!(client.calls(), vec![AnimeCall::GetEpisodes(5, "gogo".to_string())]);
    }

    #[tokio::test]
    async fn test_loaded_provider_is_not_fetched_again() {
        let client = client();
        let store = Store::new(
            StreamReducer::new(Arc::new(client.clone())),
            StreamState::new(5, providers()),
        );

        store.send(StreamAction::Initialize);
        store
            .wait_for(|state| state.selected().is_some_and(Loadable::is_success))
            .await;
        store.send(StreamAction::SelectProvider("zoro".to_string()));
        store
            .wait_for(|state| state.selected().is_some_and(Loadable::is_success))
            .await;
        store.send(StreamAction::SelectProvider("gogo".to_string()));

        assert_eq!(store.state().selected_provider.as_deref(), Some("gogo"));
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_ignored() {
        let store = Store::new(
            StreamReducer::new(Arc::new(client())),
            StreamState::new(5, providers()),
        );
        store.send(StreamAction::SelectProvider("nowhere".to_string()));
        assert_eq!(store.state(), StreamState::new(5, providers()));
    }

    #[tokio::test]
    async fn test_destroy_drops_the_pending_fetch() {
        let client = client().with_delay(std::time::Duration::from_millis(30));
        let store = Store::new(
            StreamReducer::new(Arc::new(client)),
            StreamState::new(5, providers()),
        );

        store.send(StreamAction::Initialize);
        store.send(StreamAction::Destroy);
        assert!(!store.registry().is_registered(FetchEpisodes));

        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        assert_eq!(store.state().selected(), Some(&Loadable::Loading));
    }
}
