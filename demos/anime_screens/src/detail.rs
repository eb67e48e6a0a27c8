//! Anime detail screen.
//!
//! Opening the screen fetches the anime, then keeps three observations running
//! for as long as the screen is shown: the locally cached row, the user's
//! collections and the episode downloads. Closing the screen tears all of them
//! down before the parent is told to dismiss it.

use crate::models::{
    Anime, AnimeField, AnimeId, AnimeStore, CollectionStore, DownloadedAnime, Episode,
    EpisodeNumber, EpisodeStorage, StreamingProvider,
};
use crate::settings::{COMPACT_EPISODES, EPISODES_DESCENDING_ORDER};
use crate::stream::{StreamAction, StreamReducer, StreamState};
use crate::{ClientError, DetailConfig, Environment, SettingsExt};
use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use std::collections::BTreeSet;
use storerx::{Action, Effect, Loadable, Reducer, State};

pub use crate::stream::FetchEpisodes;

storerx::cancel_ids! {
    pub FetchAnime,
    pub ObserveAnimeStore,
    pub ObserveCollections,
    pub ObserveDownloads,
    pub FavoriteWrite,
    pub CollectionWrite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailState {
    pub anime_id: AnimeId,
    pub anime: Loadable<Anime>,
    pub anime_store: Loadable<AnimeStore>,
    pub collection_stores: Loadable<Vec<CollectionStore>>,
    pub episodes_status: BTreeSet<EpisodeStorage>,
    pub compact_episodes: bool,
    pub episodes_descending_order: bool,
    pub stream: StreamState,
    /// Set once the parent has been asked to dismiss the screen.
    pub dismissed: bool,
}

impl State for DetailState {}

impl DetailState {
    pub fn new(anime_id: AnimeId, available_providers: Vec<String>) -> Self {
        DetailState {
            anime_id,
            anime: Loadable::Idle,
            anime_store: Loadable::Idle,
            collection_stores: Loadable::Idle,
            episodes_status: BTreeSet::new(),
            compact_episodes: false,
            episodes_descending_order: true,
            stream: StreamState::new(anime_id, available_providers),
            dismissed: false,
        }
    }

    /// A screen opened from an anime that is already loaded, e.g. from search results.
    pub fn with_anime(anime: Anime, available_providers: Vec<String>) -> Self {
        DetailState {
            anime: Loadable::Success(anime.clone()),
            ..DetailState::new(anime.id, available_providers)
        }
    }

    pub fn is_loading_anime(&self) -> bool {
        match self.anime.value() {
            None => !self.anime.is_finished(),
            Some(anime) => {
                !anime.is_upcoming()
                    && (!self.anime_store.is_finished() || !self.collection_stores.is_finished())
            }
        }
    }

    pub fn is_in_a_collection(&self) -> bool {
        self.collection_stores
            .value()
            .is_some_and(|collections| collections.iter().any(|c| c.contains(self.anime_id)))
    }

    pub fn streaming_provider(&self) -> Option<&Loadable<StreamingProvider>> {
        self.stream.selected()
    }

    pub fn episodes(&self) -> Loadable<Vec<Episode>> {
        match self.streaming_provider() {
            Some(provider) => provider.clone().map(|provider| provider.episodes),
            None => Loadable::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailAction {
    OnAppear,
    RetryAnimeFetch,
    TappedFavorite,
    AddToCollectionToggle,
    CloseButtonPressed,
    Close,
    ToggleCompactEpisodes,
    ToggleEpisodeOrder,
    TappedCollectionList,
    ShowCollectionsList(AnimeId, Vec<CollectionStore>),
    MarkEpisodeAsWatched(EpisodeNumber),
    MarkEpisodeAsUnwatched(EpisodeNumber),
    FetchedAnime(Loadable<Anime>),
    SelectedEpisode(EpisodeNumber),
    Play {
        anime: Anime,
        provider: StreamingProvider,
        selected: EpisodeNumber,
    },
    EpisodesStatus(BTreeSet<EpisodeStorage>),
    RemoveDownload(EpisodeNumber),
    RetryDownload(EpisodeNumber),
    CancelDownload(EpisodeNumber),
    FetchedAnimeStore(Vec<AnimeStore>),
    FetchedCollectionStores(Vec<CollectionStore>),
    Stream(StreamAction),
}

impl Action for DetailAction {}

pub struct DetailReducer {
    env: Environment,
    config: DetailConfig,
    stream: StreamReducer,
}

impl DetailReducer {
    pub fn new(env: Environment) -> Self {
        Self::with_config(env, DetailConfig::default())
    }

    pub fn with_config(env: Environment, config: DetailConfig) -> Self {
        DetailReducer {
            stream: StreamReducer::new(env.anime.clone()),
            env,
            config,
        }
    }

    fn fetch_anime(&self, state: &mut DetailState) -> Effect<DetailAction> {
        state.anime = Loadable::loading();
        let client = self.env.anime.clone();
        let anime_id = state.anime_id;
        Effect::task(
            async move { client.get_anime(anime_id).await },
            DetailAction::FetchedAnime,
        )
        .cancellable(FetchAnime, true)
    }

    /// Starts the observations the loaded anime needs. Each kind starts at most once.
    fn start_observations(&self, state: &mut DetailState) -> Effect<DetailAction> {
        let Some(anime) = state.anime.value() else {
            return Effect::none();
        };
        let anime_id = anime.id;
        let mut effects = Vec::new();

        if !anime.is_upcoming() {
            effects.push(Effect::send(DetailAction::Stream(StreamAction::Initialize)));

            let downloader = self.env.downloader.clone();
            effects.push(
                Effect::observe(
                    ObserveDownloads,
                    deferred(move || downloader.observe(anime_id)),
                    |animes: Vec<DownloadedAnime>| {
                        let episodes = animes
                            .into_iter()
                            .next()
                            .map(|anime| anime.episodes)
                            .unwrap_or_default();
                        DetailAction::EpisodesStatus(episodes)
                    },
                )
                .cancellable(ObserveDownloads, true),
            );
        }

        if !state.anime_store.has_initialized() {
            state.anime_store = Loadable::loading();
            let database = self.env.database.clone();
            effects.push(Effect::observe(
                ObserveAnimeStore,
                deferred(move || database.observe_anime_store(anime_id)),
                DetailAction::FetchedAnimeStore,
            ));
        }

        if !state.collection_stores.has_initialized() {
            state.collection_stores = Loadable::loading();
            let database = self.env.database.clone();
            effects.push(Effect::observe(
                ObserveCollections,
                deferred(move || database.observe_collections()),
                DetailAction::FetchedCollectionStores,
            ));
        }

        Effect::merge(effects)
    }

    fn toggle_favorite(&self, state: &DetailState) -> Effect<DetailAction> {
        let Some(mut anime_store) = state.anime_store.value().cloned() else {
            return Effect::none();
        };
        anime_store.is_favorite = !anime_store.is_favorite;

        let database = self.env.database.clone();
        Effect::run(move |_| async move {
            let field = AnimeField::IsFavorite(anime_store.is_favorite);
            if !database.update_anime(anime_store.id, field).await? {
                database.insert_anime_store(anime_store).await?;
            }
            Ok::<_, ClientError>(())
        })
        .cancellable(FavoriteWrite, true)
    }

    fn toggle_planning(&self, state: &DetailState) -> Effect<DetailAction> {
        let (Some(anime_store), Some(collections)) =
            (state.anime_store.value(), state.collection_stores.value())
        else {
            return Effect::none();
        };
        let Some(mut planning) = collections
            .iter()
            .find(|collection| collection.title == self.config.planning_collection)
            .cloned()
        else {
            return Effect::none();
        };
        planning.toggle(anime_store);

        let database = self.env.database.clone();
        Effect::run(move |_| async move { database.insert_collection(planning).await })
            .cancellable(CollectionWrite, true)
    }

    fn mark_watched(&self, state: &DetailState, number: EpisodeNumber) -> Effect<DetailAction> {
        let Some(mut anime_store) = state.anime_store.value().cloned() else {
            return Effect::none();
        };
        let episodes = state.episodes();
        let Some(episode) = episodes
            .value()
            .and_then(|episodes| episodes.iter().find(|e| e.number == number))
        else {
            return Effect::none();
        };
        anime_store.update_progress(episode, 1.0);

        let database = self.env.database.clone();
        Effect::fire_and_forget(async move { database.insert_anime_store(anime_store).await })
    }

    fn mark_unwatched(&self, state: &DetailState, number: EpisodeNumber) -> Effect<DetailAction> {
        let Some(anime_store) = state.anime_store.value() else {
            return Effect::none();
        };
        if anime_store.episode(number).is_none() {
            return Effect::none();
        }

        let database = self.env.database.clone();
        let field = AnimeField::EpisodeProgress {
            number,
            progress: None,
        };
        let anime_id = anime_store.id;
        Effect::fire_and_forget(async move {
            database.update_anime(anime_id, field).await.map(|_| ())
        })
    }

    fn play(&self, state: &DetailState, selected: EpisodeNumber) -> Effect<DetailAction> {
        let (Some(anime), Some(provider)) = (
            state.anime.value(),
            state.streaming_provider().and_then(Loadable::value),
        ) else {
            return Effect::none();
        };
        Effect::send(DetailAction::Play {
            anime: anime.clone(),
            provider: provider.clone(),
            selected,
        })
    }

    fn download_call<F>(&self, state: &DetailState, call: F) -> Effect<DetailAction>
    where
        F: FnOnce(AnimeId) -> BoxFuture<'static, ()> + Send + 'static,
    {
        let anime_id = state.anime_id;
        Effect::fire_and_forget(async move { call(anime_id).await })
    }

    fn core(&self, state: &mut DetailState, action: DetailAction) -> Effect<DetailAction> {
        match action {
            DetailAction::OnAppear => {
                state.compact_episodes = self.env.settings.load(&COMPACT_EPISODES);
                state.episodes_descending_order =
                    self.env.settings.load(&EPISODES_DESCENDING_ORDER);

                if !state.anime.has_initialized() {
                    self.fetch_anime(state)
                } else if state.anime.is_success() {
                    self.start_observations(state)
                } else {
                    Effect::none()
                }
            }
            DetailAction::RetryAnimeFetch => {
                if state.anime.is_finished() {
                    self.fetch_anime(state)
                } else {
                    Effect::none()
                }
            }
            DetailAction::FetchedAnime(loaded) => {
                let succeeded = loaded.is_success();
                state.anime = loaded;
                if succeeded {
                    self.start_observations(state)
                } else {
                    Effect::none()
                }
            }
            DetailAction::FetchedAnimeStore(rows) => {
                if let Some(anime) = state.anime.value() {
                    state.anime_store = Loadable::Success(AnimeStore::find_or_create(anime, rows));
                }
                Effect::none()
            }
            DetailAction::FetchedCollectionStores(collections) => {
                state.collection_stores = Loadable::Success(collections);
                Effect::none()
            }
            DetailAction::EpisodesStatus(episodes) => {
                state.episodes_status = episodes;
                Effect::none()
            }
            DetailAction::TappedFavorite => self.toggle_favorite(state),
            DetailAction::AddToCollectionToggle => self.toggle_planning(state),
            DetailAction::MarkEpisodeAsWatched(number) => self.mark_watched(state, number),
            DetailAction::MarkEpisodeAsUnwatched(number) => self.mark_unwatched(state, number),
            DetailAction::SelectedEpisode(number) => self.play(state, number),
            DetailAction::ToggleCompactEpisodes => {
                state.compact_episodes = !state.compact_episodes;
                let settings = self.env.settings.clone();
                let value = state.compact_episodes;
                Effect::fire_and_forget(async move { settings.store(&COMPACT_EPISODES, &value) })
            }
            DetailAction::ToggleEpisodeOrder => {
                state.episodes_descending_order = !state.episodes_descending_order;
                let settings = self.env.settings.clone();
                let value = state.episodes_descending_order;
                Effect::fire_and_forget(async move {
                    settings.store(&EPISODES_DESCENDING_ORDER, &value)
                })
            }
            DetailAction::TappedCollectionList => {
                let collections = state.collection_stores.value().cloned().unwrap_or_default();
                Effect::send(DetailAction::ShowCollectionsList(state.anime_id, collections))
            }
            DetailAction::RemoveDownload(number) => {
                let downloader = self.env.downloader.clone();
                self.download_call(state, move |id| downloader.delete(id, number))
            }
            DetailAction::RetryDownload(number) => {
                let downloader = self.env.downloader.clone();
                self.download_call(state, move |id| downloader.retry(id, number))
            }
            DetailAction::CancelDownload(number) => {
                let downloader = self.env.downloader.clone();
                self.download_call(state, move |id| downloader.cancel(id, number))
            }
            DetailAction::CloseButtonPressed => Effect::concatenate([
                Effect::cancel(FetchAnime),
                Effect::cancel(FetchEpisodes),
                Effect::cancel(ObserveAnimeStore),
                Effect::cancel(ObserveCollections),
                Effect::cancel(ObserveDownloads),
                Effect::send(DetailAction::Stream(StreamAction::Destroy)),
                Effect::send(DetailAction::Close),
            ]),
            DetailAction::Close => {
                state.dismissed = true;
                Effect::none()
            }
            // Handled by the parent screen.
            DetailAction::Play { .. } | DetailAction::ShowCollectionsList(..) => Effect::none(),
            DetailAction::Stream(_) => Effect::none(),
        }
    }
}

impl Reducer for DetailReducer {
    type State = DetailState;
    type Action = DetailAction;

    fn reduce(&self, state: &mut DetailState, action: DetailAction) -> Effect<DetailAction> {
        match action {
            DetailAction::Stream(action) => self
                .stream
                .reduce(&mut state.stream, action)
                .map(DetailAction::Stream),
            action => self.core(state, action),
        }
    }
}

/// Opens the stream returned by `open` on first poll, so the collaborator is only
/// reached once the effect actually runs.
fn deferred<T, F>(open: F) -> impl Stream<Item = T> + Send + 'static
where
    T: Send + 'static,
    F: FnOnce() -> BoxStream<'static, T> + Send + 'static,
{
    stream::once(future::lazy(move |_| open())).flatten()
}
