//! In-memory collaborators for tests and the demo binary.
//!
//! Tables live in futures-signals [`Mutable`]s, so every `observe_*` stream is
//! push based: it yields the current rows right away and again after each write.

use crate::models::{
    Anime, AnimeField, AnimeId, AnimeStore, CollectionStore, DownloadedAnime, Episode,
    EpisodeNumber, EpisodeStorage, StreamingProvider,
};
use crate::{AnimeClient, ClientError, DatabaseClient, DownloaderClient, SettingsClient};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use futures_signals::signal::{Mutable, SignalExt};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    anime_stores: Mutable<Vec<AnimeStore>>,
    collections: Mutable<Vec<CollectionStore>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collections(collections: Vec<CollectionStore>) -> Self {
        let database = Self::default();
        database.collections.set(collections);
        database
    }

    pub fn anime_stores(&self) -> Vec<AnimeStore> {
        self.anime_stores.get_cloned()
    }

    pub fn anime_store(&self, id: AnimeId) -> Option<AnimeStore> {
        self.anime_stores
            .lock_ref()
            .iter()
            .find(|row| row.id == id)
            .cloned()
    }

    pub fn collections(&self) -> Vec<CollectionStore> {
        self.collections.get_cloned()
    }

    pub fn collection(&self, title: &str) -> Option<CollectionStore> {
        self.collections
            .lock_ref()
            .iter()
            .find(|collection| collection.title == title)
            .cloned()
    }
}

impl DatabaseClient for MemoryDatabase {
    fn insert_anime_store(&self, store: AnimeStore) -> BoxFuture<'static, Result<(), ClientError>> {
        let rows = self.anime_stores.clone();
        async move {
            let mut rows = rows.lock_mut();
            match rows.iter_mut().find(|row| row.id == store.id) {
                Some(row) => *row = store,
                None => rows.push(store),
            }
            Ok(())
        }
        .boxed()
    }

    fn insert_collection(
        &self,
        collection: CollectionStore,
    ) -> BoxFuture<'static, Result<(), ClientError>> {
        let collections = self.collections.clone();
        async move {
            let mut collections = collections.lock_mut();
            match collections.iter_mut().find(|c| c.title == collection.title) {
                Some(stored) => *stored = collection,
                None => collections.push(collection),
            }
            Ok(())
        }
        .boxed()
    }

    fn update_anime(
        &self,
        id: AnimeId,
        field: AnimeField,
    ) -> BoxFuture<'static, Result<bool, ClientError>> {
        let rows = self.anime_stores.clone();
        async move {
            let mut rows = rows.lock_mut();
            let updated = rows
                .iter_mut()
                .find(|row| row.id == id)
                .is_some_and(|row| field.apply(row));
            Ok(updated)
        }
        .boxed()
    }

    fn observe_anime_store(&self, id: AnimeId) -> BoxStream<'static, Vec<AnimeStore>> {
        self.anime_stores
            .signal_cloned()
            .to_stream()
            .map(move |rows| rows.into_iter().filter(|row| row.id == id).take(1).collect())
            .boxed()
    }

    fn observe_collections(&self) -> BoxStream<'static, Vec<CollectionStore>> {
        self.collections.signal_cloned().to_stream().boxed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadCall {
    Delete(AnimeId, EpisodeNumber),
    Retry(AnimeId, EpisodeNumber),
    Cancel(AnimeId, EpisodeNumber),
}

#[derive(Clone, Default)]
pub struct MemoryDownloader {
    downloads: Mutable<Vec<DownloadedAnime>>,
    calls: Arc<Mutex<Vec<DownloadCall>>>,
}

impl MemoryDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the download bookkeeping of `id`.
    pub fn set_status(&self, id: AnimeId, episodes: BTreeSet<EpisodeStorage>) {
        let mut downloads = self.downloads.lock_mut();
        downloads.retain(|anime| anime.id != id);
        downloads.push(DownloadedAnime { id, episodes });
    }

    pub fn calls(&self) -> Vec<DownloadCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: DownloadCall) -> BoxFuture<'static, ()> {
        let calls = self.calls.clone();
        let downloads = self.downloads.clone();
        async move {
            lock(&calls).push(call);
            if let DownloadCall::Delete(id, number) = call {
                let mut downloads = downloads.lock_mut();
                for anime in downloads.iter_mut().filter(|anime| anime.id == id) {
                    anime.episodes.retain(|episode| episode.number != number);
                }
            }
        }
        .boxed()
    }
}

impl DownloaderClient for MemoryDownloader {
    fn observe(&self, id: AnimeId) -> BoxStream<'static, Vec<DownloadedAnime>> {
        self.downloads
            .signal_cloned()
            .to_stream()
            .map(move |animes| animes.into_iter().filter(|anime| anime.id == id).collect())
            .boxed()
    }

    fn delete(&self, id: AnimeId, episode: EpisodeNumber) -> BoxFuture<'static, ()> {
        self.record(DownloadCall::Delete(id, episode))
    }

    fn retry(&self, id: AnimeId, episode: EpisodeNumber) -> BoxFuture<'static, ()> {
        self.record(DownloadCall::Retry(id, episode))
    }

    fn cancel(&self, id: AnimeId, episode: EpisodeNumber) -> BoxFuture<'static, ()> {
        self.record(DownloadCall::Cancel(id, episode))
    }
}

/// Settings kept in a map. Writes can be made to fail with [`MemorySettings::reject_writes`].
#[derive(Clone, Default)]
pub struct MemorySettings {
    values: Arc<Mutex<HashMap<String, serde_json::Value>>>,
    read_only: Arc<AtomicBool>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_writes(&self, reject: bool) {
        self.read_only.store(reject, Ordering::SeqCst);
    }
}

impl SettingsClient for MemorySettings {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), ClientError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(ClientError::Storage(format!("{key} is read-only")));
        }
        lock(&self.values).insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimeCall {
    GetAnime(AnimeId),
    SearchAnimes(String),
    GetEpisodes(AnimeId, String),
}

#[derive(Default)]
struct Script {
    catalog: Vec<Anime>,
    episodes: HashMap<String, Vec<Episode>>,
    queued_animes: VecDeque<Result<Anime, ClientError>>,
    calls: Vec<AnimeCall>,
}

/// Scripted [`AnimeClient`].
///
/// Lookups are answered from a catalog unless a result was queued with
/// [`MockAnimeClient::queue_anime`]. Every call is logged when it is made, and
/// every answer is held back by the configured delay.
#[derive(Clone, Default)]
pub struct MockAnimeClient {
    script: Arc<Mutex<Script>>,
    delay: Duration,
}

impl MockAnimeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_anime(self, anime: Anime) -> Self {
        lock(&self.script).catalog.push(anime);
        self
    }

    /// Serves `episodes` for every anime under the provider `name`.
    pub fn with_episodes(self, name: &str, episodes: Vec<Episode>) -> Self {
        lock(&self.script)
            .episodes
            .insert(name.to_string(), episodes);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        MockAnimeClient { delay, ..self }
    }

    /// Answers the next `get_anime` with `result`, whatever the id.
    pub fn queue_anime(&self, result: Result<Anime, ClientError>) {
        lock(&self.script).queued_animes.push_back(result);
    }

    pub fn calls(&self) -> Vec<AnimeCall> {
        lock(&self.script).calls.clone()
    }

    pub fn search_queries(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                AnimeCall::SearchAnimes(query) => Some(query),
                _ => None,
            })
            .collect()
    }

    fn answer<T: Send + 'static>(
        &self,
        result: Result<T, ClientError>,
    ) -> BoxFuture<'static, Result<T, ClientError>> {
        let delay = self.delay;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        }
        .boxed()
    }
}

impl AnimeClient for MockAnimeClient {
    fn get_anime(&self, id: AnimeId) -> BoxFuture<'static, Result<Anime, ClientError>> {
        let result = {
            let mut script = lock(&self.script);
            script.calls.push(AnimeCall::GetAnime(id));
            match script.queued_animes.pop_front() {
                Some(result) => result,
                None => script
                    .catalog
                    .iter()
                    .find(|anime| anime.id == id)
                    .cloned()
                    .ok_or_else(|| ClientError::NotFound(format!("anime {id}"))),
            }
        };
        self.answer(result)
    }

    fn search_animes(&self, query: String) -> BoxFuture<'static, Result<Vec<Anime>, ClientError>> {
        let result = {
            let mut script = lock(&self.script);
            let needle = query.to_lowercase();
            script.calls.push(AnimeCall::SearchAnimes(query));
            Ok(script
                .catalog
                .iter()
                .filter(|anime| anime.title.to_lowercase().contains(&needle))
                .cloned()
                .collect())
        };
        self.answer(result)
    }

    fn get_episodes(
        &self,
        id: AnimeId,
        provider: String,
    ) -> BoxFuture<'static, Result<StreamingProvider, ClientError>> {
        let result = {
            let mut script = lock(&self.script);
            script
                .calls
                .push(AnimeCall::GetEpisodes(id, provider.clone()));
            match script.episodes.get(&provider) {
                Some(episodes) => Ok(StreamingProvider {
                    name: provider,
                    episodes: episodes.clone(),
                }),
                None => Err(ClientError::NotFound(format!("provider {provider}"))),
            }
        };
        self.answer(result)
    }
}
