//! Collaborators the screens talk to.
//!
//! Every trait is object safe and hands back boxed futures or streams, so a
//! reducer can hold them behind `Arc<dyn _>` and only ever drive them from
//! inside an effect.

use crate::models::{
    Anime, AnimeField, AnimeId, AnimeStore, CollectionStore, DownloadedAnime, EpisodeNumber,
    StreamingProvider,
};
use crate::ClientError;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use std::sync::Arc;

pub trait AnimeClient: Send + Sync {
    fn get_anime(&self, id: AnimeId) -> BoxFuture<'static, Result<Anime, ClientError>>;

    fn search_animes(&self, query: String) -> BoxFuture<'static, Result<Vec<Anime>, ClientError>>;

    fn get_episodes(
        &self,
        id: AnimeId,
        provider: String,
    ) -> BoxFuture<'static, Result<StreamingProvider, ClientError>>;
}

pub trait DatabaseClient: Send + Sync {
    /// Inserts the row, replacing any row with the same id.
    fn insert_anime_store(&self, store: AnimeStore) -> BoxFuture<'static, Result<(), ClientError>>;

    /// Inserts the collection, replacing any collection with the same title.
    fn insert_collection(
        &self,
        collection: CollectionStore,
    ) -> BoxFuture<'static, Result<(), ClientError>>;

    /// Updates one field of a cached row. Resolves to `false` when nothing was updated.
    fn update_anime(
        &self,
        id: AnimeId,
        field: AnimeField,
    ) -> BoxFuture<'static, Result<bool, ClientError>>;

    /// Emits the rows cached for `id` now and after every change.
    fn observe_anime_store(&self, id: AnimeId) -> BoxStream<'static, Vec<AnimeStore>>;

    fn observe_collections(&self) -> BoxStream<'static, Vec<CollectionStore>>;
}

pub trait DownloaderClient: Send + Sync {
    fn observe(&self, id: AnimeId) -> BoxStream<'static, Vec<DownloadedAnime>>;

    fn delete(&self, id: AnimeId, episode: EpisodeNumber) -> BoxFuture<'static, ()>;

    fn retry(&self, id: AnimeId, episode: EpisodeNumber) -> BoxFuture<'static, ()>;

    fn cancel(&self, id: AnimeId, episode: EpisodeNumber) -> BoxFuture<'static, ()>;
}

/// Synchronous key-value settings. See [`SettingsExt`](crate::SettingsExt) for typed access.
pub trait SettingsClient: Send + Sync {
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), ClientError>;
}

/// The collaborators handed to every reducer.
#[derive(Clone)]
pub struct Environment {
    pub anime: Arc<dyn AnimeClient>,
    pub database: Arc<dyn DatabaseClient>,
    pub downloader: Arc<dyn DownloaderClient>,
    pub settings: Arc<dyn SettingsClient>,
}
