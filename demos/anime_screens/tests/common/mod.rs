#![allow(dead_code)]

use anime_screens::memory::{MemoryDatabase, MemoryDownloader, MemorySettings, MockAnimeClient};
use anime_screens::models::{Anime, AnimeStatus, CollectionStore, Episode};
use anime_screens::Environment;
use std::sync::Arc;
use std::time::Duration;

pub const PLANNING: &str = "Planning";

/// In-memory collaborators plus the handles tests inspect them through.
pub struct Fixture {
    pub client: MockAnimeClient,
    pub database: MemoryDatabase,
    pub downloader: MemoryDownloader,
    pub settings: MemorySettings,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_client(catalog())
    }

    pub fn with_client(client: MockAnimeClient) -> Self {
        Fixture {
            client,
            database: MemoryDatabase::with_collections(vec![CollectionStore::new(PLANNING)]),
            downloader: MemoryDownloader::new(),
            settings: MemorySettings::new(),
        }
    }

    pub fn env(&self) -> Environment {
        Environment {
            anime: Arc::new(self.client.clone()),
            database: Arc::new(self.database.clone()),
            downloader: Arc::new(self.downloader.clone()),
            settings: Arc::new(self.settings.clone()),
        }
    }
}

pub fn naruto() -> Anime {
    Anime::new(20, "Naruto", AnimeStatus::Finished)
}

pub fn upcoming() -> Anime {
    Anime::new(99, "Next Season", AnimeStatus::Upcoming)
}

pub fn catalog() -> MockAnimeClient {
    MockAnimeClient::new()
        .with_anime(naruto())
        .with_anime(Anime::new(21, "Naruto Shippuden", AnimeStatus::Finished))
        .with_anime(Anime::new(30, "Bleach", AnimeStatus::Finished))
        .with_anime(upcoming())
        .with_episodes("gogo", episodes(3))
        .with_delay(Duration::from_millis(10))
}

pub fn episodes(count: u32) -> Vec<Episode> {
    (1..=count)
        .map(|number| Episode::new(number, format!("Episode {number}")))
        .collect()
}

pub fn providers() -> Vec<String> {
    vec!["gogo".to_string()]
}
