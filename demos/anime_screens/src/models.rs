use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type AnimeId = u64;
pub type EpisodeNumber = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimeFormat {
    Tv,
    TvShort,
    Movie,
    Special,
    Ova,
    Ona,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimeStatus {
    Finished,
    Releasing,
    Upcoming,
    Cancelled,
    Hiatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anime {
    pub id: AnimeId,
    pub title: String,
    pub description: Option<String>,
    pub format: AnimeFormat,
    pub status: AnimeStatus,
    pub genres: Vec<String>,
    /// Average rating on a 0..=100 scale.
    pub average_score: Option<u8>,
}

impl Anime {
    pub fn new(id: AnimeId, title: impl Into<String>, status: AnimeStatus) -> Self {
        Anime {
            id,
            title: title.into(),
            description: None,
            format: AnimeFormat::Tv,
            status,
            genres: Vec::new(),
            average_score: None,
        }
    }

    pub fn is_upcoming(&self) -> bool {
        self.status == AnimeStatus::Upcoming
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub number: EpisodeNumber,
    pub title: String,
    pub is_filler: bool,
}

impl Episode {
    pub fn new(number: EpisodeNumber, title: impl Into<String>) -> Self {
        Episode {
            number,
            title: title.into(),
            is_filler: false,
        }
    }
}

/// Episode list of one anime as served by one streaming provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingProvider {
    pub name: String,
    pub episodes: Vec<Episode>,
}

/// Locally persisted progress of one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStore {
    pub number: EpisodeNumber,
    pub title: String,
    /// Fraction watched in `0.0..=1.0`; `None` means never started.
    pub progress: Option<f64>,
}

/// Locally cached copy of an anime with the user's own data attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeStore {
    pub id: AnimeId,
    pub title: String,
    pub format: AnimeFormat,
    pub is_favorite: bool,
    pub episodes: Vec<EpisodeStore>,
}

impl AnimeStore {
    pub fn new(anime: &Anime) -> Self {
        AnimeStore {
            id: anime.id,
            title: anime.title.clone(),
            format: anime.format,
            is_favorite: false,
            episodes: Vec::new(),
        }
    }

    /// The row cached for `anime`, or a fresh unsaved one.
    pub fn find_or_create(anime: &Anime, rows: Vec<AnimeStore>) -> Self {
        rows.into_iter()
            .find(|row| row.id == anime.id)
            .unwrap_or_else(|| AnimeStore::new(anime))
    }

    pub fn episode(&self, number: EpisodeNumber) -> Option<&EpisodeStore> {
        self.episodes.iter().find(|episode| episode.number == number)
    }

    pub fn update_progress(&mut self, episode: &Episode, progress: f64) {
        let progress = progress.clamp(0.0, 1.0);
        match self.episodes.iter_mut().find(|e| e.number == episode.number) {
            Some(stored) => stored.progress = Some(progress),
            None => self.episodes.push(EpisodeStore {
                number: episode.number,
                title: episode.title.clone(),
                progress: Some(progress),
            }),
        }
    }
}

/// User-curated list of animes, e.g. "Planning".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStore {
    pub title: String,
    pub animes: Vec<AnimeStore>,
}

impl CollectionStore {
    pub fn new(title: impl Into<String>) -> Self {
        CollectionStore {
            title: title.into(),
            animes: Vec::new(),
        }
    }

    pub fn contains(&self, id: AnimeId) -> bool {
        self.animes.iter().any(|anime| anime.id == id)
    }

    /// Adds `anime` when absent, removes it when present.
    pub fn toggle(&mut self, anime: &AnimeStore) {
        if self.contains(anime.id) {
            self.animes.retain(|stored| stored.id != anime.id);
        } else {
            self.animes.push(anime.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DownloadStatus {
    Pending,
    /// Percentage downloaded.
    Downloading(u8),
    Downloaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodeStorage {
    pub number: EpisodeNumber,
    pub status: DownloadStatus,
}

/// Download bookkeeping for one anime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadedAnime {
    pub id: AnimeId,
    pub episodes: BTreeSet<EpisodeStorage>,
}

/// A single column update understood by the database collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimeField {
    IsFavorite(bool),
    EpisodeProgress {
        number: EpisodeNumber,
        progress: Option<f64>,
    },
}

impl AnimeField {
    pub(crate) fn apply(&self, store: &mut AnimeStore) -> bool {
        match self {
            AnimeField::IsFavorite(favorite) => {
                store.is_favorite = *favorite;
                true
            }
            AnimeField::EpisodeProgress { number, progress } => {
                match store.episodes.iter_mut().find(|e| e.number == *number) {
                    Some(episode) => {
                        episode.progress = *progress;
                        true
                    }
                    None => false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frieren() -> Anime {
        Anime::new(1, "Frieren", AnimeStatus::Finished)
    }

    #[test]
    fn test_find_or_create_prefers_cached_row() {
        let mut cached = AnimeStore::new(&frieren());
        cached.is_favorite = true;

        let found = AnimeStore::find_or_create(&frieren(), vec![cached.clone()]);
        assert_eq!(found, cached);

        let created = AnimeStore::find_or_create(&frieren(), Vec::new());
        assert!(!created.is_favorite);
        assert_eq!(created.id, 1);
    }

    #[test]
    fn test_update_progress_inserts_then_overwrites() {
        let mut store = AnimeStore::new(&frieren());
        let episode = Episode::new(3, "Killing Magic");

        store.update_progress(&episode, 0.5);
        store.update_progress(&episode, 2.0);

        assert_eq!(store.episodes.len(), 1);
        assert_eq!(store.episode(3).and_then(|e| e.progress), Some(1.0));
    }

    #[test]
    fn test_collection_toggle() {
        let store = AnimeStore::new(&frieren());
        let mut planning = CollectionStore::new("Planning");

        planning.toggle(&store);
        assert!(planning.contains(1));
        planning.toggle(&store);
        assert!(!planning.contains(1));
    }

    #[test]
    fn test_progress_field_needs_existing_episode() {
        let mut store = AnimeStore::new(&frieren());
        let field = AnimeField::EpisodeProgress {
            number: 1,
            progress: None,
        };
        assert!(!field.apply(&mut store));

        store.update_progress(&Episode::new(1, "The Journey's End"), 1.0);
        assert!(field.apply(&mut store));
        assert_eq!(store.episode(1).and_then(|e| e.progress), None);
    }
}
