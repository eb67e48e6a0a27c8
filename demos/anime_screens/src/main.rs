use crate::tracing_setup::tracing_init;
use anime_screens::detail::{DetailAction, DetailReducer, DetailState};
use anime_screens::memory::{MemoryDatabase, MemoryDownloader, MemorySettings, MockAnimeClient};
use anime_screens::models::{
    Anime, AnimeStatus, CollectionStore, DownloadStatus, Episode, EpisodeStorage,
};
use anime_screens::search::{SearchAction, SearchReducer, SearchState};
use anime_screens::stream::StreamAction;
use anime_screens::Environment;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use storerx::Store;
use tokio::time::sleep;
use tracing::info;

mod tracing_setup;

const PROVIDERS: [&str; 2] = ["gogoanime", "zoro"];

fn environment(database: MemoryDatabase, downloader: MemoryDownloader) -> Environment {
    let episodes: Vec<Episode> = (1..=12)
        .map(|number| Episode::new(number, format!("Episode {number}")))
        .collect();
    let client = MockAnimeClient::new()
        .with_anime(Anime::new(20, "Naruto", AnimeStatus::Finished))
        .with_anime(Anime::new(21, "Naruto Shippuden", AnimeStatus::Finished))
        .with_anime(Anime::new(22, "Boruto", AnimeStatus::Releasing))
        .with_episodes(PROVIDERS[0], episodes.clone())
        .with_episodes(PROVIDERS[1], episodes)
        .with_delay(Duration::from_millis(200));

    Environment {
        anime: Arc::new(client),
        database: Arc::new(database),
        downloader: Arc::new(downloader),
        settings: Arc::new(MemorySettings::new()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_init();

    let database = MemoryDatabase::with_collections(vec![CollectionStore::new("Planning")]);
    let downloader = MemoryDownloader::new();
    let env = environment(database.clone(), downloader.clone());

    // Search: type quickly, only the last query is sent.
    let search = Store::new(SearchReducer::new(env.clone()), SearchState::default());
    search.send(SearchAction::OnAppear);
    for query in ["n", "na", "nar", "naru", "narut", "naruto"] {
        search.send(SearchAction::QueryChanged(query.to_string()));
        sleep(Duration::from_millis(80)).await;
    }
    let state = search.wait_for(|state| state.results.is_finished()).await;
    let titles: Vec<String> = state
        .results
        .value()
        .map(|animes| animes.iter().map(|anime| anime.title.clone()).collect())
        .unwrap_or_default();
    info!(?titles, "search results");

    let Some(picked) = state.results.value().and_then(|animes| animes.first()).cloned() else {
        info!("nothing found");
        return Ok(());
    };
    search.send(SearchAction::OnAnimeTapped(picked.clone()));
    info!(history = ?search.state().history, "search history");

    // Detail: open from the search result, then drive it like a user would.
    downloader.set_status(
        picked.id,
        BTreeSet::from([EpisodeStorage {
            number: 1,
            status: DownloadStatus::Downloaded,
        }]),
    );
    let providers = PROVIDERS.iter().map(|name| name.to_string()).collect();
    let detail = Store::new(
        DetailReducer::new(env.clone()),
        DetailState::with_anime(picked, providers),
    );
    detail.send(DetailAction::OnAppear);
    detail.wait_for(|state| !state.is_loading_anime()).await;

    let stream = detail.scope(|state: &DetailState| state.stream.clone(), DetailAction::Stream);
    stream.send(StreamAction::SelectProvider(PROVIDERS[1].to_string()));
    let state = detail.wait_for(|state| state.episodes().is_finished()).await;
    let episodes = state.episodes().value().map(Vec::len);
    info!(
        provider = ?state.stream.selected_provider,
        episodes,
        downloads = state.episodes_status.len(),
        "episodes loaded"
    );

    // Each write lands back through the database observation before the next one.
    detail.send(DetailAction::TappedFavorite);
    detail
        .wait_for(|state| state.anime_store.value().is_some_and(|store| store.is_favorite))
        .await;
    detail.send(DetailAction::MarkEpisodeAsWatched(1));
    detail
        .wait_for(|state| {
            state
                .anime_store
                .value()
                .is_some_and(|store| store.episode(1).is_some())
        })
        .await;
    detail.send(DetailAction::AddToCollectionToggle);
    let state = detail.wait_for(|state| state.is_in_a_collection()).await;
    info!(
        favorite = state.anime_store.value().map(|store| store.is_favorite),
        in_collection = state.is_in_a_collection(),
        "library updated"
    );

    detail.send(DetailAction::CloseButtonPressed);
    let state = detail.wait_for(|state| state.dismissed).await;
    info!(anime = ?state.anime.value().map(|anime| &anime.title), "detail closed");

    info!(rows = database.anime_stores().len(), "cached animes");
    info!("=================================");
    info!("  Main thread | Finish");
    Ok(())
}
