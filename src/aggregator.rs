use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{StreamExt, iter};
use log::{debug, info};

use crate::clients::{
    Catalog,
    entities::{Playlist, Track},
};

/// Playlists requested from the catalog per search.
pub const PLAYLIST_SEARCH_LIMIT: usize = 50;
/// Playlists used, in ranking order, when none pass the locale filter.
pub const FALLBACK_PLAYLIST_COUNT: usize = 3;
/// Upper bound on the tracks returned by one aggregation.
pub const MAX_TRACKS: usize = 25;

/// Country code a playlist creator must have to pass the locale filter.
pub const DEFAULT_TARGET_COUNTRY: &str = "BR";
/// Default number of per-playlist calls in flight at once.
pub const DEFAULT_FAN_OUT: usize = PLAYLIST_SEARCH_LIMIT;

/// Deduplicates by track id (first occurrence wins), sorts by rank descending
/// and keeps the first `limit` tracks. The sort is stable, so equal ranks keep
/// their first-seen order.
#[must_use]
pub fn rank_unique(tracks: Vec<Track>, limit: usize) -> Vec<Track> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Track> = tracks.into_iter().filter(|t| seen.insert(t.id)).collect();
    unique.sort_by(|a, b| b.rank.cmp(&a.rank));
    unique.truncate(limit);
    unique
}

/// Resolves a search keyword into a ranked tracklist built from catalog playlists.
#[derive(Clone)]
pub struct Aggregator {
    catalog: Arc<dyn Catalog>,
    target_country: String,
    fan_out: usize,
}

impl Aggregator {
    /// `fan_out` bounds the in-flight calls of each per-playlist step; 0 is treated as 1.
    pub fn new(catalog: Arc<dyn Catalog>, target_country: impl Into<String>, fan_out: usize) -> Self {
        Aggregator {
            catalog,
            target_country: target_country.into(),
            fan_out: fan_out.max(1),
        }
    }

    /// Never fails: upstream problems surface as fewer (or zero) tracks.
    pub async fn search_tracks_by_playlist(&self, query: &str) -> Vec<Track> {
        let playlists = self
            .catalog
            .search_playlists(query, PLAYLIST_SEARCH_LIMIT)
            .await;

        if playlists.is_empty() {
            info!("No playlist found for {query:?}, falling back to track search");
            return self.catalog.search_tracks_by_tag(query).await;
        }

        let local = self.local_playlists(&playlists).await;
        info!(
            "Found {} playlists from {} out of {}",
            local.len(),
            self.target_country,
            playlists.len()
        );

        let selected: Vec<Playlist> = if local.is_empty() {
            playlists.into_iter().take(FALLBACK_PLAYLIST_COUNT).collect()
        } else {
            local
        };

        let tracks = self.collect_tracks(&selected).await;
        debug!(
            "Collected {} tracks from {} playlists",
            tracks.len(),
            selected.len()
        );
        rank_unique(tracks, MAX_TRACKS)
    }

    // Playlists whose creator lives in the target country, in search order.
    // A failed lookup counts as a non-match.
    async fn local_playlists(&self, playlists: &[Playlist]) -> Vec<Playlist> {
        iter(playlists.to_vec())
            .map(|p| {
                let catalog = Arc::clone(&self.catalog);
                let target = self.target_country.clone();
                async move {
                    let country = catalog.get_user_country(p.creator_id).await;
                    country
                        .is_some_and(|c| c.eq_ignore_ascii_case(&target))
                        .then_some(p)
                }
            })
            .buffered(self.fan_out)
            .filter_map(|p| async move { p })
            .collect()
            .await
    }

    // Waits for every playlist; a failed fetch contributes no tracks
    async fn collect_tracks(&self, playlists: &[Playlist]) -> Vec<Track> {
        let per_playlist: Vec<Vec<Track>> = iter(playlists.to_vec())
            .map(|p| {
                let catalog = Arc::clone(&self.catalog);
                async move { catalog.get_playlist_tracks(&p.tracklist).await }
            })
            .buffered(self.fan_out)
            .collect()
            .await;

        per_playlist.into_iter().flatten().collect()
    }
}
