use async_trait::async_trait;

use crate::clients::{
    entities::{Playlist, Track},
    errors::Result,
};

/// Deezer public API client
pub mod deezer;
/// Data entities for tracks, playlists and songs
pub mod entities;
/// Error types and result aliases
pub mod errors;
/// Gemini language model client
pub mod gemini;

pub use deezer::DeezerClient;
pub use gemini::GeminiClient;

/// Read access to a music catalog.
///
/// Every operation degrades to "produced nothing" on failure: implementations
/// log the cause and return an empty sequence or `None`, they never error.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Free-text track search.
    async fn search_tracks_by_tag(&self, tag: &str) -> Vec<Track>;

    /// Playlist search ordered by descending ranking, capped at `limit`.
    async fn search_playlists(&self, query: &str, limit: usize) -> Vec<Playlist>;

    /// Country code of a catalog user.
    async fn get_user_country(&self, user_id: i64) -> Option<String>;

    /// Track list behind a playlist's `tracklist` URL.
    async fn get_playlist_tracks(&self, tracklist_url: &str) -> Vec<Track>;
}

/// Distills a mood description into a single catalog search keyword.
///
/// `Ok(None)` means the model answered without choosing a keyword.
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    /// Keyword for `mood`; `Err` when the model could not be reached.
    async fn extract_keyword(&self, mood: &str) -> Result<Option<String>>;
}
