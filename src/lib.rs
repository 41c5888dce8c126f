//! Moodtape - turn a free-text mood into a Deezer tracklist
//!
//! A language model distills the mood into one search keyword, Deezer
//! playlists matching that keyword are filtered by the creator's country,
//! and their tracks are merged, deduplicated and ranked by popularity.

/// Playlist search, locale filtering and track ranking
pub mod aggregator;
/// Client modules for the catalog and the language model
pub mod clients;
/// Environment-driven configuration
pub mod config;
/// Mood to keyword to tracks
pub mod resolver;
/// HTTP API
pub mod server;
