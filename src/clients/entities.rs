use serde::{Deserialize, Serialize};

/// Track artist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artist {
    pub name: String,
}

/// Track album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub title: String,
    pub cover: String,
}

/// A catalog track. Lives only for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: i64,
    pub title: String,
    pub artist: Artist,
    pub album: Album,
    pub preview: String,
    pub duration: u32,
    // Popularity assigned by the catalog, higher is more popular. Absent decodes as 0.
    pub rank: i64,
}

/// Search hit: who made the playlist and where its tracks live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: i64,
    pub creator_id: i64,
    pub tracklist: String,
}

/// Projection of a [`Track`] handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover: String,
    pub preview: String,
    pub duration: u32,
}

impl From<Track> for Song {
    fn from(t: Track) -> Song {
        Song {
            id: t.id,
            title: t.title,
            artist: t.artist.name,
            album: t.album.title,
            cover: t.album.cover,
            preview: t.preview,
            duration: t.duration,
        }
    }
}
