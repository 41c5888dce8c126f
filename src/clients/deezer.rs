use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::clients::{
    Catalog,
    entities::{Album, Artist, Playlist, Track},
    errors::{Error, Result},
};

/// Public Deezer API base URL.
pub const DEEZER_API_URL: &str = "https://api.deezer.com";

const REQUEST_TIMEOUT_SECS: u64 = 15;
const CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Deserialize, Debug)]
struct DeezerApiError {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

impl From<DeezerApiError> for Error {
    fn from(e: DeezerApiError) -> Error {
        Error::CatalogApi(format!(
            "{} (type: {}, code: {})",
            e.message.unwrap_or_default(),
            e.kind.unwrap_or_default(),
            e.code.unwrap_or_default()
        ))
    }
}

// List endpoints wrap their payload in `data`; items are decoded one by one
#[derive(Deserialize, Debug)]
struct DataResponse {
    #[serde(default)]
    data: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<DeezerApiError>,
}

#[derive(Deserialize, Debug)]
struct UserResponse {
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    error: Option<DeezerApiError>,
}

#[derive(Deserialize, Debug)]
struct DeezerArtist {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct DeezerAlbum {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    cover_medium: Option<String>,
}

#[derive(Deserialize, Debug)]
struct DeezerTrack {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    preview: Option<String>,
    #[serde(default)]
    rank: Option<i64>,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    artist: Option<DeezerArtist>,
    #[serde(default)]
    album: Option<DeezerAlbum>,
}

#[derive(Deserialize, Debug)]
struct DeezerUserRef {
    id: i64,
}

#[derive(Deserialize, Debug)]
struct DeezerPlaylist {
    id: i64,
    user: DeezerUserRef,
    tracklist: String,
}

impl From<DeezerTrack> for Track {
    fn from(t: DeezerTrack) -> Track {
        let album = t.album.unwrap_or(DeezerAlbum {
            title: None,
            cover_medium: None,
        });
        Track {
            id: t.id,
            title: t.title.unwrap_or_default(),
            artist: Artist {
                name: t.artist.and_then(|a| a.name).unwrap_or_default(),
            },
            album: Album {
                title: album.title.unwrap_or_default(),
                cover: album.cover_medium.unwrap_or_default(),
            },
            preview: t.preview.unwrap_or_default(),
            duration: t.duration.unwrap_or(0),
            rank: t.rank.unwrap_or(0),
        }
    }
}

impl From<DeezerPlaylist> for Playlist {
    fn from(p: DeezerPlaylist) -> Playlist {
        Playlist {
            id: p.id,
            creator_id: p.user.id,
            tracklist: p.tracklist,
        }
    }
}

/// Unauthenticated client for the public Deezer API. Never retries.
#[derive(Clone, Debug)]
pub struct DeezerClient {
    http: Client,
    base_url: String,
}

impl DeezerClient {
    /// Client with the default timeouts, rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Client reusing an existing `reqwest::Client`.
    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        DeezerClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        debug!("GET {url} {query:?}");
        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_data<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<Vec<T>> {
        let response: DataResponse = self.get_json(url, query).await?;
        if let Some(err) = response.error {
            return Err(err.into());
        }
        Ok(response
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| {
                serde_json::from_value(item)
                    .map_err(|e| debug!("Skipping malformed Deezer entry from {url}: {e}"))
                    .ok()
            })
            .collect())
    }

    /// Free-text track search, surfacing failures.
    pub async fn try_search_tracks(&self, tag: &str) -> Result<Vec<Track>> {
        let url = format!("{}/search/track", self.base_url);
        let tracks: Vec<DeezerTrack> = self.get_data(&url, &[("q", tag)]).await?;
        Ok(tracks.into_iter().map(Track::from).collect())
    }

    /// Playlist search by ranking, surfacing failures.
    pub async fn try_search_playlists(&self, query: &str, limit: usize) -> Result<Vec<Playlist>> {
        let url = format!("{}/search/playlist", self.base_url);
        let limit = limit.to_string();
        let playlists: Vec<DeezerPlaylist> = self
            .get_data(&url, &[("q", query), ("order", "RANKING"), ("limit", limit.as_str())])
            .await?;
        Ok(playlists.into_iter().map(Playlist::from).collect())
    }

    /// Country of a user; `Ok(None)` when the profile has none.
    pub async fn try_get_user_country(&self, user_id: i64) -> Result<Option<String>> {
        let url = format!("{}/user/{user_id}", self.base_url);
        let user: UserResponse = self.get_json(&url, &[]).await?;
        if let Some(err) = user.error {
            return Err(err.into());
        }
        Ok(user.country)
    }

    /// Tracks behind an absolute tracklist URL, surfacing failures.
    pub async fn try_get_playlist_tracks(&self, tracklist_url: &str) -> Result<Vec<Track>> {
        let tracks: Vec<DeezerTrack> = self.get_data(tracklist_url, &[]).await?;
        Ok(tracks.into_iter().map(Track::from).collect())
    }
}

#[async_trait]
impl Catalog for DeezerClient {
    async fn search_tracks_by_tag(&self, tag: &str) -> Vec<Track> {
        self.try_search_tracks(tag).await.unwrap_or_else(|e| {
            warn!("Error searching Deezer tracks for tag {tag:?}: {e}");
            Vec::new()
        })
    }

    async fn search_playlists(&self, query: &str, limit: usize) -> Vec<Playlist> {
        self.try_search_playlists(query, limit)
            .await
            .unwrap_or_else(|e| {
                warn!("Error searching Deezer playlists for {query:?}: {e}");
                Vec::new()
            })
    }

    async fn get_user_country(&self, user_id: i64) -> Option<String> {
        self.try_get_user_country(user_id).await.unwrap_or_else(|e| {
            debug!("Failed to look up country of Deezer user {user_id}: {e}");
            None
        })
    }

    async fn get_playlist_tracks(&self, tracklist_url: &str) -> Vec<Track> {
        self.try_get_playlist_tracks(tracklist_url)
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to fetch tracks from {tracklist_url}: {e}");
                Vec::new()
            })
    }
}
