use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{SecondsFormat, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::clients::{
    entities::Song,
    errors::{Error, Result},
};
use crate::config::Config;
use crate::resolver::MoodResolver;

const MOOD_REQUIRED: &str = "Mood is required";
const GENERATION_FAILED: &str = "Failed to generate playlist";

#[derive(Clone)]
struct AppState {
    resolver: MoodResolver,
    started: Instant,
}

/// Body of `POST /api/generate-playlist`.
#[derive(Deserialize, Debug)]
pub struct GeneratePlaylistRequest {
    /// Free-text mood; missing and blank are both rejected.
    #[serde(default)]
    pub mood: Option<String>,
}

/// Successful playlist response.
#[derive(Serialize, Deserialize, Debug)]
pub struct GeneratePlaylistResponse {
    /// At most 25 songs, highest rank first.
    pub songs: Vec<Song>,
}

/// Body of `GET /api/health`.
#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
    /// RFC 3339 UTC time of the check.
    pub timestamp: String,
    /// Seconds since the router was built.
    pub uptime: f64,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

// What the caller sees: a rejected request or one generic failure
enum ApiError {
    InvalidRequest,
    GenerationFailed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidRequest => (StatusCode::BAD_REQUEST, MOOD_REQUIRED),
            ApiError::GenerationFailed => (StatusCode::INTERNAL_SERVER_ERROR, GENERATION_FAILED),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Rejects a missing or blank mood before anything goes over the network.
pub fn validate_mood(mood: Option<&str>) -> Result<&str> {
    match mood {
        Some(m) if !m.trim().is_empty() => Ok(m),
        _ => Err(Error::Validation(MOOD_REQUIRED.into())),
    }
}

/// Validates the mood, resolves it and projects the tracks into songs.
pub async fn generate_songs(resolver: &MoodResolver, mood: Option<&str>) -> Result<Vec<Song>> {
    let mood = validate_mood(mood)?;
    info!("Generating playlist for mood: {mood}");
    let tracks = resolver.playlist_from_mood(mood).await;
    Ok(tracks.into_iter().map(Song::from).collect())
}

async fn generate_playlist(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GeneratePlaylistRequest>, JsonRejection>,
) -> std::result::Result<Json<GeneratePlaylistResponse>, ApiError> {
    let mood = match payload {
        Ok(Json(request)) => request.mood,
        Err(rejection) => {
            info!("Rejected playlist request: {rejection}");
            return Err(ApiError::InvalidRequest);
        }
    };

    // The pipeline runs in its own task so a panic is reported like any other failure
    let resolver = state.resolver.clone();
    let task = tokio::spawn(async move { generate_songs(&resolver, mood.as_deref()).await });

    match task.await {
        Ok(Ok(songs)) => Ok(Json(GeneratePlaylistResponse { songs })),
        Ok(Err(Error::Validation(_))) => Err(ApiError::InvalidRequest),
        Ok(Err(e)) => {
            error!("Error generating playlist: {e}");
            Err(ApiError::GenerationFailed)
        }
        Err(e) => {
            error!("Error generating playlist: {e}");
            Err(ApiError::GenerationFailed)
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.started.elapsed().as_secs_f64(),
    })
}

/// Builds the API router with permissive CORS.
pub fn router(resolver: MoodResolver) -> Router {
    let state = AppState {
        resolver,
        started: Instant::now(),
    };
    Router::new()
        .route("/api/generate-playlist", post(generate_playlist))
        .route("/api/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API on `config.bind_addr` until Ctrl-C.
pub async fn serve(config: &Config) -> Result<()> {
    let app = router(config.resolver()?);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
