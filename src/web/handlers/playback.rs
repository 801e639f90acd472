//! Random track handlers.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use std::sync::Arc;

use crate::web::dto::TrackResponse;
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::AppState;

async fn pick_track(
    state: &AppState,
    headers: &HeaderMap,
    directory: &str,
) -> Result<Json<TrackResponse>, ApiError> {
    let track = state.library.random_track(directory).await?;
    let base = state.base_url(headers);

    Ok(Json(TrackResponse {
        audio_url: state.file_url(&base, &track.path),
        file_name: track.display_name,
        path: track.path.identifier(),
    }))
}

/// GET /api/random-audio/:directory - Pick a random track from a directory.
#[utoipa::path(
    get,
    path = "/api/random-audio/{directory}",
    tag = "playback",
    params(
        ("directory" = String, Path, description = "Directory name")
    ),
    responses(
        (status = 200, description = "Random track", body = TrackResponse),
        (status = 404, description = "Directory missing or empty", body = ErrorBody)
    )
)]
pub async fn random_audio(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(directory): Path<String>,
) -> Result<Json<TrackResponse>, ApiError> {
    pick_track(&state, &headers, &directory).await
}

/// GET /api/audio-info/:directory - Same as random-audio, for players that
/// fetch track info separately from the audio.
#[utoipa::path(
    get,
    path = "/api/audio-info/{directory}",
    tag = "playback",
    params(
        ("directory" = String, Path, description = "Directory name")
    ),
    responses(
        (status = 200, description = "Random track", body = TrackResponse),
        (status = 404, description = "Directory missing or empty", body = ErrorBody)
    )
)]
pub async fn audio_info(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(directory): Path<String>,
) -> Result<Json<TrackResponse>, ApiError> {
    pick_track(&state, &headers, &directory).await
}
