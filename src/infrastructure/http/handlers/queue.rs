//! Queue Handlers - 队列列表与拖拽重排

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::{GetQueue, QueueSongResponse, ReorderEntry, ReorderQueue};
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// List
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQueueRequest {
    pub session_id: String,
    /// 是否包含 completed / skipped
    #[serde(default)]
    pub include_finished: bool,
}

#[derive(Debug, Serialize)]
pub struct QueueSongDto {
    pub song_id: String,
    pub singer_name: String,
    pub artist: String,
    pub title: String,
    pub position: u32,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delayed_until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub songs_ahead: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_wait_secs: Option<u64>,
    pub created_at: String,
}

impl From<QueueSongResponse> for QueueSongDto {
    fn from(s: QueueSongResponse) -> Self {
        Self {
            song_id: s.song_id,
            singer_name: s.singer_name,
            artist: s.artist,
            title: s.title,
            position: s.position,
            status: s.status,
            delayed_until: s.delayed_until,
            delay_minutes: s.delay_minutes,
            songs_ahead: s.songs_ahead,
            estimated_wait_secs: s.estimated_wait_secs,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueueResponseDto {
    pub session_id: String,
    pub session_status: String,
    pub song_duration_seconds: u32,
    pub now_playing: Option<QueueSongDto>,
    pub next_song_id: Option<String>,
    pub songs: Vec<QueueSongDto>,
}

pub async fn list_queue(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ListQueueRequest>,
) -> Result<Json<ApiResponse<QueueResponseDto>>, ApiError> {
    let query = GetQueue {
        session_id: req.session_id,
        include_finished: req.include_finished,
    };

    let result = state.get_queue_handler.handle(query).await?;

    Ok(Json(ApiResponse::success(QueueResponseDto {
        session_id: result.session_id,
        session_status: result.session_status,
        song_duration_seconds: result.song_duration_seconds,
        now_playing: result.now_playing.map(QueueSongDto::from),
        next_song_id: result.next_song_id,
        songs: result.songs.into_iter().map(QueueSongDto::from).collect(),
    })))
}

// ============================================================================
// Reorder
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReorderEntryDto {
    pub song_id: String,
    pub position: u32,
}

#[derive(Debug, Deserialize)]
pub struct ReorderQueueRequest {
    pub session_id: String,
    pub positions: Vec<ReorderEntryDto>,
}

#[derive(Debug, Serialize)]
pub struct ReorderQueueResponseDto {
    pub session_id: String,
    pub updated: usize,
}

pub async fn reorder_queue(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReorderQueueRequest>,
) -> Result<Json<ApiResponse<ReorderQueueResponseDto>>, ApiError> {
    let cmd = ReorderQueue {
        session_id: req.session_id,
        positions: req
            .positions
            .into_iter()
            .map(|e| ReorderEntry {
                song_id: e.song_id,
                position: e.position,
            })
            .collect(),
    };

    let result = state.reorder_queue_handler.handle(cmd).await?;

    Ok(Json(ApiResponse::success(ReorderQueueResponseDto {
        session_id: result.session_id,
        updated: result.updated,
    })))
}
