//! Song Handlers - 点歌、编辑、延后、撤回与删除

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::{
    CancelSongRequest, DelaySong, DeleteSong, EditSongDetails, SongStateResponse,
    SubmitSongRequest,
};
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 单首点歌的状态回执
#[derive(Debug, Serialize)]
pub struct SongStateDto {
    pub song_id: String,
    pub status: String,
}

impl From<SongStateResponse> for SongStateDto {
    fn from(r: SongStateResponse) -> Self {
        Self {
            song_id: r.song_id,
            status: r.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SongIdRequest {
    pub song_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteSongResponseDto {
    pub song_id: String,
}

// ============================================================================
// Request
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitSongRequestDto {
    pub session_id: String,
    pub singer_name: String,
    pub artist: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitSongResponseDto {
    pub song_id: String,
    pub session_id: String,
    pub position: u32,
    pub status: String,
}

pub async fn request_song(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitSongRequestDto>,
) -> Result<Json<ApiResponse<SubmitSongResponseDto>>, ApiError> {
    let cmd = SubmitSongRequest {
        session_id: req.session_id,
        singer_name: req.singer_name,
        artist: req.artist,
        title: req.title,
    };

    let result = state.submit_song_handler.handle(cmd).await?;

    Ok(Json(ApiResponse::success(SubmitSongResponseDto {
        song_id: result.song_id,
        session_id: result.session_id,
        position: result.position,
        status: result.status,
    })))
}

// ============================================================================
// Edit
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EditSongRequest {
    pub song_id: String,
    pub singer_name: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
}

pub async fn edit_song(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EditSongRequest>,
) -> Result<Json<ApiResponse<SongStateDto>>, ApiError> {
    let cmd = EditSongDetails {
        song_id: req.song_id,
        singer_name: req.singer_name,
        artist: req.artist,
        title: req.title,
    };

    let result = state.edit_song_handler.handle(cmd).await?;
    Ok(Json(ApiResponse::success(result.into())))
}

// ============================================================================
// Delay
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DelaySongRequest {
    pub song_id: String,
    /// 缺省使用配置的默认分钟数
    pub minutes: Option<u32>,
}

pub async fn delay_song(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DelaySongRequest>,
) -> Result<Json<ApiResponse<SongStateDto>>, ApiError> {
    let cmd = DelaySong {
        song_id: req.song_id,
        minutes: req.minutes,
    };

    let result = state.delay_song_handler.handle(cmd).await?;
    Ok(Json(ApiResponse::success(result.into())))
}

// ============================================================================
// Cancel / Delete
// ============================================================================

/// 歌手撤回：仅 waiting 状态可撤回
pub async fn cancel_song(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SongIdRequest>,
) -> Result<Json<ApiResponse<DeleteSongResponseDto>>, ApiError> {
    let result = state
        .cancel_song_handler
        .handle(CancelSongRequest {
            song_id: req.song_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(DeleteSongResponseDto {
        song_id: result.song_id,
    })))
}

/// DJ 删除：任意状态
pub async fn delete_song(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SongIdRequest>,
) -> Result<Json<ApiResponse<DeleteSongResponseDto>>, ApiError> {
    let result = state
        .delete_song_handler
        .handle(DeleteSong {
            song_id: req.song_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(DeleteSongResponseDto {
        song_id: result.song_id,
    })))
}
