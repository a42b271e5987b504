//! Session Handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::{CreateSession, GetSession};
use crate::domain::session::TipHandles;
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// Create
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    pub song_duration_seconds: Option<u32>,
    pub tip_handles: Option<TipHandles>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponseDto {
    pub session_id: String,
    pub status: String,
    pub song_duration_seconds: u32,
    pub created_at: String,
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<ApiResponse<CreateSessionResponseDto>>, ApiError> {
    let cmd = CreateSession {
        song_duration_seconds: req.song_duration_seconds,
        tip_handles: req.tip_handles,
    };

    let result = state.create_session_handler.handle(cmd).await?;

    Ok(Json(ApiResponse::success(CreateSessionResponseDto {
        session_id: result.session_id,
        status: result.status,
        song_duration_seconds: result.song_duration_seconds,
        created_at: result.created_at,
    })))
}

// ============================================================================
// Get
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GetSessionRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponseDto {
    pub session_id: String,
    pub status: String,
    pub song_duration_seconds: u32,
    pub tip_handles: TipHandles,
    pub created_at: String,
    pub updated_at: String,
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GetSessionRequest>,
) -> Result<Json<ApiResponse<SessionResponseDto>>, ApiError> {
    let result = state
        .get_session_handler
        .handle(GetSession {
            session_id: req.session_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(SessionResponseDto {
        session_id: result.session_id,
        status: result.status,
        song_duration_seconds: result.song_duration_seconds,
        tip_handles: result.tip_handles,
        created_at: result.created_at,
        updated_at: result.updated_at,
    })))
}
