//! Machine Handlers - 状态机外部接口
//!
//! getState / transition / canTransition，按 kind + id 定位实例

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::{EventPayload, MachineSnapshot, TransitionOutcome};
use crate::domain::machine::EntityKind;
use crate::domain::session::TipHandles;
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MachineStateRequest {
    pub kind: EntityKind,
    pub id: String,
}

/// 事件参数，按事件取用
#[derive(Debug, Default, Deserialize)]
pub struct EventPayloadDto {
    pub minutes: Option<u32>,
    pub song_duration_seconds: Option<u32>,
    pub tip_handles: Option<TipHandles>,
    pub singer_name: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
}

impl From<EventPayloadDto> for EventPayload {
    fn from(p: EventPayloadDto) -> Self {
        Self {
            minutes: p.minutes,
            song_duration_seconds: p.song_duration_seconds,
            tip_handles: p.tip_handles,
            singer_name: p.singer_name,
            artist: p.artist,
            title: p.title,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub kind: EntityKind,
    pub id: String,
    pub event: String,
    #[serde(default)]
    pub payload: EventPayloadDto,
}

#[derive(Debug, Deserialize)]
pub struct CanTransitionRequest {
    pub kind: EntityKind,
    pub id: String,
    pub event: String,
}

#[derive(Debug, Serialize)]
pub struct CanTransitionResponse {
    pub allowed: bool,
}

pub async fn get_state(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MachineStateRequest>,
) -> Result<Json<ApiResponse<MachineSnapshot>>, ApiError> {
    let snapshot = state.gateway.get_state(req.kind, &req.id).await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

pub async fn transition(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<ApiResponse<TransitionOutcome>>, ApiError> {
    let outcome = state
        .gateway
        .transition(req.kind, &req.id, &req.event, req.payload.into())
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub async fn can_transition(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CanTransitionRequest>,
) -> Result<Json<ApiResponse<CanTransitionResponse>>, ApiError> {
    let allowed = state
        .gateway
        .can_transition(req.kind, &req.id, &req.event)
        .await?;
    Ok(Json(ApiResponse::success(CanTransitionResponse { allowed })))
}
