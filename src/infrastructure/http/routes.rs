//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                 GET   健康检查
//! - /api/session/create       POST  新建场次
//! - /api/session/get          POST  场次详情（含实时状态）
//! - /api/song/request         POST  点歌
//! - /api/song/edit            POST  修改歌手/歌曲信息
//! - /api/song/delay           POST  延后
//! - /api/song/cancel          POST  歌手撤回（仅 waiting）
//! - /api/song/delete          POST  DJ 删除
//! - /api/queue/list           POST  当前队列
//! - /api/queue/reorder        POST  拖拽重排
//! - /api/machine/state        POST  状态机视图
//! - /api/machine/transition   POST  发送事件
//! - /api/machine/can          POST  事件是否可发送

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/session", session_routes())
        .nest("/song", song_routes())
        .nest("/queue", queue_routes())
        .nest("/machine", machine_routes())
}

/// Session 路由
fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(handlers::create_session))
        .route("/get", post(handlers::get_session))
}

/// Song 路由
fn song_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/request", post(handlers::request_song))
        .route("/edit", post(handlers::edit_song))
        .route("/delay", post(handlers::delay_song))
        .route("/cancel", post(handlers::cancel_song))
        .route("/delete", post(handlers::delete_song))
}

/// Queue 路由
fn queue_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/list", post(handlers::list_queue))
        .route("/reorder", post(handlers::reorder_queue))
}

/// Machine 路由
fn machine_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/state", post(handlers::get_state))
        .route("/transition", post(handlers::transition))
        .route("/can", post(handlers::can_transition))
}
