//! HTTP Error Handling
//!
//! 业务错误统一以 HTTP 200 + errno 返回

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::ApplicationError;

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errno: i32,
    pub error: String,
    /// 机器可读的错误种类，如 guard_rejected / session_closed
    pub kind: &'static str,
    pub data: Option<()>,
}

impl ErrorResponse {
    pub fn new(errno: i32, kind: &'static str, error: impl Into<String>) -> Self {
        Self {
            errno,
            error: error.into(),
            kind,
            data: None,
        }
    }
}

/// 错误码定义
pub mod errno {
    pub const BAD_REQUEST: i32 = 400;
    pub const NOT_FOUND: i32 = 404;
    pub const CONFLICT: i32 = 409;
    pub const INTERNAL_ERROR: i32 = 500;
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    /// 迁移被拒绝：事件未定义、守卫不成立或场次已关闭
    Conflict {
        kind: &'static str,
        message: String,
    },
    Internal(String),
}

impl ApiError {
    fn errno(&self) -> i32 {
        match self {
            ApiError::NotFound(_) => errno::NOT_FOUND,
            ApiError::BadRequest(_) => errno::BAD_REQUEST,
            ApiError::Conflict { .. } => errno::CONFLICT,
            ApiError::Internal(_) => errno::INTERNAL_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.errno();
        let response = match self {
            ApiError::NotFound(msg) => {
                tracing::warn!(errno = code, error = %msg, "Resource not found");
                ErrorResponse::new(code, "not_found", msg)
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(errno = code, error = %msg, "Bad request");
                ErrorResponse::new(code, "validation", msg)
            }
            ApiError::Conflict { kind, message } => {
                tracing::warn!(errno = code, kind, error = %message, "Transition rejected");
                ErrorResponse::new(code, kind, message)
            }
            ApiError::Internal(msg) => {
                tracing::error!(errno = code, error = %msg, "Internal server error");
                ErrorResponse::new(code, "internal", msg)
            }
        };

        (StatusCode::OK, Json(response)).into_response()
    }
}

impl From<ApplicationError> for ApiError {
    fn from(e: ApplicationError) -> Self {
        let message = e.to_string();
        match e {
            ApplicationError::NotFound { .. } => ApiError::NotFound(message),
            ApplicationError::ValidationError(msg) => ApiError::BadRequest(msg),
            ApplicationError::InvalidTransition { .. } => ApiError::Conflict {
                kind: "invalid_transition",
                message,
            },
            ApplicationError::GuardRejected { .. } => ApiError::Conflict {
                kind: "guard_rejected",
                message,
            },
            ApplicationError::SessionClosed(_) => ApiError::Conflict {
                kind: "session_closed",
                message,
            },
            ApplicationError::PersistenceError(_)
            | ApplicationError::RepositoryError(_)
            | ApplicationError::InternalError(_) => ApiError::Internal(message),
        }
    }
}
