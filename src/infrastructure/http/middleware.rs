//! HTTP Middleware
//!
//! 传输层错误与慢请求日志

use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};

/// 超过该耗时的请求记为慢请求
const SLOW_REQUEST: Duration = Duration::from_millis(500);

/// 记录 4xx/5xx 及慢请求
///
/// 业务错误（errno != 0）走 HTTP 200，在 ApiError::into_response() 中记录
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms,
            "HTTP server error"
        );
    } else if status.is_client_error() {
        // 常见于 JSON 解析失败或路由不存在
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms,
            "HTTP client error"
        );
    } else if started.elapsed() > SLOW_REQUEST {
        tracing::warn!(method = %method, uri = %uri, elapsed_ms, "Slow request");
    }

    response
}
