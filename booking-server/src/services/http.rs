//! HTTP 服务
//!
//! 路由组装和服务器生命周期。明文 HTTP：TcpListener + axum::serve，
//! ctrl-c 触发优雅关闭并顺带关停事件总线。

use axum::{Router, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::auth::require_auth;
use crate::core::ServerState;
use crate::utils::AppError;

/// HTTP 请求日志中间件
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let status = response.status();

    tracing::info!(target: "http_access", "{} {} {}", method, uri, status);

    response
}

/// Build the Axum router and attach state plus middleware
///
/// 中间件层次（自内向外）：
/// 1. `require_auth` - JWT 认证，内部跳过公共路由
/// 2. CORS / 压缩
/// 3. 请求日志
pub fn build_app(state: ServerState) -> Router {
    Router::<ServerState>::new()
        // Core APIs
        .merge(crate::api::auth::router())
        .merge(crate::api::health::router())
        // Data model APIs
        .merge(crate::api::resources::router())
        .merge(crate::api::slots::router())
        .merge(crate::api::bookings::router())
        // Realtime feed
        .merge(crate::api::events::router())
        // JWT 认证中间件 - 在 Router 级别应用，require_auth 内部会跳过公共路由
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
        // Tower HTTP 中间件
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        // HTTP 请求日志中间件
        .layer(middleware::from_fn(log_request))
}

/// Bind the configured port and serve until ctrl-c
pub async fn serve(state: ServerState) -> Result<(), AppError> {
    let app = build_app(state.clone());

    let addr = format!("0.0.0.0:{}", state.config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("📅 Booking server listening on {}", addr);

    let bus = state.bus.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
            bus.shutdown();
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    Ok(())
}
