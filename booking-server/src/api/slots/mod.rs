//! Slot API Module

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::require_admin;
use crate::core::ServerState;

/// Slot router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/slots", routes())
}

fn routes() -> Router<ServerState> {
    // 读取路由：任何已登录用户可用
    let read_routes = Router::new()
        .route("/", get(handler::list))
        .route("/{id}", get(handler::get_by_id));

    // 管理路由：仅管理员可用
    let manage_routes = Router::new()
        .route("/", axum::routing::post(handler::create))
        .route("/generate", axum::routing::post(handler::generate))
        .route("/{id}", axum::routing::delete(handler::delete))
        .route(
            "/resource/{id}",
            axum::routing::delete(handler::delete_by_resource),
        )
        .layer(middleware::from_fn(require_admin));

    read_routes.merge(manage_routes)
}
