//! Resource API Module

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::require_admin;
use crate::core::ServerState;

/// Resource router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/resources", routes())
}

fn routes() -> Router<ServerState> {
    // 读取路由：任何已登录用户可用
    let read_routes = Router::new()
        .route("/", get(handler::list))
        .route("/search", get(handler::search))
        .route("/category/{category}", get(handler::list_by_category))
        .route("/{id}", get(handler::get_by_id));

    // 管理路由：仅管理员可用
    let manage_routes = Router::new()
        .route("/all", get(handler::list_with_inactive))
        .route("/", axum::routing::post(handler::create))
        .route(
            "/{id}",
            axum::routing::put(handler::update).delete(handler::delete),
        )
        .route("/{id}/active", axum::routing::put(handler::set_active))
        .layer(middleware::from_fn(require_admin));

    read_routes.merge(manage_routes)
}
