//! Booking API Module

mod handler;

use axum::{Router, middleware, routing::get, routing::post};

use crate::auth::require_admin;
use crate::core::ServerState;

/// Booking router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/bookings", routes())
}

fn routes() -> Router<ServerState> {
    // 用户路由：本人预订的创建、查看、取消
    let user_routes = Router::new()
        .route("/", post(handler::create))
        .route("/mine", get(handler::list_mine))
        .route("/mine/upcoming", get(handler::list_mine_upcoming))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/cancel", post(handler::cancel));

    // 管理路由：全量列表、状态流转、删除
    let manage_routes = Router::new()
        .route("/", get(handler::list))
        .route("/resource/{id}", get(handler::list_by_resource))
        .route(
            "/{id}/status",
            axum::routing::put(handler::update_status),
        )
        .route("/{id}", axum::routing::delete(handler::delete))
        .layer(middleware::from_fn(require_admin));

    user_routes.merge(manage_routes)
}
