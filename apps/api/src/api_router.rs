use axum::Router;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/sync/batch", post(handlers::sync::batch_sync_handler))
        .route(
            "/api/pending-changes",
            get(handlers::pending_changes::list_pending_changes_handler)
                .post(handlers::pending_changes::submit_pending_change_handler),
        )
        .route(
            "/api/pending-changes/mine",
            get(handlers::pending_changes::list_my_pending_changes_handler),
        )
        .route(
            "/api/pending-changes/{change_id}",
            get(handlers::pending_changes::get_pending_change_handler)
                .delete(handlers::pending_changes::delete_pending_change_handler),
        )
        .route(
            "/api/pending-changes/{change_id}/approve",
            post(handlers::pending_changes::approve_pending_change_handler),
        )
        .route(
            "/api/pending-changes/{change_id}/reject",
            post(handlers::pending_changes::reject_pending_change_handler),
        )
        .route_layer(from_fn(middleware::require_identity));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
