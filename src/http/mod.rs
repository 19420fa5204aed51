//! The Control API: the operator-facing HTTP surface over the Store. Bearer
//! tokens are issued by `/api/auth/login` and required on every other
//! route.

mod auth;
mod handlers;
mod state;

pub use state::AppState;

use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/domain-logs", get(handlers::list_domain_logs))
        .route(
            "/api/lists/{source}/{list_type}/domains",
            get(handlers::list_domains),
        )
        .route(
            "/api/lists/manual/{list_type}/domains",
            post(handlers::insert_manual_domain),
        )
        .route(
            "/api/lists/{source}/{list_type}/domains/{domain}",
            delete(handlers::delete_domain),
        )
        .route("/api/lists/stats", get(handlers::stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer_token));

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/metrics", get(handlers::metrics))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
