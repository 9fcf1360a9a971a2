use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use page_sensor::{sensor_middleware, Instrumentation};

use crate::handlers;
use crate::AppState;

/// Builds the full Axum `Router`. Without instrumentation the routes still
/// work; their task timers report into a no-op recorder.
pub fn create_router(
    state: Arc<AppState>,
    instrumentation: Option<Arc<Instrumentation>>,
) -> Router {
    let router = Router::new()
        // ── User endpoints ──────────────────────────────────────
        .route("/api/users/:id", get(handlers::users::get_user))
        .route("/api/users", post(handlers::users::create_user))
        // ── Product endpoints ───────────────────────────────────
        .route(
            "/api/products/:id",
            get(handlers::products::get_product),
        )
        // ── Provide shared state to all routes above ────────────
        .with_state(state);

    // ── Global middleware (applied bottom-up) ───────────────────
    let router = match instrumentation {
        Some(instrumentation) => router.layer(axum_mw::from_fn_with_state(
            instrumentation,
            sensor_middleware,
        )),
        None => router,
    };

    router.layer(CorsLayer::permissive())
}
