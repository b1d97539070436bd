use axum::{extract::DefaultBodyLimit, middleware, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    app_state::AppState, events_interface::create_events_router,
    images_interface::create_images_router, infrastructure::middleware::session_middleware,
};

/// Full application router with session resolution, tracing and CORS applied
pub fn create_app_router(state: AppState) -> Router {
    let body_limit = state.config.files.max_upload_bytes;

    Router::new()
        .merge(create_events_router())
        .merge(create_images_router())
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    session_middleware::<AppState>,
                )),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
