// Images HTTP interface - GET /images/{name}

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    routing::get,
    Router,
};

use crate::{app_state::AppState, error::AppResult, services::FileResponse};

pub fn create_images_router() -> Router<AppState> {
    Router::new().route("/images/{name}", get(serve_image))
}

async fn serve_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> AppResult<FileResponse> {
    let if_none_match = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok());
    state.images.serve(&name, if_none_match).await
}
