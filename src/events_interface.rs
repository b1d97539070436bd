// Events HTTP interface - feed listing and session-gated form actions

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::FormRejection, rejection::QueryRejection,
        Multipart, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    infrastructure::{middleware::CurrentSession, require_session},
    models::EventFeed,
    services::parse_limit,
};

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub limit: Option<String>,
}

type EventForm = Result<Form<HashMap<String, String>>, FormRejection>;

pub fn create_events_router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/create_event", post(create_event))
        .route("/events/update_event", post(update_event))
        .route("/events/remove_event", post(remove_event))
        .route("/events/upload_image", post(upload_image))
}

async fn list_events(
    State(state): State<AppState>,
    params: Result<Query<FeedParams>, QueryRejection>,
) -> AppResult<Json<EventFeed>> {
    let raw_limit = params.ok().and_then(|Query(params)| params.limit);
    let limit = parse_limit(raw_limit.as_deref(), state.config.feed.default_limit);
    Ok(Json(state.feed.list_events(limit).await?))
}

async fn create_event(
    State(state): State<AppState>,
    session: CurrentSession,
    form: EventForm,
) -> AppResult<impl IntoResponse> {
    let form = read_form(&session, form)?;
    let created = state.actions.create(session.get(), &form).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": created.id, "slug": created.slug }))))
}

async fn update_event(
    State(state): State<AppState>,
    session: CurrentSession,
    form: EventForm,
) -> AppResult<Json<serde_json::Value>> {
    let form = read_form(&session, form)?;
    let slug = form.get("slug").cloned().unwrap_or_default();
    state.actions.update(session.get(), &slug, &form).await?;
    Ok(Json(json!({ "slug": slug, "updated": true })))
}

async fn remove_event(
    State(state): State<AppState>,
    session: CurrentSession,
    form: EventForm,
) -> AppResult<Json<serde_json::Value>> {
    let form = read_form(&session, form)?;
    let slug = form.get("slug").cloned().unwrap_or_default();
    state.actions.remove(session.get(), &slug).await?;
    Ok(Json(json!({ "slug": slug, "deleted": true })))
}

async fn upload_image(
    State(state): State<AppState>,
    session: CurrentSession,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<impl IntoResponse> {
    require_session(session.get())?;
    let mut multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let name = state.images.upload(session.get(), &file_name, &bytes).await?;
        return Ok((StatusCode::CREATED, Json(json!({ "name": name }))));
    }

    Err(AppError::Validation("Missing multipart field \"file\"".to_string()))
}

/// Session first, so an unauthenticated caller learns nothing about form handling
fn read_form(session: &CurrentSession, form: EventForm) -> AppResult<HashMap<String, String>> {
    require_session(session.get())?;
    form.map(|Form(form)| form)
        .map_err(|e| AppError::Validation(e.body_text()))
}
