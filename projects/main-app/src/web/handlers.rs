use std::sync::Arc;

use axum::{
    Json,
    extract::{Form, Query, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    app_state::AppState,
    core::{
        errors::AppError,
        state::{StatusKind, StreamState, StreamStatus},
    },
    stream::url::normalize_stream_url,
};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub struct StateResponse {
    state: StreamState,
    kind: StatusKind,
    message: String,
    is_error: bool,
    url: Option<String>,
    frames: u64,
    resolution: Option<String>,
}

#[derive(Deserialize)]
pub struct StartRequest {
    url: String,
}

#[derive(Deserialize)]
pub struct FrameQuery {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Deserialize)]
pub struct MessageRequest {
    text: String,
    url: Option<String>,
}

fn status_tag(status: &StreamStatus) -> Html<String> {
    let color = match status.kind {
        StatusKind::Streaming => "is-success",
        StatusKind::Connecting => "is-warning",
        StatusKind::Error => "is-danger",
        StatusKind::Idle | StatusKind::Stopped => "is-dark",
    };
    Html(format!(
        "<span class=\"tag {color} is-medium\">{}</span>",
        escape_html(&status.message)
    ))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub async fn root() -> Redirect {
    Redirect::to("/static/index.html")
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn status(State(state): State<Arc<AppState>>) -> Html<String> {
    status_tag(&state.display.status())
}

pub async fn stream_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    let service_status = state.stream.lock().await.status();
    let status = state.display.status();
    let resolution = state
        .display
        .frame()
        .map(|frame| format!("{} × {}", frame.width(), frame.height()));

    Json(StateResponse {
        state: service_status.state,
        kind: status.kind,
        is_error: status.is_error(),
        message: status.message,
        url: service_status.url.map(|url| url.to_string()),
        frames: state.display.frames_shown(),
        resolution,
    })
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<StartRequest>,
) -> Result<Html<String>, AppError> {
    let url = {
        let mut stream = state.stream.lock().await;
        stream.start(&payload.url)?
    };
    info!("stream start requested for {url}");
    Ok(status_tag(&state.display.status()))
}

pub async fn stop(State(state): State<Arc<AppState>>) -> Html<String> {
    {
        let mut stream = state.stream.lock().await;
        stream.stop();
    }
    info!("stream stop requested");
    status_tag(&state.display.status())
}

pub async fn frame(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FrameQuery>,
) -> Result<Response, AppError> {
    let Some(frame) = state.display.frame() else {
        return Err(AppError::new(StatusCode::NOT_FOUND, "No video"));
    };

    let body = match (query.width, query.height) {
        (None, None) => frame.jpeg(),
        (width, height) => {
            let (width, height) = (width.unwrap_or(u32::MAX), height.unwrap_or(u32::MAX));
            tokio::task::spawn_blocking(move || frame.fit_within(width, height))
                .await
                .map_err(|err| AppError::internal(format!("frame scaling task failed: {err}")))??
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok((StatusCode::OK, headers, body).into_response())
}

pub async fn message(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<MessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.text.is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "text cannot be empty"));
    }

    let stream_url = match payload.url.as_deref().filter(|url| !url.trim().is_empty()) {
        Some(input) => normalize_stream_url(input, &state.config.default_stream_path)?,
        None => state.stream.lock().await.current_url().ok_or_else(|| {
            AppError::new(
                StatusCode::BAD_REQUEST,
                "no stream URL to derive the message endpoint from",
            )
        })?,
    };

    match state.messages.send_text(&stream_url, &payload.text).await {
        Ok(endpoint) => {
            info!("message sent to {endpoint}");
            Ok((StatusCode::ACCEPTED, format!("Message sent to {endpoint}")))
        }
        Err(err) => {
            warn!("message send failed: {err:#}");
            Err(AppError::new(
                StatusCode::BAD_GATEWAY,
                format!("Failed to send message: {err:#}"),
            ))
        }
    }
}
