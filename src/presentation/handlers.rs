// HTTP request handlers
use crate::application::engine::EngineEvent;
use crate::application::renderer::{EngineStatus, PlotFrame};
use crate::application::viewport_controller::Gesture;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub live: bool,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Latest frame of every plot; plots not yet drawn are `null`
pub async fn list_plots(State(state): State<Arc<AppState>>) -> Json<Vec<Option<PlotFrame>>> {
    Json(state.frames.frames())
}

pub async fn get_plot(
    Path(index): Path<usize>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<PlotFrame>, StatusCode> {
    state.frames.frame(index).map(Json).ok_or(StatusCode::NOT_FOUND)
}

pub async fn post_gesture(
    Path(index): Path<usize>,
    State(state): State<Arc<AppState>>,
    Json(gesture): Json<Gesture>,
) -> StatusCode {
    if index >= state.frames.plot_count() {
        return StatusCode::NOT_FOUND;
    }
    submit(&state, EngineEvent::Gesture { plot: index, gesture }).await
}

pub async fn post_visibility(
    Path(index): Path<usize>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<VisibilityRequest>,
) -> StatusCode {
    if index >= state.frames.plot_count() {
        return StatusCode::NOT_FOUND;
    }
    submit(
        &state,
        EngineEvent::SetVisible {
            plot: index,
            visible: request.visible,
        },
    )
    .await
}

pub async fn post_mode(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ModeRequest>,
) -> StatusCode {
    submit(&state, EngineEvent::SetLiveMode(request.live)).await
}

pub async fn engine_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.frames.status() {
        Some(status) => Json::<EngineStatus>(status).into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn submit(state: &AppState, event: EngineEvent) -> StatusCode {
    match state.events.send(event).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            tracing::error!("Engine queue closed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
