// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{sync::Arc, time::Duration};
use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::engine::EngineContext;
use crate::application::render_scheduler::RenderScheduler;
use crate::infrastructure::config::load_engine_config;
use crate::infrastructure::frame_store::FrameStore;
use crate::infrastructure::http_history_repository::HttpHistoryRepository;
use crate::infrastructure::live_feed::spawn_tcp_feed;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    engine_status, get_plot, health_check, list_plots, post_gesture, post_mode, post_visibility,
};

const EVENT_QUEUE_DEPTH: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_engine_config().context("Failed to load engine configuration")?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(HttpHistoryRepository::new(
        config.history.base_url.clone(),
        Duration::from_millis(config.history.request_timeout_ms),
    )?);

    // Metadata, clock skew and historic range must be known before the first tick
    let context = EngineContext::bootstrap(repository.as_ref(), &config).await?;
    let frames = FrameStore::new(context.viewports.plot_count());

    let (events, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    spawn_tcp_feed(config.feed.clone(), events.clone());

    let scheduler = RenderScheduler::new(
        context,
        repository,
        frames.clone(),
        events.clone(),
        Duration::from_millis(config.scheduler.tick_ms),
    );
    tokio::spawn(scheduler.run(rx));

    // Create application state
    let state = Arc::new(AppState { frames, events });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/plots", get(list_plots))
        .route("/plots/:index", get(get_plot))
        .route("/plots/:index/gesture", post(post_gesture))
        .route("/plots/:index/visibility", post(post_visibility))
        .route("/mode", post(post_mode))
        .route("/status", get(engine_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!("Starting telemetry-viewport on {}", config.server.bind);

    axum::serve(listener, router).await?;

    Ok(())
}
