// Application layer - Engine components and the single event queue
pub mod clock_sync;
pub mod engine;
pub mod history_repository;
pub mod live_buffer;
pub mod render_scheduler;
pub mod renderer;
pub mod segment_cache;
pub mod series_model;
pub mod smoothing;
pub mod viewport_controller;
