// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod frame_store;
pub mod http_history_repository;
pub mod live_feed;
