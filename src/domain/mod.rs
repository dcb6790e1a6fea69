// Domain layer - Pure types and math, no I/O
pub mod feed;
pub mod segment;
pub mod series;
pub mod telemetry;
pub mod viewport;
