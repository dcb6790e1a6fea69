// Repository trait for historical data access
use crate::domain::segment::SegmentKey;
use crate::domain::telemetry::{AggregateBucket, SeriesStatus};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Series metadata document (flat array or group tree)
    async fn fetch_meta(&self) -> Result<serde_json::Value, HistoryError>;

    /// Current server epoch time in milliseconds
    async fn fetch_server_time(&self) -> Result<f64, HistoryError>;

    /// Time range the historical store holds for one series
    async fn fetch_status(&self, value_code: &str) -> Result<SeriesStatus, HistoryError>;

    /// Aggregate buckets of one segment, ascending by time
    async fn fetch_segment(&self, key: &SegmentKey) -> Result<Vec<AggregateBucket>, HistoryError>;
}
