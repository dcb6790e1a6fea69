// HTTP repository for metadata, server time, status and segment endpoints
use crate::application::history_repository::{HistoryError, HistoryRepository};
use crate::domain::segment::SegmentKey;
use crate::domain::telemetry::{AggregateBucket, RatioSums, SeriesStatus};
use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

// Column layout shared by Scalar and Ratio segments. Columns 2..=4 hold
// variance, min and max, which the plots do not use.
const COL_TIMESTAMP: usize = 0;
const COL_MEAN: usize = 1;
const COL_COUNT: usize = 5;
const COL_NUMERATOR_SUM: usize = 6;
const COL_DENOMINATOR_SUM: usize = 7;

#[derive(Debug, Clone)]
pub struct HttpHistoryRepository {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SegmentResponse {
    data: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    min_time: Option<f64>,
    max_time: Option<f64>,
}

impl HttpHistoryRepository {
    pub fn new(base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn meta_url(&self) -> String {
        format!("{}/meta.json", self.base_url)
    }

    fn now_url(&self) -> String {
        format!("{}/now/", self.base_url)
    }

    fn status_url(&self, value_code: &str) -> String {
        format!(
            "{}/plot/{}/status.json",
            self.base_url,
            urlencoding::encode(value_code)
        )
    }

    fn segment_url(&self, key: &SegmentKey) -> String {
        format!(
            "{}/plot/{}/{}/{}.json",
            self.base_url,
            urlencoding::encode(&key.series_code),
            key.level,
            key.index
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, HistoryError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(HistoryError::Status { status, body });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| HistoryError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl HistoryRepository for HttpHistoryRepository {
    async fn fetch_meta(&self) -> Result<Value, HistoryError> {
        self.get_json(&self.meta_url()).await
    }

    async fn fetch_server_time(&self) -> Result<f64, HistoryError> {
        self.get_json(&self.now_url()).await
    }

    async fn fetch_status(&self, value_code: &str) -> Result<SeriesStatus, HistoryError> {
        let status: StatusResponse = self.get_json(&self.status_url(value_code)).await?;
        Ok(SeriesStatus {
            min_time_ms: status.min_time,
            max_time_ms: status.max_time,
        })
    }

    async fn fetch_segment(&self, key: &SegmentKey) -> Result<Vec<AggregateBucket>, HistoryError> {
        let response: SegmentResponse = self.get_json(&self.segment_url(key)).await?;
        parse_segment_rows(&response.data)
    }
}

/// Convert segment rows into buckets. Rows must be strictly ascending by
/// timestamp and carry at least the six scalar columns.
pub fn parse_segment_rows(rows: &[Vec<Value>]) -> Result<Vec<AggregateBucket>, HistoryError> {
    let mut buckets: Vec<AggregateBucket> = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        if row.len() <= COL_COUNT {
            return Err(HistoryError::Malformed(format!(
                "row {} has {} columns",
                i,
                row.len()
            )));
        }
        let required = |col: usize, name: &str| {
            row[col]
                .as_f64()
                .ok_or_else(|| HistoryError::Malformed(format!("row {}: {} is not numeric", i, name)))
        };
        let optional = |col: usize| row.get(col).and_then(Value::as_f64);

        let time_ms = required(COL_TIMESTAMP, "timestamp")?;
        let mean = required(COL_MEAN, "mean")?;
        let count = required(COL_COUNT, "count")?;
        if count.is_nan() || count < 0.0 || count.fract() != 0.0 {
            return Err(HistoryError::Malformed(format!(
                "row {}: count {} is not a non-negative integer",
                i, count
            )));
        }

        if let Some(previous) = buckets.last() {
            if time_ms <= previous.time_ms {
                return Err(HistoryError::Malformed(format!(
                    "row {}: timestamp {} not after {}",
                    i, time_ms, previous.time_ms
                )));
            }
        }

        let ratio = match (optional(COL_NUMERATOR_SUM), optional(COL_DENOMINATOR_SUM)) {
            (Some(numerator), Some(denominator)) => Some(RatioSums {
                numerator,
                denominator,
            }),
            _ => None,
        };

        buckets.push(AggregateBucket {
            time_ms,
            count: count as u64,
            sum: mean * count,
            ratio,
        });
    }

    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Vec<Value>> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_segment_url_encodes_code() {
        let repo =
            HttpHistoryRepository::new("http://host/base/".into(), Duration::from_secs(1)).unwrap();
        let key = SegmentKey::new("a b", 16, -3);
        assert_eq!(repo.segment_url(&key), "http://host/base/plot/a%20b/16/-3.json");
        assert_eq!(repo.status_url("temp"), "http://host/base/plot/temp/status.json");
        assert_eq!(repo.meta_url(), "http://host/base/meta.json");
    }

    #[test]
    fn test_parse_scalar_rows() {
        let buckets = parse_segment_rows(&rows(json!([
            [1000.0, 2.5, null, 1.0, 4.0, 4],
            [2000.0, 3.0, 0.5, 2.0, 4.0, 2]
        ])))
        .unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].sum, 10.0);
        assert_eq!(buckets[0].count, 4);
        assert_eq!(buckets[1].ratio, None);
        assert_eq!(buckets[1].mean(), 3.0);
    }

    #[test]
    fn test_parse_ratio_rows() {
        let buckets =
            parse_segment_rows(&rows(json!([[1000.0, 0.5, null, 0.4, 0.6, 3, 6.0, 12.0]]))).unwrap();
        assert_eq!(
            buckets[0].ratio,
            Some(RatioSums {
                numerator: 6.0,
                denominator: 12.0
            })
        );
    }

    #[test]
    fn test_short_row_is_malformed() {
        let err = parse_segment_rows(&rows(json!([[1000.0, 2.5]]))).unwrap_err();
        assert!(matches!(err, HistoryError::Malformed(_)));
    }

    #[test]
    fn test_non_numeric_mean_is_malformed() {
        let err = parse_segment_rows(&rows(json!([[1000.0, "x", null, 0, 0, 1]]))).unwrap_err();
        assert!(matches!(err, HistoryError::Malformed(_)));
    }

    #[test]
    fn test_invalid_counts_are_malformed() {
        for count in [json!(2.5), json!(-1), json!(-0.5)] {
            let err = parse_segment_rows(&rows(json!([[1000.0, 1.0, null, 1.0, 1.0, count]])))
                .unwrap_err();
            assert!(matches!(err, HistoryError::Malformed(_)), "count {}", count);
        }
    }

    #[test]
    fn test_out_of_order_rows_are_malformed() {
        let err = parse_segment_rows(&rows(json!([
            [2000.0, 1.0, null, 1.0, 1.0, 1],
            [1000.0, 1.0, null, 1.0, 1.0, 1]
        ])))
        .unwrap_err();
        assert!(matches!(err, HistoryError::Malformed(_)));
    }
}
