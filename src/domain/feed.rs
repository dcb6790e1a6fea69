// Live feed message envelope
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct LiveMessage {
    pub topic: String,
    pub data: LiveData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveData {
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Connecting,
    Connected,
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_envelope() {
        let msg: LiveMessage = serde_json::from_str(
            r#"{"topic": "rover.data:", "data": {"fields": {"timestamp": 1, "x": 2.5}}}"#,
        )
        .unwrap();
        assert_eq!(msg.topic, "rover.data:");
        assert_eq!(msg.data.fields["x"], 2.5);
    }
}
