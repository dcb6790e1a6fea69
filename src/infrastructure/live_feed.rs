// Live feed transport: newline-delimited JSON over TCP
use crate::application::engine::EngineEvent;
use crate::domain::feed::{FeedStatus, LiveMessage};
use crate::infrastructure::config::FeedSettings;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

/// Connect to the feed and forward every message onto the engine queue,
/// reconnecting after `reconnect_delay_ms` whenever the connection drops.
pub fn spawn_tcp_feed(settings: FeedSettings, events: mpsc::Sender<EngineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let delay = Duration::from_millis(settings.reconnect_delay_ms);
        while !events.is_closed() {
            match TcpStream::connect(&settings.address).await {
                Ok(stream) => {
                    tracing::info!("Connected to live feed at {}", settings.address);
                    let _ = events.send(EngineEvent::Feed(FeedStatus::Connected)).await;
                    if let Err(e) = forward_messages(stream, &events).await {
                        tracing::warn!("Live feed read error: {}", e);
                    }
                    let _ = events.send(EngineEvent::Feed(FeedStatus::Disconnected)).await;
                }
                Err(e) => {
                    tracing::debug!("Live feed at {} unavailable: {}", settings.address, e);
                    let _ = events.send(EngineEvent::Feed(FeedStatus::Disconnected)).await;
                }
            }
            tokio::time::sleep(delay).await;
        }
    })
}

/// Read messages until EOF. Unparsable lines are logged and skipped.
pub async fn forward_messages<R>(reader: R, events: &mpsc::Sender<EngineEvent>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = LinesStream::new(BufReader::new(reader).lines());
    while let Some(line) = lines.next().await {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LiveMessage>(&line) {
            Ok(message) => {
                if events.send(EngineEvent::Live(message)).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("Dropping malformed feed message: {}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forwards_valid_lines_and_skips_bad_ones() {
        let input = concat!(
            r#"{"topic": "a:", "data": {"fields": {"t": 1}}}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"topic": "b:", "data": {"fields": {"t": 2}}}"#,
            "\n",
        );
        let (tx, mut rx) = mpsc::channel(8);
        forward_messages(input.as_bytes(), &tx).await.unwrap();
        drop(tx);

        let mut topics = Vec::new();
        while let Some(event) = rx.recv().await {
            if let EngineEvent::Live(message) = event {
                topics.push(message.topic);
            }
        }
        assert_eq!(topics, vec!["a:", "b:"]);
    }

    #[tokio::test]
    async fn test_stops_when_engine_gone() {
        let input = r#"{"topic": "a:", "data": {"fields": {}}}"#;
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert!(forward_messages(input.as_bytes(), &tx).await.is_ok());
    }
}
