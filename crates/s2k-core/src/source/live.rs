//! Live keyword-filtered feed over a streaming HTTP connection.
//!
//! The provider delivers an unbounded, non-restartable sequence of
//! line-delimited JSON payloads. One payload that fails to decode is skipped;
//! the feed ending or erroring closes the subscription.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::model::PostEvent;
use crate::source::{EventCallback, IngestionSource, Subscription};
use crate::{Error, Result};

/// Live feed source.
pub struct LiveSource {
    config: StreamConfig,
    client: reqwest::Client,
}

impl LiveSource {
    /// Build the HTTP client for the configured feed endpoint.
    ///
    /// No request timeout is set: the streaming response is expected to stay
    /// open for the process lifetime. Connects are still bounded.
    pub fn new(config: StreamConfig) -> Result<Self> {
        if config.live_endpoint.is_none() {
            return Err(StreamError::InvalidConfig("live endpoint is not set".into()).into());
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl IngestionSource for LiveSource {
    async fn subscribe(
        &mut self,
        keywords: &[String],
        on_event: EventCallback,
    ) -> Result<Subscription> {
        let endpoint = self
            .config
            .live_endpoint
            .clone()
            .ok_or_else(|| StreamError::InvalidConfig("live endpoint is not set".into()))?;

        let mut request = self
            .client
            .get(&endpoint)
            .query(&[("track", keywords.join(","))]);
        if let Some(ref token) = self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| StreamError::Connect(e.to_string()))?;

        info!(endpoint = %endpoint, keywords = ?keywords, "Live stream connected");

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.wait_for(|stop| *stop) => {
                        debug!("Live stream subscription released");
                        break;
                    }
                    chunk = stream.next() => match chunk {
                        Some(Ok(bytes)) => {
                            buffer.extend_from_slice(&bytes);
                            drain_lines(&mut buffer, &on_event);
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Live stream read failed, closing feed");
                            break;
                        }
                        None => {
                            warn!("Live stream ended");
                            break;
                        }
                    }
                }
            }
        });

        Ok(Subscription::new(stop_tx, task))
    }
}

/// Decode and deliver every complete line currently in `buffer`.
fn drain_lines(buffer: &mut Vec<u8>, on_event: &EventCallback) {
    while let Some(newline) = buffer.iter().position(|byte| *byte == b'\n') {
        let line: Vec<u8> = buffer.drain(..=newline).collect();
        let line = trim_line(&line);

        // Providers send bare newlines as keep-alives.
        if line.is_empty() {
            continue;
        }

        match serde_json::from_slice::<PostEvent>(line) {
            Ok(event) => on_event(event),
            Err(e) => warn!(error = %e, "Skipping undecodable stream payload"),
        }
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map(|index| index + 1)
        .unwrap_or(0);
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn collecting_callback() -> (EventCallback, Arc<Mutex<Vec<PostEvent>>>) {
        let events: Arc<Mutex<Vec<PostEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: EventCallback = Arc::new(move |event| sink.lock().push(event));
        (callback, events)
    }

    #[test]
    fn test_drain_lines_delivers_complete_lines() {
        let (callback, events) = collecting_callback();
        let mut buffer = Vec::new();

        buffer.extend_from_slice(
            br#"{"id":1,"author_id":2,"text":"a","created_at":0}"#,
        );
        drain_lines(&mut buffer, &callback);
        assert!(events.lock().is_empty(), "incomplete line must be buffered");

        buffer.extend_from_slice(b"\r\n");
        drain_lines(&mut buffer, &callback);
        assert_eq!(events.lock().len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_lines_handles_multiple_lines_per_chunk() {
        let (callback, events) = collecting_callback();
        let mut buffer = Vec::new();

        buffer.extend_from_slice(
            b"{\"id\":1,\"author_id\":2,\"text\":\"a\",\"created_at\":0}\n\
              {\"id\":2,\"author_id\":3,\"text\":\"b\",\"created_at\":1}\n",
        );
        drain_lines(&mut buffer, &callback);

        let events = events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, 1);
        assert_eq!(events[1].id, 2);
    }

    #[test]
    fn test_drain_lines_skips_keep_alives_and_poison() {
        let (callback, events) = collecting_callback();
        let mut buffer = Vec::new();

        buffer.extend_from_slice(b"\n\nnot json\n");
        buffer.extend_from_slice(b"{\"id\":9,\"author_id\":8,\"created_at\":7}\n");
        drain_lines(&mut buffer, &callback);

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, 9);
        assert_eq!(events[0].text, "");
    }

    #[test]
    fn test_new_requires_endpoint() {
        let config = StreamConfig {
            keywords: vec!["rust".into()],
            enable_mock_stream: false,
            live_endpoint: None,
            bearer_token: None,
            mock_min_post_length: 10,
            mock_max_post_length: 20,
            mock_sleep_ms: 100,
        };

        assert!(LiveSource::new(config).is_err());
    }
}
