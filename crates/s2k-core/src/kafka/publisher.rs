//! Asynchronous record publishing to Kafka.
//!
//! Submission is non-blocking: `publish` returns as soon as the record is in
//! the producer's send buffer, and the eventual delivery outcome is observed
//! on a spawned task. Delivery is at-most-once at this layer; redelivery, if
//! wanted, belongs to the underlying client configuration.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rdkafka::error::KafkaError as RdKafkaError;
use rdkafka::message::OwnedMessage;
use rdkafka::producer::{DeliveryFuture, FutureProducer, FutureRecord, Producer};
use tracing::{debug, error, info, warn};

use crate::config::KafkaConfig;
use crate::error::KafkaError;
use crate::kafka::base_client_config;
use crate::metrics::IngestionMetrics;
use crate::model::PostRecord;
use crate::Result;

/// Longest record text fragment included in failure logs.
const LOG_TEXT_LIMIT: usize = 64;

/// Accepts a (key, record) pair for asynchronous publishing.
///
/// Implementations must never block the calling event handler and must catch
/// and log per-record failures instead of propagating them; a poison record
/// must not stop the stream.
pub trait RecordSink: Send + Sync {
    /// Hand one record to the sink.
    fn publish(&self, key: i64, record: &PostRecord);
}

/// Result of one publish attempt, observed asynchronously.
///
/// Outcomes may arrive out of submission order and on arbitrary tasks; they
/// feed observability only, never retry logic for the record they describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Record was acknowledged by the cluster
    Delivered {
        topic: String,
        partition: i32,
        offset: i64,
        at: DateTime<Utc>,
    },
    /// Record was not delivered
    Failed { topic: String, cause: String },
}

impl DeliveryOutcome {
    fn from_result(
        topic: &str,
        result: std::result::Result<(i32, i64), (RdKafkaError, OwnedMessage)>,
    ) -> Self {
        match result {
            Ok((partition, offset)) => DeliveryOutcome::Delivered {
                topic: topic.to_string(),
                partition,
                offset,
                at: Utc::now(),
            },
            Err((cause, _message)) => DeliveryOutcome::Failed {
                topic: topic.to_string(),
                cause: cause.to_string(),
            },
        }
    }
}

/// Kafka-backed record sink built on `FutureProducer`.
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
    metrics: Arc<IngestionMetrics>,
}

impl KafkaPublisher {
    /// Create a producer against the configured brokers.
    pub fn new(config: &KafkaConfig, metrics: Arc<IngestionMetrics>) -> Result<Self> {
        let mut client_config = base_client_config(config);
        client_config.set("message.timeout.ms", config.delivery_timeout_ms.to_string());

        let producer: FutureProducer = client_config.create().map_err(|e| {
            KafkaError::ClientBuild {
                brokers: config.bootstrap_servers.join(","),
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            producer,
            topic: config.topic_name.clone(),
            metrics,
        })
    }

    /// Wait for in-flight records to drain, up to `timeout`.
    ///
    /// Called once on shutdown; full quiescence is not promised, so a timeout
    /// is reported but not treated as an error.
    pub fn flush(&self, timeout: Duration) {
        if let Err(e) = self.producer.flush(timeout) {
            warn!(error = %e, "Producer flush did not complete in time");
        }
    }

    fn observe(future: DeliveryFuture, topic: String, key: i64, text: String, metrics: Arc<IngestionMetrics>) {
        tokio::spawn(async move {
            let outcome = match future.await {
                Ok(result) => DeliveryOutcome::from_result(&topic, result),
                Err(_canceled) => DeliveryOutcome::Failed {
                    topic,
                    cause: "producer closed before delivery was resolved".into(),
                },
            };

            match outcome {
                DeliveryOutcome::Delivered {
                    topic,
                    partition,
                    offset,
                    at,
                } => {
                    metrics.record_delivery();
                    info!(
                        topic = %topic,
                        partition = partition,
                        offset = offset,
                        at = %at,
                        key = key,
                        "Record delivered"
                    );
                }
                DeliveryOutcome::Failed { topic, cause } => {
                    metrics.record_delivery_failure();
                    error!(
                        topic = %topic,
                        key = key,
                        text = %truncate_for_log(&text, LOG_TEXT_LIMIT),
                        cause = %cause,
                        "Record delivery failed"
                    );
                }
            }
        });
    }
}

impl RecordSink for KafkaPublisher {
    fn publish(&self, key: i64, record: &PostRecord) {
        let payload = match serde_json::to_vec(record) {
            Ok(payload) => payload,
            Err(e) => {
                self.metrics.record_publish_error();
                error!(key = key, error = %e, "Record serialization failed");
                return;
            }
        };
        let key_bytes = key.to_be_bytes();

        debug!(topic = %self.topic, key = key, "Publishing record");

        let future_record = FutureRecord::to(&self.topic)
            .key(&key_bytes[..])
            .payload(&payload);

        match self.producer.send_result(future_record) {
            Ok(future) => {
                self.metrics.record_publish();
                Self::observe(
                    future,
                    self.topic.clone(),
                    key,
                    record.text.clone(),
                    Arc::clone(&self.metrics),
                );
            }
            Err((e, _record)) => {
                self.metrics.record_publish_error();
                error!(
                    topic = %self.topic,
                    key = key,
                    text = %truncate_for_log(&record.text, LOG_TEXT_LIMIT),
                    error = %e,
                    "Producer enqueue failed"
                );
            }
        }
    }
}

/// Truncate `text` to at most `limit` characters for log output.
fn truncate_for_log(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_input() {
        assert_eq!(truncate_for_log("hello", 64), "hello");
    }

    #[test]
    fn test_truncate_for_log_limits_length() {
        let long = "a".repeat(200);
        assert_eq!(truncate_for_log(&long, 64).len(), 64);
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let text = "ünïcödé".repeat(20);
        let truncated = truncate_for_log(&text, 10);
        assert_eq!(truncated.chars().count(), 10);
    }

    #[test]
    fn test_delivery_outcome_from_success() {
        let outcome = DeliveryOutcome::from_result("filtered-posts", Ok((2, 41)));
        match outcome {
            DeliveryOutcome::Delivered {
                topic,
                partition,
                offset,
                ..
            } => {
                assert_eq!(topic, "filtered-posts");
                assert_eq!(partition, 2);
                assert_eq!(offset, 41);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_delivery_outcome_from_failure() {
        let message = OwnedMessage::new(None, None, "filtered-posts".into(), rdkafka::Timestamp::NotAvailable, 0, 0, None);
        let outcome = DeliveryOutcome::from_result(
            "filtered-posts",
            Err((RdKafkaError::MessageProduction(rdkafka::types::RDKafkaErrorCode::MessageTimedOut), message)),
        );
        match outcome {
            DeliveryOutcome::Failed { topic, cause } => {
                assert_eq!(topic, "filtered-posts");
                assert!(cause.to_lowercase().contains("time"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
