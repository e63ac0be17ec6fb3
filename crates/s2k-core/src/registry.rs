//! Schema registry readiness probe.
//!
//! A lightweight GET against the registry endpoint, repeated under the
//! bootstrap backoff policy until a 2xx status is seen. Transport faults and
//! non-success statuses are treated uniformly as "not ready"; only an
//! exhausted attempt ceiling is fatal.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::backoff::{interruptible_sleep, Backoff};
use crate::config::{KafkaConfig, RetryConfig};
use crate::error::BootstrapError;
use crate::{Error, Result};

/// Health-check capability of the schema registry.
#[async_trait]
pub trait RegistryEndpoint: Send + Sync {
    /// Issue one health request. `None` means the endpoint could not be
    /// reached at all; `Some(status)` carries the HTTP status code.
    async fn health_check(&self) -> Option<u16>;
}

/// Production `RegistryEndpoint` backed by reqwest.
pub struct HttpRegistryEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpRegistryEndpoint {
    /// Build an HTTP client for the configured registry URL.
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.schema_registry_url.clone(),
        })
    }
}

#[async_trait]
impl RegistryEndpoint for HttpRegistryEndpoint {
    async fn health_check(&self) -> Option<u16> {
        match self.client.get(&self.url).send().await {
            Ok(response) => Some(response.status().as_u16()),
            Err(_) => None,
        }
    }
}

/// Polls the schema registry until it reports ready.
pub struct RegistryReadinessProbe<E> {
    endpoint: E,
    url: String,
    retry: RetryConfig,
}

impl<E: RegistryEndpoint> RegistryReadinessProbe<E> {
    /// Create a probe for the given endpoint.
    pub fn new(endpoint: E, url: String, retry: RetryConfig) -> Self {
        Self { endpoint, url, retry }
    }

    /// Block until the registry answers with a 2xx status.
    ///
    /// Exhausting the attempt ceiling raises `RegistryUnreachable`; no
    /// further health requests are made after a success.
    pub async fn await_ready(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> std::result::Result<(), BootstrapError> {
        let mut backoff = Backoff::new(&self.retry);

        loop {
            match self.endpoint.health_check().await {
                Some(status) if (200..300).contains(&status) => {
                    info!(url = %self.url, status = status, "Schema registry is ready");
                    return Ok(());
                }
                Some(status) => {
                    debug!(
                        url = %self.url,
                        status = status,
                        attempt = backoff.attempt(),
                        "Schema registry not ready"
                    );
                }
                None => {
                    debug!(
                        url = %self.url,
                        attempt = backoff.attempt(),
                        "Schema registry unreachable"
                    );
                }
            }

            if !backoff.has_attempts_remaining() {
                return Err(BootstrapError::RegistryUnreachable {
                    attempts: backoff.attempt(),
                    url: self.url.clone(),
                });
            }
            interruptible_sleep(backoff.next_delay(), shutdown, "registry probe").await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct ScriptedEndpoint {
        responses: Mutex<VecDeque<Option<u16>>>,
        calls: AtomicU32,
    }

    impl ScriptedEndpoint {
        fn with_responses(responses: &[Option<u16>]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().copied().collect()),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl RegistryEndpoint for ScriptedEndpoint {
        async fn health_check(&self) -> Option<u16> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses.lock().pop_front().flatten()
        }
    }

    fn retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_sleep_ms: 100,
            multiplier: 2.0,
        }
    }

    fn probe(endpoint: ScriptedEndpoint, max_attempts: u32) -> RegistryReadinessProbe<ScriptedEndpoint> {
        RegistryReadinessProbe::new(endpoint, "http://localhost:8081".into(), retry(max_attempts))
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_ready_retries_until_success() {
        // 503 three times, then 200: exactly 4 health checks, no 5th.
        let endpoint = ScriptedEndpoint::with_responses(&[
            Some(503),
            Some(503),
            Some(503),
            Some(200),
            Some(500),
        ]);
        let probe = probe(endpoint, 10);
        let (_tx, mut rx) = watch::channel(false);

        probe.await_ready(&mut rx).await.unwrap();
        assert_eq!(probe.endpoint.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_ready_accepts_any_2xx() {
        let endpoint = ScriptedEndpoint::with_responses(&[Some(204)]);
        let probe = probe(endpoint, 3);
        let (_tx, mut rx) = watch::channel(false);

        probe.await_ready(&mut rx).await.unwrap();
        assert_eq!(probe.endpoint.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_ready_treats_transport_fault_as_not_ready() {
        let endpoint = ScriptedEndpoint::with_responses(&[None, None, Some(200)]);
        let probe = probe(endpoint, 5);
        let (_tx, mut rx) = watch::channel(false);

        probe.await_ready(&mut rx).await.unwrap();
        assert_eq!(probe.endpoint.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_ready_exhausts_attempts() {
        let endpoint = ScriptedEndpoint::default();
        let probe = probe(endpoint, 3);
        let (_tx, mut rx) = watch::channel(false);

        let err = probe.await_ready(&mut rx).await.unwrap_err();
        match err {
            BootstrapError::RegistryUnreachable { attempts, url } => {
                assert_eq!(attempts, 4);
                assert_eq!(url, "http://localhost:8081");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(probe.endpoint.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_ready_interrupted_by_shutdown() {
        let endpoint = ScriptedEndpoint::default();
        let probe = probe(endpoint, 10);
        let (tx, mut rx) = watch::channel(false);

        let waiter = tokio::spawn(async move { probe.await_ready(&mut rx).await });

        tokio::task::yield_now().await;
        tx.send(true).unwrap();

        let err = waiter.await.unwrap().unwrap_err();
        assert_eq!(err, BootstrapError::Interrupted { phase: "registry probe" });
    }
}
