//! Startup readiness gate.
//!
//! Sequences topic provisioning, topic visibility polling, and the schema
//! registry probe, then records the outcome in a write-once `ReadinessState`.
//! Ingestion is only permitted to start against a `Ready` state.

use tokio::sync::watch;
use tracing::{error, info};

use crate::error::BootstrapError;
use crate::kafka::{ClusterAdmin, TopicProvisioner};
use crate::registry::{RegistryEndpoint, RegistryReadinessProbe};
use crate::{Error, Result};

/// Process-wide readiness state, set exactly once and never reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessState {
    /// Bootstrap has not run
    NotStarted,
    /// Backend confirmed available; ingestion may start
    Ready,
    /// Bootstrap failed; the cause is re-raised on further calls
    Failed(BootstrapError),
}

impl ReadinessState {
    /// Whether the readiness gate has passed.
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadinessState::Ready)
    }
}

/// Runs the readiness gate once at process start.
///
/// `ensure_ready` takes `&mut self`, so concurrent invocation is
/// unrepresentable; repeat invocation is a no-op after `Ready` and re-raises
/// the stored cause after `Failed`.
pub struct BootstrapCoordinator<A, E> {
    provisioner: TopicProvisioner<A>,
    probe: RegistryReadinessProbe<E>,
    state: ReadinessState,
    shutdown: watch::Receiver<bool>,
}

impl<A: ClusterAdmin, E: RegistryEndpoint> BootstrapCoordinator<A, E> {
    /// Create a coordinator over the two bootstrap phases.
    pub fn new(
        provisioner: TopicProvisioner<A>,
        probe: RegistryReadinessProbe<E>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            provisioner,
            probe,
            state: ReadinessState::NotStarted,
            shutdown,
        }
    }

    /// Block until the log cluster and schema registry are confirmed
    /// available, or fail with the phase that exhausted its attempts.
    pub async fn ensure_ready(&mut self) -> Result<()> {
        match &self.state {
            ReadinessState::Ready => return Ok(()),
            ReadinessState::Failed(cause) => return Err(Error::Bootstrap(cause.clone())),
            ReadinessState::NotStarted => {}
        }

        match self.run_gate().await {
            Ok(()) => {
                self.state = ReadinessState::Ready;
                info!("Bootstrap complete, backend is ready");
                Ok(())
            }
            Err(cause) => {
                error!(error = %cause, "Bootstrap failed");
                self.state = ReadinessState::Failed(cause.clone());
                Err(Error::Bootstrap(cause))
            }
        }
    }

    async fn run_gate(&mut self) -> std::result::Result<(), BootstrapError> {
        info!("Provisioning topics");
        self.provisioner.create_topics(&mut self.shutdown).await?;
        self.provisioner.await_all_present(&mut self.shutdown).await?;

        info!("Probing schema registry");
        self.probe.await_ready(&mut self.shutdown).await?;

        Ok(())
    }

    /// The recorded readiness state.
    pub fn state(&self) -> &ReadinessState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::kafka::{TopicCreation, TopicSpec};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Admin stub that always succeeds and counts calls.
    #[derive(Default)]
    struct CountingAdmin {
        create_calls: Arc<AtomicU32>,
        list_calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl ClusterAdmin for CountingAdmin {
        async fn create_topics(&self, specs: &[TopicSpec]) -> crate::Result<Vec<TopicCreation>> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            Ok(specs
                .iter()
                .map(|spec| TopicCreation::Created(spec.name.clone()))
                .collect())
        }

        async fn list_topics(&self) -> crate::Result<HashSet<String>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(HashSet::from(["filtered-posts".to_string()]))
        }
    }

    /// Registry stub with a fixed status and a call counter.
    struct CountingEndpoint {
        status: Option<u16>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl RegistryEndpoint for CountingEndpoint {
        async fn health_check(&self) -> Option<u16> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.status
        }
    }

    fn retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 2,
            initial_sleep_ms: 10,
            multiplier: 2.0,
        }
    }

    fn coordinator(
        registry_status: Option<u16>,
    ) -> (
        BootstrapCoordinator<CountingAdmin, CountingEndpoint>,
        Arc<AtomicU32>,
        Arc<AtomicU32>,
        Arc<AtomicU32>,
    ) {
        let admin = CountingAdmin::default();
        let create_calls = Arc::clone(&admin.create_calls);
        let list_calls = Arc::clone(&admin.list_calls);

        let probe_calls = Arc::new(AtomicU32::new(0));
        let endpoint = CountingEndpoint {
            status: registry_status,
            calls: Arc::clone(&probe_calls),
        };

        let specs = vec![TopicSpec {
            name: "filtered-posts".into(),
            partitions: 3,
            replication_factor: 1,
        }];
        let provisioner = TopicProvisioner::new(admin, specs, retry());
        let probe =
            RegistryReadinessProbe::new(endpoint, "http://localhost:8081".into(), retry());

        // Dropping the sender is fine: shutdown then simply never fires.
        let (_tx, rx) = watch::channel(false);

        (
            BootstrapCoordinator::new(provisioner, probe, rx),
            create_calls,
            list_calls,
            probe_calls,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_ready_sequences_phases() {
        let (mut coordinator, create_calls, list_calls, probe_calls) = coordinator(Some(200));

        assert_eq!(*coordinator.state(), ReadinessState::NotStarted);
        coordinator.ensure_ready().await.unwrap();

        assert!(coordinator.state().is_ready());
        assert_eq!(create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(probe_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_ensure_ready_is_a_no_op() {
        let (mut coordinator, create_calls, list_calls, probe_calls) = coordinator(Some(200));

        coordinator.ensure_ready().await.unwrap();
        coordinator.ensure_ready().await.unwrap();

        assert_eq!(create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(probe_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_state_re_raises_stored_cause() {
        // Registry stays down: probe makes max_attempts + 1 checks, then the
        // gate fails; the second call must not probe again.
        let (mut coordinator, _create_calls, _list_calls, probe_calls) = coordinator(Some(503));

        let first = coordinator.ensure_ready().await.unwrap_err();
        let calls_after_first = probe_calls.load(Ordering::SeqCst);
        assert_eq!(calls_after_first, 3);

        let second = coordinator.ensure_ready().await.unwrap_err();
        assert_eq!(probe_calls.load(Ordering::SeqCst), calls_after_first);
        assert_eq!(first.to_string(), second.to_string());

        match coordinator.state() {
            ReadinessState::Failed(BootstrapError::RegistryUnreachable { attempts, .. }) => {
                assert_eq!(*attempts, 3);
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn test_readiness_state_is_ready() {
        assert!(ReadinessState::Ready.is_ready());
        assert!(!ReadinessState::NotStarted.is_ready());
        assert!(
            !ReadinessState::Failed(BootstrapError::Interrupted { phase: "registry probe" })
                .is_ready()
        );
    }
}
