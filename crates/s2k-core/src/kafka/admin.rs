//! Topic provisioning against the Kafka cluster.
//!
//! Topic creation is asynchronous at the cluster level: a successful create
//! call does not guarantee immediate visibility, so presence is polled
//! independently after submission. Both operations retry under the bootstrap
//! backoff policy and are fatal once the attempt ceiling is reached.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::types::RDKafkaErrorCode;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backoff::{interruptible_sleep, Backoff};
use crate::config::{KafkaConfig, RetryConfig};
use crate::error::{BootstrapError, KafkaError};
use crate::kafka::base_client_config;
use crate::Result;

/// Specification of one topic to provision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    /// Topic name
    pub name: String,
    /// Partition count
    pub partitions: i32,
    /// Replication factor
    pub replication_factor: i32,
}

impl TopicSpec {
    /// Build the provisioning set from configuration.
    pub fn from_config(config: &KafkaConfig) -> Vec<TopicSpec> {
        config
            .topic_names_to_create
            .iter()
            .map(|name| TopicSpec {
                name: name.trim().to_string(),
                partitions: config.num_partitions,
                replication_factor: config.replication_factor,
            })
            .collect()
    }
}

/// Per-topic result of a create-topics submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicCreation {
    /// Topic was newly created
    Created(String),
    /// Topic already existed; not a failure
    AlreadyExists(String),
    /// Cluster rejected the topic for another reason
    Rejected { name: String, reason: String },
}

/// Admin capability of the log cluster.
#[async_trait]
pub trait ClusterAdmin: Send + Sync {
    /// Submit one batched create request for all specs.
    async fn create_topics(&self, specs: &[TopicSpec]) -> Result<Vec<TopicCreation>>;

    /// List the names of all topics currently visible in the cluster.
    async fn list_topics(&self) -> Result<HashSet<String>>;
}

/// Production `ClusterAdmin` backed by the rdkafka admin client.
pub struct KafkaAdmin {
    admin: AdminClient<DefaultClientContext>,
    request_timeout: Duration,
}

impl KafkaAdmin {
    /// Create an admin client against the configured brokers.
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let admin: AdminClient<DefaultClientContext> =
            base_client_config(config).create().map_err(|e| {
                KafkaError::ClientBuild {
                    brokers: config.bootstrap_servers.join(","),
                    message: e.to_string(),
                }
            })?;

        Ok(Self {
            admin,
            request_timeout: Duration::from_millis(config.request_timeout_ms),
        })
    }
}

#[async_trait]
impl ClusterAdmin for KafkaAdmin {
    async fn create_topics(&self, specs: &[TopicSpec]) -> Result<Vec<TopicCreation>> {
        let new_topics: Vec<NewTopic> = specs
            .iter()
            .map(|spec| {
                NewTopic::new(
                    &spec.name,
                    spec.partitions,
                    TopicReplication::Fixed(spec.replication_factor),
                )
            })
            .collect();

        let opts = AdminOptions::new().operation_timeout(Some(self.request_timeout));
        let results = self
            .admin
            .create_topics(new_topics.iter(), &opts)
            .await
            .map_err(|e| KafkaError::AdminRequest(e.to_string()))?;

        Ok(results
            .into_iter()
            .map(|result| match result {
                Ok(name) => TopicCreation::Created(name),
                Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    TopicCreation::AlreadyExists(name)
                }
                Err((name, code)) => TopicCreation::Rejected {
                    name,
                    reason: code.to_string(),
                },
            })
            .collect())
    }

    async fn list_topics(&self) -> Result<HashSet<String>> {
        let metadata = self
            .admin
            .inner()
            .fetch_metadata(None, self.request_timeout)
            .map_err(|e| KafkaError::Metadata(e.to_string()))?;

        Ok(metadata
            .topics()
            .iter()
            .map(|topic| topic.name().to_string())
            .collect())
    }
}

/// Creates the configured topics and confirms they are visible.
pub struct TopicProvisioner<A> {
    admin: A,
    specs: Vec<TopicSpec>,
    retry: RetryConfig,
}

impl<A: ClusterAdmin> TopicProvisioner<A> {
    /// Create a provisioner for the given topic set.
    pub fn new(admin: A, specs: Vec<TopicSpec>, retry: RetryConfig) -> Self {
        Self { admin, specs, retry }
    }

    /// Submit the batched create request, retrying under backoff.
    ///
    /// "Topic already exists" results are tolerated, so calling this twice
    /// with the same spec set succeeds both times. Any other fault retries
    /// the whole batch; exhausting the ceiling is fatal.
    pub async fn create_topics(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> std::result::Result<(), BootstrapError> {
        let mut backoff = Backoff::new(&self.retry);
        let mut last_failure;

        loop {
            info!(
                topics = self.specs.len(),
                attempt = backoff.attempt(),
                "Submitting create-topics request"
            );

            match self.admin.create_topics(&self.specs).await {
                Ok(results) => {
                    let mut rejected = Vec::new();
                    for result in results {
                        match result {
                            TopicCreation::Created(name) => {
                                info!(topic = %name, "Topic created");
                            }
                            TopicCreation::AlreadyExists(name) => {
                                info!(topic = %name, "Topic already exists");
                            }
                            TopicCreation::Rejected { name, reason } => {
                                warn!(topic = %name, reason = %reason, "Topic creation rejected");
                                rejected.push(format!("{name}: {reason}"));
                            }
                        }
                    }

                    if rejected.is_empty() {
                        return Ok(());
                    }
                    last_failure = rejected.join(", ");
                }
                Err(e) => {
                    warn!(error = %e, "Create-topics request failed");
                    last_failure = e.to_string();
                }
            }

            if !backoff.has_attempts_remaining() {
                return Err(BootstrapError::ProvisioningFailed {
                    attempts: backoff.attempt(),
                    message: last_failure,
                });
            }
            interruptible_sleep(backoff.next_delay(), shutdown, "topic provisioning").await?;
        }
    }

    /// Poll the cluster until every configured topic is visible.
    pub async fn await_all_present(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> std::result::Result<(), BootstrapError> {
        let names: Vec<&str> = self.specs.iter().map(|spec| spec.name.as_str()).collect();
        let mut backoff = Backoff::new(&self.retry);

        loop {
            let missing: Vec<&str> = match self.admin.list_topics().await {
                Ok(present) => {
                    debug!(
                        found = present.len(),
                        attempt = backoff.attempt(),
                        "Listed cluster topics"
                    );
                    names
                        .iter()
                        .filter(|name| !present.contains(**name))
                        .copied()
                        .collect()
                }
                Err(e) => {
                    warn!(error = %e, "Topic listing failed");
                    names.clone()
                }
            };

            if missing.is_empty() {
                info!(topics = ?names, "All topics visible in cluster");
                return Ok(());
            }

            if !backoff.has_attempts_remaining() {
                return Err(BootstrapError::ProvisioningFailed {
                    attempts: backoff.attempt(),
                    message: format!("topics not visible: {}", missing.join(", ")),
                });
            }

            debug!(missing = ?missing, "Topics not yet visible, backing off");
            interruptible_sleep(backoff.next_delay(), shutdown, "topic provisioning").await?;
        }
    }
}
