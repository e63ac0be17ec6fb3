//! Configuration structures for s2k.
//!
//! Configuration is loaded from TOML files and can be overridden via CLI flags.
//! Everything is read once at bootstrap; there is no hot-reload.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Error, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Kafka cluster and schema registry configuration
    pub kafka: KafkaConfig,

    /// Retry/backoff configuration for the readiness gate
    #[serde(default)]
    pub retry: RetryConfig,

    /// Stream provider configuration
    pub stream: StreamConfig,

    /// Monitoring configuration
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Kafka cluster configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KafkaConfig {
    /// Kafka bootstrap servers
    pub bootstrap_servers: Vec<String>,

    /// Topic records are published to
    pub topic_name: String,

    /// Topics created and confirmed present before ingestion starts.
    /// Usually contains `topic_name`.
    pub topic_names_to_create: Vec<String>,

    /// Partition count for created topics
    #[serde(default = "default_num_partitions")]
    pub num_partitions: i32,

    /// Replication factor for created topics
    #[serde(default = "default_replication_factor")]
    pub replication_factor: i32,

    /// Schema registry health-check URL
    pub schema_registry_url: String,

    /// Timeout for admin and registry requests in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Upper bound for a record sitting in the producer send buffer
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,

    /// Security configuration
    #[serde(default)]
    pub security: KafkaSecurityConfig,
}

/// Kafka security configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KafkaSecurityConfig {
    /// Security protocol (PLAINTEXT, SSL, SASL_SSL, SASL_PLAINTEXT)
    pub protocol: Option<String>,

    /// SASL mechanism (PLAIN, SCRAM-SHA-256, SCRAM-SHA-512)
    pub sasl_mechanism: Option<String>,

    /// SASL username
    pub sasl_username: Option<String>,

    /// SASL password
    pub sasl_password: Option<String>,

    /// SSL CA certificate location
    pub ssl_ca_location: Option<PathBuf>,

    /// SSL client certificate location
    pub ssl_cert_location: Option<PathBuf>,

    /// SSL client key location
    pub ssl_key_location: Option<PathBuf>,
}

/// Retry configuration for the bootstrap readiness gate.
///
/// The first sleep lasts `initial_sleep_ms`; every further sleep is the
/// previous one times `multiplier`, up to `max_attempts` checks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Maximum number of attempts before bootstrap fails
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial sleep between attempts in milliseconds
    #[serde(default = "default_initial_sleep_ms")]
    pub initial_sleep_ms: u64,

    /// Sleep growth factor, must be greater than 1
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_sleep_ms: default_initial_sleep_ms(),
            multiplier: default_multiplier(),
        }
    }
}

/// Stream provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Keywords the provider-side filter tracks
    pub keywords: Vec<String>,

    /// Use the synthetic in-process event generator instead of the live feed
    #[serde(default)]
    pub enable_mock_stream: bool,

    /// Live feed endpoint; required unless `enable_mock_stream` is set
    pub live_endpoint: Option<String>,

    /// Bearer token for the live feed
    pub bearer_token: Option<String>,

    /// Minimum generated post length in characters (mock stream)
    #[serde(default = "default_mock_min_post_length")]
    pub mock_min_post_length: usize,

    /// Maximum generated post length in characters (mock stream)
    #[serde(default = "default_mock_max_post_length")]
    pub mock_max_post_length: usize,

    /// Pause between generated posts in milliseconds (mock stream)
    #[serde(default = "default_mock_sleep_ms")]
    pub mock_sleep_ms: u64,
}

/// Monitoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Port for the health endpoints
    #[serde(default = "default_health_port")]
    pub health_port: u16,

    /// Port for the Prometheus metrics endpoint
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Base log level when RUST_LOG is not set
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            health_port: default_health_port(),
            metrics_port: default_metrics_port(),
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
        }
    }
}

/// Log verbosity level.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level logging
    Trace,
    /// Debug-level logging
    Debug,
    /// Info-level logging (default)
    #[default]
    Info,
    /// Warning-level logging
    Warn,
    /// Error-level logging
    Error,
}

impl LogLevel {
    /// Filter directive string for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured JSON output (default)
    #[default]
    Json,
    /// Human-readable text output
    Text,
}

impl Config {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.kafka.bootstrap_servers.is_empty() {
            return Err(Error::Config("Kafka bootstrap servers cannot be empty".into()));
        }
        if self.kafka.topic_name.is_empty() {
            return Err(Error::Config("Kafka topic name cannot be empty".into()));
        }
        if self.kafka.topic_names_to_create.is_empty() {
            return Err(Error::Config("Topic list to create cannot be empty".into()));
        }
        if self.kafka.topic_names_to_create.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::Config("Topic names to create cannot be blank".into()));
        }
        if self.kafka.num_partitions < 1 {
            return Err(Error::Config("Partition count must be positive".into()));
        }
        if self.kafka.replication_factor < 1 {
            return Err(Error::Config("Replication factor must be positive".into()));
        }
        if self.kafka.schema_registry_url.is_empty() {
            return Err(Error::Config("Schema registry URL cannot be empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("Retry max attempts must be at least 1".into()));
        }
        if self.retry.initial_sleep_ms == 0 {
            return Err(Error::Config("Retry initial sleep must be positive".into()));
        }
        if self.retry.multiplier <= 1.0 {
            return Err(Error::Config("Retry multiplier must be greater than 1".into()));
        }
        if self.stream.keywords.is_empty() {
            return Err(Error::Config("Keyword list cannot be empty".into()));
        }
        if !self.stream.enable_mock_stream && self.stream.live_endpoint.is_none() {
            return Err(Error::Config(
                "Stream live endpoint is required unless the mock stream is enabled".into(),
            ));
        }
        if self.stream.mock_min_post_length == 0
            || self.stream.mock_min_post_length > self.stream.mock_max_post_length
        {
            return Err(Error::Config(
                "Mock post length bounds must satisfy 0 < min <= max".into(),
            ));
        }
        Ok(())
    }
}

fn default_num_partitions() -> i32 {
    3
}

fn default_replication_factor() -> i32 {
    1
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_delivery_timeout_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_sleep_ms() -> u64 {
    2_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_mock_min_post_length() -> usize {
    10
}

fn default_mock_max_post_length() -> usize {
    120
}

fn default_mock_sleep_ms() -> u64 {
    1_000
}

fn default_health_port() -> u16 {
    8080
}

fn default_metrics_port() -> u16 {
    9090
}
