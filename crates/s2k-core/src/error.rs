//! Error types for the s2k core library.
//!
//! Uses hierarchical domain-specific errors following the thiserror pattern.

use thiserror::Error;

/// Result type alias for s2k operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for s2k.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Kafka-related error
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    /// Bootstrap (readiness gate) error
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    /// Stream ingestion error
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the startup readiness gate.
///
/// These are always fatal to bootstrap and terminate startup; they carry the
/// failed phase and the final attempt count so the process exit message can
/// report both.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    /// Topic creation or visibility polling exhausted its retry budget
    #[error("Topic provisioning failed after {attempts} attempt(s): {message}")]
    ProvisioningFailed { attempts: u32, message: String },

    /// Schema registry never answered with a success status
    #[error("Schema registry at {url} not reachable after {attempts} attempt(s)")]
    RegistryUnreachable { attempts: u32, url: String },

    /// Shutdown was requested while a backoff sleep was pending
    #[error("Bootstrap interrupted by shutdown during {phase}")]
    Interrupted { phase: &'static str },
}

/// Kafka-specific errors.
#[derive(Error, Debug)]
pub enum KafkaError {
    /// Failed to build a client against the configured brokers
    #[error("Failed to create Kafka client for {brokers}: {message}")]
    ClientBuild { brokers: String, message: String },

    /// Admin request (topic creation) could not be submitted
    #[error("Admin request failed: {0}")]
    AdminRequest(String),

    /// Cluster metadata could not be fetched
    #[error("Metadata fetch failed: {0}")]
    Metadata(String),

    /// Record could not be handed to the producer send buffer
    #[error("Producer enqueue failed: {0}")]
    Enqueue(String),
}

/// Errors from the ingestion side of the pipeline.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Could not open the subscription against the stream provider
    #[error("Failed to connect to stream provider: {0}")]
    Connect(String),

    /// `start()` was called before the readiness gate passed
    #[error("Ingestion cannot start: backend readiness not confirmed")]
    BackendNotReady,

    /// `start()` was called while a subscription is already active
    #[error("Ingestion is already running")]
    AlreadyRunning,

    /// Stream configuration is unusable
    #[error("Invalid stream configuration: {0}")]
    InvalidConfig(String),
}

// Conversion implementations for external error types

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
