//! S2K Core - social-stream to Kafka ingestion engine
//!
//! This library provides the core functionality for ingesting a
//! keyword-filtered stream of social posts and publishing them to Kafka:
//!
//! - Startup readiness gate: topic provisioning and schema registry probe
//!   with bounded exponential backoff
//! - Pure event-to-wire-record transformation
//! - Fire-and-forget publishing with asynchronous delivery observation
//! - Live and synthetic ingestion sources behind one interface

pub mod backoff;
pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod kafka;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod source;

// Re-export commonly used types
pub use config::Config;
pub use error::{BootstrapError, KafkaError, StreamError};
pub use error::{Error, Result};
