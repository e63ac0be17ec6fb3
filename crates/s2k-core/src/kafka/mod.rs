//! Kafka admin and producer integration.

mod admin;
mod publisher;

pub use admin::{ClusterAdmin, KafkaAdmin, TopicCreation, TopicProvisioner, TopicSpec};
pub use publisher::{DeliveryOutcome, KafkaPublisher, RecordSink};

use rdkafka::ClientConfig;

use crate::config::KafkaConfig;

/// Base client configuration shared by the admin client and the producer.
pub(crate) fn base_client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config.set("bootstrap.servers", config.bootstrap_servers.join(","));

    if let Some(ref protocol) = config.security.protocol {
        client_config.set("security.protocol", protocol);
    }
    if let Some(ref mechanism) = config.security.sasl_mechanism {
        client_config.set("sasl.mechanism", mechanism);
    }
    if let Some(ref username) = config.security.sasl_username {
        client_config.set("sasl.username", username);
    }
    if let Some(ref password) = config.security.sasl_password {
        client_config.set("sasl.password", password);
    }
    if let Some(ref path) = config.security.ssl_ca_location {
        client_config.set("ssl.ca.location", path.to_string_lossy().as_ref());
    }
    if let Some(ref path) = config.security.ssl_cert_location {
        client_config.set("ssl.certificate.location", path.to_string_lossy().as_ref());
    }
    if let Some(ref path) = config.security.ssl_key_location {
        client_config.set("ssl.key.location", path.to_string_lossy().as_ref());
    }

    client_config
}
