//! Run command: bootstrap the backend, then ingest until shutdown.

use anyhow::Result;
use s2k_core::bootstrap::BootstrapCoordinator;
use s2k_core::engine::IngestionRunner;
use s2k_core::kafka::{KafkaAdmin, KafkaPublisher, RecordSink, TopicProvisioner, TopicSpec};
use s2k_core::metrics::IngestionMetrics;
use s2k_core::registry::{HttpRegistryEndpoint, RegistryReadinessProbe};
use s2k_core::source::{IngestionSource, LiveSource, SyntheticSource};
use s2k_core::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use crate::server::{start_server, ServerState};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// How long the final producer flush may block on shutdown.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Bootstrap and run the ingestion pipeline.
pub async fn run(
    mut config: Config,
    bootstrap_servers: Option<String>,
    topic: Option<String>,
    keywords: Option<String>,
) -> Result<()> {
    // Apply CLI overrides
    if let Some(servers) = bootstrap_servers {
        config.kafka.bootstrap_servers = servers.split(',').map(String::from).collect();
    }
    if let Some(t) = topic {
        config.kafka.topic_name = t.clone();
        config.kafka.topic_names_to_create = vec![t];
    }
    if let Some(k) = keywords {
        config.stream.keywords = k.split(',').map(|s| s.trim().to_string()).collect();
    }
    config.validate()?;

    info!(
        topic = %config.kafka.topic_name,
        keywords = ?config.stream.keywords,
        mock = config.stream.enable_mock_stream,
        "Starting ingestion service"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_handler(shutdown_tx);

    let health = Arc::new(s2k_core::health::HealthCheck::new());
    health.register_component("kafka");
    health.register_component("schema_registry");
    health.register_component("stream");

    let metrics = Arc::new(IngestionMetrics::new());

    let server_state = Arc::new(ServerState {
        health: Arc::clone(&health),
        metrics: Arc::clone(&metrics),
    });
    tokio::spawn(start_server(
        server_state,
        config.monitoring.health_port,
        config.monitoring.metrics_port,
        shutdown_rx.clone(),
    ));

    // Readiness gate: blocks the startup path by design. Ingestion must not
    // proceed while the backend is not confirmed available.
    let admin = KafkaAdmin::new(&config.kafka)?;
    let provisioner = TopicProvisioner::new(
        admin,
        TopicSpec::from_config(&config.kafka),
        config.retry.clone(),
    );
    let endpoint = HttpRegistryEndpoint::new(&config.kafka)?;
    let probe = RegistryReadinessProbe::new(
        endpoint,
        config.kafka.schema_registry_url.clone(),
        config.retry.clone(),
    );

    let mut coordinator = BootstrapCoordinator::new(provisioner, probe, shutdown_rx.clone());
    coordinator.ensure_ready().await?;
    health.mark_healthy("kafka");
    health.mark_healthy("schema_registry");

    let publisher = Arc::new(KafkaPublisher::new(&config.kafka, Arc::clone(&metrics))?);

    let source: Box<dyn IngestionSource> = if config.stream.enable_mock_stream {
        Box::new(SyntheticSource::new(config.stream.clone()))
    } else {
        Box::new(LiveSource::new(config.stream.clone())?)
    };

    let mut runner = IngestionRunner::new(
        source,
        Arc::clone(&publisher) as Arc<dyn RecordSink>,
        config.stream.keywords.clone(),
        Arc::clone(&metrics),
    );

    let outcome = match runner.start(coordinator.state()).await {
        Ok(()) => {
            health.mark_healthy("stream");
            health.job_started();
            wait_for_shutdown(shutdown_rx).await;
            Ok(())
        }
        Err(e) => {
            health.mark_unhealthy("stream", &e.to_string());
            Err(e)
        }
    };

    // Single shutdown path, reached on success and on failed start alike.
    runner.shutdown().await;
    publisher.flush(FLUSH_TIMEOUT);
    health.job_completed();

    info!(
        events = metrics.events_total(),
        delivered = metrics.deliveries_total(),
        failed = metrics.delivery_failures_total(),
        "Ingestion service stopped"
    );

    outcome?;
    Ok(())
}

/// Resolve once shutdown is requested.
async fn wait_for_shutdown(mut shutdown_rx: watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

/// Forward SIGINT and SIGTERM into the shutdown channel.
fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        let _ = shutdown_tx.send(true);
    });
}
