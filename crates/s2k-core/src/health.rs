//! Component health tracking for the ingestion service.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Health status of a single component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentStatus {
    /// Component is healthy
    Healthy,
    /// Component is degraded but operational
    Degraded(String),
    /// Component is unhealthy
    Unhealthy(String),
    /// Component has not reported yet
    Unknown,
}

/// Overall system health, rolled up from all components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// All components healthy
    Healthy,
    /// Some components degraded
    Degraded,
    /// At least one component unhealthy
    Unhealthy,
}

/// Tracks component health and whether the ingestion job is running.
pub struct HealthCheck {
    components: RwLock<HashMap<String, ComponentStatus>>,
    job_running: RwLock<bool>,
}

impl HealthCheck {
    /// Create an empty health registry.
    pub fn new() -> Self {
        Self {
            components: RwLock::new(HashMap::new()),
            job_running: RwLock::new(false),
        }
    }

    /// Register a component to track; it starts as `Unknown`.
    pub fn register_component(&self, name: &str) {
        self.components
            .write()
            .insert(name.to_string(), ComponentStatus::Unknown);
    }

    /// Mark a component as healthy.
    pub fn mark_healthy(&self, name: &str) {
        self.components
            .write()
            .insert(name.to_string(), ComponentStatus::Healthy);
    }

    /// Mark a component as degraded.
    pub fn mark_degraded(&self, name: &str, reason: &str) {
        self.components.write().insert(
            name.to_string(),
            ComponentStatus::Degraded(reason.to_string()),
        );
    }

    /// Mark a component as unhealthy.
    pub fn mark_unhealthy(&self, name: &str, reason: &str) {
        self.components.write().insert(
            name.to_string(),
            ComponentStatus::Unhealthy(reason.to_string()),
        );
    }

    /// Status of a specific component, if registered.
    pub fn component_status(&self, name: &str) -> Option<ComponentStatus> {
        self.components.read().get(name).cloned()
    }

    /// Snapshot of all component statuses.
    pub fn all_statuses(&self) -> HashMap<String, ComponentStatus> {
        self.components.read().clone()
    }

    /// Overall system health.
    pub fn overall_status(&self) -> HealthStatus {
        let components = self.components.read();

        let mut has_degraded = false;
        for status in components.values() {
            match status {
                ComponentStatus::Unhealthy(_) => return HealthStatus::Unhealthy,
                ComponentStatus::Degraded(_) => has_degraded = true,
                _ => {}
            }
        }

        if has_degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Whether the system can accept work (healthy or degraded).
    pub fn is_operational(&self) -> bool {
        self.overall_status() != HealthStatus::Unhealthy
    }

    /// Mark the ingestion job as started.
    pub fn job_started(&self) {
        *self.job_running.write() = true;
    }

    /// Mark the ingestion job as stopped.
    pub fn job_completed(&self) {
        *self.job_running.write() = false;
    }

    /// Whether the ingestion job is running.
    pub fn is_job_running(&self) -> bool {
        *self.job_running.read()
    }
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let health = HealthCheck::new();

        health.register_component("kafka");
        health.register_component("schema_registry");
        assert_eq!(
            health.component_status("kafka"),
            Some(ComponentStatus::Unknown)
        );

        health.mark_healthy("kafka");
        health.mark_healthy("schema_registry");
        assert_eq!(health.overall_status(), HealthStatus::Healthy);

        health.mark_degraded("kafka", "delivery latency");
        assert_eq!(health.overall_status(), HealthStatus::Degraded);
        assert!(health.is_operational());

        health.mark_unhealthy("schema_registry", "connection refused");
        assert_eq!(health.overall_status(), HealthStatus::Unhealthy);
        assert!(!health.is_operational());

        health.mark_healthy("schema_registry");
        health.mark_healthy("kafka");
        assert_eq!(health.overall_status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_unknown_component() {
        let health = HealthCheck::new();
        assert_eq!(health.component_status("stream"), None);
        assert_eq!(health.overall_status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_unhealthy_outranks_degraded() {
        let health = HealthCheck::new();
        health.mark_degraded("kafka", "slow");
        health.mark_unhealthy("stream", "closed");
        assert_eq!(health.overall_status(), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_job_flag() {
        let health = HealthCheck::default();
        assert!(!health.is_job_running());

        health.job_started();
        assert!(health.is_job_running());

        health.job_completed();
        assert!(!health.is_job_running());
    }

    #[test]
    fn test_all_statuses_snapshot() {
        let health = HealthCheck::new();
        health.mark_healthy("kafka");
        health.mark_degraded("stream", "reconnecting");

        let statuses = health.all_statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses.get("kafka"), Some(&ComponentStatus::Healthy));
        assert!(matches!(
            statuses.get("stream"),
            Some(ComponentStatus::Degraded(_))
        ));
    }
}
