use serde::{Deserialize, Serialize};

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health of one runtime component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            message: "ok".to_string(),
        }
    }

    pub fn degraded(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Degraded,
            message: message.into(),
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            message: message.into(),
        }
    }
}

/// Overall health check result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: String,
    pub timestamp: u64,
    pub checks: Vec<ComponentHealth>,
}

impl HealthCheckResult {
    /// Aggregate component checks: the worst component wins
    pub fn from_components(checks: Vec<ComponentHealth>) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut overall = HealthStatus::Healthy;
        let mut messages = Vec::new();

        for check in &checks {
            match check.status {
                HealthStatus::Unhealthy => {
                    overall = HealthStatus::Unhealthy;
                    messages.push(format!("{}: {}", check.name, check.message));
                }
                HealthStatus::Degraded => {
                    if overall == HealthStatus::Healthy {
                        overall = HealthStatus::Degraded;
                    }
                    messages.push(format!("{}: {}", check.name, check.message));
                }
                HealthStatus::Healthy => {}
            }
        }

        let message = if messages.is_empty() {
            "All systems operational".to_string()
        } else {
            messages.join("; ")
        };

        Self {
            status: overall,
            message,
            timestamp,
            checks,
        }
    }
}
