pub mod health;
pub mod metrics;

pub use health::{ComponentHealth, HealthCheckResult, HealthStatus};
pub use metrics::{MetricsSnapshot, RuntimeMetrics};
