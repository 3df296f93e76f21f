pub mod logging;
pub mod metrics;
pub mod health;

pub use logging::{init_logging, LogConfig, LogFormat, RequestSpan, mask_sensitive, mask_uuid, mask_amount};
pub use metrics::{init_metrics, get_metrics, Metrics, LatencyTimer, METRICS};
pub use health::{HealthChecker, HealthStatus, DependencyHealth, AggregatedHealth};
