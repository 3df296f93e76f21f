use metrics::{counter, gauge, histogram, describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics instance.
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics collector for the settlement core.
#[derive(Debug, Clone)]
pub struct Metrics {
    initialized: bool,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self { initialized: true }
    }

    pub fn record_transfer_completed(&self, currency: &str) {
        counter!("transfers_completed_total", "currency" => currency.to_string()).increment(1);
    }

    pub fn record_transfer_failed(&self, currency: &str, failure_code: &str) {
        counter!("transfers_failed_total", "currency" => currency.to_string(), "failure_code" => failure_code.to_string()).increment(1);
    }

    pub fn record_transfer_reversed(&self, currency: &str) {
        counter!("transfers_reversed_total", "currency" => currency.to_string()).increment(1);
    }

    pub fn record_transfer_latency(&self, duration_ms: f64) {
        histogram!("transfer_execution_duration_ms").record(duration_ms);
    }

    pub fn record_ledger_write_latency(&self, duration_ms: f64) {
        histogram!("ledger_write_duration_ms").record(duration_ms);
    }

    pub fn record_idempotency_duplicate(&self, operation_type: &str) {
        counter!("idempotency_duplicates_total", "operation" => operation_type.to_string()).increment(1);
    }

    pub fn record_reconciliation_run(&self, accounts_checked: u64, drifted: u64) {
        histogram!("reconciliation_accounts_checked").record(accounts_checked as f64);
        gauge!("reconciliation_drifted_accounts").set(drifted as f64);
    }

    pub fn record_outbox_published(&self, count: u64) {
        counter!("outbox_events_published_total").increment(count);
    }

    pub fn record_outbox_dead_lettered(&self, count: u64) {
        counter!("outbox_events_dead_lettered_total").increment(count);
    }

    pub fn set_accounts_active(&self, count: i64) {
        gauge!("accounts_active").set(count as f64);
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_ms: f64) {
        counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string()).increment(1);
        histogram!("http_request_duration_ms", "method" => method.to_string(), "path" => path.to_string()).record(duration_ms);
    }

    pub fn record_db_query(&self, query_type: &str, duration_ms: f64, success: bool) {
        counter!("db_queries_total", "type" => query_type.to_string(), "success" => success.to_string()).increment(1);
        histogram!("db_query_duration_ms", "type" => query_type.to_string()).record(duration_ms);
    }

    pub fn record_redis_operation(&self, operation: &str, duration_ms: f64, success: bool) {
        counter!("redis_operations_total", "operation" => operation.to_string(), "success" => success.to_string()).increment(1);
        histogram!("redis_operation_duration_ms", "operation" => operation.to_string()).record(duration_ms);
    }

    pub fn record_kafka_message(&self, topic: &str, success: bool) {
        counter!("kafka_messages_total", "topic" => topic.to_string(), "success" => success.to_string()).increment(1);
    }
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Initializes the metrics system and returns the Prometheus handle.
pub fn init_metrics() -> PrometheusHandle {
    let handle = METRICS_HANDLE.get_or_init(|| {
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        describe_metrics();
        handle
    });

    METRICS.get_or_init(Metrics::new);

    handle.clone()
}

/// Describes all metrics for Prometheus.
fn describe_metrics() {
    describe_counter!("transfers_completed_total", Unit::Count, "Total number of completed transfers");
    describe_counter!("transfers_failed_total", Unit::Count, "Total number of failed transfers");
    describe_counter!("transfers_reversed_total", Unit::Count, "Total number of reversed transfers");
    describe_histogram!("transfer_execution_duration_ms", Unit::Milliseconds, "Transfer execution latency in milliseconds");

    describe_histogram!("ledger_write_duration_ms", Unit::Milliseconds, "Ledger write latency in milliseconds");

    describe_counter!("idempotency_duplicates_total", Unit::Count, "Total number of duplicate requests served from the idempotency store");

    describe_histogram!("reconciliation_accounts_checked", Unit::Count, "Accounts checked per reconciliation run");
    describe_gauge!("reconciliation_drifted_accounts", Unit::Count, "Accounts found drifted in the most recent reconciliation run");

    describe_counter!("outbox_events_published_total", Unit::Count, "Total outbox events published");
    describe_counter!("outbox_events_dead_lettered_total", Unit::Count, "Total outbox events dead-lettered after exceeding max attempts");

    describe_gauge!("accounts_active", Unit::Count, "Number of active accounts");

    describe_counter!("http_requests_total", Unit::Count, "Total HTTP requests");
    describe_histogram!("http_request_duration_ms", Unit::Milliseconds, "HTTP request latency in milliseconds");

    describe_counter!("db_queries_total", Unit::Count, "Total database queries");
    describe_histogram!("db_query_duration_ms", Unit::Milliseconds, "Database query latency in milliseconds");

    describe_counter!("redis_operations_total", Unit::Count, "Total Redis operations");
    describe_histogram!("redis_operation_duration_ms", Unit::Milliseconds, "Redis operation latency in milliseconds");

    describe_counter!("kafka_messages_total", Unit::Count, "Total Kafka messages");
}

/// Returns the global metrics instance.
pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
