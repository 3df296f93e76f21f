use money_movement_core::api::{create_router, AppState};
use money_movement_core::config::Settings;
use money_movement_core::idempotency::{IdempotencyCleanupJob, IdempotencyHandler, IdempotencyHandlerConfig};
use money_movement_core::observability::{
    init_logging, init_metrics, LogConfig, LogFormat, HealthChecker,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first (needed for log level)
    let settings = Settings::new()?;

    // Initialize structured logging
    let log_config = LogConfig {
        level: settings.logging.level.clone(),
        format: LogFormat::from(settings.logging.format.as_str()),
        include_target: true,
        include_file: false,
        include_line: false,
    };
    init_logging(&log_config);

    // Initialize Prometheus metrics
    let metrics_handle = init_metrics();
    info!("Configuration loaded, metrics initialized");

    // Connect to PostgreSQL
    info!("Connecting to database...");
    let statement_timeout_ms = settings.database.statement_timeout_ms;
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.pool_size)
        .acquire_timeout(Duration::from_secs(settings.database.connect_timeout_seconds))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("SELECT set_config('statement_timeout', $1, false)")
                    .bind(statement_timeout_ms.to_string())
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&settings.database.url)
        .await?;

    info!("Database connection established");

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations applied successfully");

    // Connect to Redis
    info!("Connecting to Redis...");
    let redis_client = redis::Client::open(settings.redis.url.clone())?;
    let mut con = redis_client.get_multiplexed_async_connection().await?;
    let _: () = redis::cmd("PING").query_async(&mut con).await?;
    info!("Redis connection established");

    // Connect to Kafka (with timeout, preserve client)
    info!("Checking Kafka connection...");
    use rskafka::client::ClientBuilder;

    let connection = vec![settings.kafka.brokers.clone()];
    let kafka_client = match tokio::time::timeout(
        Duration::from_secs(settings.kafka.connect_timeout_seconds),
        ClientBuilder::new(connection).build(),
    )
    .await
    {
        Ok(Ok(client)) => {
            info!("Kafka client created successfully");
            Some(Arc::new(client))
        }
        Ok(Err(e)) => {
            tracing::warn!("Kafka connection failed: {}. Continuing without Kafka.", e);
            None
        }
        Err(_) => {
            tracing::warn!("Kafka connection timed out. Continuing without Kafka.");
            None
        }
    };

    if kafka_client.is_none() {
        info!("Kafka not available, continuing without event streaming");
    }

    // Start the outbox publisher if Kafka is reachable.
    if kafka_client.is_some() {
        let producer_config = money_movement_core::events::ProducerConfig {
            brokers: vec![settings.kafka.brokers.clone()],
            default_topic: format!("{}.events", settings.kafka.topic_prefix),
            compression: Default::default(),
            retry_count: 3,
            retry_delay_ms: 500,
            request_timeout_ms: 5_000,
        };
        let mut producer = money_movement_core::events::EventProducer::new(producer_config);
        match producer.connect().await {
            Ok(()) => {
                let publisher = money_movement_core::events::OutboxPublisher::new(
                    pool.clone(),
                    Arc::new(producer),
                    settings.application.clone(),
                );
                publisher.spawn();
                info!("Outbox publisher started");
            }
            Err(e) => {
                tracing::warn!("Outbox publisher not started: failed to connect producer: {}", e);
            }
        }
    } else {
        tracing::warn!("Outbox publisher not started: Kafka unavailable");
    }

    // Idempotency handler and its background cleanup job.
    let idempotency_config = IdempotencyHandlerConfig {
        ttl_seconds: settings.application.idempotency_ttl_seconds,
        ..IdempotencyHandlerConfig::default()
    };
    let idempotency_handler = Arc::new(IdempotencyHandler::new(
        pool.clone(),
        redis_client.clone(),
        idempotency_config,
    ));
    IdempotencyCleanupJob::new(
        idempotency_handler.clone(),
        settings.application.idempotency_cleanup_interval_seconds,
    )
    .start();

    info!("System startup verification complete.");

    // Create health checker
    let health_checker = Arc::new(HealthChecker::new(
        pool.clone(),
        redis_client.clone(),
        kafka_client.clone(),
    ));

    // Create application state with metrics handle and health checker
    let state = AppState::new(
        pool,
        redis_client,
        kafka_client,
        idempotency_handler,
        &settings.application,
    )
    .with_metrics(metrics_handle)
    .with_health_checker(health_checker);

    // Create API router
    let app = create_router(state);

    // Start HTTP server
    let addr = format!("{}:{}", settings.application.host, settings.application.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
