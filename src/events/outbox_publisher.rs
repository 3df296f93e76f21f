use crate::config::ApplicationSettings;
use crate::events::producer::EventProducer;
use crate::events::types::EventEnvelope;
use crate::models::outbox_event::MAX_PUBLISH_ATTEMPTS;
use crate::observability::get_metrics;
use crate::repositories::OutboxRepository;
use chrono::Utc;
use rand::Rng;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Background poller draining the outbox. At-least-once delivery: a crash
/// between `send` succeeding and `mark_published` committing means the
/// event is republished on the next pass, which is why every consumer of
/// these events must be idempotent on `event_id`.
pub struct OutboxPublisher {
    repo: OutboxRepository,
    producer: Arc<EventProducer>,
    settings: ApplicationSettings,
}

impl OutboxPublisher {
    pub fn new(pool: PgPool, producer: Arc<EventProducer>, settings: ApplicationSettings) -> Self {
        Self {
            repo: OutboxRepository::new(pool),
            producer,
            settings,
        }
    }

    /// Spawns the polling loop as a background task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(self.settings.outbox_poll_interval_ms));
            loop {
                interval.tick().await;
                if let Err(err) = self.drain_once().await {
                    error!(error = %err, "outbox publisher pass failed");
                }
            }
        })
    }

    /// Publishes one batch of due events. Returns the number published.
    pub async fn drain_once(&self) -> crate::error::Result<usize> {
        let now = Utc::now();
        let batch = self
            .repo
            .pending(self.settings.outbox_batch_size, self.settings.outbox_max_attempts as i32, now)
            .await?;

        let mut published = 0;
        for event in batch {
            let envelope = EventEnvelope::from_outbox_event(&event);
            match self
                .producer
                .send(EventEnvelope::topic(), Some(&envelope.partition_key()), &envelope)
                .await
            {
                Ok(_) => {
                    self.repo.mark_published(event.id, Utc::now()).await?;
                    published += 1;
                }
                Err(err) => {
                    let attempts = event.attempts + 1;
                    let jitter_seconds = rand::thread_rng().gen_range(0..=5);
                    self.repo.bump_failure(event.id, attempts, jitter_seconds).await?;
                    if attempts >= MAX_PUBLISH_ATTEMPTS {
                        get_metrics().record_outbox_dead_lettered(1);
                        warn!(
                            event_id = %event.id,
                            aggregate_type = %event.aggregate_type,
                            aggregate_id = %event.aggregate_id,
                            "outbox event dead-lettered after exhausting retries"
                        );
                    } else {
                        warn!(event_id = %event.id, attempts, error = %err, "outbox publish attempt failed, will retry");
                    }
                }
            }
        }

        if published > 0 {
            get_metrics().record_outbox_published(published as u64);
            info!(published, "outbox publisher pass complete");
        }
        Ok(published)
    }
}
