//! # View and Click Tracking
//!
//! Buffers tracking events from the request path and applies them to the
//! database in coalesced batches. Handlers push into a bounded in-process
//! queue and never block: when the queue is full the event is dropped and
//! counted. A background worker drains the queue, merges increments per
//! record, and flushes on a fixed interval. On shutdown the worker drains
//! whatever is still queued before exiting.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{counter, histogram};
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{Duration as TokioDuration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::TrackingConfig;
use crate::repositories::{BlogPostRepository, PerkRepository};

/// A single countable interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    PerkView(Uuid),
    PerkClick(Uuid),
    PostView(Uuid),
}

/// Cheap cloneable producer side handed to request handlers.
#[derive(Clone)]
pub struct TrackingHandle {
    sender: mpsc::Sender<TrackEvent>,
}

impl TrackingHandle {
    /// Enqueue an event without waiting. A full queue drops the event and
    /// bumps `tracking_events_dropped_total` instead of blocking the request.
    pub fn record(&self, event: TrackEvent) {
        if let Err(err) = self.sender.try_send(event) {
            match err {
                TrySendError::Full(event) => {
                    debug!(?event, "Tracking queue full, dropping event");
                    counter!("tracking_events_dropped_total").increment(1);
                }
                TrySendError::Closed(_) => {
                    debug!("Tracking worker stopped, dropping event");
                }
            }
        }
    }
}

/// Increments merged per record between flushes.
#[derive(Debug, Default)]
struct FlushBuffer {
    perk_views: HashMap<Uuid, i64>,
    perk_clicks: HashMap<Uuid, i64>,
    post_views: HashMap<Uuid, i64>,
}

impl FlushBuffer {
    fn add(&mut self, event: TrackEvent) {
        match event {
            TrackEvent::PerkView(id) => *self.perk_views.entry(id).or_insert(0) += 1,
            TrackEvent::PerkClick(id) => *self.perk_clicks.entry(id).or_insert(0) += 1,
            TrackEvent::PostView(id) => *self.post_views.entry(id).or_insert(0) += 1,
        }
    }

    fn is_empty(&self) -> bool {
        self.perk_views.is_empty() && self.perk_clicks.is_empty() && self.post_views.is_empty()
    }
}

/// Background task that owns the consumer side of the queue.
pub struct TrackingWorker {
    perks: PerkRepository,
    posts: BlogPostRepository,
    receiver: mpsc::Receiver<TrackEvent>,
    flush_interval_ms: u64,
}

/// Build the queue described by the config and split it into the handler-side
/// handle and the worker to spawn.
pub fn channel(
    db: Arc<DatabaseConnection>,
    config: &TrackingConfig,
) -> (TrackingHandle, TrackingWorker) {
    let (sender, receiver) = mpsc::channel(config.queue_capacity);
    let handle = TrackingHandle { sender };
    let worker = TrackingWorker {
        perks: PerkRepository::new(db.clone()),
        posts: BlogPostRepository::new(db),
        receiver,
        flush_interval_ms: config.flush_interval_ms,
    };
    (handle, worker)
}

impl TrackingWorker {
    /// Run the worker loop until the provided shutdown token fires.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Starting tracking worker");
        let mut ticker = tokio::time::interval(TokioDuration::from_millis(self.flush_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut buffer = FlushBuffer::default();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Tracking worker shutdown requested");
                    break;
                }
                event = self.receiver.recv() => {
                    match event {
                        Some(event) => buffer.add(event),
                        // All handles dropped, nothing more will arrive
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if !buffer.is_empty() {
                        let flush_started = Instant::now();
                        self.flush(std::mem::take(&mut buffer)).await;
                        histogram!("tracking_flush_duration_ms")
                            .record(flush_started.elapsed().as_secs_f64() * 1_000.0);
                    }
                }
            }
        }

        // Drain what is still queued so recorded activity survives shutdown
        while let Ok(event) = self.receiver.try_recv() {
            buffer.add(event);
        }
        if !buffer.is_empty() {
            self.flush(std::mem::take(&mut buffer)).await;
        }
        info!("Tracking worker stopped");
    }

    async fn flush(&self, buffer: FlushBuffer) {
        let mut applied: u64 = 0;

        for (id, count) in buffer.perk_views {
            match self.perks.bump_view_counts(&id, count).await {
                Ok(()) => applied += count as u64,
                Err(err) => Self::record_failure(err, "perk_views", &id),
            }
        }
        for (id, count) in buffer.perk_clicks {
            match self.perks.bump_click_counts(&id, count).await {
                Ok(()) => applied += count as u64,
                Err(err) => Self::record_failure(err, "perk_clicks", &id),
            }
        }
        for (id, count) in buffer.post_views {
            match self.posts.bump_view_counts(&id, count).await {
                Ok(()) => applied += count as u64,
                Err(err) => Self::record_failure(err, "post_views", &id),
            }
        }

        if applied > 0 {
            counter!("tracking_events_flushed_total").increment(applied);
        }
    }

    fn record_failure(err: anyhow::Error, target: &'static str, id: &Uuid) {
        warn!(error = ?err, target, record_id = %id, "Failed to flush tracking counters");
        counter!("tracking_flush_failures_total", "target" => target).increment(1);
    }
}
