/*
 *  Copyright 2025-2026 Activity Service Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Background delivery worker.
//!
//! A supervised loop that runs a delivery pass on a fixed interval. The loop
//! shares the pass implementation (and therefore the claim protocol) with
//! manual triggers, so the two can race safely.
//!
//! Failure semantics: transport errors are absorbed inside the pass and
//! become FAILED rows; store errors abort the current pass, are recorded in
//! the processor stats, and the loop simply tries again on the next tick.
//! Stopping the processor stops the loop before the next tick but does not
//! roll back a pass already in flight.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::service::OutboxService;

/// Configuration for the background processor.
#[derive(Debug, Clone)]
pub struct OutboxProcessorConfig {
    poll_interval: Duration,
    batch_size: usize,
}

impl OutboxProcessorConfig {
    /// Returns a builder with the default configuration.
    pub fn builder() -> OutboxProcessorConfigBuilder {
        OutboxProcessorConfigBuilder::default()
    }

    /// Interval between scheduled delivery passes.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Maximum events claimed per scheduled pass.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Default for OutboxProcessorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            batch_size: 50,
        }
    }
}

/// Builder for [`OutboxProcessorConfig`].
#[derive(Debug, Default)]
pub struct OutboxProcessorConfigBuilder {
    poll_interval: Option<Duration>,
    batch_size: Option<usize>,
}

impl OutboxProcessorConfigBuilder {
    /// Sets the interval between scheduled delivery passes.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Sets the maximum events claimed per scheduled pass.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Builds the configuration, filling unset fields with defaults.
    pub fn build(self) -> OutboxProcessorConfig {
        let defaults = OutboxProcessorConfig::default();
        OutboxProcessorConfig {
            poll_interval: self.poll_interval.unwrap_or(defaults.poll_interval),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
        }
    }
}

/// Snapshot of the processor's counters and state.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessorStats {
    pub is_running: bool,
    /// Completed delivery passes, including empty ones.
    pub passes: u64,
    /// Events delivered across all passes.
    pub delivered: u64,
    /// Events marked FAILED across all passes.
    pub failed: u64,
    pub last_pass_at: Option<DateTime<Utc>>,
    /// Last store error that aborted a pass, if any.
    pub last_error: Option<String>,
    pub poll_interval_secs: u64,
    pub batch_size: usize,
}

#[derive(Default)]
struct StatsInner {
    passes: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    last: Mutex<LastPass>,
}

#[derive(Default)]
struct LastPass {
    at: Option<DateTime<Utc>>,
    error: Option<String>,
}

/// The background delivery worker.
///
/// An explicit lifecycle object: construct, [`start`](Self::start), and
/// [`stop`](Self::stop). All state is held here rather than in globals, so
/// multiple processors (e.g. in tests) can coexist.
pub struct OutboxProcessor {
    service: Arc<OutboxService>,
    config: OutboxProcessorConfig,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    stats: Arc<StatsInner>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl OutboxProcessor {
    /// Creates a processor over the given service.
    pub fn new(service: Arc<OutboxService>, config: OutboxProcessorConfig) -> Self {
        Self {
            service,
            config,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            stats: Arc::new(StatsInner::default()),
            handle: Mutex::new(None),
        }
    }

    /// Starts the scheduled delivery loop.
    ///
    /// Idempotent: a second call while running is a no-op. The first pass
    /// runs immediately, then once per poll interval.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Outbox processor already running");
            return;
        }

        let service = self.service.clone();
        let running = self.running.clone();
        let shutdown = self.shutdown.clone();
        let stats = self.stats.clone();
        let poll_interval = self.config.poll_interval;
        let batch_size = self.config.batch_size;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            info!(
                poll_interval_secs = poll_interval.as_secs(),
                batch_size, "Outbox processor started"
            );

            loop {
                tokio::select! {
                    _ = shutdown.notified() => break,
                    _ = ticker.tick() => {
                        if !running.load(Ordering::SeqCst) {
                            break;
                        }
                        match service.process_pending_events(batch_size).await {
                            Ok(outcome) => {
                                stats.passes.fetch_add(1, Ordering::Relaxed);
                                stats.delivered.fetch_add(outcome.successful, Ordering::Relaxed);
                                stats.failed.fetch_add(outcome.failed, Ordering::Relaxed);
                                let mut last = stats.last.lock();
                                last.at = Some(Utc::now());
                                last.error = None;
                            }
                            Err(e) => {
                                // Store errors abort this pass only; unclaimed
                                // work is retried on the next tick.
                                error!(error = %e, "Outbox delivery pass aborted");
                                let mut last = stats.last.lock();
                                last.at = Some(Utc::now());
                                last.error = Some(e.to_string());
                            }
                        }
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            info!("Outbox processor stopped");
        });

        *self.handle.lock() = Some(handle);
    }

    /// Stops the scheduled loop and waits for it to exit.
    ///
    /// A pass already in flight completes normally; its claimed events are
    /// either written terminal or left PROCESSING for operator reconciliation,
    /// the same as any crash mid-delivery.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        // notify_one stores a permit, so a loop that is mid-pass (not yet
        // waiting in select) still observes the shutdown promptly.
        self.shutdown.notify_one();

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Outbox processor task join failed");
            }
        }
    }

    /// Whether the scheduled loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the processor counters.
    pub fn stats(&self) -> ProcessorStats {
        let last = self.stats.last.lock();
        ProcessorStats {
            is_running: self.is_running(),
            passes: self.stats.passes.load(Ordering::Relaxed),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            last_pass_at: last.at,
            last_error: last.error.clone(),
            poll_interval_secs: self.config.poll_interval.as_secs(),
            batch_size: self.config.batch_size,
        }
    }
}
