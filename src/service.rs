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

//! Transactional and administrative API over the outbox record store.
//!
//! The service owns the delivery pass algorithm: both the background
//! processor and manual `process-now` triggers call
//! [`OutboxService::process_pending_events`], so the claim protocol is
//! identical on both paths and safe under concurrent invocation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dal::models::NewOutboxEventRow;
use crate::dal::DAL;
use crate::database::Database;
use crate::error::{DeliveryError, StoreError};
use crate::models::{NewOutboxEvent, OutboxEvent, OutboxStatus};
use crate::transport::DeliveryTransport;

/// Upper bound on a single delivery pass, manual or scheduled.
pub const MAX_PROCESS_BATCH: usize = 200;

/// Upper bound on administrative listing queries.
pub const MAX_LIST_LIMIT: i64 = 500;

const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Point-in-time per-status row counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxStats {
    pub pending: i64,
    pub processing: i64,
    pub published: i64,
    pub failed: i64,
    pub total: i64,
}

impl OutboxStats {
    /// Folds per-status counts into a stats snapshot.
    pub fn from_counts(counts: &[(OutboxStatus, i64)]) -> Self {
        let mut stats = OutboxStats::default();
        for (status, count) in counts {
            match status {
                OutboxStatus::Pending => stats.pending = *count,
                OutboxStatus::Processing => stats.processing = *count,
                OutboxStatus::Published => stats.published = *count,
                OutboxStatus::Failed => stats.failed = *count,
            }
            stats.total += *count;
        }
        stats
    }
}

/// Result of one delivery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassOutcome {
    /// Events delivered and marked PUBLISHED.
    pub successful: u64,
    /// Events whose delivery failed and were marked FAILED.
    pub failed: u64,
}

impl PassOutcome {
    /// Total events attempted in the pass.
    pub fn total(&self) -> u64 {
        self.successful + self.failed
    }
}

/// Result of an administrative cleanup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupOutcome {
    /// Number of PUBLISHED rows removed.
    pub deleted: u64,
    /// The retention cutoff that was applied.
    pub cutoff: DateTime<Utc>,
}

/// The outbox service.
///
/// `OutboxService` is cheap to clone-by-`Arc` and is shared between the HTTP
/// layer, the background processor and the health reporter.
pub struct OutboxService {
    dal: DAL,
    transport: Arc<dyn DeliveryTransport>,
    delivery_timeout: Duration,
}

impl OutboxService {
    /// Creates a service over the given database and transport.
    pub fn new(database: Database, transport: Arc<dyn DeliveryTransport>) -> Self {
        Self {
            dal: DAL::new(database),
            transport,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    /// Overrides the per-attempt delivery timeout (default 30s).
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Returns the underlying DAL.
    pub fn dal(&self) -> &DAL {
        &self.dal
    }

    /// Prepares an insertable PENDING row from enqueue parameters.
    ///
    /// This is the transactional enqueue path: build the row here, then
    /// insert it with [`crate::dal::outbox_event::insert_postgres`] (or the
    /// SQLite variant) inside the same transaction as the domain write it
    /// describes. The atomicity contract lives at that call site.
    pub fn prepare_event(&self, event: NewOutboxEvent) -> Result<NewOutboxEventRow, StoreError> {
        NewOutboxEventRow::from_domain(event)
    }

    /// Enqueues a PENDING event using a pooled connection.
    ///
    /// For callers without a surrounding transaction. Domain operations that
    /// must commit atomically with their own write should use
    /// [`OutboxService::prepare_event`] instead.
    pub async fn enqueue(&self, event: NewOutboxEvent) -> Result<OutboxEvent, StoreError> {
        let row = NewOutboxEventRow::from_domain(event)?;
        let event = self.dal.outbox_event().insert(row).await?;
        debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            "Enqueued outbox event"
        );
        Ok(event)
    }

    /// Point-in-time per-status counts, from a single aggregate query.
    pub async fn get_stats(&self) -> Result<OutboxStats, StoreError> {
        let counts = self.dal.outbox_event().count_by_status().await?;
        Ok(OutboxStats::from_counts(&counts))
    }

    /// Single event detail, including payload.
    pub async fn get_event(&self, id: &str) -> Result<OutboxEvent, StoreError> {
        self.dal
            .outbox_event()
            .get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// Filtered event listing, newest-first. `limit` is clamped to
    /// `1..=MAX_LIST_LIMIT`.
    pub async fn list_events(
        &self,
        status: Option<OutboxStatus>,
        event_type: Option<String>,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, StoreError> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT);
        self.dal.outbox_event().list(status, event_type, limit).await
    }

    /// FAILED events with error detail, newest-first, bounded.
    pub async fn list_failed_events(&self, limit: i64) -> Result<Vec<OutboxEvent>, StoreError> {
        self.list_events(Some(OutboxStatus::Failed), None, limit)
            .await
    }

    /// Distinct event types currently present.
    pub async fn event_types(&self) -> Result<Vec<String>, StoreError> {
        self.dal.outbox_event().event_types().await
    }

    /// Operator action: requeue every FAILED event.
    ///
    /// Transitions FAILED -> PENDING without resetting `retry_count`, so the
    /// retry history of repeatedly failing events stays visible. Returns the
    /// number of rows transitioned.
    pub async fn retry_failed_events(&self) -> Result<u64, StoreError> {
        let count = self.dal.outbox_event().reset_failed().await?;
        if count > 0 {
            info!(count, "Reset failed outbox events for retry");
        }
        Ok(count)
    }

    /// Operator action: requeue PROCESSING events whose claim is older than
    /// `older_than`.
    ///
    /// A crash or an aborted pass can leave claimed rows with no terminal
    /// write; this transitions them PROCESSING -> PENDING so the next pass
    /// picks them up (at-least-once delivery). `older_than` must exceed the
    /// delivery timeout, or a claim still in flight could be requeued and
    /// delivered twice. Returns the number of rows recovered.
    pub async fn recover_stale_events(&self, older_than: Duration) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::seconds(older_than.as_secs() as i64);
        let count = self
            .dal
            .outbox_event()
            .reset_stale_processing(cutoff.naive_utc())
            .await?;
        if count > 0 {
            warn!(count, %cutoff, "Recovered stale claimed outbox events");
        }
        Ok(count)
    }

    /// Runs one delivery pass over up to `batch_size` PENDING events.
    ///
    /// Claims oldest-first, attempts delivery per event bounded by the
    /// delivery timeout, and writes the terminal status per event. A
    /// transport failure marks that one event FAILED and the pass continues;
    /// a store failure aborts the pass. Returns the per-pass counters.
    pub async fn process_pending_events(
        &self,
        batch_size: usize,
    ) -> Result<PassOutcome, StoreError> {
        let batch = batch_size.clamp(1, MAX_PROCESS_BATCH) as i64;
        let claimed = self.dal.outbox_event().claim_pending(batch).await?;
        if claimed.is_empty() {
            return Ok(PassOutcome::default());
        }

        debug!(claimed = claimed.len(), "Starting outbox delivery pass");
        let mut outcome = PassOutcome::default();

        for event in &claimed {
            let result = match tokio::time::timeout(
                self.delivery_timeout,
                self.transport.deliver(&event.routing_key, &event.payload),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(DeliveryError::Timeout(self.delivery_timeout)),
            };

            match result {
                Ok(()) => {
                    self.dal.outbox_event().mark_published(&event.id).await?;
                    metrics::counter!("outbox_events_published_total").increment(1);
                    outcome.successful += 1;
                    debug!(event_id = %event.id, event_type = %event.event_type, "Delivered outbox event");
                }
                Err(e) => {
                    warn!(
                        event_id = %event.id,
                        event_type = %event.event_type,
                        retry_count = event.retry_count,
                        error = %e,
                        "Outbox event delivery failed"
                    );
                    self.dal
                        .outbox_event()
                        .mark_failed(&event.id, &e.to_string())
                        .await?;
                    metrics::counter!("outbox_events_failed_total").increment(1);
                    outcome.failed += 1;
                }
            }
        }

        info!(
            successful = outcome.successful,
            failed = outcome.failed,
            "Outbox delivery pass complete"
        );
        Ok(outcome)
    }

    /// Administrative cleanup: deletes PUBLISHED events created more than
    /// `days` days ago. Unresolved work (PENDING, PROCESSING, FAILED) is
    /// never deleted. Returns the count removed and the cutoff applied.
    pub async fn cleanup_published_events(&self, days: u32) -> Result<CleanupOutcome, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::days(days as i64);
        let deleted = self
            .dal
            .outbox_event()
            .delete_published_older_than(cutoff.naive_utc())
            .await?;
        info!(deleted, %cutoff, "Cleaned up published outbox events");
        Ok(CleanupOutcome { deleted, cutoff })
    }
}
