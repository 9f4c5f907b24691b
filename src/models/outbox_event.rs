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

//! Outbox event domain model.
//!
//! An [`OutboxEvent`] is one unit of work to deliver: a business fact recorded
//! atomically alongside the domain write that produced it, then delivered
//! asynchronously by the processor. Rows are mutated only by the delivery
//! pass (status, retry bookkeeping) and by administrative operations
//! (retry-reset, cleanup); the payload is write-once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StoreError;

/// Delivery state of an outbox event.
///
/// The closed state machine is:
///
/// ```text
/// PENDING    -> PROCESSING -> PUBLISHED   (terminal success)
///                          -> FAILED      (terminal until operator retry)
/// FAILED     -> PENDING                   (retry_failed_events only)
/// PROCESSING -> PENDING                   (recover_stale_events only)
/// ```
///
/// PROCESSING is the exclusive claim state: a delivery pass transitions a row
/// PENDING -> PROCESSING atomically, so two concurrent passes can never both
/// deliver the same event. A crash mid-delivery leaves the row PROCESSING;
/// it stays visible through stats and listings, and the operator requeues it
/// with `recover_stale_events` once its claim is old enough to be dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    /// Enqueued, waiting for a delivery pass.
    Pending,
    /// Claimed by a delivery pass, attempt in flight.
    Processing,
    /// Delivered; `processed_at` is set.
    Published,
    /// Last delivery attempt failed; requeued only by operator action.
    Failed,
}

impl OutboxStatus {
    /// The stored string form of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "PENDING",
            OutboxStatus::Processing => "PROCESSING",
            OutboxStatus::Published => "PUBLISHED",
            OutboxStatus::Failed => "FAILED",
        }
    }

    /// Parses a stored status string.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "PENDING" => Ok(OutboxStatus::Pending),
            "PROCESSING" => Ok(OutboxStatus::Processing),
            "PUBLISHED" => Ok(OutboxStatus::Published),
            "FAILED" => Ok(OutboxStatus::Failed),
            other => Err(StoreError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbox event record (domain type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    /// Globally unique event id (UUID v4, immutable).
    pub id: String,
    /// Tag identifying the kind of business fact, e.g. `RECOMMENDATION_CREATED`.
    pub event_type: String,
    /// Identifier of the domain entity the event concerns.
    pub aggregate_id: String,
    /// Serialized JSON event body; write-once.
    pub payload: String,
    /// Routing key handed to the delivery transport.
    pub routing_key: String,
    /// Current delivery state.
    pub status: OutboxStatus,
    /// Number of failed delivery attempts so far; only ever increases.
    pub retry_count: i32,
    /// Last failure reason, if any.
    pub error_message: Option<String>,
    /// Opaque identifier linking causally related events.
    pub correlation_id: Option<String>,
    /// Set at insert, immutable.
    pub created_at: DateTime<Utc>,
    /// Set on successful delivery, and only then.
    pub processed_at: Option<DateTime<Utc>>,
    /// Set when a delivery pass claims the row; cleared when the row is
    /// requeued to PENDING.
    pub claimed_at: Option<DateTime<Utc>>,
    /// Identity of the actor whose action produced the event.
    pub created_by: String,
}

impl OutboxEvent {
    /// Parses the stored payload back into JSON, for detail views.
    pub fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

/// Parameters for enqueueing a new outbox event.
///
/// The id, created_at and initial PENDING status are assigned by the service
/// at enqueue time; callers only provide the business fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOutboxEvent {
    /// Tag identifying the kind of business fact.
    pub event_type: String,
    /// Identifier of the domain entity the event concerns.
    pub aggregate_id: String,
    /// Event body; serialized to text at enqueue time.
    pub payload: serde_json::Value,
    /// Routing key for the delivery transport.
    pub routing_key: String,
    /// Optional causal-chain identifier.
    pub correlation_id: Option<String>,
    /// Identity of the actor whose action produced the event.
    pub created_by: String,
}
