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

//! Error types for the outbox engine.
//!
//! Two taxonomies, kept separate on purpose:
//!
//! - [`StoreError`]: infrastructure failures talking to the record store.
//!   These propagate to the caller of an administrative operation, or abort
//!   the current delivery pass.
//! - [`DeliveryError`]: transport failures for a single event. These are
//!   recovered locally (the event is marked FAILED) and never propagate out
//!   of a delivery pass.
//!
//! A lookup for an unknown event id is [`StoreError::NotFound`]; an empty
//! listing result is not an error anywhere in this crate.

use std::time::Duration;
use thiserror::Error;

/// Errors from the outbox record store and its connection pool.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to obtain a connection from the pool, or the blocking
    /// interaction with it was cancelled.
    #[error("Connection pool error: {0}")]
    ConnectionPool(String),

    /// A query or transaction failed.
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Payload could not be serialized or deserialized.
    #[error("Payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No outbox event with the given id exists.
    #[error("Outbox event not found: {id}")]
    NotFound { id: String },

    /// A stored status string did not map to a known [`crate::models::OutboxStatus`].
    #[error("Invalid outbox status: {0}")]
    InvalidStatus(String),
}

/// Errors from the external delivery transport.
///
/// Every variant here is terminal for one delivery attempt only; the event
/// is marked FAILED and the batch continues.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The transport rejected or failed to accept the event.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The delivery attempt exceeded the configured timeout.
    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),
}
