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

//! Diesel row types for the outbox table.
//!
//! These stay at the storage boundary: ids are text, statuses are strings,
//! timestamps are naive UTC. Conversion to the domain [`OutboxEvent`] happens
//! in the DAL, where the stored status string is parsed back into the closed
//! enumeration.

use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;

use crate::database::schema::outbox_events;
use crate::error::StoreError;
use crate::models::{NewOutboxEvent, OutboxEvent, OutboxStatus};

/// A stored outbox event row.
#[derive(Debug, Clone, Queryable, Selectable, QueryableByName)]
#[diesel(table_name = outbox_events)]
pub struct OutboxEventRow {
    pub id: String,
    pub event_type: String,
    pub aggregate_id: String,
    pub payload: String,
    pub routing_key: String,
    pub status: String,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub correlation_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
    pub claimed_at: Option<NaiveDateTime>,
    pub created_by: String,
}

impl TryFrom<OutboxEventRow> for OutboxEvent {
    type Error = StoreError;

    fn try_from(row: OutboxEventRow) -> Result<Self, Self::Error> {
        Ok(OutboxEvent {
            status: OutboxStatus::parse(&row.status)?,
            id: row.id,
            event_type: row.event_type,
            aggregate_id: row.aggregate_id,
            payload: row.payload,
            routing_key: row.routing_key,
            retry_count: row.retry_count,
            error_message: row.error_message,
            correlation_id: row.correlation_id,
            created_at: Utc.from_utc_datetime(&row.created_at),
            processed_at: row.processed_at.map(|ts| Utc.from_utc_datetime(&ts)),
            claimed_at: row.claimed_at.map(|ts| Utc.from_utc_datetime(&ts)),
            created_by: row.created_by,
        })
    }
}

/// An insertable outbox event row.
///
/// Built via [`NewOutboxEventRow::from_domain`], which assigns the id, the
/// initial PENDING status and the creation timestamp.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = outbox_events)]
pub struct NewOutboxEventRow {
    pub id: String,
    pub event_type: String,
    pub aggregate_id: String,
    pub payload: String,
    pub routing_key: String,
    pub status: String,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub correlation_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
    pub claimed_at: Option<NaiveDateTime>,
    pub created_by: String,
}

impl NewOutboxEventRow {
    /// Prepares a PENDING row from enqueue parameters.
    ///
    /// Fails only if the payload cannot be serialized to JSON text.
    pub fn from_domain(event: NewOutboxEvent) -> Result<Self, StoreError> {
        Ok(NewOutboxEventRow {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event.event_type,
            aggregate_id: event.aggregate_id,
            payload: serde_json::to_string(&event.payload)?,
            routing_key: event.routing_key,
            status: OutboxStatus::Pending.as_str().to_string(),
            retry_count: 0,
            error_message: None,
            correlation_id: event.correlation_id,
            created_at: Utc::now().naive_utc(),
            processed_at: None,
            claimed_at: None,
            created_by: event.created_by,
        })
    }
}
