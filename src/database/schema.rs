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

//! Diesel schema for the outbox table.
//!
//! The column types are chosen so a single definition serves both backends:
//! ids are text UUIDs, timestamps are naive UTC `TIMESTAMP`s, and the status
//! is stored as text but only ever written from the closed
//! [`crate::models::OutboxStatus`] enumeration.

diesel::table! {
    outbox_events (id) {
        id -> Text,
        event_type -> Text,
        aggregate_id -> Text,
        payload -> Text,
        routing_key -> Text,
        status -> Text,
        retry_count -> Integer,
        error_message -> Nullable<Text>,
        correlation_id -> Nullable<Text>,
        created_at -> Timestamp,
        processed_at -> Nullable<Timestamp>,
        claimed_at -> Nullable<Timestamp>,
        created_by -> Text,
    }
}
