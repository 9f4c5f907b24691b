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

//! Outbox event store operations with runtime backend selection.
//!
//! The claim protocol lives here. A delivery pass claims rows by atomically
//! flipping them PENDING -> PROCESSING:
//!
//! - PostgreSQL: a single `UPDATE ... WHERE id IN (SELECT ... FOR UPDATE
//!   SKIP LOCKED) RETURNING` statement, so concurrent passes skip each
//!   other's rows instead of blocking or double-claiming.
//! - SQLite: select-then-update inside an IMMEDIATE transaction, which takes
//!   the write lock up front and serializes concurrent claim attempts.
//!
//! Terminal writes (`mark_published`, `mark_failed`) are conditional on the
//! row still being PROCESSING, so a stray late write can never clobber a row
//! another pass owns.

use diesel::prelude::*;

use super::models::{NewOutboxEventRow, OutboxEventRow};
use super::DAL;
use crate::database::schema::outbox_events;
use crate::error::StoreError;
use crate::models::{OutboxEvent, OutboxStatus};
use chrono::NaiveDateTime;

/// Inserts a pending outbox row on an open PostgreSQL connection.
///
/// This is the transactional enqueue entry point: call it inside the same
/// transaction as the domain write the event describes, so either both
/// persist or neither does.
#[cfg(feature = "postgres")]
pub fn insert_postgres(
    conn: &mut diesel::PgConnection,
    row: &NewOutboxEventRow,
) -> QueryResult<()> {
    diesel::insert_into(outbox_events::table)
        .values(row)
        .execute(conn)?;
    Ok(())
}

/// Inserts a pending outbox row on an open SQLite connection.
///
/// See [`insert_postgres`] for the transaction-sharing contract.
#[cfg(feature = "sqlite")]
pub fn insert_sqlite(
    conn: &mut diesel::SqliteConnection,
    row: &NewOutboxEventRow,
) -> QueryResult<()> {
    diesel::insert_into(outbox_events::table)
        .values(row)
        .execute(conn)?;
    Ok(())
}

/// Data access layer for outbox event records.
#[derive(Clone)]
pub struct OutboxEventDAL<'a> {
    dal: &'a DAL,
}

impl<'a> OutboxEventDAL<'a> {
    /// Creates a new OutboxEventDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Inserts a new pending event using a pooled connection.
    ///
    /// For atomicity with a domain write, prefer [`insert_postgres`] /
    /// [`insert_sqlite`] inside the caller's transaction; this method is for
    /// callers that have no surrounding transaction of their own.
    pub async fn insert(&self, row: NewOutboxEventRow) -> Result<OutboxEvent, StoreError> {
        crate::dispatch_backend!(
            self.dal.backend(),
            self.insert_pg(row).await,
            self.insert_sq(row).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn insert_pg(&self, row: NewOutboxEventRow) -> Result<OutboxEvent, StoreError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let inserted: OutboxEventRow = conn
            .interact(move |conn| {
                diesel::insert_into(outbox_events::table)
                    .values(&row)
                    .get_result(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        inserted.try_into()
    }

    #[cfg(feature = "sqlite")]
    async fn insert_sq(&self, row: NewOutboxEventRow) -> Result<OutboxEvent, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let inserted: OutboxEventRow = conn
            .interact(move |conn| {
                diesel::insert_into(outbox_events::table)
                    .values(&row)
                    .get_result(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        inserted.try_into()
    }

    /// Point lookup by event id.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<OutboxEvent>, StoreError> {
        let id = id.to_string();
        crate::dispatch_backend!(
            self.dal.backend(),
            self.get_by_id_pg(id).await,
            self.get_by_id_sq(id).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn get_by_id_pg(&self, id: String) -> Result<Option<OutboxEvent>, StoreError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let row: Option<OutboxEventRow> = conn
            .interact(move |conn| {
                outbox_events::table
                    .find(id)
                    .first::<OutboxEventRow>(conn)
                    .optional()
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        row.map(OutboxEvent::try_from).transpose()
    }

    #[cfg(feature = "sqlite")]
    async fn get_by_id_sq(&self, id: String) -> Result<Option<OutboxEvent>, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let row: Option<OutboxEventRow> = conn
            .interact(move |conn| {
                outbox_events::table
                    .find(id)
                    .first::<OutboxEventRow>(conn)
                    .optional()
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        row.map(OutboxEvent::try_from).transpose()
    }

    /// Filtered listing, newest-first, bounded by `limit`.
    pub async fn list(
        &self,
        status: Option<OutboxStatus>,
        event_type: Option<String>,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, StoreError> {
        crate::dispatch_backend!(
            self.dal.backend(),
            self.list_pg(status, event_type, limit).await,
            self.list_sq(status, event_type, limit).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn list_pg(
        &self,
        status: Option<OutboxStatus>,
        event_type: Option<String>,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, StoreError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let rows: Vec<OutboxEventRow> = conn
            .interact(move |conn| {
                let mut query = outbox_events::table.into_boxed();
                if let Some(status) = status {
                    query = query.filter(outbox_events::status.eq(status.as_str()));
                }
                if let Some(event_type) = event_type {
                    query = query.filter(outbox_events::event_type.eq(event_type));
                }
                query
                    .order(outbox_events::created_at.desc())
                    .limit(limit)
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(OutboxEvent::try_from).collect()
    }

    #[cfg(feature = "sqlite")]
    async fn list_sq(
        &self,
        status: Option<OutboxStatus>,
        event_type: Option<String>,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let rows: Vec<OutboxEventRow> = conn
            .interact(move |conn| {
                let mut query = outbox_events::table.into_boxed();
                if let Some(status) = status {
                    query = query.filter(outbox_events::status.eq(status.as_str()));
                }
                if let Some(event_type) = event_type {
                    query = query.filter(outbox_events::event_type.eq(event_type));
                }
                query
                    .order(outbox_events::created_at.desc())
                    .limit(limit)
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(OutboxEvent::try_from).collect()
    }

    /// Distinct event type values currently present.
    pub async fn event_types(&self) -> Result<Vec<String>, StoreError> {
        crate::dispatch_backend!(
            self.dal.backend(),
            self.event_types_pg().await,
            self.event_types_sq().await
        )
    }

    #[cfg(feature = "postgres")]
    async fn event_types_pg(&self) -> Result<Vec<String>, StoreError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let types: Vec<String> = conn
            .interact(|conn| {
                outbox_events::table
                    .select(outbox_events::event_type)
                    .distinct()
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(types)
    }

    #[cfg(feature = "sqlite")]
    async fn event_types_sq(&self) -> Result<Vec<String>, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let types: Vec<String> = conn
            .interact(|conn| {
                outbox_events::table
                    .select(outbox_events::event_type)
                    .distinct()
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(types)
    }

    /// Per-status row counts in a single aggregate query.
    pub async fn count_by_status(&self) -> Result<Vec<(OutboxStatus, i64)>, StoreError> {
        let counts = crate::dispatch_backend!(
            self.dal.backend(),
            self.count_by_status_pg().await,
            self.count_by_status_sq().await
        )?;

        counts
            .into_iter()
            .map(|(status, count)| Ok((OutboxStatus::parse(&status)?, count)))
            .collect()
    }

    #[cfg(feature = "postgres")]
    async fn count_by_status_pg(&self) -> Result<Vec<(String, i64)>, StoreError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let counts: Vec<(String, i64)> = conn
            .interact(|conn| {
                outbox_events::table
                    .group_by(outbox_events::status)
                    .select((outbox_events::status, diesel::dsl::count_star()))
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(counts)
    }

    #[cfg(feature = "sqlite")]
    async fn count_by_status_sq(&self) -> Result<Vec<(String, i64)>, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let counts: Vec<(String, i64)> = conn
            .interact(|conn| {
                outbox_events::table
                    .group_by(outbox_events::status)
                    .select((outbox_events::status, diesel::dsl::count_star()))
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(counts)
    }

    /// Bulk FAILED -> PENDING reset for operator-triggered retry.
    ///
    /// `retry_count` and `error_message` are preserved so repeated failures
    /// stay visible. Returns the number of rows transitioned.
    pub async fn reset_failed(&self) -> Result<u64, StoreError> {
        crate::dispatch_backend!(
            self.dal.backend(),
            self.reset_failed_pg().await,
            self.reset_failed_sq().await
        )
    }

    #[cfg(feature = "postgres")]
    async fn reset_failed_pg(&self) -> Result<u64, StoreError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let updated: usize = conn
            .interact(|conn| {
                diesel::update(
                    outbox_events::table
                        .filter(outbox_events::status.eq(OutboxStatus::Failed.as_str())),
                )
                .set((
                    outbox_events::status.eq(OutboxStatus::Pending.as_str()),
                    outbox_events::claimed_at.eq(None::<chrono::NaiveDateTime>),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(updated as u64)
    }

    #[cfg(feature = "sqlite")]
    async fn reset_failed_sq(&self) -> Result<u64, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let updated: usize = conn
            .interact(|conn| {
                diesel::update(
                    outbox_events::table
                        .filter(outbox_events::status.eq(OutboxStatus::Failed.as_str())),
                )
                .set((
                    outbox_events::status.eq(OutboxStatus::Pending.as_str()),
                    outbox_events::claimed_at.eq(None::<chrono::NaiveDateTime>),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(updated as u64)
    }

    /// Bulk PROCESSING -> PENDING reset for claims whose `claimed_at` is
    /// before `cutoff`.
    ///
    /// Recovery path for rows left claimed by a crash or an aborted pass.
    /// The cutoff keeps live claims out of reach: callers derive it from an
    /// age comfortably above the delivery timeout. Clears `claimed_at` so a
    /// recovered row reads as unclaimed. Returns the number of rows
    /// transitioned.
    pub async fn reset_stale_processing(&self, cutoff: NaiveDateTime) -> Result<u64, StoreError> {
        crate::dispatch_backend!(
            self.dal.backend(),
            self.reset_stale_processing_pg(cutoff).await,
            self.reset_stale_processing_sq(cutoff).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn reset_stale_processing_pg(&self, cutoff: NaiveDateTime) -> Result<u64, StoreError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let updated: usize = conn
            .interact(move |conn| {
                diesel::update(
                    outbox_events::table
                        .filter(outbox_events::status.eq(OutboxStatus::Processing.as_str()))
                        .filter(outbox_events::claimed_at.lt(cutoff)),
                )
                .set((
                    outbox_events::status.eq(OutboxStatus::Pending.as_str()),
                    outbox_events::claimed_at.eq(None::<NaiveDateTime>),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(updated as u64)
    }

    #[cfg(feature = "sqlite")]
    async fn reset_stale_processing_sq(&self, cutoff: NaiveDateTime) -> Result<u64, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let updated: usize = conn
            .interact(move |conn| {
                diesel::update(
                    outbox_events::table
                        .filter(outbox_events::status.eq(OutboxStatus::Processing.as_str()))
                        .filter(outbox_events::claimed_at.lt(cutoff)),
                )
                .set((
                    outbox_events::status.eq(OutboxStatus::Pending.as_str()),
                    outbox_events::claimed_at.eq(None::<NaiveDateTime>),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(updated as u64)
    }

    /// Atomically claims up to `limit` PENDING events, oldest-first.
    ///
    /// Claimed rows are returned already transitioned to PROCESSING. Two
    /// concurrent claims never return the same event.
    pub async fn claim_pending(&self, limit: i64) -> Result<Vec<OutboxEvent>, StoreError> {
        crate::dispatch_backend!(
            self.dal.backend(),
            self.claim_pending_pg(limit).await,
            self.claim_pending_sq(limit).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn claim_pending_pg(&self, limit: i64) -> Result<Vec<OutboxEvent>, StoreError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let mut rows: Vec<OutboxEventRow> = conn
            .interact(move |conn| {
                // FOR UPDATE SKIP LOCKED: concurrent passes skip each other's
                // rows, so each PENDING event is claimed at most once.
                diesel::sql_query(format!(
                    r#"
                    UPDATE outbox_events
                    SET status = 'PROCESSING',
                        claimed_at = NOW() AT TIME ZONE 'utc'
                    WHERE id IN (
                        SELECT id FROM outbox_events
                        WHERE status = 'PENDING'
                        ORDER BY created_at ASC
                        LIMIT {}
                        FOR UPDATE SKIP LOCKED
                    )
                    RETURNING id, event_type, aggregate_id, payload, routing_key,
                              status, retry_count, error_message, correlation_id,
                              created_at, processed_at, claimed_at, created_by
                    "#,
                    limit
                ))
                .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        // RETURNING has no ordering guarantee; restore FIFO order.
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        rows.into_iter().map(OutboxEvent::try_from).collect()
    }

    #[cfg(feature = "sqlite")]
    async fn claim_pending_sq(&self, limit: i64) -> Result<Vec<OutboxEvent>, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let rows: Vec<OutboxEventRow> = conn
            .interact(move |conn| {
                // IMMEDIATE takes the write lock before the SELECT, so
                // concurrent claim attempts are serialized and cannot both
                // see the same PENDING rows.
                conn.immediate_transaction::<_, diesel::result::Error, _>(|conn| {
                    let mut rows: Vec<OutboxEventRow> = outbox_events::table
                        .filter(outbox_events::status.eq(OutboxStatus::Pending.as_str()))
                        .order(outbox_events::created_at.asc())
                        .limit(limit)
                        .load(conn)?;

                    if rows.is_empty() {
                        return Ok(rows);
                    }

                    let now = chrono::Utc::now().naive_utc();
                    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
                    diesel::update(outbox_events::table.filter(outbox_events::id.eq_any(&ids)))
                        .set((
                            outbox_events::status.eq(OutboxStatus::Processing.as_str()),
                            outbox_events::claimed_at.eq(Some(now)),
                        ))
                        .execute(conn)?;

                    for row in &mut rows {
                        row.status = OutboxStatus::Processing.as_str().to_string();
                        row.claimed_at = Some(now);
                    }
                    Ok(rows)
                })
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(OutboxEvent::try_from).collect()
    }

    /// Terminal success write: PROCESSING -> PUBLISHED.
    ///
    /// Sets `processed_at` and clears `error_message`. Returns false if the
    /// row was no longer PROCESSING (the claim was lost), in which case
    /// nothing was written.
    pub async fn mark_published(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        crate::dispatch_backend!(
            self.dal.backend(),
            self.mark_published_pg(id).await,
            self.mark_published_sq(id).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn mark_published_pg(&self, id: String) -> Result<bool, StoreError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let updated: usize = conn
            .interact(move |conn| {
                let now = chrono::Utc::now().naive_utc();
                diesel::update(
                    outbox_events::table
                        .filter(outbox_events::id.eq(id))
                        .filter(outbox_events::status.eq(OutboxStatus::Processing.as_str())),
                )
                .set((
                    outbox_events::status.eq(OutboxStatus::Published.as_str()),
                    outbox_events::processed_at.eq(Some(now)),
                    outbox_events::error_message.eq(None::<String>),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(updated > 0)
    }

    #[cfg(feature = "sqlite")]
    async fn mark_published_sq(&self, id: String) -> Result<bool, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let updated: usize = conn
            .interact(move |conn| {
                let now = chrono::Utc::now().naive_utc();
                diesel::update(
                    outbox_events::table
                        .filter(outbox_events::id.eq(id))
                        .filter(outbox_events::status.eq(OutboxStatus::Processing.as_str())),
                )
                .set((
                    outbox_events::status.eq(OutboxStatus::Published.as_str()),
                    outbox_events::processed_at.eq(Some(now)),
                    outbox_events::error_message.eq(None::<String>),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(updated > 0)
    }

    /// Terminal failure write: PROCESSING -> FAILED.
    ///
    /// Increments `retry_count` and records the failure reason. Returns false
    /// if the row was no longer PROCESSING.
    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        let error = error.to_string();
        crate::dispatch_backend!(
            self.dal.backend(),
            self.mark_failed_pg(id, error).await,
            self.mark_failed_sq(id, error).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn mark_failed_pg(&self, id: String, error: String) -> Result<bool, StoreError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let updated: usize = conn
            .interact(move |conn| {
                diesel::update(
                    outbox_events::table
                        .filter(outbox_events::id.eq(id))
                        .filter(outbox_events::status.eq(OutboxStatus::Processing.as_str())),
                )
                .set((
                    outbox_events::status.eq(OutboxStatus::Failed.as_str()),
                    outbox_events::retry_count.eq(outbox_events::retry_count + 1),
                    outbox_events::error_message.eq(Some(error)),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(updated > 0)
    }

    #[cfg(feature = "sqlite")]
    async fn mark_failed_sq(&self, id: String, error: String) -> Result<bool, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let updated: usize = conn
            .interact(move |conn| {
                diesel::update(
                    outbox_events::table
                        .filter(outbox_events::id.eq(id))
                        .filter(outbox_events::status.eq(OutboxStatus::Processing.as_str())),
                )
                .set((
                    outbox_events::status.eq(OutboxStatus::Failed.as_str()),
                    outbox_events::retry_count.eq(outbox_events::retry_count + 1),
                    outbox_events::error_message.eq(Some(error)),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(updated > 0)
    }

    /// Deletes PUBLISHED rows created strictly before `cutoff`.
    ///
    /// PENDING, PROCESSING and FAILED rows represent unresolved work and are
    /// never touched here. Returns the number of rows removed.
    pub async fn delete_published_older_than(
        &self,
        cutoff: NaiveDateTime,
    ) -> Result<u64, StoreError> {
        crate::dispatch_backend!(
            self.dal.backend(),
            self.delete_published_older_than_pg(cutoff).await,
            self.delete_published_older_than_sq(cutoff).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn delete_published_older_than_pg(
        &self,
        cutoff: NaiveDateTime,
    ) -> Result<u64, StoreError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let deleted: usize = conn
            .interact(move |conn| {
                diesel::delete(
                    outbox_events::table
                        .filter(outbox_events::status.eq(OutboxStatus::Published.as_str()))
                        .filter(outbox_events::created_at.lt(cutoff)),
                )
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(deleted as u64)
    }

    #[cfg(feature = "sqlite")]
    async fn delete_published_older_than_sq(
        &self,
        cutoff: NaiveDateTime,
    ) -> Result<u64, StoreError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))?;

        let deleted: usize = conn
            .interact(move |conn| {
                diesel::delete(
                    outbox_events::table
                        .filter(outbox_events::status.eq(OutboxStatus::Published.as_str()))
                        .filter(outbox_events::created_at.lt(cutoff)),
                )
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(deleted as u64)
    }
}
