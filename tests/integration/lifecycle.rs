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

//! End-to-end event lifecycle: enqueue, deliver, fail, retry.

use std::time::Duration;

use diesel::Connection;

use activity_outbox::dal::outbox_event::insert_sqlite;
use activity_outbox::{OutboxService, OutboxStatus, StoreError};

use crate::fixtures::{recommendation_event, test_database, RecordingTransport, SlowTransport};

#[tokio::test]
async fn enqueued_event_starts_pending() {
    let database = test_database().await;
    let service = OutboxService::new(database, RecordingTransport::succeeding());

    let event = service
        .enqueue(recommendation_event("rec-1"))
        .await
        .expect("Failed to enqueue event");

    assert_eq!(event.status, OutboxStatus::Pending);
    assert_eq!(event.retry_count, 0);
    assert!(event.processed_at.is_none());
    assert!(event.error_message.is_none());

    let stats = service.get_stats().await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.total, 1);
}

#[tokio::test]
async fn transactional_enqueue_follows_the_caller_transaction() {
    let database = test_database().await;
    let service = OutboxService::new(database.clone(), RecordingTransport::succeeding());

    // Rolled-back domain write: the outbox row must vanish with it.
    let row = service
        .prepare_event(recommendation_event("rec-rollback"))
        .unwrap();
    let rolled_back_id = row.id.clone();
    let conn = database.get_sqlite_connection().await.unwrap();
    let result = conn
        .interact(move |conn| {
            conn.transaction::<(), diesel::result::Error, _>(|conn| {
                insert_sqlite(conn, &row)?;
                Err(diesel::result::Error::RollbackTransaction)
            })
        })
        .await
        .unwrap();
    drop(conn);
    assert!(result.is_err());
    assert!(matches!(
        service.get_event(&rolled_back_id).await,
        Err(StoreError::NotFound { .. })
    ));

    // Committed domain write: the outbox row persists as PENDING.
    let row = service
        .prepare_event(recommendation_event("rec-commit"))
        .unwrap();
    let committed_id = row.id.clone();
    let conn = database.get_sqlite_connection().await.unwrap();
    conn.interact(move |conn| {
        conn.transaction::<(), diesel::result::Error, _>(|conn| insert_sqlite(conn, &row))
    })
    .await
    .unwrap()
    .unwrap();
    drop(conn);

    let event = service.get_event(&committed_id).await.unwrap();
    assert_eq!(event.status, OutboxStatus::Pending);
    assert!(event.processed_at.is_none());
}

#[tokio::test]
async fn successful_pass_publishes_event() {
    let database = test_database().await;
    let transport = RecordingTransport::succeeding();
    let service = OutboxService::new(database, transport.clone());

    let event = service.enqueue(recommendation_event("rec-1")).await.unwrap();

    let outcome = service.process_pending_events(10).await.unwrap();
    assert_eq!(outcome.successful, 1);
    assert_eq!(outcome.failed, 0);

    let published = service.get_event(&event.id).await.unwrap();
    assert_eq!(published.status, OutboxStatus::Published);
    assert!(published.processed_at.is_some());
    assert!(published.error_message.is_none());

    let deliveries = transport.delivered();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, "activity.recommendation.created");
    assert!(deliveries[0].1.contains("rec-1"));

    let stats = service.get_stats().await.unwrap();
    assert_eq!(stats.published, 1);
    assert_eq!(stats.pending, 0);
}

#[tokio::test]
async fn transport_failure_marks_event_failed() {
    let database = test_database().await;
    let service = OutboxService::new(database, RecordingTransport::failing());

    let event = service.enqueue(recommendation_event("rec-1")).await.unwrap();

    let outcome = service.process_pending_events(10).await.unwrap();
    assert_eq!(outcome.successful, 0);
    assert_eq!(outcome.failed, 1);

    let failed = service.get_event(&event.id).await.unwrap();
    assert_eq!(failed.status, OutboxStatus::Failed);
    assert_eq!(failed.retry_count, 1);
    assert!(failed.processed_at.is_none());
    assert!(failed
        .error_message
        .as_deref()
        .unwrap()
        .contains("transport unavailable"));
}

#[tokio::test]
async fn failed_event_retries_after_reset() {
    let database = test_database().await;
    let transport = RecordingTransport::failing();
    let service = OutboxService::new(database, transport.clone());

    let event = service.enqueue(recommendation_event("rec-1")).await.unwrap();
    service.process_pending_events(10).await.unwrap();

    let reset = service.retry_failed_events().await.unwrap();
    assert_eq!(reset, 1);

    let requeued = service.get_event(&event.id).await.unwrap();
    assert_eq!(requeued.status, OutboxStatus::Pending);
    // Retry history survives the reset.
    assert_eq!(requeued.retry_count, 1);

    transport.set_failing(false);
    let outcome = service.process_pending_events(10).await.unwrap();
    assert_eq!(outcome.successful, 1);

    let published = service.get_event(&event.id).await.unwrap();
    assert_eq!(published.status, OutboxStatus::Published);
    assert_eq!(published.retry_count, 1);
    assert!(published.processed_at.is_some());
    assert!(published.error_message.is_none());
}

#[tokio::test]
async fn slow_delivery_times_out_and_fails() {
    let database = test_database().await;
    let service = OutboxService::new(database, SlowTransport::new(Duration::from_secs(30)))
        .with_delivery_timeout(Duration::from_millis(50));

    let event = service.enqueue(recommendation_event("rec-1")).await.unwrap();

    let outcome = service.process_pending_events(10).await.unwrap();
    assert_eq!(outcome.successful, 0);
    assert_eq!(outcome.failed, 1);

    let failed = service.get_event(&event.id).await.unwrap();
    assert_eq!(failed.status, OutboxStatus::Failed);
    assert!(failed.error_message.as_deref().unwrap().contains("timed out"));
}
