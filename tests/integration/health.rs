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

//! Health snapshots under running, stopped, degraded and broken-store
//! conditions.

use std::sync::Arc;
use std::time::Duration;

use diesel::RunQueryDsl;

use activity_outbox::{
    HealthReporter, HealthStatus, OutboxProcessor, OutboxProcessorConfig, OutboxService,
};

use crate::fixtures::{recommendation_event, test_database, RecordingTransport};

fn idle_config() -> OutboxProcessorConfig {
    OutboxProcessorConfig::builder()
        .poll_interval(Duration::from_secs(60))
        .batch_size(10)
        .build()
}

#[tokio::test]
async fn healthy_while_running_with_empty_outbox() {
    let database = test_database().await;
    let service = Arc::new(OutboxService::new(
        database,
        RecordingTransport::succeeding(),
    ));
    let processor = Arc::new(OutboxProcessor::new(service.clone(), idle_config()));
    let reporter = HealthReporter::new(service, processor.clone());

    processor.start();

    let report = reporter.snapshot().await;
    assert_eq!(report.status, HealthStatus::Healthy);
    assert!(report.processor.is_running);
    assert!(report.error.is_none());
    let outbox = report.outbox.expect("outbox stats missing");
    assert_eq!(outbox.total, 0);

    processor.stop().await;
}

#[tokio::test]
async fn unhealthy_when_processor_not_running() {
    let database = test_database().await;
    let service = Arc::new(OutboxService::new(
        database,
        RecordingTransport::succeeding(),
    ));
    let processor = Arc::new(OutboxProcessor::new(service.clone(), idle_config()));
    let reporter = HealthReporter::new(service, processor.clone());

    let report = reporter.snapshot().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert!(!report.processor.is_running);

    processor.start();
    processor.stop().await;

    let report = reporter.snapshot().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn unhealthy_when_failed_backlog_reaches_threshold() {
    let database = test_database().await;
    let transport = RecordingTransport::failing();
    let service = Arc::new(OutboxService::new(database, transport));
    let processor = Arc::new(OutboxProcessor::new(service.clone(), idle_config()));
    let reporter =
        HealthReporter::new(service.clone(), processor.clone()).with_failed_threshold(1);

    processor.start();

    service.enqueue(recommendation_event("rec-1")).await.unwrap();
    service.process_pending_events(10).await.unwrap();

    let report = reporter.snapshot().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert_eq!(report.outbox.unwrap().failed, 1);

    processor.stop().await;
}

#[tokio::test]
async fn broken_store_degrades_to_error_status() {
    let database = test_database().await;
    let service = Arc::new(OutboxService::new(
        database.clone(),
        RecordingTransport::succeeding(),
    ));
    let processor = Arc::new(OutboxProcessor::new(service.clone(), idle_config()));
    let reporter = HealthReporter::new(service, processor.clone());

    processor.start();

    let conn = database.get_sqlite_connection().await.unwrap();
    conn.interact(|conn| diesel::sql_query("DROP TABLE outbox_events").execute(conn))
        .await
        .unwrap()
        .unwrap();
    drop(conn);

    let report = reporter.snapshot().await;
    assert_eq!(report.status, HealthStatus::Error);
    assert!(report.outbox.is_none());
    assert!(report.error.is_some());
    // Processor state is still reported even when the store is unreachable.
    assert!(report.processor.is_running);

    processor.stop().await;
}
