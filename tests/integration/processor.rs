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

//! Background processor lifecycle and scheduled delivery.

use std::sync::Arc;
use std::time::Duration;

use activity_outbox::{OutboxProcessor, OutboxProcessorConfig, OutboxService, OutboxStatus};

use crate::fixtures::{recommendation_event, test_database, RecordingTransport};

fn fast_config() -> OutboxProcessorConfig {
    OutboxProcessorConfig::builder()
        .poll_interval(Duration::from_millis(50))
        .batch_size(10)
        .build()
}

/// Polls until `check` passes or the deadline expires.
async fn wait_for<F>(deadline: Duration, mut check: F)
where
    F: FnMut() -> bool,
{
    let start = tokio::time::Instant::now();
    while !check() {
        if start.elapsed() > deadline {
            panic!("Condition not met within {:?}", deadline);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn scheduled_passes_deliver_enqueued_events() {
    let database = test_database().await;
    let transport = RecordingTransport::succeeding();
    let service = Arc::new(OutboxService::new(database, transport.clone()));
    let processor = OutboxProcessor::new(service.clone(), fast_config());

    processor.start();
    assert!(processor.is_running());

    for i in 0..3 {
        service
            .enqueue(recommendation_event(&format!("rec-{}", i)))
            .await
            .unwrap();
    }

    let transport_check = transport.clone();
    wait_for(Duration::from_secs(5), move || {
        transport_check.delivery_count() == 3
    })
    .await;

    let stats = processor.stats();
    assert!(stats.is_running);
    assert!(stats.passes >= 1);
    assert_eq!(stats.delivered, 3);
    assert_eq!(stats.failed, 0);
    assert!(stats.last_pass_at.is_some());
    assert!(stats.last_error.is_none());

    let outbox = service.get_stats().await.unwrap();
    assert_eq!(outbox.published, 3);
    assert_eq!(outbox.pending, 0);

    processor.stop().await;
    assert!(!processor.is_running());
}

#[tokio::test]
async fn events_enqueued_while_stopped_stay_pending() {
    let database = test_database().await;
    let service = Arc::new(OutboxService::new(
        database,
        RecordingTransport::succeeding(),
    ));
    let processor = OutboxProcessor::new(service.clone(), fast_config());

    processor.start();
    processor.stop().await;

    let event = service.enqueue(recommendation_event("rec-1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(
        service.get_event(&event.id).await.unwrap().status,
        OutboxStatus::Pending
    );
}

#[tokio::test]
async fn start_is_idempotent() {
    let database = test_database().await;
    let service = Arc::new(OutboxService::new(
        database,
        RecordingTransport::succeeding(),
    ));
    let processor = OutboxProcessor::new(service, fast_config());

    processor.start();
    processor.start();
    assert!(processor.is_running());

    processor.stop().await;
    assert!(!processor.is_running());
}

#[tokio::test]
async fn stop_without_start_returns_immediately() {
    let database = test_database().await;
    let service = Arc::new(OutboxService::new(
        database,
        RecordingTransport::succeeding(),
    ));
    let processor = OutboxProcessor::new(service, fast_config());

    processor.stop().await;
    assert!(!processor.is_running());
}

#[tokio::test]
async fn stats_track_failed_deliveries() {
    let database = test_database().await;
    let transport = RecordingTransport::failing();
    let service = Arc::new(OutboxService::new(database, transport));
    let processor = Arc::new(OutboxProcessor::new(service.clone(), fast_config()));

    processor.start();
    service.enqueue(recommendation_event("rec-1")).await.unwrap();

    let processor_check = processor.clone();
    wait_for(Duration::from_secs(5), move || {
        processor_check.stats().failed == 1
    })
    .await;

    let stats = processor.stats();
    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.failed, 1);

    processor.stop().await;
}
