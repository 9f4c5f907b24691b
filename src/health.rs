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

//! Health and stats reporting.
//!
//! A pure aggregation over the service and processor: no side effects, and a
//! store failure degrades the snapshot to an explicit error status instead of
//! propagating.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::processor::{OutboxProcessor, ProcessorStats};
use crate::service::{OutboxService, OutboxStats};

/// Failed-event count at or above which the system reports unhealthy.
pub const DEFAULT_FAILED_THRESHOLD: i64 = 100;

/// Overall health verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Worker running and failure backlog below the threshold.
    Healthy,
    /// Worker stopped, or too many FAILED events.
    Unhealthy,
    /// The snapshot itself could not be taken (store unavailable).
    Error,
}

/// One operational snapshot of the outbox system.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    /// Per-status outbox counts; absent when the store was unreachable.
    pub outbox: Option<OutboxStats>,
    pub processor: ProcessorStats,
    /// Store error message when `status` is [`HealthStatus::Error`].
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Aggregates service and processor state into health snapshots.
pub struct HealthReporter {
    service: Arc<OutboxService>,
    processor: Arc<OutboxProcessor>,
    failed_threshold: i64,
}

impl HealthReporter {
    /// Creates a reporter with the default failed-event threshold.
    pub fn new(service: Arc<OutboxService>, processor: Arc<OutboxProcessor>) -> Self {
        Self {
            service,
            processor,
            failed_threshold: DEFAULT_FAILED_THRESHOLD,
        }
    }

    /// Overrides the failed-event threshold.
    pub fn with_failed_threshold(mut self, threshold: i64) -> Self {
        self.failed_threshold = threshold;
        self
    }

    /// Takes one snapshot. Never fails: store errors are folded into the
    /// report as [`HealthStatus::Error`].
    pub async fn snapshot(&self) -> HealthReport {
        let processor = self.processor.stats();
        let timestamp = Utc::now();

        match self.service.get_stats().await {
            Ok(outbox) => HealthReport {
                status: verdict(processor.is_running, outbox.failed, self.failed_threshold),
                outbox: Some(outbox),
                processor,
                error: None,
                timestamp,
            },
            Err(e) => {
                error!(error = %e, "Health snapshot failed to read outbox stats");
                HealthReport {
                    status: HealthStatus::Error,
                    outbox: None,
                    processor,
                    error: Some(e.to_string()),
                    timestamp,
                }
            }
        }
    }
}

/// Health policy: the worker must be running and the FAILED backlog must be
/// below the operational threshold.
fn verdict(is_running: bool, failed: i64, threshold: i64) -> HealthStatus {
    if is_running && failed < threshold {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    }
}
