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

//! Transactional outbox and delivery engine for the activity service.
//!
//! A domain operation that needs to notify external consumers writes an
//! outbox row in the same database transaction as its own change, so the
//! "save the domain change" / "emit the event" dual write cannot race. A
//! background processor then claims pending rows and delivers them to an
//! external transport, with per-event failure accounting and manual
//! operational controls (retry-failed, recover-stale, process-now, cleanup).
//!
//! # Architecture
//!
//! - [`database`]: connection pooling with runtime PostgreSQL/SQLite backend
//!   selection and embedded migrations.
//! - [`dal`]: the record store, including the atomic claim protocol that
//!   keeps concurrent delivery passes from double-publishing.
//! - [`service`]: the transactional and administrative API ([`OutboxService`]).
//! - [`processor`]: the supervised background loop ([`OutboxProcessor`]).
//! - [`health`]: operational snapshots ([`HealthReporter`]).
//! - [`transport`]: the [`DeliveryTransport`] seam to the outside world.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use activity_outbox::{
//!     Database, NewOutboxEvent, OutboxProcessor, OutboxProcessorConfig, OutboxService,
//! };
//!
//! let database = Database::new("postgres://localhost:5432", "activity", 10);
//! database.run_migrations().await?;
//!
//! let service = Arc::new(OutboxService::new(database, transport));
//! let processor = Arc::new(OutboxProcessor::new(
//!     service.clone(),
//!     OutboxProcessorConfig::default(),
//! ));
//! processor.start();
//!
//! service
//!     .enqueue(NewOutboxEvent {
//!         event_type: "RECOMMENDATION_CREATED".into(),
//!         aggregate_id: "42".into(),
//!         payload: serde_json::json!({"recommendation_id": 42}),
//!         routing_key: "activity.recommendation.created".into(),
//!         correlation_id: None,
//!         created_by: "supervisor-1".into(),
//!     })
//!     .await?;
//! ```

pub mod dal;
pub mod database;
pub mod error;
pub mod health;
pub mod models;
pub mod processor;
pub mod service;
pub mod transport;

pub use dal::{OutboxEventDAL, DAL};
pub use database::{BackendType, Database};
pub use error::{DeliveryError, StoreError};
pub use health::{HealthReport, HealthReporter, HealthStatus};
pub use models::{NewOutboxEvent, OutboxEvent, OutboxStatus};
pub use processor::{OutboxProcessor, OutboxProcessorConfig, ProcessorStats};
pub use service::{CleanupOutcome, OutboxService, OutboxStats, PassOutcome};
pub use transport::DeliveryTransport;

#[cfg(feature = "kafka")]
pub use transport::KafkaTransport;
