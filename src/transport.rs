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

//! Delivery transport abstraction.
//!
//! The engine never interprets event payloads; it hands `(routing_key,
//! payload)` to whatever [`DeliveryTransport`] it was constructed with. The
//! optional `kafka` feature provides a producer-backed implementation; tests
//! use in-memory recording transports.

use async_trait::async_trait;

use crate::error::DeliveryError;

/// External consumer of outbox events.
///
/// Implementations must treat `deliver` as at-least-once: a delivery pass may
/// retry an event that failed or timed out earlier, so downstream consumers
/// are expected to deduplicate on the event id carried in the payload.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Delivers one event body under the given routing key.
    ///
    /// Any error returned here marks the event FAILED; it is never allowed to
    /// abort the rest of the batch or the worker loop.
    async fn deliver(&self, routing_key: &str, payload: &str) -> Result<(), DeliveryError>;
}

/// Kafka-backed delivery transport.
///
/// Routing keys become message keys on a single configured topic, preserving
/// per-aggregate ordering through partition assignment.
#[cfg(feature = "kafka")]
pub struct KafkaTransport {
    producer: rdkafka::producer::FutureProducer,
    topic: String,
}

#[cfg(feature = "kafka")]
impl KafkaTransport {
    /// Creates a transport producing to `topic` on the given brokers.
    pub fn new(brokers: &str, topic: impl Into<String>) -> Result<Self, DeliveryError> {
        use rdkafka::config::ClientConfig;

        let producer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "30000")
            .create()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        Ok(Self {
            producer,
            topic: topic.into(),
        })
    }
}

#[cfg(feature = "kafka")]
#[async_trait]
impl DeliveryTransport for KafkaTransport {
    async fn deliver(&self, routing_key: &str, payload: &str) -> Result<(), DeliveryError> {
        use rdkafka::producer::FutureRecord;
        use rdkafka::util::Timeout;

        let record = FutureRecord::to(&self.topic)
            .key(routing_key)
            .payload(payload);

        self.producer
            .send(record, Timeout::Never)
            .await
            .map_err(|(e, _)| DeliveryError::Transport(e.to_string()))?;

        Ok(())
    }
}
