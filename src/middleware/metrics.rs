// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use super::{Layer, VertexInfo};
use crate::errors::VertexError;
use crate::packet::{distinct_packets, Batch};
use crate::telemetry::{Counter, KeyValue, Meter, ValueRecorder};
use crate::traits::Handler;

/// Records batch sizes, error counts and durations for one vertex.
///
/// Instruments are named `{type}.{id}.<metric>` and every sample carries
/// `vertex_id` and `vertex_type` labels.
pub struct MetricsLayer {
    info: Arc<VertexInfo>,
    enabled: bool,
    meter: Arc<dyn Meter>,
}

impl MetricsLayer {
    pub fn new(info: Arc<VertexInfo>, enabled: bool, meter: Arc<dyn Meter>) -> Self {
        Self {
            info,
            enabled,
            meter,
        }
    }
}

struct MetricsHandler {
    inner: Arc<dyn Handler>,
    labels: Vec<KeyValue>,
    incoming_total: Arc<dyn Counter>,
    outgoing_total: Arc<dyn Counter>,
    errors_total: Arc<dyn Counter>,
    incoming: Arc<dyn ValueRecorder>,
    outgoing: Arc<dyn ValueRecorder>,
    errors: Arc<dyn ValueRecorder>,
    duration: Arc<dyn ValueRecorder>,
}

impl Layer for MetricsLayer {
    fn wrap(self: Box<Self>, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        if !self.enabled {
            return inner;
        }
        let prefix = format!("{}.{}", self.info.vertex_type, self.info.id);
        let meter = &self.meter;
        Arc::new(MetricsHandler {
            inner,
            labels: self.info.labels(),
            incoming_total: meter.counter(&format!("{}.total.incoming", prefix)),
            outgoing_total: meter.counter(&format!("{}.total.outgoing", prefix)),
            errors_total: meter.counter(&format!("{}.total.errors", prefix)),
            incoming: meter.value_recorder(&format!("{}.incoming", prefix)),
            outgoing: meter.value_recorder(&format!("{}.outgoing", prefix)),
            errors: meter.value_recorder(&format!("{}.errors", prefix)),
            duration: meter.value_recorder(&format!("{}.duration", prefix)),
        })
    }
}

#[async_trait]
impl Handler for MetricsHandler {
    async fn handle(&self, batch: Batch) -> Result<Batch, VertexError> {
        self.incoming.record(batch.len() as i64, &self.labels);
        self.incoming_total.add(batch.len() as f64, &self.labels);

        let received = batch.clone();
        let start = Instant::now();
        let out = self.inner.handle(batch).await?;
        let elapsed = start.elapsed();

        // Packets the handler dropped still count when it failed them.
        let failures = distinct_packets(&received, &out)
            .iter()
            .filter(|p| p.has_error())
            .count();
        self.outgoing.record(out.len() as i64, &self.labels);
        self.outgoing_total.add(out.len() as f64, &self.labels);
        self.errors.record(failures as i64, &self.labels);
        self.errors_total.add(failures as f64, &self.labels);
        self.duration
            .record(i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX), &self.labels);

        Ok(out)
    }
}
