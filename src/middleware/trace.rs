// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::{Layer, VertexInfo};
use crate::errors::VertexError;
use crate::packet::{distinct_packets, Batch};
use crate::telemetry::{KeyValue, Tracer};
use crate::traits::Handler;

/// Name of the span opened for a packet the first time it is traced.
pub const PACKET_SPAN: &str = "stream.inject";
pub const VERTEX_EVENT: &str = "vertex";
pub const ERROR_EVENT: &str = "error";

/// Follows each packet through the vertex with span events.
///
/// Packets get a span on first touch, a `vertex` event on entry, and an
/// `error` event if their error slot is set once the handler returns, whether
/// or not the handler forwarded them. At a terminus vertex every span the
/// vertex saw is ended, even when tracing is off for that vertex, so spans
/// opened upstream are always closed.
pub struct TraceLayer {
    info: Arc<VertexInfo>,
    enabled: bool,
    tracer: Arc<dyn Tracer>,
}

impl TraceLayer {
    pub fn new(info: Arc<VertexInfo>, enabled: bool, tracer: Arc<dyn Tracer>) -> Self {
        Self {
            info,
            enabled,
            tracer,
        }
    }
}

struct TraceHandler {
    info: Arc<VertexInfo>,
    enabled: bool,
    terminus: bool,
    tracer: Arc<dyn Tracer>,
    inner: Arc<dyn Handler>,
}

impl Layer for TraceLayer {
    fn wrap(self: Box<Self>, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        let terminus = self.info.is_terminus();
        if !self.enabled && !terminus {
            return inner;
        }
        Arc::new(TraceHandler {
            info: self.info,
            enabled: self.enabled,
            terminus,
            tracer: self.tracer,
            inner,
        })
    }
}

impl TraceHandler {
    fn attributes(&self, packet_id: &str, when: i64) -> Vec<KeyValue> {
        vec![
            KeyValue::string("vertex_id", self.info.id.clone()),
            KeyValue::string("vertex_type", self.info.vertex_type.clone()),
            KeyValue::string("packet_id", packet_id),
            KeyValue::int("when", when),
        ]
    }
}

fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

#[async_trait]
impl Handler for TraceHandler {
    async fn handle(&self, batch: Batch) -> Result<Batch, VertexError> {
        if self.enabled {
            let when = now_nanos();
            for packet in &batch {
                let span = packet.trace_or_start(|| {
                    let mut attributes = self.info.labels();
                    attributes.push(KeyValue::string("packet_id", packet.id()));
                    self.tracer.start_span(PACKET_SPAN, &attributes)
                });
                span.add_event(VERTEX_EVENT, &self.attributes(packet.id(), when));
            }
        }

        let received = batch.clone();
        let out = self.inner.handle(batch).await?;
        // Dropped packets are reported and closed too.
        let touched = distinct_packets(&received, &out);

        if self.enabled {
            let when = now_nanos();
            for packet in touched.iter().filter(|p| p.has_error()) {
                if let Some(span) = packet.trace_handle() {
                    let mut attributes = self.attributes(packet.id(), when);
                    attributes.push(KeyValue::bool("error", true));
                    span.add_event(ERROR_EVENT, &attributes);
                }
            }
        }

        if self.terminus {
            for span in touched.iter().filter_map(|p| p.trace_handle()) {
                span.end();
            }
        }

        Ok(out)
    }
}
