// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Telemetry backends that forward to the `tracing` crate.
//!
//! Packet spans become `tracing` spans named `packet_trace`; span events and
//! metric samples become `debug`/`trace` level events so they show up under
//! whatever subscriber the host process installs.

use parking_lot::Mutex;
use std::sync::Arc;

use super::attribute::render;
use super::{Counter, KeyValue, Meter, Span, TraceHandle, Tracer, ValueRecorder};

pub struct LogTracer;

struct LogSpan {
    name: String,
    span: Mutex<Option<tracing::Span>>,
}

impl Tracer for LogTracer {
    fn start_span(&self, name: &str, attributes: &[KeyValue]) -> TraceHandle {
        let span = tracing::info_span!(
            "packet_trace",
            span_name = name,
            attributes = %render(attributes),
        );
        TraceHandle::new(LogSpan {
            name: name.to_string(),
            span: Mutex::new(Some(span)),
        })
    }
}

impl Span for LogSpan {
    fn add_event(&self, name: &str, attributes: &[KeyValue]) {
        if let Some(span) = self.span.lock().as_ref() {
            tracing::debug!(
                parent: span,
                event = name,
                attributes = %render(attributes),
                "span event"
            );
        }
    }

    fn end(&self) {
        if let Some(span) = self.span.lock().take() {
            tracing::debug!(parent: &span, span_name = %self.name, "span ended");
        }
    }
}

pub struct LogMeter;

struct LogInstrument {
    name: String,
}

impl Meter for LogMeter {
    fn counter(&self, name: &str) -> Arc<dyn Counter> {
        Arc::new(LogInstrument {
            name: name.to_string(),
        })
    }

    fn value_recorder(&self, name: &str) -> Arc<dyn ValueRecorder> {
        Arc::new(LogInstrument {
            name: name.to_string(),
        })
    }
}

impl Counter for LogInstrument {
    fn add(&self, value: f64, labels: &[KeyValue]) {
        tracing::trace!(metric = %self.name, value, labels = %render(labels), "counter add");
    }
}

impl ValueRecorder for LogInstrument {
    fn record(&self, value: i64, labels: &[KeyValue]) {
        tracing::trace!(metric = %self.name, value, labels = %render(labels), "value recorded");
    }
}
