// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::{Counter, KeyValue, Meter, Span, TraceHandle, Tracer, ValueRecorder};

pub struct NoopTracer;

pub struct NoopSpan;

impl Tracer for NoopTracer {
    fn start_span(&self, _name: &str, _attributes: &[KeyValue]) -> TraceHandle {
        TraceHandle::new(NoopSpan)
    }
}

impl Span for NoopSpan {
    fn add_event(&self, _name: &str, _attributes: &[KeyValue]) {}

    fn end(&self) {}
}

pub struct NoopMeter;

struct NoopInstrument;

impl Meter for NoopMeter {
    fn counter(&self, _name: &str) -> Arc<dyn Counter> {
        Arc::new(NoopInstrument)
    }

    fn value_recorder(&self, _name: &str) -> Arc<dyn ValueRecorder> {
        Arc::new(NoopInstrument)
    }
}

impl Counter for NoopInstrument {
    fn add(&self, _value: f64, _labels: &[KeyValue]) {}
}

impl ValueRecorder for NoopInstrument {
    fn record(&self, _value: i64, _labels: &[KeyValue]) {}
}
