// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-memory telemetry backends.
//!
//! Every span, event, counter total and sample is kept so callers can inspect
//! what a graph did after the fact.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::{Counter, KeyValue, Meter, Span, TraceHandle, Tracer, ValueRecorder};

/// A span event as it was emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub name: String,
    pub attributes: Vec<KeyValue>,
}

impl EventRecord {
    /// Value of the first attribute with the given key.
    pub fn attribute(&self, key: &str) -> Option<&super::AttributeValue> {
        self.attributes
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| &kv.value)
    }
}

/// Everything observed for one span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRecord {
    pub name: String,
    pub attributes: Vec<KeyValue>,
    pub events: Vec<EventRecord>,
    pub end_count: usize,
}

#[derive(Clone, Default)]
pub struct InMemoryTracer {
    spans: Arc<Mutex<Vec<Arc<Mutex<SpanRecord>>>>>,
}

struct MemorySpan {
    record: Arc<Mutex<SpanRecord>>,
}

impl InMemoryTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans.lock().iter().map(|s| s.lock().clone()).collect()
    }

    pub fn span_count(&self) -> usize {
        self.spans.lock().len()
    }

    /// All events with the given name across every span.
    pub fn events_named(&self, name: &str) -> Vec<EventRecord> {
        self.spans()
            .into_iter()
            .flat_map(|s| s.events)
            .filter(|e| e.name == name)
            .collect()
    }
}

impl Tracer for InMemoryTracer {
    fn start_span(&self, name: &str, attributes: &[KeyValue]) -> TraceHandle {
        let record = Arc::new(Mutex::new(SpanRecord {
            name: name.to_string(),
            attributes: attributes.to_vec(),
            events: Vec::new(),
            end_count: 0,
        }));
        self.spans.lock().push(Arc::clone(&record));
        TraceHandle::new(MemorySpan { record })
    }
}

impl Span for MemorySpan {
    fn add_event(&self, name: &str, attributes: &[KeyValue]) {
        self.record.lock().events.push(EventRecord {
            name: name.to_string(),
            attributes: attributes.to_vec(),
        });
    }

    fn end(&self) {
        self.record.lock().end_count += 1;
    }
}

#[derive(Clone, Default)]
pub struct InMemoryMeter {
    counters: Arc<Mutex<HashMap<String, Arc<MemoryCounter>>>>,
    recorders: Arc<Mutex<HashMap<String, Arc<MemoryRecorder>>>>,
}

#[derive(Default)]
struct MemoryCounter {
    total: Mutex<f64>,
}

#[derive(Default)]
struct MemoryRecorder {
    samples: Mutex<Vec<i64>>,
}

impl InMemoryMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running total of a counter, `None` if it was never created.
    pub fn counter_total(&self, name: &str) -> Option<f64> {
        self.counters.lock().get(name).map(|c| *c.total.lock())
    }

    /// Samples recorded on a value recorder, in recording order.
    pub fn samples(&self, name: &str) -> Vec<i64> {
        self.recorders
            .lock()
            .get(name)
            .map(|r| r.samples.lock().clone())
            .unwrap_or_default()
    }

    pub fn instrument_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .counters
            .lock()
            .keys()
            .chain(self.recorders.lock().keys())
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl Meter for InMemoryMeter {
    fn counter(&self, name: &str) -> Arc<dyn Counter> {
        let counter = self
            .counters
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();
        counter
    }

    fn value_recorder(&self, name: &str) -> Arc<dyn ValueRecorder> {
        let recorder = self
            .recorders
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();
        recorder
    }
}

impl Counter for MemoryCounter {
    fn add(&self, value: f64, _labels: &[KeyValue]) {
        *self.total.lock() += value;
    }
}

impl ValueRecorder for MemoryRecorder {
    fn record(&self, value: i64, _labels: &[KeyValue]) {
        self.samples.lock().push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_accumulates_across_handles() {
        let meter = InMemoryMeter::new();
        meter.counter("map.a.total.incoming").add(3.0, &[]);
        meter.counter("map.a.total.incoming").add(2.0, &[]);
        assert_eq!(meter.counter_total("map.a.total.incoming"), Some(5.0));
        assert_eq!(meter.counter_total("missing"), None);
    }

    #[test]
    fn test_recorder_keeps_samples_in_order() {
        let meter = InMemoryMeter::new();
        let recorder = meter.value_recorder("map.a.incoming");
        recorder.record(4, &[]);
        recorder.record(1, &[]);
        assert_eq!(meter.samples("map.a.incoming"), vec![4, 1]);
    }

    #[test]
    fn test_tracer_records_events_and_end() {
        let tracer = InMemoryTracer::new();
        let handle = tracer.start_span("stream.inject", &[KeyValue::string("vertex_id", "a")]);
        handle.add_event("vertex", &[KeyValue::int("when", 1)]);
        handle.end();
        handle.end();

        let spans = tracer.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].events.len(), 1);
        assert_eq!(spans[0].end_count, 1);
        assert_eq!(
            tracer.events_named("vertex")[0].attribute("when"),
            Some(&crate::telemetry::AttributeValue::Int(1))
        );
    }
}
