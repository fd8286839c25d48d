// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::KeyValue;

/// Source of per-packet trace spans.
pub trait Tracer: Send + Sync {
    /// Open a span that will follow one packet through the graph.
    fn start_span(&self, name: &str, attributes: &[KeyValue]) -> TraceHandle;
}

/// A distributed-trace span owned by a backend.
pub trait Span: Send + Sync {
    fn add_event(&self, name: &str, attributes: &[KeyValue]);

    /// Close the span. Called at most once per span through [`TraceHandle::end`].
    fn end(&self);
}

struct HandleInner {
    span: Box<dyn Span>,
    ended: AtomicBool,
}

/// Shared, opaque reference to a packet's span.
///
/// Clones refer to the same span; identity survives packet isolation copies
/// because the handle is carried over rather than serialized.
#[derive(Clone)]
pub struct TraceHandle {
    inner: Arc<HandleInner>,
}

impl TraceHandle {
    pub fn new(span: impl Span + 'static) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                span: Box::new(span),
                ended: AtomicBool::new(false),
            }),
        }
    }

    pub fn add_event(&self, name: &str, attributes: &[KeyValue]) {
        self.inner.span.add_event(name, attributes);
    }

    /// End the span. Returns `false` when it had already been ended.
    pub fn end(&self) -> bool {
        if self.inner.ended.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner.span.end();
        true
    }

    pub fn is_ended(&self) -> bool {
        self.inner.ended.load(Ordering::Acquire)
    }

    /// Whether both handles refer to the same span.
    pub fn same_span(&self, other: &TraceHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for TraceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceHandle")
            .field("ended", &self.is_ended())
            .finish()
    }
}
