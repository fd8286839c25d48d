// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for vertex lifecycle and fault events.
//!
//! This module contains message types for logging events related to:
//! * Vertex wiring and fan-in merges
//! * Dispatch loop start and stop
//! * Panic and fault containment

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A fault was contained at a vertex boundary and its batch dropped.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use vertexflow::observability::messages::vertex::PanicRecovered;
///
/// let ids = vec!["p-1".to_string(), "p-2".to_string()];
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "boom");
/// let msg = PanicRecovered {
///     vertex_id: "parse",
///     vertex_type: "map",
///     error: &error,
///     packet_ids: &ids,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "panic-recovery [id: parse type: map error: boom packets: [p-1, p-2]]"
/// );
/// ```
pub struct PanicRecovered<'a> {
    pub vertex_id: &'a str,
    pub vertex_type: &'a str,
    pub error: &'a dyn std::error::Error,
    pub packet_ids: &'a [String],
}

impl Display for PanicRecovered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "panic-recovery [id: {} type: {} error: {} packets: [{}]]",
            self.vertex_id,
            self.vertex_type,
            self.error,
            self.packet_ids.join(", ")
        )
    }
}

impl StructuredLog for PanicRecovered<'_> {
    fn log(&self) {
        tracing::error!(
            vertex_id = self.vertex_id,
            vertex_type = self.vertex_type,
            error = %self.error,
            packet_ids = ?self.packet_ids,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "panic_recovered",
            span_name = name,
            vertex_id = self.vertex_id,
            vertex_type = self.vertex_type,
            error = %self.error,
        )
    }
}

/// Vertex decorated and its dispatch loop started.
///
/// # Log Level
/// `debug!` - Wiring detail
pub struct VertexWired<'a> {
    pub vertex_id: &'a str,
    pub vertex_type: &'a str,
    pub options: &'a crate::config::ResolvedOptions,
}

impl Display for VertexWired<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Vertex '{}' ({}) wired: trace={} metrics={} debug={} isolation_copy={} serial_dispatch={}",
            self.vertex_id,
            self.vertex_type,
            self.options.trace,
            self.options.metrics,
            self.options.debug,
            self.options.isolation_copy,
            self.options.serial_dispatch
        )
    }
}

impl StructuredLog for VertexWired<'_> {
    fn log(&self) {
        tracing::debug!(
            vertex_id = self.vertex_id,
            vertex_type = self.vertex_type,
            serial_dispatch = self.options.serial_dispatch,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "vertex",
            span_name = name,
            vertex_id = self.vertex_id,
            vertex_type = self.vertex_type,
        )
    }
}

/// A further upstream edge was merged into an already wired vertex.
///
/// # Log Level
/// `debug!` - Wiring detail
pub struct EdgeMerged<'a> {
    pub vertex_id: &'a str,
    pub vertex_type: &'a str,
}

impl Display for EdgeMerged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Vertex '{}' ({}) already wired, merging additional upstream edge",
            self.vertex_id, self.vertex_type
        )
    }
}

impl StructuredLog for EdgeMerged<'_> {
    fn log(&self) {
        tracing::debug!(
            vertex_id = self.vertex_id,
            vertex_type = self.vertex_type,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "edge_merged",
            span_name = name,
            vertex_id = self.vertex_id,
        )
    }
}

/// A vertex's dispatch loop exited.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct DispatchLoopStopped<'a> {
    pub vertex_id: &'a str,
    pub reason: &'a str,
}

impl Display for DispatchLoopStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dispatch loop for vertex '{}' stopped: {}",
            self.vertex_id, self.reason
        )
    }
}

impl StructuredLog for DispatchLoopStopped<'_> {
    fn log(&self) {
        tracing::debug!(vertex_id = self.vertex_id, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "dispatch_loop_stopped",
            span_name = name,
            vertex_id = self.vertex_id,
        )
    }
}

/// A batch was taken off a vertex inbox and handed to its layer stack.
///
/// The span from [`StructuredLog::span`] wraps the whole decorated handler
/// call, so events logged while handling the batch carry the vertex fields.
///
/// # Log Level
/// `trace!` - Per-batch detail
pub struct BatchDispatched<'a> {
    pub vertex_id: &'a str,
    pub vertex_type: &'a str,
    pub packet_count: usize,
}

impl Display for BatchDispatched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Vertex '{}' ({}) dispatching batch of {} packets",
            self.vertex_id, self.vertex_type, self.packet_count
        )
    }
}

impl StructuredLog for BatchDispatched<'_> {
    fn log(&self) {
        tracing::trace!(
            vertex_id = self.vertex_id,
            vertex_type = self.vertex_type,
            packet_count = self.packet_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "batch_dispatch",
            span_name = name,
            vertex_id = self.vertex_id,
            vertex_type = self.vertex_type,
            packet_count = self.packet_count,
        )
    }
}
