// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph build and shutdown events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Graph cascade finished and every reachable vertex is running.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use vertexflow::observability::messages::graph::GraphStarted;
///
/// let msg = GraphStarted {
///     root_id: "ingest",
///     vertex_count: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct GraphStarted<'a> {
    pub root_id: &'a str,
    pub vertex_count: usize,
}

impl Display for GraphStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph rooted at '{}' started with {} vertices",
            self.root_id, self.vertex_count
        )
    }
}

impl StructuredLog for GraphStarted<'_> {
    fn log(&self) {
        tracing::info!(
            root_id = self.root_id,
            vertex_count = self.vertex_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "graph",
            span_name = name,
            root_id = self.root_id,
            vertex_count = self.vertex_count,
        )
    }
}

/// Graph lifetime ended and all tasks drained.
///
/// # Log Level
/// `info!` - Important operational event
pub struct GraphStopped<'a> {
    pub root_id: &'a str,
    pub duration: std::time::Duration,
}

impl Display for GraphStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph rooted at '{}' stopped after {:?}",
            self.root_id, self.duration
        )
    }
}

impl StructuredLog for GraphStopped<'_> {
    fn log(&self) {
        tracing::info!(
            root_id = self.root_id,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "graph_stopped",
            span_name = name,
            root_id = self.root_id,
            duration = ?self.duration,
        )
    }
}
