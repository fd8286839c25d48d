// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::config::{GraphConfig, Options};
use crate::edge::Edge;
use crate::errors::GraphError;
use crate::graph::Vertex;
use crate::middleware::{LayerContext, Recorder};
use crate::observability::messages::graph::{GraphStarted, GraphStopped};
use crate::observability::messages::StructuredLog;
use crate::packet::Batch;
use crate::telemetry::log::{LogMeter, LogTracer};
use crate::telemetry::{Meter, Tracer};

/// Collects what every vertex needs at wiring time and cascades a root vertex
/// into a running [`Graph`].
///
/// Tracing and metrics go through the `tracing` bridge unless other backends
/// are injected.
pub struct Builder {
    id: Uuid,
    defaults: Options,
    recorder: Option<Recorder>,
    tracer: Arc<dyn Tracer>,
    meter: Arc<dyn Meter>,
    token: CancellationToken,
    tracker: TaskTracker,
    vertices: HashMap<String, Arc<Vertex>>,
}

impl Builder {
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            defaults: config.defaults,
            recorder: None,
            tracer: Arc::new(LogTracer),
            meter: Arc::new(LogMeter),
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            vertices: HashMap::new(),
        }
    }

    /// Audit callback invoked with `(vertex_id, vertex_type, "start", batch)`
    /// before every handler call.
    pub fn with_recorder(mut self, recorder: Recorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_meter(mut self, meter: Arc<dyn Meter>) -> Self {
        self.meter = meter;
        self
    }

    /// Tie the graph lifetime to an outer token. Cancelling it stops the graph.
    pub fn with_parent_token(mut self, parent: &CancellationToken) -> Self {
        self.token = parent.child_token();
        self
    }

    pub fn defaults(&self) -> &Options {
        &self.defaults
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Identifies the graph this builder wires vertices into.
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    pub(crate) fn layer_context(&self) -> LayerContext {
        LayerContext {
            recorder: self.recorder.clone(),
            tracer: Arc::clone(&self.tracer),
            meter: Arc::clone(&self.meter),
        }
    }

    pub(crate) fn register(&mut self, vertex: Arc<Vertex>) -> Result<(), GraphError> {
        if let Some(existing) = self.vertices.get(vertex.id()) {
            if !Arc::ptr_eq(existing, &vertex) {
                return Err(GraphError::DuplicateVertex {
                    vertex_id: vertex.id().to_string(),
                });
            }
            return Ok(());
        }
        self.vertices.insert(vertex.id().to_string(), vertex);
        Ok(())
    }

    /// Wire `root` and everything reachable from it.
    ///
    /// On failure the loops started so far are cancelled.
    pub fn build(mut self, root: Arc<Vertex>) -> Result<Graph, GraphError> {
        let input = Edge::new();
        if let Err(e) = root.cascade(&mut self, &input) {
            self.token.cancel();
            return Err(e);
        }

        GraphStarted {
            root_id: root.id(),
            vertex_count: self.vertices.len(),
        }
        .log();

        Ok(Graph {
            root_id: root.id().to_string(),
            input,
            vertices: self.vertices,
            token: self.token,
            tracker: self.tracker,
            started: Instant::now(),
        })
    }
}

/// A running graph.
///
/// Dropping the handle cancels the graph without waiting; call
/// [`Graph::shutdown`] to also wait for in-flight batches.
pub struct Graph {
    root_id: String,
    input: Edge,
    vertices: HashMap<String, Arc<Vertex>>,
    token: CancellationToken,
    tracker: TaskTracker,
    started: Instant,
}

impl Graph {
    /// Send a batch into the root vertex. Returns the number of inboxes reached.
    pub fn inject(&self, batch: Batch) -> usize {
        if self.token.is_cancelled() {
            return 0;
        }
        self.input.send(batch)
    }

    pub fn input_edge(&self) -> &Edge {
        &self.input
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn vertex(&self, id: &str) -> Option<&Arc<Vertex>> {
        self.vertices.get(id)
    }

    /// Registered vertex ids, sorted.
    pub fn vertex_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.vertices.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Cancel the graph and wait for every dispatch loop and in-flight batch.
    pub async fn shutdown(&self) {
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        GraphStopped {
            root_id: &self.root_id,
            duration: self.started.elapsed(),
        }
        .log();
    }
}

impl Drop for Graph {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_outside_runtime_fails() {
        let root = Vertex::transmit("sink", Options::new(), |_| {});
        let result = Builder::new(&GraphConfig::default()).build(root);
        assert!(matches!(result, Err(GraphError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_build_registers_reachable_vertices() {
        let sink = Vertex::transmit("sink", Options::new(), |_| {});
        let double = Vertex::map("double", Options::new(), |_| Ok(()), vec![sink]);
        let root = Vertex::stream("source", Options::new(), vec![double]);

        let graph = Builder::new(&GraphConfig::default()).build(root).unwrap();

        assert_eq!(graph.vertex_ids(), vec!["double", "sink", "source"]);
        assert_eq!(graph.root_id(), "source");
        assert!(graph.vertex("double").unwrap().is_wired());
        assert_eq!(graph.input_edge().subscriber_count(), 1);
        graph.shutdown().await;
        assert!(!graph.is_running());
    }

    #[tokio::test]
    async fn test_parent_token_cancels_graph() {
        let parent = CancellationToken::new();
        let root = Vertex::transmit("sink", Options::new(), |_| {});
        let graph = Builder::new(&GraphConfig::default())
            .with_parent_token(&parent)
            .build(root)
            .unwrap();

        parent.cancel();

        assert!(!graph.is_running());
        assert_eq!(graph.inject(Vec::new()), 0);
    }
}
