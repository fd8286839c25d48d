// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Vertices and the cascade that wires them into a running graph.
//!
//! A vertex is constructed `Pending`: it holds its raw handler and a connector
//! that knows how to cascade its downstream vertices. The first cascade freezes
//! it into `Wired`, composing the layer stack exactly once and starting its
//! dispatch loop. Later cascades reaching the same vertex only attach its inbox
//! to the additional upstream edge.

use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{Options, ResolvedOptions};
use crate::edge::{Edge, InboxSender};
use crate::engine::DispatchLoop;
use crate::errors::{GraphError, PacketError};
use crate::graph::vertex_type;
use crate::graph::Builder;
use crate::middleware::{self, VertexInfo};
use crate::observability::messages::vertex::{EdgeMerged, VertexWired};
use crate::observability::messages::StructuredLog;
use crate::packet::Packet;
use crate::traits::{BatchFn, FilterFn, Handler, PacketFn, PassThrough};

/// Cascades a vertex's downstream vertices once the vertex itself is wired.
pub type Connector = Box<dyn FnOnce(&mut Builder) -> Result<(), GraphError> + Send>;

struct Pending {
    handler: Arc<dyn Handler>,
    connector: Connector,
}

struct Wiring {
    graph_id: Uuid,
    input: Edge,
    options: ResolvedOptions,
    inbox: InboxSender,
    upstreams: usize,
}

enum VertexState {
    Pending(Pending),
    Wired(Wiring),
}

pub struct Vertex {
    info: Arc<VertexInfo>,
    local: Options,
    output: Option<Edge>,
    state: Mutex<VertexState>,
}

impl Vertex {
    /// General constructor for a vertex with a custom handler and connector.
    pub fn new(
        id: impl Into<String>,
        vertex_type: impl Into<String>,
        options: Options,
        handler: Arc<dyn Handler>,
        output: Option<Edge>,
        connector: Connector,
    ) -> Arc<Self> {
        Arc::new(Self {
            info: Arc::new(VertexInfo::new(id, vertex_type)),
            local: options,
            output,
            state: Mutex::new(VertexState::Pending(Pending { handler, connector })),
        })
    }

    /// A vertex whose handler output is forwarded to every vertex in `downstream`.
    pub fn process(
        id: impl Into<String>,
        vertex_type: impl Into<String>,
        options: Options,
        handler: Arc<dyn Handler>,
        downstream: Vec<Arc<Vertex>>,
    ) -> Arc<Self> {
        let output = Edge::new();
        let edge = output.clone();
        let connector: Connector = Box::new(move |builder: &mut Builder| {
            for next in &downstream {
                next.cascade(builder, &edge)?;
            }
            Ok(())
        });
        Self::new(id, vertex_type, options, handler, Some(output), connector)
    }

    /// Source vertex: forwards injected batches untouched.
    pub fn stream(
        id: impl Into<String>,
        options: Options,
        downstream: Vec<Arc<Vertex>>,
    ) -> Arc<Self> {
        Self::process(id, vertex_type::STREAM, options, Arc::new(PassThrough), downstream)
    }

    /// Per-packet transform. An `Err` is recorded on the packet, which moves on.
    pub fn map<F>(
        id: impl Into<String>,
        options: Options,
        f: F,
        downstream: Vec<Arc<Vertex>>,
    ) -> Arc<Self>
    where
        F: Fn(&Packet) -> Result<(), PacketError> + Send + Sync + 'static,
    {
        Self::process(id, vertex_type::MAP, options, Arc::new(PacketFn(f)), downstream)
    }

    /// Forwards only the packets `predicate` accepts.
    pub fn filter<F>(
        id: impl Into<String>,
        options: Options,
        predicate: F,
        downstream: Vec<Arc<Vertex>>,
    ) -> Arc<Self>
    where
        F: Fn(&Packet) -> bool + Send + Sync + 'static,
    {
        Self::process(
            id,
            vertex_type::FILTER,
            options,
            Arc::new(FilterFn(predicate)),
            downstream,
        )
    }

    /// Graph terminus. Has no output edge.
    pub fn transmit<F>(id: impl Into<String>, options: Options, sink: F) -> Arc<Self>
    where
        F: Fn(&[Packet]) + Send + Sync + 'static,
    {
        Self::new(
            id,
            vertex_type::TRANSMIT,
            options,
            Arc::new(BatchFn(sink)),
            None,
            Box::new(|_: &mut Builder| Ok(())),
        )
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn vertex_type(&self) -> &str {
        &self.info.vertex_type
    }

    pub fn local_options(&self) -> Options {
        self.local
    }

    pub fn output_edge(&self) -> Option<&Edge> {
        self.output.as_ref()
    }

    pub fn is_wired(&self) -> bool {
        matches!(*self.state.lock(), VertexState::Wired(_))
    }

    /// Options fixed when the vertex was wired.
    pub fn resolved_options(&self) -> Option<ResolvedOptions> {
        match &*self.state.lock() {
            VertexState::Wired(wiring) => Some(wiring.options),
            VertexState::Pending(_) => None,
        }
    }

    /// The edge the vertex was first wired with.
    pub fn input_edge(&self) -> Option<Edge> {
        match &*self.state.lock() {
            VertexState::Wired(wiring) => Some(wiring.input.clone()),
            VertexState::Pending(_) => None,
        }
    }

    /// Number of upstream edges feeding this vertex's inbox.
    pub fn upstream_count(&self) -> usize {
        match &*self.state.lock() {
            VertexState::Wired(wiring) => wiring.upstreams,
            VertexState::Pending(_) => 0,
        }
    }

    /// Wire this vertex to `input`, then its downstream vertices.
    ///
    /// A vertex belongs to the graph of the builder that first wired it; any
    /// other builder gets [`GraphError::WiredElsewhere`].
    pub fn cascade(self: &Arc<Self>, builder: &mut Builder, input: &Edge) -> Result<(), GraphError> {
        let mut state = self.state.lock();

        if let VertexState::Wired(wiring) = &mut *state {
            if wiring.graph_id != builder.id() {
                return Err(GraphError::WiredElsewhere {
                    vertex_id: self.info.id.clone(),
                });
            }
            if self.info.vertex_type == vertex_type::STREAM {
                return Err(GraphError::SourceAlreadyWired {
                    vertex_id: self.info.id.clone(),
                });
            }
            input.attach(wiring.inbox.clone());
            wiring.upstreams += 1;
            EdgeMerged {
                vertex_id: &self.info.id,
                vertex_type: &self.info.vertex_type,
            }
            .log();
            return Ok(());
        }

        tokio::runtime::Handle::try_current().map_err(|_| GraphError::NoRuntime)?;
        builder.register(Arc::clone(self))?;

        let options = builder.defaults().merge(&self.local).resolve();
        let (inbox, receiver) = input.subscribe();
        let previous = std::mem::replace(
            &mut *state,
            VertexState::Wired(Wiring {
                graph_id: builder.id(),
                input: input.clone(),
                options,
                inbox,
                upstreams: 1,
            }),
        );
        drop(state);

        let VertexState::Pending(pending) = previous else {
            unreachable!("vertex state was checked under the same lock");
        };

        let handler = middleware::compose(
            Arc::clone(&self.info),
            &options,
            pending.handler,
            &builder.layer_context(),
        );

        VertexWired {
            vertex_id: &self.info.id,
            vertex_type: &self.info.vertex_type,
            options: &options,
        }
        .log();

        DispatchLoop::new(
            Arc::clone(&self.info),
            handler,
            receiver,
            self.output.clone(),
            options.serial_dispatch,
            builder.token().clone(),
            builder.tracker().clone(),
        )
        .spawn();

        (pending.connector)(builder)
    }
}

impl std::fmt::Debug for Vertex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vertex")
            .field("id", &self.info.id)
            .field("vertex_type", &self.info.vertex_type)
            .field("wired", &self.is_wired())
            .finish()
    }
}
