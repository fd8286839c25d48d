// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Cross-cutting layers composed around every vertex handler.
//!
//! [`compose`] installs the six layers in a fixed order. Install order is
//! innermost first, so at runtime a batch passes through them in reverse:
//!
//! ```text
//! recover -> debug -> isolation copy -> trace -> metrics -> record -> handler
//! ```
//!
//! Recovery is outermost so that a fault in any layer or in the handler is
//! contained. Trace and metrics sit inside the isolation copy and observe the
//! packets the handler actually works on; the audit recorder fires last before
//! the handler.

mod chain;
pub mod debug;
pub mod isolation;
pub mod metrics;
pub mod record;
pub mod recover;
pub mod trace;

use std::sync::Arc;

pub use chain::{HandlerChain, Layer};
pub use record::Recorder;

use crate::config::ResolvedOptions;
use crate::graph::vertex_type;
use crate::telemetry::{KeyValue, Meter, Tracer};
use crate::traits::Handler;

/// Identity of the vertex a layer is installed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInfo {
    pub id: String,
    pub vertex_type: String,
}

impl VertexInfo {
    pub fn new(id: impl Into<String>, vertex_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vertex_type: vertex_type.into(),
        }
    }

    /// Whether packets end their journey (and their spans) at this vertex.
    pub fn is_terminus(&self) -> bool {
        self.vertex_type == vertex_type::TRANSMIT
    }

    pub fn labels(&self) -> Vec<KeyValue> {
        vec![
            KeyValue::string("vertex_id", self.id.clone()),
            KeyValue::string("vertex_type", self.vertex_type.clone()),
        ]
    }
}

/// Shared collaborators handed to layers at wiring time.
#[derive(Clone)]
pub struct LayerContext {
    pub recorder: Option<Recorder>,
    pub tracer: Arc<dyn Tracer>,
    pub meter: Arc<dyn Meter>,
}

/// Wrap `core` in the full layer stack for one vertex.
pub fn compose(
    info: Arc<VertexInfo>,
    options: &ResolvedOptions,
    core: Arc<dyn Handler>,
    ctx: &LayerContext,
) -> Arc<dyn Handler> {
    HandlerChain::new(core)
        .layer(record::RecordLayer::new(Arc::clone(&info), ctx.recorder.clone()))
        .layer(metrics::MetricsLayer::new(
            Arc::clone(&info),
            options.metrics,
            Arc::clone(&ctx.meter),
        ))
        .layer(trace::TraceLayer::new(
            Arc::clone(&info),
            options.trace,
            Arc::clone(&ctx.tracer),
        ))
        .layer(isolation::IsolationLayer::new(options.isolation_copy))
        .layer(debug::DebugLayer::new(Arc::clone(&info), options.debug))
        .layer(recover::RecoverLayer::new(info))
        .build()
}
