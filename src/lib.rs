// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;        // defaults + YAML loading
pub mod edge;          // multicast batch conduits
pub mod engine;        // per-vertex dispatch loops
pub mod errors;        // error handling
pub mod graph;         // vertices, builder, running graph
pub mod middleware;    // layers composed around handlers
pub mod observability;
pub mod packet;
pub mod telemetry;     // injected tracer and meter backends
pub mod traits;        // handler abstraction

#[cfg(test)]
mod test_support;

pub use config::{GraphConfig, Options, ResolvedOptions};
pub use edge::Edge;
pub use errors::{ConfigError, GraphError, PacketError, VertexError};
pub use graph::{Builder, Graph, Vertex};
pub use packet::{Batch, DebugInfo, Packet, Payload};
pub use traits::Handler;
