// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors raised while wiring vertices into a running graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Two distinct vertices were registered under the same id.
    #[error("duplicate vertex id '{vertex_id}'")]
    DuplicateVertex { vertex_id: String },

    /// A stream source was reached a second time after it had been wired.
    #[error("stream vertex '{vertex_id}' is already wired to an input edge")]
    SourceAlreadyWired { vertex_id: String },

    /// The vertex is already running in a graph built by another builder.
    #[error("vertex '{vertex_id}' is already wired into a different graph")]
    WiredElsewhere { vertex_id: String },

    /// Dispatch loops need a tokio runtime to run on.
    #[error("graph must be built from within a tokio runtime")]
    NoRuntime,
}
