// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Faults raised while a vertex processes a batch.

use std::any::Any;
use thiserror::Error;

/// A fault raised anywhere inside a vertex's decorated handler.
///
/// Faults are contained at the vertex boundary by the recover layer: the
/// in-flight batch is dropped, a diagnostic is logged, and the dispatch loop
/// keeps consuming subsequent batches.
#[derive(Error, Debug)]
pub enum VertexError {
    /// The handler or one of its layers panicked.
    #[error("panic: {0}")]
    Panic(String),

    /// A packet could not be serialized or deserialized during an isolation
    /// copy or a debug snapshot.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A handler rejected the batch as a whole.
    #[error("handler failed: {0}")]
    Handler(String),
}

impl VertexError {
    /// Convert a panic payload captured by `catch_unwind` into a fault.
    ///
    /// A payload that already is a `VertexError` is passed through; `&str` and
    /// `String` payloads keep their message.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<VertexError>() {
            Ok(err) => return *err,
            Err(other) => other,
        };
        if let Some(msg) = payload.downcast_ref::<&'static str>() {
            return VertexError::Panic((*msg).to_string());
        }
        match payload.downcast::<String>() {
            Ok(msg) => VertexError::Panic(*msg),
            Err(_) => VertexError::Panic("unknown panic payload".to_string()),
        }
    }
}
