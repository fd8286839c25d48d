// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::{PacketError, VertexError};
use crate::packet::{Batch, Packet};

/// A batch-processing stage.
///
/// Raw business handlers and every decorator layer share this signature: an
/// owned batch goes in, and the batch that should continue downstream comes
/// out. Handlers mutate packets through their handles; returning `Err` faults
/// the whole batch.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, batch: Batch) -> Result<Batch, VertexError>;
}

/// Adapts a closure that mutates a batch in place and forwards all of it.
pub struct BatchFn<F>(pub F);

#[async_trait]
impl<F> Handler for BatchFn<F>
where
    F: Fn(&[Packet]) + Send + Sync,
{
    async fn handle(&self, batch: Batch) -> Result<Batch, VertexError> {
        (self.0)(&batch);
        Ok(batch)
    }
}

/// Adapts a per-packet closure. A returned `PacketError` is recorded on the
/// packet, which still moves on.
pub struct PacketFn<F>(pub F);

#[async_trait]
impl<F> Handler for PacketFn<F>
where
    F: Fn(&Packet) -> Result<(), PacketError> + Send + Sync,
{
    async fn handle(&self, batch: Batch) -> Result<Batch, VertexError> {
        for packet in &batch {
            if let Err(err) = (self.0)(packet) {
                packet.set_error(err);
            }
        }
        Ok(batch)
    }
}

/// Adapts a predicate; only packets it accepts are forwarded.
pub struct FilterFn<F>(pub F);

#[async_trait]
impl<F> Handler for FilterFn<F>
where
    F: Fn(&Packet) -> bool + Send + Sync,
{
    async fn handle(&self, batch: Batch) -> Result<Batch, VertexError> {
        Ok(batch.into_iter().filter(|p| (self.0)(p)).collect())
    }
}

/// Forwards batches untouched.
pub struct PassThrough;

#[async_trait]
impl Handler for PassThrough {
    async fn handle(&self, batch: Batch) -> Result<Batch, VertexError> {
        Ok(batch)
    }
}

/// Shorthand for boxing a batch closure as a shared handler.
pub fn batch_fn<F>(f: F) -> Arc<dyn Handler>
where
    F: Fn(&[Packet]) + Send + Sync + 'static,
{
    Arc::new(BatchFn(f))
}
