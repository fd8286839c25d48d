// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use super::Layer;
use crate::errors::VertexError;
use crate::packet::{Batch, Packet};
use crate::traits::Handler;

/// Hands the inner chain deep copies instead of the shared packets.
///
/// Consumers of a fan-out edge all receive handles to the same packets; with
/// this layer a vertex works on its own copies, which are also what it
/// forwards. A packet that fails to round-trip faults the batch.
pub struct IsolationLayer {
    enabled: bool,
}

impl IsolationLayer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

struct IsolationHandler {
    inner: Arc<dyn Handler>,
}

impl Layer for IsolationLayer {
    fn wrap(self: Box<Self>, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        if self.enabled {
            Arc::new(IsolationHandler { inner })
        } else {
            inner
        }
    }
}

#[async_trait]
impl Handler for IsolationHandler {
    async fn handle(&self, batch: Batch) -> Result<Batch, VertexError> {
        let copies = batch
            .iter()
            .map(Packet::deep_copy)
            .collect::<Result<Batch, _>>()?;
        self.inner.handle(copies).await
    }
}
