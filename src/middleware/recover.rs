// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::{Layer, VertexInfo};
use crate::errors::VertexError;
use crate::observability::messages::vertex::PanicRecovered;
use crate::observability::messages::StructuredLog;
use crate::packet::{packet_ids, Batch};
use crate::traits::Handler;

/// Outermost guard: contains any panic or fault raised by the chain.
///
/// A contained fault is logged once with every packet id of the batch and
/// returned as an error, so the dispatcher forwards nothing for it.
pub struct RecoverLayer {
    info: Arc<VertexInfo>,
}

impl RecoverLayer {
    pub fn new(info: Arc<VertexInfo>) -> Self {
        Self { info }
    }
}

struct RecoverHandler {
    info: Arc<VertexInfo>,
    inner: Arc<dyn Handler>,
}

impl Layer for RecoverLayer {
    fn wrap(self: Box<Self>, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(RecoverHandler {
            info: self.info,
            inner,
        })
    }
}

#[async_trait]
impl Handler for RecoverHandler {
    async fn handle(&self, batch: Batch) -> Result<Batch, VertexError> {
        let held = batch.clone();
        let outcome = AssertUnwindSafe(self.inner.handle(batch))
            .catch_unwind()
            .await;

        let error = match outcome {
            Ok(Ok(out)) => return Ok(out),
            Ok(Err(err)) => err,
            Err(payload) => VertexError::from_panic(payload),
        };

        let ids = packet_ids(&held);
        PanicRecovered {
            vertex_id: &self.info.id,
            vertex_type: &self.info.vertex_type,
            error: &error,
            packet_ids: &ids,
        }
        .log();

        Err(error)
    }
}
