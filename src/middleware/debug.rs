// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::{Layer, VertexInfo};
use crate::errors::VertexError;
use crate::packet::{Batch, DebugInfo};
use crate::traits::Handler;

/// Appends a timed payload snapshot to every packet the vertex emits.
///
/// Snapshots are taken from the batch the inner chain returns, which under
/// isolation copying is the copied batch that travels downstream.
pub struct DebugLayer {
    info: Arc<VertexInfo>,
    enabled: bool,
}

impl DebugLayer {
    pub fn new(info: Arc<VertexInfo>, enabled: bool) -> Self {
        Self { info, enabled }
    }
}

struct DebugHandler {
    info: Arc<VertexInfo>,
    inner: Arc<dyn Handler>,
}

impl Layer for DebugLayer {
    fn wrap(self: Box<Self>, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        if !self.enabled {
            return inner;
        }
        Arc::new(DebugHandler {
            info: self.info,
            inner,
        })
    }
}

#[async_trait]
impl Handler for DebugHandler {
    async fn handle(&self, batch: Batch) -> Result<Batch, VertexError> {
        let start = Utc::now();
        let out = self.inner.handle(batch).await?;
        let end = Utc::now();

        let snapshots = out
            .iter()
            .map(|p| p.snapshot_data())
            .collect::<Result<Vec<_>, _>>()?;

        for (packet, snapshot) in out.iter().zip(snapshots) {
            packet.push_snapshot(DebugInfo {
                vertex_id: self.info.id.clone(),
                start,
                end,
                snapshot,
            });
        }

        Ok(out)
    }
}
