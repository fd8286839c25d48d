// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use super::{Layer, VertexInfo};
use crate::errors::VertexError;
use crate::packet::{Batch, Packet};
use crate::traits::Handler;

/// Audit hook: `(vertex id, vertex type, operation, batch)`.
pub type Recorder = Arc<dyn Fn(&str, &str, &str, &[Packet]) + Send + Sync>;

pub const RECORD_START: &str = "start";

/// Calls the audit recorder before the handler sees the batch.
pub struct RecordLayer {
    info: Arc<VertexInfo>,
    recorder: Option<Recorder>,
}

impl RecordLayer {
    pub fn new(info: Arc<VertexInfo>, recorder: Option<Recorder>) -> Self {
        Self { info, recorder }
    }
}

struct RecordHandler {
    info: Arc<VertexInfo>,
    recorder: Recorder,
    inner: Arc<dyn Handler>,
}

impl Layer for RecordLayer {
    fn wrap(self: Box<Self>, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        match self.recorder {
            Some(recorder) => Arc::new(RecordHandler {
                info: self.info,
                recorder,
                inner,
            }),
            None => inner,
        }
    }
}

#[async_trait]
impl Handler for RecordHandler {
    async fn handle(&self, batch: Batch) -> Result<Batch, VertexError> {
        (self.recorder)(&self.info.id, &self.info.vertex_type, RECORD_START, &batch);
        self.inner.handle(batch).await
    }
}
