// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-vertex dispatch loop.
//!
//! Each wired vertex owns exactly one loop. The loop waits on two things: the
//! graph's cancellation token and the vertex inbox. Cancellation wins when both
//! are ready, and stops further consumption without interrupting a batch that
//! is already being handled.
//!
//! # Dispatch modes
//!
//! * **Serial**: the decorated handler is awaited inside the loop, so batches
//!   are handled one at a time in arrival order and a slow handler holds back
//!   the inbox.
//! * **Concurrent**: every batch gets its own task on the graph's
//!   [`TaskTracker`]; batches may overlap and finish in any order.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::edge::{Edge, InboxReceiver};
use crate::middleware::VertexInfo;
use crate::observability::messages::vertex::{BatchDispatched, DispatchLoopStopped};
use crate::observability::messages::StructuredLog;
use crate::packet::Batch;
use crate::traits::Handler;

pub struct DispatchLoop {
    info: Arc<VertexInfo>,
    handler: Arc<dyn Handler>,
    inbox: InboxReceiver,
    output: Option<Edge>,
    serial: bool,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl DispatchLoop {
    pub fn new(
        info: Arc<VertexInfo>,
        handler: Arc<dyn Handler>,
        inbox: InboxReceiver,
        output: Option<Edge>,
        serial: bool,
        token: CancellationToken,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            info,
            handler,
            inbox,
            output,
            serial,
            token,
            tracker,
        }
    }

    /// Start the loop on the tracker. Must be called inside a tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        let tracker = self.tracker.clone();
        tracker.spawn(self.run())
    }

    fn batch_span(&self, batch: &Batch) -> tracing::Span {
        let msg = BatchDispatched {
            vertex_id: &self.info.id,
            vertex_type: &self.info.vertex_type,
            packet_count: batch.len(),
        };
        let span = msg.span("dispatch");
        span.in_scope(|| msg.log());
        span
    }

    async fn run(mut self) {
        let reason = loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break "graph context cancelled",
                next = self.inbox.recv() => match next {
                    None => break "inbox closed",
                    Some(batch) if batch.is_empty() => continue,
                    Some(batch) => {
                        let span = self.batch_span(&batch);
                        if self.serial {
                            dispatch(&self.handler, batch, self.output.as_ref())
                                .instrument(span)
                                .await;
                        } else {
                            let handler = Arc::clone(&self.handler);
                            let output = self.output.clone();
                            self.tracker.spawn(
                                async move {
                                    dispatch(&handler, batch, output.as_ref()).await;
                                }
                                .instrument(span),
                            );
                        }
                    }
                },
            }
        };

        DispatchLoopStopped {
            vertex_id: &self.info.id,
            reason,
        }
        .log();
    }
}

/// Run one batch through the decorated handler and forward what it returns.
///
/// Faults were already contained and logged by the recover layer; a faulted
/// batch is simply not forwarded.
async fn dispatch(handler: &Arc<dyn Handler>, batch: Batch, output: Option<&Edge>) {
    let Ok(out) = handler.handle(batch).await else {
        return;
    };
    if let Some(edge) = output {
        if !out.is_empty() {
            edge.send(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Packet, Payload};
    use crate::traits::batch_fn;
    use parking_lot::Mutex;
    use std::time::Duration;

    fn spawn_loop(handler: Arc<dyn Handler>, serial: bool) -> (Edge, Edge, CancellationToken, JoinHandle<()>) {
        let input = Edge::new();
        let output = Edge::new();
        let (_tx, rx) = input.subscribe();
        let token = CancellationToken::new();
        let handle = DispatchLoop::new(
            Arc::new(VertexInfo::new("v", "map")),
            handler,
            rx,
            Some(output.clone()),
            serial,
            token.clone(),
            TaskTracker::new(),
        )
        .spawn();
        (input, output, token, handle)
    }

    #[tokio::test]
    async fn test_empty_batches_are_not_dispatched() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let (input, output, token, handle) =
            spawn_loop(batch_fn(move |_| *counter.lock() += 1), true);
        let (_tx, mut out_rx) = output.subscribe();

        input.send(Vec::new());
        input.send(vec![Packet::new(Payload::new())]);

        let forwarded = tokio::time::timeout(Duration::from_secs(1), out_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(*calls.lock(), 1);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_each_batch_runs_inside_a_dispatch_span() {
        let (logs, _guard) = crate::test_support::capture_logs();
        let (input, output, token, handle) = spawn_loop(batch_fn(|_| {}), true);
        let (_tx, mut out_rx) = output.subscribe();

        input.send(vec![Packet::new(Payload::new())]);
        input.send(vec![Packet::new(Payload::new()), Packet::new(Payload::new())]);
        for _ in 0..2 {
            tokio::time::timeout(Duration::from_secs(1), out_rx.recv())
                .await
                .unwrap()
                .unwrap();
        }
        token.cancel();
        handle.await.unwrap();

        assert_eq!(logs.spans_named("batch_dispatch").len(), 2);
        let dispatched: Vec<_> = logs
            .events()
            .into_iter()
            .filter(|e| e.message().contains("dispatching batch"))
            .collect();
        assert_eq!(dispatched.len(), 2);
        assert_eq!(dispatched[1].fields.get("packet_count").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn test_cancellation_stops_loop() {
        let (input, _output, token, handle) = spawn_loop(batch_fn(|_| {}), false);
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(input.subscriber_count(), 0);
    }
}
