// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

use crate::config::{GraphConfig, Options};
use crate::errors::{GraphError, VertexError};
use crate::graph::{Builder, Vertex};
use crate::packet::{Batch, Packet};
use crate::telemetry::memory::{InMemoryMeter, InMemoryTracer};
use crate::telemetry::noop::{NoopMeter, NoopTracer};
use crate::test_support::{batch_of, capture_logs, payload};
use crate::traits::{batch_fn, Handler};

/// Integration tests for dispatch loops running inside built graphs
#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_builder(defaults: Options) -> Builder {
        Builder::new(&GraphConfig { defaults })
            .with_tracer(Arc::new(NoopTracer))
            .with_meter(Arc::new(NoopMeter))
    }

    fn collector() -> (
        impl Fn(&[Packet]) + Send + Sync + 'static,
        mpsc::UnboundedReceiver<Batch>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = move |batch: &[Packet]| {
            let _ = tx.send(batch.to_vec());
        };
        (sink, rx)
    }

    async fn next_batch(rx: &mut mpsc::UnboundedReceiver<Batch>) -> Batch {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for a batch")
            .expect("collector closed")
    }

    fn serial() -> Options {
        Options::new().with_serial_dispatch(true)
    }

    /// Records arrival order and the peak number of overlapping invocations.
    #[derive(Default)]
    struct OverlapTracker {
        active: AtomicUsize,
        peak: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    struct Tracked(Arc<OverlapTracker>);

    #[async_trait]
    impl Handler for Tracked {
        async fn handle(&self, batch: Batch) -> Result<Batch, VertexError> {
            let now = self.0.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.0.peak.fetch_max(now, Ordering::SeqCst);
            self.0.seen.lock().push(batch[0].id().to_string());
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.0.active.fetch_sub(1, Ordering::SeqCst);
            Ok(batch)
        }
    }

    #[tokio::test]
    async fn test_serial_dispatch_preserves_order_without_overlap() {
        let overlap = Arc::new(OverlapTracker::default());
        let (sink, mut rx) = collector();
        let sink = Vertex::transmit("sink", serial(), sink);
        let slow = Vertex::process(
            "slow",
            "tracked",
            serial(),
            Arc::new(Tracked(Arc::clone(&overlap))),
            vec![sink],
        );
        let graph = quiet_builder(Options::new()).build(slow).unwrap();

        for i in 0..5 {
            graph.inject(batch_of(&format!("b{}", i), 1));
        }
        let mut forwarded = Vec::new();
        for _ in 0..5 {
            forwarded.push(next_batch(&mut rx).await[0].id().to_string());
        }

        let expected = vec!["b0-0", "b1-0", "b2-0", "b3-0", "b4-0"];
        assert_eq!(*overlap.seen.lock(), expected);
        assert_eq!(forwarded, expected);
        assert_eq!(overlap.peak.load(Ordering::SeqCst), 1);
        graph.shutdown().await;
    }

    struct Rendezvous(Arc<tokio::sync::Barrier>);

    #[async_trait]
    impl Handler for Rendezvous {
        async fn handle(&self, batch: Batch) -> Result<Batch, VertexError> {
            self.0.wait().await;
            Ok(batch)
        }
    }

    #[tokio::test]
    async fn test_concurrent_dispatch_overlaps_batches() {
        // Each batch blocks until the other arrives, so only overlapping
        // dispatch lets both through.
        let barrier = Arc::new(tokio::sync::Barrier::new(2));
        let (sink, mut rx) = collector();
        let sink = Vertex::transmit("sink", Options::new(), sink);
        let meet = Vertex::process(
            "meet",
            "rendezvous",
            Options::new().with_serial_dispatch(false),
            Arc::new(Rendezvous(barrier)),
            vec![sink],
        );
        let graph = quiet_builder(Options::new()).build(meet).unwrap();

        graph.inject(batch_of("a", 1));
        graph.inject(batch_of("b", 1));

        let mut ids = vec![
            next_batch(&mut rx).await[0].id().to_string(),
            next_batch(&mut rx).await[0].id().to_string(),
        ];
        ids.sort();
        assert_eq!(ids, vec!["a-0", "b-0"]);
        graph.shutdown().await;
    }

    #[tokio::test]
    async fn test_two_vertex_graph_sets_field_on_every_packet() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&invocations);
        let (collect, mut rx) = collector();
        let b = Vertex::transmit("b", serial(), move |batch: &[Packet]| {
            counted.fetch_add(1, Ordering::SeqCst);
            collect(batch);
        });
        let a = Vertex::map(
            "a",
            serial(),
            |p| {
                p.set("x", 1);
                Ok(())
            },
            vec![b],
        );
        let graph = quiet_builder(Options::new()).build(a).unwrap();

        graph.inject(batch_of("p", 3));
        let received = next_batch(&mut rx).await;
        graph.shutdown().await;

        assert_eq!(received.len(), 3);
        assert!(received.iter().all(|p| p.get("x") == Some(json!(1))));
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_batch_is_dropped_and_loop_survives() {
        let (logs, _guard) = capture_logs();
        let (sink, mut rx) = collector();
        let sink = Vertex::transmit("sink", Options::new(), sink);
        let validate = Vertex::map(
            "validate",
            serial(),
            |p| {
                if p.get("bad") == Some(json!(true)) {
                    panic!("bad packet {}", p.id());
                }
                Ok(())
            },
            vec![sink],
        );
        let graph = quiet_builder(Options::new()).build(validate).unwrap();

        let poisoned = batch_of("p", 4);
        poisoned[2].replace_data(payload(json!({"bad": true})));
        graph.inject(poisoned);
        graph.inject(batch_of("ok", 2));

        let survivor = next_batch(&mut rx).await;
        graph.shutdown().await;

        assert_eq!(survivor.len(), 2);
        assert_eq!(survivor[0].id(), "ok-0");
        assert!(rx.try_recv().is_err());

        let errors = logs.errors();
        assert_eq!(errors.len(), 1);
        let message = errors[0].message();
        assert!(message.contains("id: validate"));
        for id in ["p-0", "p-1", "p-2", "p-3"] {
            assert!(message.contains(id), "missing {} in {}", id, message);
        }
    }

    #[tokio::test]
    async fn test_isolation_copy_under_fan_out() {
        let tracer = InMemoryTracer::new();
        let (left_sink, mut left_rx) = collector();
        let (right_sink, mut right_rx) = collector();
        let isolated = Options::new().with_isolation_copy(true).with_serial_dispatch(true);

        let left = Vertex::map(
            "left",
            isolated,
            |p| {
                p.set("x", "left");
                Ok(())
            },
            vec![Vertex::transmit("left-sink", Options::new(), left_sink)],
        );
        let right = Vertex::map(
            "right",
            isolated,
            |p| {
                p.set("x", "right");
                Ok(())
            },
            vec![Vertex::transmit("right-sink", Options::new(), right_sink)],
        );
        let source = Vertex::stream("source", Options::new(), vec![left, right]);
        let graph = Builder::new(&GraphConfig::default())
            .with_tracer(Arc::new(tracer.clone()))
            .with_meter(Arc::new(NoopMeter))
            .build(source)
            .unwrap();

        let originals = batch_of("p", 3);
        for packet in &originals {
            packet.set("x", "original");
        }
        graph.inject(originals.clone());

        let from_left = next_batch(&mut left_rx).await;
        let from_right = next_batch(&mut right_rx).await;
        graph.shutdown().await;

        for (i, original) in originals.iter().enumerate() {
            assert_eq!(original.get("x"), Some(json!("original")));
            assert_eq!(from_left[i].get("x"), Some(json!("left")));
            assert_eq!(from_right[i].get("x"), Some(json!("right")));

            let span = original.trace_handle().unwrap();
            assert!(from_left[i].trace_handle().unwrap().same_span(&span));
            assert!(from_right[i].trace_handle().unwrap().same_span(&span));
        }
        assert_eq!(tracer.span_count(), 3);
        assert!(tracer.spans().iter().all(|s| s.end_count == 1));
    }

    async fn snapshot_trail(debug: bool) -> Vec<Vec<String>> {
        let (sink, mut rx) = collector();
        let sink = Vertex::transmit("sink", Options::new(), sink);
        let b = Vertex::map("b", Options::new(), |_| Ok(()), vec![sink]);
        let a = Vertex::map("a", Options::new(), |_| Ok(()), vec![b]);
        let source = Vertex::stream("source", Options::new(), vec![a]);
        let graph = quiet_builder(serial().with_debug(debug))
            .build(source)
            .unwrap();

        let packets = batch_of("p", 2);
        graph.inject(packets.clone());
        next_batch(&mut rx).await;
        graph.shutdown().await;

        packets
            .iter()
            .map(|p| p.snapshots().into_iter().map(|s| s.vertex_id).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_debug_records_one_snapshot_per_traversed_vertex() {
        let trail = snapshot_trail(true).await;
        for vertices in trail {
            assert_eq!(vertices, vec!["source", "a", "b", "sink"]);
        }
    }

    #[tokio::test]
    async fn test_debug_off_records_nothing() {
        let trail = snapshot_trail(false).await;
        assert!(trail.iter().all(|vertices| vertices.is_empty()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_batches_do_not_lose_shared_updates() {
        let total = Arc::new(Mutex::new(0u64));
        let shared = Arc::clone(&total);
        let (sink, mut rx) = collector();
        let sink = Vertex::transmit("sink", Options::new(), sink);
        let count = Vertex::process(
            "count",
            "counter",
            Options::new()
                .with_serial_dispatch(false)
                .with_isolation_copy(false),
            batch_fn(move |batch| *shared.lock() += batch.len() as u64),
            vec![sink],
        );
        let graph = quiet_builder(Options::new()).build(count).unwrap();

        for i in 0..50 {
            graph.inject(batch_of(&format!("b{}", i), 2));
        }
        for _ in 0..50 {
            next_batch(&mut rx).await;
        }
        graph.shutdown().await;

        assert_eq!(*total.lock(), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_batches_share_metric_instruments() {
        let meter = InMemoryMeter::new();
        let (sink, mut rx) = collector();
        let sink = Vertex::transmit("sink", Options::new().with_metrics(false), sink);
        let count = Vertex::process(
            "count",
            "counter",
            Options::new()
                .with_serial_dispatch(false)
                .with_metrics(true),
            batch_fn(|_| std::thread::yield_now()),
            vec![sink],
        );
        let graph = Builder::new(&GraphConfig::default())
            .with_tracer(Arc::new(NoopTracer))
            .with_meter(Arc::new(meter.clone()))
            .build(count)
            .unwrap();

        for i in 0..40 {
            graph.inject(batch_of(&format!("b{}", i), 3));
        }
        for _ in 0..40 {
            next_batch(&mut rx).await;
        }
        graph.shutdown().await;

        assert_eq!(meter.counter_total("counter.count.total.incoming"), Some(120.0));
        assert_eq!(meter.counter_total("counter.count.total.outgoing"), Some(120.0));
        assert_eq!(meter.samples("counter.count.incoming").len(), 40);
        assert_eq!(meter.samples("counter.count.duration").len(), 40);
        assert!(meter.samples("counter.count.incoming").iter().all(|n| *n == 3));
    }

    /// Signals when a batch arrives, then holds it until released.
    struct Gate {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Handler for Gate {
        async fn handle(&self, batch: Batch) -> Result<Batch, VertexError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(batch)
        }
    }

    #[tokio::test]
    async fn test_cancellation_lets_in_flight_handler_finish() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let finished = Arc::new(AtomicBool::new(false));

        let gated = Vertex::process(
            "gated",
            "gate",
            serial(),
            Arc::new(Gate {
                entered: Arc::clone(&entered),
                release: Arc::clone(&release),
                finished: Arc::clone(&finished),
            }),
            vec![],
        );
        let graph = quiet_builder(Options::new()).build(gated).unwrap();

        graph.inject(batch_of("held", 1));
        tokio::time::timeout(Duration::from_secs(2), entered.notified())
            .await
            .expect("handler never started");

        graph.token().cancel();
        assert!(!finished.load(Ordering::SeqCst));
        assert_eq!(graph.inject(batch_of("late", 1)), 0);

        let release_later = async {
            tokio::task::yield_now().await;
            release.notify_one();
        };
        tokio::time::timeout(
            Duration::from_secs(2),
            async { tokio::join!(graph.shutdown(), release_later) },
        )
        .await
        .expect("shutdown did not complete");

        assert!(finished.load(Ordering::SeqCst));
        assert!(!graph.is_running());
    }

    #[tokio::test]
    async fn test_fan_in_wires_one_chain_and_merges_inputs() {
        let (logs, _guard) = capture_logs();
        let starts = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&starts);

        let (sink, mut rx) = collector();
        let sink = Vertex::transmit("sink", Options::new(), sink);
        let left = Vertex::map("left", Options::new(), |_| Ok(()), vec![sink.clone()]);
        let right = Vertex::map("right", Options::new(), |_| Ok(()), vec![sink.clone()]);
        let source = Vertex::stream("source", Options::new(), vec![left, right]);

        let graph = quiet_builder(Options::new())
            .with_recorder(Arc::new(move |id: &str, _: &str, _: &str, batch: &[Packet]| {
                recorded.lock().push((id.to_string(), batch.len()));
            }))
            .build(source)
            .unwrap();

        assert_eq!(graph.len(), 4);
        assert_eq!(sink.upstream_count(), 2);

        graph.inject(batch_of("p", 2));
        next_batch(&mut rx).await;
        next_batch(&mut rx).await;
        graph.shutdown().await;

        let sink_starts = starts.lock().iter().filter(|(id, _)| id == "sink").count();
        assert_eq!(sink_starts, 2);

        let wired_sink = logs
            .events()
            .into_iter()
            .filter(|e| {
                e.fields.get("vertex_id").map(String::as_str) == Some("sink")
                    && e.message().contains("wired:")
            })
            .count();
        assert_eq!(wired_sink, 1);
    }

    #[tokio::test]
    async fn test_fan_out_delivers_each_batch_to_every_branch() {
        let (first, mut first_rx) = collector();
        let (second, mut second_rx) = collector();
        let source = Vertex::stream(
            "source",
            Options::new(),
            vec![
                Vertex::transmit("first", Options::new(), first),
                Vertex::transmit("second", Options::new(), second),
            ],
        );
        let graph = quiet_builder(Options::new()).build(source).unwrap();

        let packets = batch_of("p", 1);
        graph.inject(packets.clone());

        let a = next_batch(&mut first_rx).await;
        let b = next_batch(&mut second_rx).await;
        graph.shutdown().await;

        assert!(a[0].same_packet(&packets[0]));
        assert!(b[0].same_packet(&packets[0]));
    }

    #[tokio::test]
    async fn test_shutdown_stops_consumption() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let sink = Vertex::transmit("sink", Options::new(), move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        });
        let graph = quiet_builder(Options::new()).build(sink).unwrap();

        graph.shutdown().await;

        assert_eq!(graph.inject(batch_of("late", 1)), 0);
        assert_eq!(graph.input_edge().send(batch_of("later", 1)), 0);
        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stream_reached_twice_is_rejected() {
        let source = Vertex::stream("source", Options::new(), vec![]);
        let splitter = Vertex::map(
            "splitter",
            Options::new(),
            |_| Ok(()),
            vec![source.clone(), source],
        );

        let result = quiet_builder(Options::new()).build(splitter);

        assert_eq!(
            result.err(),
            Some(GraphError::SourceAlreadyWired {
                vertex_id: "source".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_duplicate_vertex_ids_are_rejected() {
        let first = Vertex::transmit("sink", Options::new(), |_| {});
        let second = Vertex::transmit("sink", Options::new(), |_| {});
        let source = Vertex::stream("source", Options::new(), vec![first, second]);

        let result = quiet_builder(Options::new()).build(source);

        assert_eq!(
            result.err(),
            Some(GraphError::DuplicateVertex {
                vertex_id: "sink".to_string()
            })
        );
    }
}
