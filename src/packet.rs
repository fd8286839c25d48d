// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Packets: the unit of data moving through a graph.
//!
//! A [`Packet`] is a shared handle. Cloning it (as an edge does when it
//! multicasts a batch to several vertices) shares the same body, so one
//! consumer's mutation is visible to every other holder. Vertices that must not
//! observe each other's writes enable isolation copying, which gives the
//! handler structurally independent packets built by [`Packet::deep_copy`].

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use crate::errors::{PacketError, VertexError};
use crate::telemetry::TraceHandle;

/// Business data carried by a packet.
pub type Payload = serde_json::Map<String, Value>;

/// An ordered group of packets handled by one invocation.
pub type Batch = Vec<Packet>;

/// One debug record appended by a vertex running in debug mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub vertex_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub snapshot: Payload,
}

/// Serializable part of a packet. The trace handle is deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct PacketBody {
    data: Payload,
    #[serde(default)]
    error: Option<PacketError>,
    #[serde(default)]
    snapshots: Vec<DebugInfo>,
}

/// Wire form used by [`Packet::deep_copy`].
#[derive(Serialize, Deserialize)]
struct PacketRecord {
    id: String,
    #[serde(flatten)]
    body: PacketBody,
}

struct PacketInner {
    id: String,
    body: RwLock<PacketBody>,
    trace: OnceLock<TraceHandle>,
}

#[derive(Clone)]
pub struct Packet {
    inner: Arc<PacketInner>,
}

impl Packet {
    /// Create a packet with a fresh UUID.
    pub fn new(data: Payload) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), data)
    }

    pub fn with_id(id: impl Into<String>, data: Payload) -> Self {
        Self::from_parts(
            id.into(),
            PacketBody {
                data,
                ..Default::default()
            },
            None,
        )
    }

    fn from_parts(id: String, body: PacketBody, trace: Option<TraceHandle>) -> Self {
        let cell = OnceLock::new();
        if let Some(handle) = trace {
            let _ = cell.set(handle);
        }
        Self {
            inner: Arc::new(PacketInner {
                id,
                body: RwLock::new(body),
                trace: cell,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Copy of the current payload.
    pub fn data(&self) -> Payload {
        self.inner.body.read().data.clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.body.read().data.get(key).cloned()
    }

    /// Set one payload field, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.body.write().data.insert(key.into(), value.into())
    }

    /// Run `f` with mutable access to the payload.
    ///
    /// The body lock is held while `f` runs and is not reentrant: `f` must work
    /// through its argument and not call other methods on this packet, or the
    /// calling task deadlocks.
    pub fn update<R>(&self, f: impl FnOnce(&mut Payload) -> R) -> R {
        f(&mut self.inner.body.write().data)
    }

    pub fn replace_data(&self, data: Payload) {
        self.inner.body.write().data = data;
    }

    pub fn error(&self) -> Option<PacketError> {
        self.inner.body.read().error.clone()
    }

    pub fn has_error(&self) -> bool {
        self.inner.body.read().error.is_some()
    }

    pub fn set_error(&self, error: PacketError) {
        self.inner.body.write().error = Some(error);
    }

    pub fn clear_error(&self) {
        self.inner.body.write().error = None;
    }

    pub fn snapshots(&self) -> Vec<DebugInfo> {
        self.inner.body.read().snapshots.clone()
    }

    pub fn push_snapshot(&self, info: DebugInfo) {
        self.inner.body.write().snapshots.push(info);
    }

    pub fn trace_handle(&self) -> Option<TraceHandle> {
        self.inner.trace.get().cloned()
    }

    /// Return the packet's span, creating it with `start` on first touch.
    pub fn trace_or_start(&self, start: impl FnOnce() -> TraceHandle) -> TraceHandle {
        self.inner.trace.get_or_init(start).clone()
    }

    /// Whether both values are handles to the same packet body.
    pub fn same_packet(&self, other: &Packet) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Serialize and deserialize the payload, yielding a value-only copy.
    pub fn snapshot_data(&self) -> Result<Payload, VertexError> {
        let value = serde_json::to_value(&self.inner.body.read().data)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Build a structurally independent packet through a full serde round-trip.
    ///
    /// Id, payload, error and snapshots are carried by the round-trip; the trace
    /// handle is not serializable and is re-attached from `self`.
    pub fn deep_copy(&self) -> Result<Packet, VertexError> {
        let value = {
            let body = self.inner.body.read();
            serde_json::to_value(PacketRecord {
                id: self.inner.id.clone(),
                body: body.clone(),
            })?
        };
        let record: PacketRecord = serde_json::from_value(value)?;
        Ok(Packet::from_parts(record.id, record.body, self.trace_handle()))
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.inner.body.read();
        f.debug_struct("Packet")
            .field("id", &self.inner.id)
            .field("data", &body.data)
            .field("error", &body.error)
            .field("snapshots", &body.snapshots.len())
            .field("traced", &self.inner.trace.get().is_some())
            .finish()
    }
}

/// Every packet of `first`, then the packets of `second` not already in it.
///
/// Identity is by handle ([`Packet::same_packet`]), not by id.
pub fn distinct_packets(first: &[Packet], second: &[Packet]) -> Vec<Packet> {
    let mut all = first.to_vec();
    for packet in second {
        if !first.iter().any(|p| p.same_packet(packet)) {
            all.push(packet.clone());
        }
    }
    all
}

/// Ids of every packet in a batch, in batch order.
pub fn packet_ids(batch: &[Packet]) -> Vec<String> {
    batch.iter().map(|p| p.id().to_string()).collect()
}
