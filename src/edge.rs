// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Edges: multicast conduits carrying packet batches between vertices.
//!
//! An edge keeps one sender per subscribed inbox. Sending a batch clones the
//! batch (the packet handles, not the packet bodies) into every inbox, so all
//! consumers of one edge see the same packets. Inboxes are unbounded: a send
//! never waits on a slow consumer.
//!
//! Fan-in works the other way round: a vertex that is reachable from several
//! upstream edges attaches its single inbox to each of them.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::packet::Batch;

pub type InboxSender = mpsc::UnboundedSender<Batch>;
pub type InboxReceiver = mpsc::UnboundedReceiver<Batch>;

#[derive(Default)]
struct EdgeInner {
    subscribers: Mutex<Vec<InboxSender>>,
}

#[derive(Clone, Default)]
pub struct Edge {
    inner: Arc<EdgeInner>,
}

impl Edge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new inbox that receives every batch sent from now on.
    pub fn subscribe(&self) -> (InboxSender, InboxReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.attach(tx.clone());
        (tx, rx)
    }

    /// Add an existing inbox as a subscriber of this edge.
    pub fn attach(&self, inbox: InboxSender) {
        self.inner.subscribers.lock().push(inbox);
    }

    /// Deliver `batch` to every live subscriber and return how many received it.
    ///
    /// Subscribers whose inbox has been dropped are pruned.
    pub fn send(&self, batch: Batch) -> usize {
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());

        let Some((last, rest)) = subscribers.split_last() else {
            return 0;
        };
        let mut delivered = 0;
        for tx in rest {
            if tx.send(batch.clone()).is_ok() {
                delivered += 1;
            }
        }
        if last.send(batch).is_ok() {
            delivered += 1;
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// Whether both values are handles to the same edge.
    pub fn same_edge(&self, other: &Edge) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Edge")
            .field("subscribers", &self.inner.subscribers.lock().len())
            .finish()
    }
}
