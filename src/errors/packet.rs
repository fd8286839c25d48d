// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A per-packet processing error.
///
/// This is data, not control flow: a stage records it on the packet and the
/// packet keeps moving so later stages (and tracing/metrics) can inspect it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct PacketError {
    pub message: String,
}

impl PacketError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
