// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::KeyValue;

/// Factory for named metric instruments.
///
/// Instruments are created once per vertex at wiring time and then shared by
/// every concurrent invocation of that vertex, so implementations must accept
/// concurrent updates.
pub trait Meter: Send + Sync {
    fn counter(&self, name: &str) -> Arc<dyn Counter>;

    fn value_recorder(&self, name: &str) -> Arc<dyn ValueRecorder>;
}

/// Monotonic running total.
pub trait Counter: Send + Sync {
    fn add(&self, value: f64, labels: &[KeyValue]);
}

/// Point samples.
pub trait ValueRecorder: Send + Sync {
    fn record(&self, value: i64, labels: &[KeyValue]);
}
