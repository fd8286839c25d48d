// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::config::consts::{
    DEFAULT_DEBUG, DEFAULT_ISOLATION_COPY, DEFAULT_METRICS, DEFAULT_SERIAL_DISPATCH,
    DEFAULT_TRACE,
};

/// Per-vertex behaviour switches.
///
/// Every field is optional: an unset field falls through to the graph-wide
/// default when the vertex is wired, and to the built-in constant after that.
///
/// # Example
/// ```yaml
/// trace: true
/// metrics: false
/// serial_dispatch: true
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub trace: Option<bool>,
    pub metrics: Option<bool>,
    pub debug: Option<bool>,
    pub isolation_copy: Option<bool>,
    pub serial_dispatch: Option<bool>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace(mut self, on: bool) -> Self {
        self.trace = Some(on);
        self
    }

    pub fn with_metrics(mut self, on: bool) -> Self {
        self.metrics = Some(on);
        self
    }

    pub fn with_debug(mut self, on: bool) -> Self {
        self.debug = Some(on);
        self
    }

    pub fn with_isolation_copy(mut self, on: bool) -> Self {
        self.isolation_copy = Some(on);
        self
    }

    pub fn with_serial_dispatch(mut self, on: bool) -> Self {
        self.serial_dispatch = Some(on);
        self
    }

    /// Overlay `local` onto `self`: fields set in `local` win.
    pub fn merge(&self, local: &Options) -> Options {
        Options {
            trace: local.trace.or(self.trace),
            metrics: local.metrics.or(self.metrics),
            debug: local.debug.or(self.debug),
            isolation_copy: local.isolation_copy.or(self.isolation_copy),
            serial_dispatch: local.serial_dispatch.or(self.serial_dispatch),
        }
    }

    /// Fill every unset field with its built-in default.
    pub fn resolve(&self) -> ResolvedOptions {
        ResolvedOptions {
            trace: self.trace.unwrap_or(DEFAULT_TRACE),
            metrics: self.metrics.unwrap_or(DEFAULT_METRICS),
            debug: self.debug.unwrap_or(DEFAULT_DEBUG),
            isolation_copy: self.isolation_copy.unwrap_or(DEFAULT_ISOLATION_COPY),
            serial_dispatch: self.serial_dispatch.unwrap_or(DEFAULT_SERIAL_DISPATCH),
        }
    }
}

/// Options after merging, fixed for the lifetime of a wired vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub trace: bool,
    pub metrics: bool,
    pub debug: bool,
    pub isolation_copy: bool,
    pub serial_dispatch: bool,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Options::default().resolve()
    }
}
