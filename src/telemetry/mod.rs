// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Instrumentation contracts for vertices.
//!
//! Vertices never look tracers or meters up from global state; the graph
//! builder hands each vertex the [`Tracer`] and [`Meter`] it should use.
//!
//! * [`log`] - bridges spans and metrics onto the `tracing` crate
//! * [`memory`] - keeps everything in memory for introspection and tests
//! * [`noop`] - discards everything

mod attribute;
pub mod log;
pub mod memory;
mod meter;
pub mod noop;
mod tracer;

pub use attribute::{AttributeValue, KeyValue};
pub use meter::{Counter, Meter, ValueRecorder};
pub use tracer::{Span, TraceHandle, Tracer};
