// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging.
//!
//! Every diagnostic line the runtime writes is a message type from
//! [`messages`]. Each one implements `Display` for the human-readable text and
//! [`messages::StructuredLog`] to emit it through `tracing` with its fields
//! attached, so nothing in the engine formats log strings inline.
//!
//! # Usage
//!
//! ```rust
//! use vertexflow::observability::messages::vertex::PanicRecovered;
//! use vertexflow::observability::messages::StructuredLog;
//!
//! let ids = vec!["p-1".to_string()];
//! let error = std::io::Error::new(std::io::ErrorKind::Other, "boom");
//! PanicRecovered {
//!     vertex_id: "parse",
//!     vertex_type: "map",
//!     error: &error,
//!     packet_ids: &ids,
//! }
//! .log();
//! ```

pub mod messages;
