// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod builder;
pub mod vertex;

pub use builder::{Builder, Graph};
pub use vertex::{Connector, Vertex};

/// Type tags of the built-in vertex kinds. Custom vertices may use any string.
pub mod vertex_type {
    pub const STREAM: &str = "stream";
    pub const MAP: &str = "map";
    pub const FILTER: &str = "filter";
    /// Graph terminus; packet spans end here.
    pub const TRANSMIT: &str = "transmit";
}
