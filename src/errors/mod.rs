// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod graph;
mod packet;
mod vertex;

pub use config::ConfigError;
pub use graph::GraphError;
pub use packet::PacketError;
pub use vertex::VertexError;
