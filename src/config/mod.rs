// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod consts;
mod loader;
mod options;

pub use loader::{load_config, parse_config, GraphConfig};
pub use options::{Options, ResolvedOptions};
