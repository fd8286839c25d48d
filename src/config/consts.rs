//! Built-in values for options no configuration layer has set.

/// Trace spans are emitted unless switched off.
pub const DEFAULT_TRACE: bool = true;
/// Per-vertex metrics are recorded unless switched off.
pub const DEFAULT_METRICS: bool = true;
pub const DEFAULT_DEBUG: bool = false;
pub const DEFAULT_ISOLATION_COPY: bool = false;
/// Batches are dispatched concurrently unless serial dispatch is requested.
pub const DEFAULT_SERIAL_DISPATCH: bool = false;
