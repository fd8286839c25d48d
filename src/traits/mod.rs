pub mod handler;

pub use handler::{batch_fn, BatchFn, FilterFn, Handler, PacketFn, PassThrough};
