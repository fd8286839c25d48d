pub mod dispatch;
#[cfg(test)]
mod integration_tests;

pub use dispatch::DispatchLoop;
