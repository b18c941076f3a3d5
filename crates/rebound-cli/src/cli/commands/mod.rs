//! CLI command handlers. Each command is in its own file.

mod backoff;
mod config;
mod send;

pub use backoff::{run_backoff, BackoffArgs};
pub use config::run_config;
pub use send::{run_send, SendArgs};

#[cfg(test)]
pub(crate) use send::build_request;
