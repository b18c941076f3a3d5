pub mod backoff;
pub mod config;
pub mod http;
pub mod logging;
pub mod retry;
pub mod transport;

pub use tokio_util::sync::CancellationToken;
