//! Client for a remote batch ping service: submit targets to a vantage point, then receive
//! per-target results over a WebSocket until the job reports it finished.

pub mod batch;
pub mod config;
pub mod error;
pub mod job_call;
pub mod nodes;
pub mod results;
pub mod stream;
pub mod sweep;
pub mod token;

#[cfg(test)]
mod test_utils;

pub use batch::{batch_ping, BatchPing, PingOptions};
pub use config::ClientConfig;
pub use error::{BatchPingError, PingError, ProtocolError};
