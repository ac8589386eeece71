//! LMS REST API access.

pub mod client;
pub mod endpoints;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ApiTransport, HttpTransport, TransportConfig};
pub use retry::RetryPolicy;
