//! Service implementations
//!
//! Real implementations of the I/O traits for production use

pub mod ws_connector;
pub mod sse_source;
pub mod token;

#[cfg(test)]
mod tests;

// Re-export service implementations
pub use ws_connector::RealConnector;
pub use sse_source::RealProgressSource;
pub use token::{SharedToken, StaticToken};
