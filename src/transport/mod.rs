//! Transport layer for the ingestion service.
//!
//! The HTTP transport binds a listener and serves the API router until a
//! shutdown signal arrives.

pub mod http;

pub use http::HttpTransport;
