//! HTTP client for the deck service: a normalizing JSON transport and the
//! three operation wrappers built on it.

pub mod api;
pub mod client;
pub mod transport;

pub use api::ApiClient;
pub use client::HttpTransport;
pub use transport::{join_url, Transport, TransportError};
