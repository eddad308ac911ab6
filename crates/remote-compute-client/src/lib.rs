//! HTTP client for the remote inference session API.
//!
//! Provides:
//! - `HttpInferenceClient` - `InferenceClient` over the server's REST routes

pub mod http;

pub use http::HttpInferenceClient;
