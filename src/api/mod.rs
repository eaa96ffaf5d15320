//! API module
//!
//! This module provides access to the remote plan service.

pub mod client;

// Re-export commonly used types
pub use client::{Client, ClientConfig, ClientError, HttpClientImpl};
