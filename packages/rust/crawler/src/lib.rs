//! Page retrieval for scripturekit.
//!
//! This crate provides:
//! - [`HttpSource`]: the content origin and its HTTP client
//! - [`RetryPolicy`]: exponential backoff with jitter for transient failures
//! - [`Fetcher`]: a bounded worker pool that fetches and processes leaf pages

pub mod engine;
pub mod http;
pub mod retry;

pub use engine::{FetchReport, Fetcher};
pub use http::HttpSource;
pub use retry::{RetryPolicy, Transient};
