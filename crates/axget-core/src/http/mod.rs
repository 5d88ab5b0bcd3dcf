//! HTTP access to release mirrors.

mod client;

pub use client::{Fetcher, HttpClient, HttpClientConfig, HttpError, DEFAULT_CHUNK_SIZE};
