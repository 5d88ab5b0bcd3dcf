//! Blocking HTTP client used to fetch release archives.
//!
//! This module wraps `reqwest::blocking` with the features the installer
//! needs:
//! - Retry logic with exponential backoff (disabled by default)
//! - Chunked streaming of response bodies to disk with progress callbacks
//! - Custom User-Agent, timeouts and proxy support
//!
//! # Examples
//!
//! ```no_run
//! use axget_core::http::{Fetcher, HttpClient, HttpClientConfig};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpClientConfig::new()
//!     .with_timeout(Duration::from_secs(120))
//!     .with_max_retries(2);
//! let client = HttpClient::with_config(config)?;
//!
//! let progress: &dyn Fn(u64, u64) = &|downloaded, total| {
//!     println!("{}/{} bytes", downloaded, total);
//! };
//! client.fetch(
//!     "https://example.com/axelor-erp-v7.3.1.war",
//!     "/tmp/axelor.war".as_ref(),
//!     Some(progress),
//! )?;
//! # Ok(())
//! # }
//! ```

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_USER_AGENT: &str = concat!("ax-get/", env!("CARGO_PKG_VERSION"));
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 0;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Max retries exceeded for {url}")]
    MaxRetries { url: String },
}

/// Something that can stream a remote resource into a local file.
///
/// The destination file is created (or truncated) by the fetcher and is
/// fully written and closed when `fetch` returns `Ok`.
pub trait Fetcher {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64, HttpError>;
}

pub struct HttpClient {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
    chunk_size: usize,
}

impl HttpClient {
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, HttpError> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .user_agent(&config.user_agent);

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            chunk_size: config.chunk_size.max(1),
        })
    }

    /// Perform GET request with automatic retries
    pub fn get(&self, url: &str) -> Result<Response, HttpError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match self.client.get(url).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(HttpError::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    } else {
                        // Don't retry on client errors (4xx except 429)
                        return Err(HttpError::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }
                }
                Err(e) => {
                    last_error = Some(HttpError::Request(e));
                }
            }

            if attempt < self.max_retries {
                let delay = self.retry_delay * 2_u32.pow(attempt);
                log::debug!("Retrying {} in {:?} (attempt {})", url, delay, attempt + 1);
                std::thread::sleep(delay);
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Err(HttpError::MaxRetries {
                url: url.to_string(),
            }),
        }
    }

    /// Get the maximum number of retries
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl Fetcher for HttpClient {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64, HttpError> {
        let response = self.get(url)?;
        let total_size = response.content_length().unwrap_or(0);

        let mut file = File::create(dest)?;
        let downloaded = copy_in_chunks(response, &mut file, self.chunk_size, |done| {
            if let Some(callback) = progress {
                callback(done, total_size);
            }
        })?;
        file.flush()?;

        log::debug!("Fetched {} ({} bytes) into {}", url, downloaded, dest.display());
        Ok(downloaded)
    }
}

/// Copy `reader` into `writer` using a buffer of `chunk_size` bytes,
/// reporting the running total after every chunk.
fn copy_in_chunks<R, W, F>(
    mut reader: R,
    writer: &mut W,
    chunk_size: usize,
    mut on_chunk: F,
) -> std::io::Result<u64>
where
    R: Read,
    W: Write,
    F: FnMut(u64),
{
    let mut buffer = vec![0u8; chunk_size];
    let mut copied: u64 = 0;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..read])?;
        copied += read as u64;
        on_chunk(copied);
    }

    Ok(copied)
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Limit on the whole request, body included. `None` lets large
    /// archives stream for as long as they need.
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub proxy: Option<String>,
    pub user_agent: String,
    pub chunk_size: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}
