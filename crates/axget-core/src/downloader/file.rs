//! File downloader for HTTP/HTTPS archives.

use std::path::Path;

use crate::http::Fetcher;
use crate::{AxGetError, Result};

/// Downloads archives through a [`Fetcher`], optionally trying a fallback
/// mirror.
pub struct FileDownloader<'a> {
    fetcher: &'a dyn Fetcher,
}

impl<'a> FileDownloader<'a> {
    /// Create a new file downloader
    pub fn new(fetcher: &'a dyn Fetcher) -> Self {
        Self { fetcher }
    }

    /// Download a file to the specified path
    pub fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        log::info!("Downloading {}", url);
        self.fetcher
            .fetch(url, dest, progress)
            .map_err(|e| AxGetError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Download from `primary`, falling back to `fallback` once if the first
    /// fetch fails. Returns the URL that succeeded.
    pub fn download_with_fallback<'u>(
        &self,
        primary: &'u str,
        fallback: &'u str,
        dest: &Path,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<&'u str> {
        let primary_error = match self.download(primary, dest, progress) {
            Ok(_) => return Ok(primary),
            Err(e) => e,
        };

        log::warn!("{}; trying fallback mirror {}", primary_error, fallback);

        match self.download(fallback, dest, progress) {
            Ok(_) => Ok(fallback),
            Err(fallback_error) => Err(AxGetError::Download {
                url: primary.to_string(),
                reason: format!("{}; fallback mirror also failed: {}", primary_error, fallback_error),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpError;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    /// Serves fixed bodies for known URLs and fails everything else
    struct ScriptedFetcher {
        ok_urls: Vec<&'static str>,
        requested: RefCell<Vec<String>>,
    }

    impl Fetcher for ScriptedFetcher {
        fn fetch(
            &self,
            url: &str,
            dest: &Path,
            progress: Option<&dyn Fn(u64, u64)>,
        ) -> std::result::Result<u64, HttpError> {
            self.requested.borrow_mut().push(url.to_string());
            if self.ok_urls.iter().any(|ok| *ok == url) {
                fs::write(dest, url.as_bytes())?;
                if let Some(callback) = progress {
                    callback(url.len() as u64, url.len() as u64);
                }
                Ok(url.len() as u64)
            } else {
                Err(HttpError::HttpStatus {
                    status: 404,
                    url: url.to_string(),
                })
            }
        }
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let fetcher = ScriptedFetcher {
            ok_urls: vec!["https://primary/a.war"],
            requested: RefCell::new(Vec::new()),
        };
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a");

        let used = FileDownloader::new(&fetcher)
            .download_with_fallback("https://primary/a.war", "https://fallback/a.war", &dest, None)
            .unwrap();

        assert_eq!(used, "https://primary/a.war");
        assert_eq!(*fetcher.requested.borrow(), vec!["https://primary/a.war"]);
    }

    #[test]
    fn test_fallback_tried_exactly_once() {
        let fetcher = ScriptedFetcher {
            ok_urls: vec!["https://fallback/a.war"],
            requested: RefCell::new(Vec::new()),
        };
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a");

        let used = FileDownloader::new(&fetcher)
            .download_with_fallback("https://primary/a.war", "https://fallback/a.war", &dest, None)
            .unwrap();

        assert_eq!(used, "https://fallback/a.war");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "https://fallback/a.war");
        assert_eq!(fetcher.requested.borrow().len(), 2);
    }

    #[test]
    fn test_both_mirrors_failing_reports_both() {
        let fetcher = ScriptedFetcher {
            ok_urls: vec![],
            requested: RefCell::new(Vec::new()),
        };
        let dir = TempDir::new().unwrap();

        let err = FileDownloader::new(&fetcher)
            .download_with_fallback("https://primary/a.war", "https://fallback/a.war", &dir.path().join("a"), None)
            .unwrap_err();

        match err {
            AxGetError::Download { url, reason } => {
                assert_eq!(url, "https://primary/a.war");
                assert!(reason.contains("https://fallback/a.war"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fetcher.requested.borrow().len(), 2);
    }

    #[test]
    fn test_progress_callback_forwarded() {
        let fetcher = ScriptedFetcher {
            ok_urls: vec!["u"],
            requested: RefCell::new(Vec::new()),
        };
        let dir = TempDir::new().unwrap();
        let seen = RefCell::new(Vec::new());
        let progress: &dyn Fn(u64, u64) = &|done, total| seen.borrow_mut().push((done, total));

        FileDownloader::new(&fetcher)
            .download("u", &dir.path().join("u"), Some(progress))
            .unwrap();

        assert_eq!(*seen.borrow(), vec![(1, 1)]);
    }
}
