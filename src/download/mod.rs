//! Concurrent document downloader.
//!
//! Fetches a batch of URLs with a bounded number of requests in flight and
//! writes each body into the output directory. Every URL yields exactly one
//! [`DownloadResult`], in input order; failures are data, never errors.

mod filename;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::http::build_client;
use crate::models::DownloadResult;

pub use filename::{filename_from_url, numbered_filename, sanitize_filename, PLACEHOLDER_NAME};

/// User agent sent with document fetches.
pub const DOWNLOAD_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Why a single download failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadFailure {
    #[error("Timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("File too small or empty ({0} bytes)")]
    TooSmall(usize),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for DownloadFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() || e.is_request() || e.is_body() || e.is_redirect() || e.is_decode() {
            Self::Network(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// Events emitted while a batch is downloading.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// A fetch has acquired its slot.
    Started { url: String, filename: String },
    /// The body was written to disk.
    Completed { url: String, path: PathBuf },
    /// The target already existed; nothing was fetched.
    AlreadyPresent { url: String, path: PathBuf },
    Failed { url: String, error: String },
}

/// Configuration for the downloader.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub output_dir: PathBuf,
    /// Maximum fetches in flight.
    pub max_concurrent: usize,
    pub timeout: Duration,
    /// Bodies shorter than this are rejected as placeholders.
    pub min_size: usize,
    pub proxy: Option<String>,
}

impl DownloadConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_concurrent: 5,
            timeout: Duration::from_secs(30),
            min_size: 100,
            proxy: None,
        }
    }
}

/// Where a URL's body goes, decided before any fetch starts.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// A regular file is already at this path.
    Existing(PathBuf),
    Fetch(PathBuf),
}

pub struct Downloader {
    config: DownloadConfig,
    client: Client,
    events: Option<mpsc::UnboundedSender<DownloadEvent>>,
}

impl Downloader {
    pub fn new(config: DownloadConfig) -> reqwest::Result<Self> {
        let client = build_client(config.timeout, Some(DOWNLOAD_USER_AGENT), config.proxy.as_deref())?;
        Ok(Self {
            config,
            client,
            events: None,
        })
    }

    /// Report progress on `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<DownloadEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Download up to `limit` of `urls`, returning one result per URL in input order.
    /// A limit of `None` or `Some(0)` downloads every URL.
    pub async fn download_files(&self, urls: &[String], limit: Option<usize>) -> Vec<DownloadResult> {
        let count = match limit {
            Some(l) if l > 0 => l.min(urls.len()),
            _ => urls.len(),
        };
        let urls = &urls[..count];

        if let Err(e) = tokio::fs::create_dir_all(&self.config.output_dir).await {
            warn!(
                "Cannot create output directory {}: {}",
                self.config.output_dir.display(),
                e
            );
            let failure = DownloadFailure::Other(e.to_string()).to_string();
            return urls
                .iter()
                .map(|url| DownloadResult::failure(url, failure.clone()))
                .collect();
        }

        let targets = self.plan_targets(urls).await;
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));

        let tasks = urls.iter().zip(targets).map(|(url, target)| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await.ok();
                self.download_one(url, target).await
            }
        });
        let results = join_all(tasks).await;

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(
            "Downloaded {}/{} files into {}",
            succeeded,
            results.len(),
            self.config.output_dir.display()
        );
        results
    }

    /// Assign every URL its target path, in input order.
    ///
    /// A name already claimed by an earlier URL in the batch, or occupied by
    /// something that is not a regular file, is renumbered `_1`, `_2`, ...
    /// A regular file at the chosen name is reused without fetching.
    async fn plan_targets(&self, urls: &[String]) -> Vec<Target> {
        let mut claimed: HashSet<String> = HashSet::new();
        let mut targets = Vec::with_capacity(urls.len());

        for url in urls {
            let name = sanitize_filename(&filename_from_url(url));
            let mut candidate = name.clone();
            let mut n = 0;
            let target = loop {
                if !claimed.contains(&candidate) {
                    let path = self.config.output_dir.join(&candidate);
                    match tokio::fs::metadata(&path).await {
                        Ok(meta) if meta.is_file() => {
                            claimed.insert(candidate);
                            break Target::Existing(path);
                        }
                        Ok(_) => {}
                        Err(_) => {
                            claimed.insert(candidate);
                            break Target::Fetch(path);
                        }
                    }
                }
                n += 1;
                candidate = numbered_filename(&name, n);
            };
            targets.push(target);
        }

        targets
    }

    async fn download_one(&self, url: &str, target: Target) -> DownloadResult {
        let path = match target {
            Target::Existing(path) => {
                debug!("Already downloaded: {}", path.display());
                self.emit(DownloadEvent::AlreadyPresent {
                    url: url.to_string(),
                    path: path.clone(),
                });
                return DownloadResult::success(url, path);
            }
            Target::Fetch(path) => path,
        };

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.emit(DownloadEvent::Started {
            url: url.to_string(),
            filename,
        });

        match self.fetch(url, &path).await {
            Ok(size) => {
                debug!("Saved {} ({} bytes) to {}", url, size, path.display());
                self.emit(DownloadEvent::Completed {
                    url: url.to_string(),
                    path: path.clone(),
                });
                DownloadResult::success(url, path)
            }
            Err(failure) => {
                warn!("Download failed for {}: {}", url, failure);
                self.emit(DownloadEvent::Failed {
                    url: url.to_string(),
                    error: failure.to_string(),
                });
                DownloadResult::failure(url, failure.to_string())
            }
        }
    }

    async fn fetch(&self, url: &str, path: &Path) -> Result<usize, DownloadFailure> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DownloadFailure::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await?;
        if body.len() < self.config.min_size {
            return Err(DownloadFailure::TooSmall(body.len()));
        }

        tokio::fs::write(path, &body)
            .await
            .map_err(|e| DownloadFailure::Other(e.to_string()))?;
        Ok(body.len())
    }
}
