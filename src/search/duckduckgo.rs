//! DuckDuckGo HTML search.
//!
//! Queries the JavaScript-free results page with a form POST and scrapes the
//! result links. The page answers 202 or 429 when it suspects automation, so
//! attempts are retried with jittered backoff.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use super::user_agent::{pick_identity, search_headers};
use super::{Pacer, PauseReason, QueryBuilder, SearchConfig, SearchEngine, SearchError, TokioPacer};
use crate::http::build_client;
use crate::models::{FileType, SearchResult};

/// DuckDuckGo search URL.
pub const DDG_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

/// Redirect parameter wrapping the real target of a result link.
const REDIRECT_PARAM: &str = "uddg=";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct DuckDuckGoSearch {
    config: SearchConfig,
    client: Mutex<Option<Client>>,
    rng: Mutex<StdRng>,
    pacer: Arc<dyn Pacer>,
}

impl DuckDuckGoSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self::with_pacer(config, Arc::new(TokioPacer))
    }

    /// Create a search whose sleeps go through `pacer`.
    pub fn with_pacer(config: SearchConfig, pacer: Arc<dyn Pacer>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            client: Mutex::new(None),
            rng: Mutex::new(rng),
            pacer,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Whether the connection pool is currently released.
    pub fn is_closed(&self) -> bool {
        lock(&self.client).is_none()
    }

    /// The pooled client, created on first use and again after `close`.
    fn client(&self, query: &str) -> Result<Client, SearchError> {
        let mut slot = lock(&self.client);
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = build_client(self.config.timeout, None, self.config.proxy.as_deref())
            .map_err(|e| SearchError::Client {
                message: e.to_string(),
                query: query.to_string(),
            })?;
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Uniform jitter factor in [0.5, 1.5).
    fn jitter(&self) -> f64 {
        lock(&self.rng).gen_range(0.5..1.5)
    }

    fn identity(&self) -> (&'static str, &'static str) {
        pick_identity(&mut *lock(&self.rng), self.config.rotate_user_agent)
    }

    async fn run_attempts(
        &self,
        query: &str,
        file_type: FileType,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let client = self.client(query)?;
        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let wait = self
                    .config
                    .base_delay
                    .mul_f64(f64::from(attempt + 1) * self.jitter());
                debug!("Retrying '{}' in {:.1}s (attempt {})", query, wait.as_secs_f64(), attempt + 1);
                self.pacer.pause(wait, PauseReason::Backoff).await;
            }

            let (user_agent, accept_language) = self.identity();
            let response = client
                .post(&self.config.endpoint)
                .headers(search_headers(user_agent, accept_language))
                .form(&[("q", query), ("b", "")])
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    debug!("Search request for '{}' failed: {}", query, e);
                    last_error = Some(SearchError::Network {
                        message: e.to_string(),
                        query: query.to_string(),
                    });
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::ACCEPTED || status == StatusCode::TOO_MANY_REQUESTS {
                debug!("Search for '{}' rate limited ({})", query, status);
                last_error = Some(SearchError::RateLimited {
                    status: status.as_u16(),
                    query: query.to_string(),
                });
                continue;
            }
            if status != StatusCode::OK {
                return Err(SearchError::Status {
                    status: status.as_u16(),
                    query: query.to_string(),
                });
            }

            match response.text().await {
                Ok(html) => {
                    return parse_results(&html, file_type, Some(&self.config.domain)).map_err(
                        |message| SearchError::Parse {
                            message,
                            query: query.to_string(),
                        },
                    );
                }
                Err(e) => {
                    last_error = Some(SearchError::Network {
                        message: e.to_string(),
                        query: query.to_string(),
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SearchError::Network {
            message: "no attempts made".to_string(),
            query: query.to_string(),
        }))
    }
}

#[async_trait]
impl SearchEngine for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search_files(
        &self,
        file_type: FileType,
        limit: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let query = QueryBuilder::new()
            .filetype(file_type.as_str())
            .site(&self.config.domain)
            .build();
        debug!("DuckDuckGo search: {}", query);

        let outcome = self.run_attempts(&query, file_type).await;

        let courtesy = self.config.base_delay + Duration::from_secs_f64(self.jitter());
        self.pacer.pause(courtesy, PauseReason::Courtesy).await;

        match outcome {
            Ok(mut results) => {
                results.truncate(limit);
                info!("Found {} {} files for '{}'", results.len(), file_type, query);
                Ok(results)
            }
            Err(e) => {
                warn!("Search failed: {}", e);
                Err(e)
            }
        }
    }

    fn close(&self) {
        if lock(&self.client).take().is_some() {
            debug!("Closed DuckDuckGo connection pool");
        }
    }
}

impl Drop for DuckDuckGoSearch {
    fn drop(&mut self) {
        self.close();
    }
}

/// Parse a results page into validated file URLs.
///
/// Result links are read first (unwrapping redirect links), then every other
/// link on the page that points at a file of the requested type. Results are
/// deduplicated by URL and keep first-seen order.
pub fn parse_results(
    html: &str,
    file_type: FileType,
    domain: Option<&str>,
) -> Result<Vec<SearchResult>, String> {
    let document = Html::parse_document(html);
    let result_selector =
        Selector::parse("a.result__a").map_err(|e| format!("Failed to parse selector: {:?}", e))?;
    let link_selector =
        Selector::parse("[href]").map_err(|e| format!("Failed to parse selector: {:?}", e))?;

    let ext = file_type.as_str();
    let suffix = format!(".{}", ext);
    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for element in document.select(&result_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let url = if href.contains(REDIRECT_PARAM) {
            unwrap_redirect(href)
        } else {
            absolutize(href)
        };
        let Some(url) = url.and_then(|u| validate_file_url(&u, ext, domain)) else {
            continue;
        };
        if seen.insert(url.clone()) {
            let title = element.text().collect::<String>().trim().to_string();
            results.push(SearchResult::new(url, Some(title)));
        }
    }

    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if !href.to_lowercase().contains(&suffix) {
            continue;
        }
        let decoded = urlencoding::decode(href)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| href.to_string());
        let Some(url) = absolutize(&decoded).and_then(|u| validate_file_url(&u, ext, domain)) else {
            continue;
        };
        if seen.insert(url.clone()) {
            results.push(SearchResult::new(url, None));
        }
    }

    debug!("Parsed {} results from DuckDuckGo", results.len());
    Ok(results)
}

/// Extract the real target from a `//duckduckgo.com/l/?uddg=<encoded>&...` link.
fn unwrap_redirect(href: &str) -> Option<String> {
    let start = href.find(REDIRECT_PARAM)? + REDIRECT_PARAM.len();
    let encoded = &href[start..];
    let end = encoded.find('&').unwrap_or(encoded.len());
    urlencoding::decode(&encoded[..end])
        .ok()
        .map(|s| s.into_owned())
}

/// Accept absolute and scheme-relative links.
fn absolutize(href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        Some(href.to_string())
    } else if let Some(rest) = href.strip_prefix("//") {
        Some(format!("https://{}", rest))
    } else {
        None
    }
}

/// Normalise `url` if it is an absolute HTTP(S) URL whose path ends in
/// `.<ext>` and, when a domain is given, whose host contains it.
fn validate_file_url(url: &str, ext: &str, domain: Option<&str>) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_lowercase();
    let suffix = format!(".{}", ext.to_lowercase());
    if !parsed.path().to_lowercase().ends_with(&suffix) {
        return None;
    }
    if let Some(domain) = domain.filter(|d| !d.is_empty()) {
        if !host.contains(&domain.to_lowercase()) {
            return None;
        }
    }
    Some(parsed.to_string())
}
