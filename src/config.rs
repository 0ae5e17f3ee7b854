//! Configuration management for metaharvest using the prefer crate.
//!
//! Settings are resolved in layers: built-in defaults, then an optional
//! config file discovered by `prefer`, then `METAHARVEST_*` environment
//! variables, then command-line flags (applied by the CLI).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::download::DownloadConfig;
use crate::models::FileType;
use crate::search::{SearchConfig, DDG_SEARCH_URL};

/// Environment variable overriding the download directory.
pub const ENV_OUTPUT_DIR: &str = "METAHARVEST_OUTPUT_DIR";
/// Environment variable setting a proxy for all outbound requests.
pub const ENV_PROXY: &str = "METAHARVEST_PROXY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config: {message}")]
    Parse { format: &'static str, message: String },
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where downloaded documents are written.
    pub output_dir: PathBuf,
    /// Maximum search results kept per file type.
    pub search_limit: usize,
    /// Maximum downloads per file type.
    pub download_limit: usize,
    /// Maximum concurrent downloads.
    pub concurrency: usize,
    pub request_timeout: Duration,
    /// Base delay between searches and for retry backoff.
    pub search_delay: Duration,
    pub rotate_user_agent: bool,
    pub search_endpoint: String,
    pub proxy: Option<String>,
    /// Fixed seed for search jitter and header rotation.
    pub seed: Option<u64>,
    pub file_types: Vec<FileType>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./downloads"),
            search_limit: 200,
            download_limit: 50,
            concurrency: 5,
            request_timeout: Duration::from_secs(30),
            search_delay: Duration::from_secs(3),
            rotate_user_agent: true,
            search_endpoint: DDG_SEARCH_URL.to_string(),
            proxy: None,
            seed: None,
            file_types: FileType::DEFAULT_SEARCH.to_vec(),
        }
    }
}

impl Settings {
    /// Apply `METAHARVEST_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(ENV_OUTPUT_DIR) {
            if !dir.trim().is_empty() {
                self.output_dir = PathBuf::from(dir);
            }
        }
        if let Ok(proxy) = std::env::var(ENV_PROXY) {
            if !proxy.trim().is_empty() {
                self.proxy = Some(proxy);
            }
        }
        self
    }

    /// Search configuration for `domain`.
    pub fn search_config(&self, domain: &str) -> SearchConfig {
        SearchConfig {
            domain: domain.to_string(),
            endpoint: self.search_endpoint.clone(),
            base_delay: self.search_delay,
            max_retries: 3,
            rotate_user_agent: self.rotate_user_agent,
            timeout: self.request_timeout,
            proxy: self.proxy.clone(),
            seed: self.seed,
        }
    }

    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig {
            output_dir: self.output_dir.clone(),
            max_concurrent: self.concurrency,
            timeout: self.request_timeout,
            min_size: 100,
            proxy: self.proxy.clone(),
        }
    }
}

/// Optional on-disk configuration. Every field overrides the default when set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Download directory; relative paths resolve against the config file's directory.
    pub output_dir: Option<String>,
    pub search_limit: Option<usize>,
    pub download_limit: Option<usize>,
    pub concurrency: Option<usize>,
    /// Request timeout in seconds.
    pub request_timeout: Option<u64>,
    /// Search delay in seconds.
    pub search_delay: Option<f64>,
    pub rotate_user_agent: Option<bool>,
    pub search_endpoint: Option<String>,
    pub proxy: Option<String>,
    pub seed: Option<u64>,
    pub file_types: Option<Vec<String>>,

    /// Path the configuration was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer for discovery; defaults when none is found.
    pub async fn load() -> Self {
        match prefer::load("metaharvest").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Ignoring config file: {}", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file, parsed by extension
    /// (TOML, YAML, otherwise JSON).
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            })?,
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            })?,
            _ => serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            })?,
        };

        debug!("Loaded config from {}", path.display());
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory relative paths resolve against.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Overlay file values onto `settings`.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref dir) = self.output_dir {
            let path = Path::new(dir);
            settings.output_dir = if path.is_absolute() {
                path.to_path_buf()
            } else {
                base_dir.join(path)
            };
        }
        if let Some(limit) = self.search_limit {
            settings.search_limit = limit;
        }
        if let Some(limit) = self.download_limit {
            settings.download_limit = limit;
        }
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency.max(1);
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = Duration::from_secs(timeout);
        }
        if let Some(delay) = self.search_delay {
            if delay.is_finite() && delay >= 0.0 {
                settings.search_delay = Duration::from_secs_f64(delay);
            }
        }
        if let Some(rotate) = self.rotate_user_agent {
            settings.rotate_user_agent = rotate;
        }
        if let Some(ref endpoint) = self.search_endpoint {
            settings.search_endpoint = endpoint.clone();
        }
        if let Some(ref proxy) = self.proxy {
            settings.proxy = Some(proxy.clone());
        }
        if let Some(seed) = self.seed {
            settings.seed = Some(seed);
        }
        if let Some(ref types) = self.file_types {
            let (valid, invalid) = parse_file_types(types.iter().map(String::as_str));
            if !invalid.is_empty() {
                warn!("Ignoring unknown file types in config: {}", invalid.join(", "));
            }
            if !valid.is_empty() {
                settings.file_types = valid;
            }
        }
    }
}

/// Split extension names into recognised file types (deduplicated, in order)
/// and unrecognised names.
pub fn parse_file_types<'a>(names: impl IntoIterator<Item = &'a str>) -> (Vec<FileType>, Vec<String>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        match FileType::from_extension(name) {
            Some(ft) if !valid.contains(&ft) => valid.push(ft),
            Some(_) => {}
            None => invalid.push(name.to_string()),
        }
    }
    (valid, invalid)
}

/// Load settings: defaults, then the config file (explicit path or
/// discovered), then environment overrides.
pub async fn load_settings(config_path: Option<&Path>) -> Result<(Settings, Config), ConfigError> {
    let config = match config_path {
        Some(path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    Ok((settings.with_env_overrides(), config))
}
