//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Environment variable holding the spec source URL.
pub const ENV_SOURCE_URL: &str = "SWAGGER_INIT_JS_URL";
/// Environment variable holding the notification webhook URL.
pub const ENV_WEBHOOK_URL: &str = "SLACK_CHANNEL_URL";
/// Environment variable holding the storage directory.
pub const ENV_STORAGE_DIR: &str = "SPEC_STORAGE_DIR";
/// Environment variable overriding the diff engine timeout.
pub const ENV_DIFF_TIMEOUT: &str = "DIFF_TIMEOUT_SECS";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where the carrier payload comes from and how to read it
    #[serde(default)]
    pub source: SourceConfig,

    /// Outbound notification channel
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Baseline/latest persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// External diff engine invocation
    #[serde(default)]
    pub diff: DiffConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, falling back to defaults only when the file is absent.
    ///
    /// A file that exists but cannot be read or parsed is a configuration error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config file at {}; using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(AppError::config(format!("{}: {e}", path.display()))),
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = present(ENV_SOURCE_URL) {
            self.source.url = Some(url);
        }
        if let Some(url) = present(ENV_WEBHOOK_URL) {
            self.notify.webhook_url = Some(url);
        }
        if let Some(dir) = present(ENV_STORAGE_DIR) {
            self.storage.dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = present(ENV_DIFF_TIMEOUT) {
            match secs.trim().parse() {
                Ok(secs) => self.diff.timeout_secs = secs,
                Err(_) => log::warn!("Ignoring non-numeric {}={}", ENV_DIFF_TIMEOUT, secs),
            }
        }
    }

    /// Validate that every required parameter is present and sane.
    pub fn validate(&self) -> Result<()> {
        let source_url = required(self.source.url.as_deref(), "source.url", ENV_SOURCE_URL)?;
        check_http_url(source_url, "source.url")?;

        let webhook_url = required(
            self.notify.webhook_url.as_deref(),
            "notify.webhook_url",
            ENV_WEBHOOK_URL,
        )?;
        check_http_url(webhook_url, "notify.webhook_url")?;

        self.storage_dir()?;

        if self.source.timeout_secs == 0 {
            return Err(AppError::config("source.timeout_secs must be > 0"));
        }
        if self.notify.timeout_secs == 0 {
            return Err(AppError::config("notify.timeout_secs must be > 0"));
        }
        if self.diff.timeout_secs == 0 {
            return Err(AppError::config("diff.timeout_secs must be > 0"));
        }
        if self.diff.program.trim().is_empty() {
            return Err(AppError::config("diff.program is empty"));
        }
        if self.source.variable.trim().is_empty() {
            return Err(AppError::config("source.variable is empty"));
        }
        if self.storage.baseline_file == self.storage.latest_file {
            return Err(AppError::config(
                "storage.baseline_file and storage.latest_file must differ",
            ));
        }
        Ok(())
    }

    /// The spec source URL, or a configuration error if missing.
    pub fn source_url(&self) -> Result<&str> {
        required(self.source.url.as_deref(), "source.url", ENV_SOURCE_URL)
    }

    /// The webhook URL, or a configuration error if missing.
    pub fn webhook_url(&self) -> Result<&str> {
        required(
            self.notify.webhook_url.as_deref(),
            "notify.webhook_url",
            ENV_WEBHOOK_URL,
        )
    }

    /// The storage directory, or a configuration error if missing.
    pub fn storage_dir(&self) -> Result<&Path> {
        match self.storage.dir.as_deref() {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir),
            _ => Err(AppError::config(format!(
                "storage.dir is not set (config file or {})",
                ENV_STORAGE_DIR
            ))),
        }
    }
}

fn required<'a>(value: Option<&'a str>, name: &str, env: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim()),
        _ => Err(AppError::config(format!(
            "{name} is not set (config file or {env})"
        ))),
    }
}

fn check_http_url(raw: &str, name: &str) -> Result<()> {
    let url = Url::parse(raw).map_err(|e| AppError::config(format!("{name}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::config(format!(
            "{name}: unsupported scheme '{other}'"
        ))),
    }
}

/// Spec source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URL of the script carrying the embedded document
    #[serde(default)]
    pub url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "defaults::source_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Variable the document literal is assigned to
    #[serde(default = "defaults::variable")]
    pub variable: String,

    /// Member of the literal holding the API document (empty = whole literal)
    #[serde(default = "defaults::document_key")]
    pub document_key: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: defaults::source_timeout(),
            user_agent: defaults::user_agent(),
            variable: defaults::variable(),
            document_key: defaults::document_key(),
        }
    }
}

/// Notification channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Incoming-webhook URL of the team channel
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "defaults::notify_timeout")]
    pub timeout_secs: u64,

    /// Header line that replaces the engine's banner
    #[serde(default = "defaults::header")]
    pub header: String,

    /// Banner title emitted by the diff engine
    #[serde(default = "defaults::banner")]
    pub banner: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: defaults::notify_timeout(),
            header: defaults::header(),
            banner: defaults::banner(),
        }
    }
}

/// Baseline store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding both slots (created on first run)
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// File name of the accepted baseline
    #[serde(default = "defaults::baseline_file")]
    pub baseline_file: String,

    /// File name of the latest observed document
    #[serde(default = "defaults::latest_file")]
    pub latest_file: String,

    /// Age after which an abandoned run lock is reclaimed
    #[serde(default = "defaults::lock_stale")]
    pub lock_stale_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            baseline_file: defaults::baseline_file(),
            latest_file: defaults::latest_file(),
            lock_stale_secs: defaults::lock_stale(),
        }
    }
}

impl StorageConfig {
    pub fn lock_stale_after(&self) -> Duration {
        Duration::from_secs(self.lock_stale_secs)
    }
}

/// Diff engine process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Executable to spawn
    #[serde(default = "defaults::program")]
    pub program: String,

    /// Arguments; `{dir}`, `{baseline}` and `{latest}` are substituted
    #[serde(default = "defaults::args")]
    pub args: Vec<String>,

    /// Maximum time to wait for the engine to exit
    #[serde(default = "defaults::diff_timeout")]
    pub timeout_secs: u64,

    /// Output prefix meaning "no differences"
    #[serde(default = "defaults::sentinel")]
    pub no_changes_sentinel: String,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            program: defaults::program(),
            args: defaults::args(),
            timeout_secs: defaults::diff_timeout(),
            no_changes_sentinel: defaults::sentinel(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "defaults::level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::level(),
        }
    }
}

mod defaults {
    // Source defaults
    pub fn source_timeout() -> u64 {
        30
    }
    pub fn user_agent() -> String {
        format!("spec-watch/{}", env!("CARGO_PKG_VERSION"))
    }
    pub fn variable() -> String {
        "options".into()
    }
    pub fn document_key() -> String {
        "swaggerDoc".into()
    }

    // Notify defaults
    pub fn notify_timeout() -> u64 {
        10
    }
    pub fn header() -> String {
        "🚨 Frontend Bot이 API 변경을 탐지했습니다! 🚨".into()
    }
    pub fn banner() -> String {
        "API CHANGE LOG".into()
    }

    // Storage defaults
    pub fn baseline_file() -> String {
        "local-api.json".into()
    }
    pub fn latest_file() -> String {
        "server-api.json".into()
    }
    pub fn lock_stale() -> u64 {
        3600
    }

    // Diff engine defaults
    pub fn program() -> String {
        "docker".into()
    }
    pub fn args() -> Vec<String> {
        [
            "run",
            "--rm",
            "-v",
            "{dir}:/specs",
            "openapitools/openapi-diff:latest",
            "/specs/{baseline}",
            "/specs/{latest}",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn diff_timeout() -> u64 {
        300
    }
    pub fn sentinel() -> String {
        "No differences".into()
    }

    pub fn level() -> String {
        "info".into()
    }
}
