//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILSHELL_CONFIG` (environment variable)
//! 2. `~/.config/mailshell/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailshell\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Message display settings.
    pub display: DisplayConfig,
    /// External programs used to draw HTML and images.
    pub renderers: RendererConfig,
    /// Remote image fetching.
    pub network: NetworkConfig,
    /// Mailbox backend settings.
    pub mailbox: MailboxConfig,
    /// Download defaults.
    pub download: DownloadConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Override the directory used for temporary render files.
    pub scratch_dir: Option<PathBuf>,
}

/// Message display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// `strftime` format string for message dates.
    pub date_format: String,
    /// Plain-text bodies longer than this many characters ask how much to show.
    pub plain_text_threshold: usize,
    /// Resize the terminal to `[rows, cols]` on startup.
    pub terminal_size: Option<[u16; 2]>,
}

/// External renderer commands. The file path is appended as the last argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Program that dumps an HTML file as text to stdout.
    pub html_command: Vec<String>,
    /// Program that draws an image file in the terminal.
    pub image_command: Vec<String>,
}

/// Remote image fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-request timeout in seconds (0 = wait forever).
    pub fetch_timeout_secs: u64,
    /// `User-Agent` header sent with image requests.
    pub user_agent: String,
}

/// Mailbox backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Path or name of the `himalaya` executable.
    pub himalaya_bin: String,
    /// Account name passed to `--account` (default account when unset).
    pub account: Option<String>,
    /// Address used in the `From:` header of outgoing mail.
    pub email: String,
    /// Folder listed when no label is requested.
    pub inbox_folder: String,
    /// Folder spam is moved to.
    pub spam_folder: String,
    /// Folder holding deleted mail.
    pub trash_folder: String,
    /// Maximum number of messages listed per folder.
    pub default_limit: usize,
}

/// Download defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory offered as the default download location.
    pub default_dir: Option<PathBuf>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
            scratch_dir: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d %H:%M UTC".to_string(),
            plain_text_threshold: 3000,
            terminal_size: None,
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            html_command: vec![
                "w3m".to_string(),
                "-dump".to_string(),
                "-T".to_string(),
                "text/html".to_string(),
            ],
            image_command: vec!["viu".to_string()],
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 20,
            user_agent: concat!("mailshell/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            himalaya_bin: "himalaya".to_string(),
            account: None,
            email: String::new(),
            inbox_folder: "INBOX".to_string(),
            spam_folder: "[Gmail]/Spam".to_string(),
            trash_folder: "[Gmail]/Trash".to_string(),
            default_limit: 50,
        }
    }
}

impl NetworkConfig {
    /// The request timeout, or `None` when fetches may wait forever.
    pub fn timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs))
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILSHELL_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailshell").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailshell")
}

/// Return the directory that holds temporary render files.
///
/// Each process gets its own subdirectory so concurrent sessions never
/// share file names.
pub fn scratch_dir(config: &Config) -> PathBuf {
    let base = config
        .general
        .scratch_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);
    base.join(format!("mailshell-{}", std::process::id()))
}

/// Return the directory offered for downloads.
pub fn download_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.download.default_dir {
        return dir.clone();
    }
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
