//! Account and engine configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$DESKMAIL_CONFIG` (environment variable)
//! 2. `~/.config/deskmail/config.toml` (Linux/macOS)
//!    `%APPDATA%\deskmail\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MailError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mailbox account credentials and endpoints.
    pub account: AccountConfig,
    /// Operational bounds.
    pub limits: LimitsConfig,
}

/// IMAP and SMTP endpoints for one support mailbox.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub imap: ImapConfig,
    pub smtp: SmtpConfig,
}

/// IMAP endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Wrap the connection in TLS. Plain TCP is for test servers only.
    pub tls: bool,
}

/// SMTP endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Transport security: "ssl", "starttls", or "none".
    pub security: String,
    /// Display name placed on outgoing mail.
    pub from_name: String,
    /// Address placed on outgoing mail.
    pub from_address: String,
}

/// Operational bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Wall-clock bound for the attachment fetch path, in seconds.
    pub attachment_timeout_secs: u64,
    /// Per-read/write socket bound on mailbox connections, in seconds.
    /// Keeps a stalled server from pinning a session open forever.
    pub io_timeout_secs: u64,
    /// Default number of messages returned by a folder listing.
    pub list_page_size: u32,
}

// ── Default implementations ─────────────────────────────────────

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 993,
            user: String::new(),
            password: String::new(),
            tls: true,
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            user: String::new(),
            password: String::new(),
            security: "starttls".to_string(),
            from_name: "Support".to_string(),
            from_address: String::new(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            attachment_timeout_secs: 30,
            io_timeout_secs: 30,
            list_page_size: 50,
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match load_config_from(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "Loaded config");
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to load config, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Load configuration from an explicit path.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| MailError::Config(format!("{}: {e}", path.display())))?;
    toml::from_str(&contents).map_err(|e| MailError::Config(format!("{}: {e}", path.display())))
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("DESKMAIL_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("deskmail").join("config.toml"))
}
