//! Configuration module for Deckhand.
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - Project configuration (`<projects_dir>/deckhand.toml`)
//! - Environment variables (`DECKHAND_*`)
//!
//! The projects directory itself is resolved first (from
//! `DECKHAND_PROJECTS_DIR` or `~/deckhand_projects`) because the config
//! file and every default path hang off it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the optional configuration file inside the projects directory.
pub const CONFIG_FILE: &str = "deckhand.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory containing Ansible projects.
    pub projects_dir: PathBuf,

    /// Path to the SQLite fact database. Defaults to
    /// `<projects_dir>/deckhand.db`.
    pub db_path: Option<PathBuf>,

    /// Log level for console output (overridden by `-v` flags).
    pub console_log_level: String,

    /// Log level for the log file under `<projects_dir>/logs/`.
    pub file_log_level: String,

    /// Comment tag marking deckhand-managed crontab entries.
    pub cron_tag: String,

    /// Script invoked by scheduled cron entries. Defaults to
    /// `<projects_dir>/deckhand_run.sh`.
    pub run_script: Option<PathBuf>,

    /// DNS servers used by `inventory check-dns`.
    pub dns_servers: Vec<String>,

    /// Per-server timeout for DNS resolution checks, in seconds.
    pub dns_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects_dir: default_projects_dir(),
            db_path: None,
            console_log_level: "warn".to_string(),
            file_log_level: "info".to_string(),
            cron_tag: "#Deckhand-".to_string(),
            run_script: None,
            dns_servers: vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()],
            dns_timeout_secs: 5,
        }
    }
}

/// Resolve the projects directory from the environment or the home default.
fn default_projects_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DECKHAND_PROJECTS_DIR") {
        return expand_path(&dir);
    }
    dirs::home_dir()
        .map(|home| home.join("deckhand_projects"))
        .unwrap_or_else(|| PathBuf::from("deckhand_projects"))
}

/// Expand `~` and environment variables in a configured path.
fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => PathBuf::from(raw),
    }
}

impl Config {
    /// Load configuration, merging the config file and environment variables
    /// over the defaults.
    ///
    /// `file` overrides the config file location; when `None`, the file is
    /// looked up inside the projects directory and is optional.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        let config_path = file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.projects_dir.join(CONFIG_FILE));

        if config_path.is_file() {
            let content = std::fs::read_to_string(&config_path)?;
            config = toml::from_str(&content)?;
        } else if file.is_some() {
            return Err(Error::Config(format!(
                "config file not found: {}",
                config_path.display()
            )));
        }

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `DECKHAND_*` environment variable overrides.
    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("DECKHAND_PROJECTS_DIR") {
            self.projects_dir = expand_path(&dir);
        }
        if let Ok(path) = std::env::var("DECKHAND_DB_PATH") {
            self.db_path = Some(expand_path(&path));
        }
        if let Ok(level) = std::env::var("DECKHAND_CONSOLE_LOG_LEVEL") {
            self.console_log_level = level;
        }
        if let Ok(level) = std::env::var("DECKHAND_FILE_LOG_LEVEL") {
            self.file_log_level = level;
        }
        if let Ok(tag) = std::env::var("DECKHAND_CRON_TAG") {
            self.cron_tag = tag;
        }
        if let Ok(script) = std::env::var("DECKHAND_RUN_SCRIPT") {
            self.run_script = Some(expand_path(&script));
        }
        if let Ok(servers) = std::env::var("DECKHAND_DNS_SERVERS") {
            self.dns_servers = servers
                .split(',')
                .map(|server| server.trim().to_string())
                .filter(|server| !server.is_empty())
                .collect();
        }
        if let Ok(timeout) = std::env::var("DECKHAND_DNS_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.dns_timeout_secs = secs;
            }
        }
    }

    /// Reject configurations the rest of the tool cannot work with.
    fn validate(&self) -> Result<()> {
        for (name, level) in [
            ("console_log_level", &self.console_log_level),
            ("file_log_level", &self.file_log_level),
        ] {
            if !matches!(
                level.to_ascii_lowercase().as_str(),
                "off" | "error" | "warn" | "info" | "debug" | "trace"
            ) {
                return Err(Error::Config(format!(
                    "invalid {name} '{level}': expected off, error, warn, info, debug, or trace"
                )));
            }
        }
        if self.cron_tag.trim().is_empty() {
            return Err(Error::Config("cron_tag must not be empty".to_string()));
        }
        Ok(())
    }

    /// Effective path of the SQLite fact database.
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.projects_dir.join("deckhand.db"))
    }

    /// Effective path of the cron run script.
    pub fn run_script(&self) -> PathBuf {
        self.run_script
            .clone()
            .unwrap_or_else(|| self.projects_dir.join("deckhand_run.sh"))
    }

    /// Directory for deckhand's own log files.
    pub fn log_dir(&self) -> PathBuf {
        self.projects_dir.join("logs")
    }
}
