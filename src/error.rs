//! Error types for Deckhand.
//!
//! This module defines the error types used throughout Deckhand, providing
//! rich error information for debugging and user feedback.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Deckhand operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Deckhand.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Schedule Errors
    // ========================================================================
    /// Invalid cron cadence value.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Failed to read the user crontab.
    #[error("Failed to read crontab: {0}")]
    CrontabRead(String),

    /// Failed to write the user crontab.
    #[error("Failed to write crontab: {0}")]
    CrontabWrite(String),

    // ========================================================================
    // Project Errors
    // ========================================================================
    /// Invalid project name.
    #[error(
        "Invalid project name '{0}': only alphanumeric characters, dashes, \
         and underscores are allowed"
    )]
    ProjectName(String),

    /// Project directory is missing required entries.
    #[error("Project '{project}' is missing required files or directories")]
    ProjectLayout {
        /// Project name
        project: String,
        /// Required directories that do not exist
        missing_dirs: Vec<PathBuf>,
        /// Required files that do not exist
        missing_files: Vec<PathBuf>,
    },

    /// Playbook file not found in a project.
    #[error("Playbook '{playbook}' not found in project '{project}'")]
    PlaybookNotFound {
        /// Project name
        project: String,
        /// Playbook file name
        playbook: String,
    },

    // ========================================================================
    // Inventory Errors
    // ========================================================================
    /// Host not found in inventory.
    #[error("Host '{0}' not found in inventory")]
    HostNotFound(String),

    /// Group not found in inventory.
    #[error("Group '{0}' not found in inventory")]
    GroupNotFound(String),

    /// Inventory directory does not exist for a project.
    #[error("Inventory directory does not exist: {0}")]
    InventoryMissing(PathBuf),

    // ========================================================================
    // External Tool Errors
    // ========================================================================
    /// A wrapped executable is not installed.
    #[error("Required tool '{tool}' is not installed or not on PATH")]
    ToolMissing {
        /// Executable name
        tool: String,
    },

    /// A wrapped executable exited with a failure status.
    #[error("'{tool}' exited with status {code}: {stderr}")]
    ToolFailed {
        /// Executable name
        tool: String,
        /// Exit code (-1 when killed by a signal)
        code: i32,
        /// Captured stderr
        stderr: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed `key=value` extra-vars string.
    #[error("Invalid extra-vars entry '{0}': expected key=value")]
    ExtraVars(String),

    // ========================================================================
    // Storage and IO Errors
    // ========================================================================
    /// Fact database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// CSV output error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Creates a new tool failure error from a finished process.
    pub fn tool_failed(
        tool: impl Into<String>,
        code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            code: code.unwrap_or(-1),
            stderr: stderr.into(),
        }
    }

    /// Creates a new missing tool error.
    pub fn tool_missing(tool: impl Into<String>) -> Self {
        Self::ToolMissing { tool: tool.into() }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ToolMissing { .. } | Error::ToolFailed { .. } => 2,
            Error::ProjectName(_)
            | Error::ProjectLayout { .. }
            | Error::PlaybookNotFound { .. } => 3,
            Error::InvalidSchedule(_) | Error::CrontabRead(_) | Error::CrontabWrite(_) => 4,
            Error::HostNotFound(_) | Error::GroupNotFound(_) | Error::InventoryMissing(_) => 5,
            Error::Database(_) => 6,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_categories() {
        assert_eq!(Error::tool_missing("ansible-lint").exit_code(), 2);
        assert_eq!(Error::ProjectName("bad name".into()).exit_code(), 3);
        assert_eq!(Error::InvalidSchedule("minute 99".into()).exit_code(), 4);
        assert_eq!(Error::HostNotFound("web01".into()).exit_code(), 5);
        assert_eq!(Error::Config("broken".into()).exit_code(), 1);
    }

    #[test]
    fn tool_failed_defaults_signal_exit() {
        match Error::tool_failed("crontab", None, "killed") {
            Error::ToolFailed { code, .. } => assert_eq!(code, -1),
            other => panic!("unexpected error: {other}"),
        }
    }
}
