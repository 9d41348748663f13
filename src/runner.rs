//! Playbook execution via the `ansible-playbook` binary.
//!
//! Each run captures combined output and persists it in a fresh artifact
//! directory (`artifacts/<timestamp>-<id>/` with `stdout`, `command`, `rc`,
//! and `status` files - the ansible-runner layout the report module reads
//! back). Old artifact directories are rotated out after every run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::Utc;
use serde_json::json;
use tokio::process::Command;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::project;

/// Default number of artifact directories kept per project.
pub const DEFAULT_ROTATE_ARTIFACTS: usize = 7;

/// Options for a playbook run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Number of artifact directories to keep (1-31).
    pub rotate_artifacts: usize,
    /// Limit execution to a host or group pattern.
    pub limit: Option<String>,
    /// Extra variables passed to `ansible-playbook`.
    pub extra_vars: HashMap<String, String>,
    /// `-v` count forwarded to `ansible-playbook`.
    pub verbosity: u8,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            rotate_artifacts: DEFAULT_ROTATE_ARTIFACTS,
            limit: None,
            extra_vars: HashMap::new(),
            verbosity: 0,
        }
    }
}

/// Final status of a playbook run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// `ansible-playbook` exited 0.
    Successful,
    /// `ansible-playbook` exited non-zero.
    Failed,
}

impl RunStatus {
    /// String form, matching the artifact `status` file content.
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Successful => "successful",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a playbook run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Overall status.
    pub status: RunStatus,
    /// Exit code of `ansible-playbook`.
    pub rc: i32,
    /// Artifact directory written for this run.
    pub artifact_dir: PathBuf,
}

/// Parses a comma-separated `key=value[,key=value]` string.
pub fn parse_extra_vars(raw: &str) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    for pair in raw.split(',').filter(|pair| !pair.trim().is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::ExtraVars(pair.trim().to_string()))?;
        vars.insert(key.trim().to_string(), value.trim().to_string());
    }
    debug!("Extra vars: {vars:?}");
    Ok(vars)
}

/// Runs a playbook and persists the run artifacts.
pub async fn run_playbook(
    projects_dir: &Path,
    project_name: &str,
    playbook_file: &str,
    opts: &RunOptions,
) -> Result<RunOutcome> {
    let playbook_path = project::playbook_path(projects_dir, project_name, playbook_file)
        .ok_or_else(|| Error::PlaybookNotFound {
            project: project_name.to_string(),
            playbook: playbook_file.to_string(),
        })?;
    let project_dir = project::project_dir(projects_dir, project_name);

    let mut argv: Vec<String> = vec![
        "ansible-playbook".to_string(),
        playbook_path.display().to_string(),
        "-i".to_string(),
        project_dir.join("inventory").display().to_string(),
    ];
    if let Some(limit) = opts.limit.as_deref().filter(|l| !l.is_empty()) {
        argv.push("--limit".to_string());
        argv.push(limit.to_string());
    }
    if !opts.extra_vars.is_empty() {
        argv.push("--extra-vars".to_string());
        argv.push(serde_json::to_string(&opts.extra_vars)?);
    }
    if opts.verbosity > 0 {
        argv.push(format!("-{}", "v".repeat(opts.verbosity as usize)));
    }

    info!(
        "Running playbook: {} (limit: {}, rotate artifacts: {})",
        playbook_path.display(),
        opts.limit.as_deref().unwrap_or("none"),
        opts.rotate_artifacts,
    );
    debug!("Run command: {}", argv.join(" "));

    let output = Command::new(&argv[0])
        .args(&argv[1..])
        .current_dir(&project_dir)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::tool_missing("ansible-playbook"),
            _ => Error::Io(err),
        })?;

    let rc = output.status.code().unwrap_or(-1);
    let status = if output.status.success() {
        RunStatus::Successful
    } else {
        RunStatus::Failed
    };

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        combined.push_str(&stderr);
    }

    let artifact_dir = write_artifacts(&project_dir, &argv, &combined, rc, status).await?;
    rotate_artifacts(&project_dir.join("artifacts"), opts.rotate_artifacts)?;

    match status {
        RunStatus::Successful => {
            info!("Playbook completed successfully: '{}'", playbook_path.display());
        }
        RunStatus::Failed => {
            error!(
                "Playbook failed (return code: {rc}): '{}'",
                playbook_path.display()
            );
        }
    }

    Ok(RunOutcome {
        status,
        rc,
        artifact_dir,
    })
}

/// Writes the artifact directory for a finished run.
async fn write_artifacts(
    project_dir: &Path,
    argv: &[String],
    combined_output: &str,
    rc: i32,
    status: RunStatus,
) -> Result<PathBuf> {
    let run_id = format!(
        "{}-{}",
        Utc::now().format("%Y%m%dT%H%M%S"),
        &Uuid::new_v4().simple().to_string()[..8]
    );
    let artifact_dir = project_dir.join("artifacts").join(run_id);
    tokio::fs::create_dir_all(&artifact_dir).await?;

    tokio::fs::write(artifact_dir.join("stdout"), combined_output).await?;
    tokio::fs::write(
        artifact_dir.join("command"),
        serde_json::to_string(&json!({ "command": argv }))?,
    )
    .await?;
    tokio::fs::write(artifact_dir.join("rc"), rc.to_string()).await?;
    tokio::fs::write(artifact_dir.join("status"), status.as_str()).await?;

    debug!("Wrote artifacts to '{}'", artifact_dir.display());
    Ok(artifact_dir)
}

/// Deletes the oldest artifact directories beyond `keep`.
pub fn rotate_artifacts(artifacts_dir: &Path, keep: usize) -> Result<Vec<PathBuf>> {
    if keep == 0 || !artifacts_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut dirs: Vec<(std::time::SystemTime, PathBuf)> = std::fs::read_dir(artifacts_dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let mtime = path.metadata().and_then(|meta| meta.modified()).ok()?;
            Some((mtime, path))
        })
        .collect();
    // Newest first; ties broken by name so rotation is deterministic.
    dirs.sort_by(|a, b| b.cmp(a));

    let mut removed = Vec::new();
    for (_, path) in dirs.into_iter().skip(keep) {
        debug!("Rotating out artifact dir '{}'", path.display());
        std::fs::remove_dir_all(&path)?;
        removed.push(path);
    }
    if !removed.is_empty() {
        info!("Rotated out {} old artifact dir(s)", removed.len());
    }
    Ok(removed)
}
