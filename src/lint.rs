//! Playbook linting via the `ansible-lint` binary.
//!
//! Deckhand does not implement lint rules itself; it builds the right
//! command line, runs `ansible-lint` inside the project directory, and
//! shapes the captured output for display.

use std::path::PathBuf;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::project;

/// Maximum `-v` level `ansible-lint` accepts.
const MAX_VERBOSITY: u8 = 3;

/// Checks that `ansible-lint` is installed and runnable.
pub async fn available() -> bool {
    if which::which("ansible-lint").is_err() {
        error!("ansible-lint is not installed");
        return false;
    }
    match Command::new("ansible-lint")
        .args(["--version", "--nocolor"])
        .output()
        .await
    {
        Ok(output) if output.status.success() => {
            debug!(
                "{}",
                String::from_utf8_lossy(&output.stdout).trim()
            );
            true
        }
        _ => {
            error!("ansible-lint is not runnable");
            false
        }
    }
}

/// Lints a single playbook or, when `playbook_file` is `None`, the whole
/// project directory.
///
/// Returns the indented lint output, or `None` when the run produced none.
pub async fn lint(
    projects_dir: &std::path::Path,
    project_name: &str,
    playbook_file: Option<&str>,
    verbosity: u8,
) -> Result<Option<String>> {
    let project_dir = project::project_dir(projects_dir, project_name);
    let target: Option<PathBuf> = match playbook_file {
        Some(file) => Some(
            project::playbook_path(projects_dir, project_name, file).ok_or_else(|| {
                Error::PlaybookNotFound {
                    project: project_name.to_string(),
                    playbook: file.to_string(),
                }
            })?,
        ),
        None => None,
    };

    let mut command = Command::new("ansible-lint");
    if let Some(path) = &target {
        command.arg(path);
    }
    command.arg("--project-dir").arg(&project_dir);
    let verbosity = verbosity.min(MAX_VERBOSITY);
    if verbosity > 0 {
        command.arg(format!("-{}", "v".repeat(verbosity as usize)));
    }
    command.arg("--nocolor");
    command.current_dir(&project_dir);

    info!(
        "Linting {}",
        target
            .as_deref()
            .unwrap_or(project_dir.as_path())
            .display()
    );
    let output = command.output().await.map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => Error::tool_missing("ansible-lint"),
        _ => Error::Io(err),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if let Some(path) = yaml_load_failure(&stderr) {
            error!(
                "Error linting project '{project_name}', problematic playbook: '{path}'"
            );
        } else {
            error!("Error linting project '{project_name}':");
            error!("{}", indent(stderr.trim_end()));
        }
    }

    if stdout.trim().is_empty() {
        info!("No lint output");
        return Ok(None);
    }
    Ok(Some(indent(stdout.trim_end())))
}

/// Extracts the path from an `ansible-lint` "Failed to load YAML file"
/// message.
fn yaml_load_failure(stderr: &str) -> Option<String> {
    let re = Regex::new(r"Failed to load YAML file\n(.+?):\d+").ok()?;
    re.captures(stderr)
        .map(|captures| captures[1].to_string())
}

/// Indents every non-empty line by four spaces.
fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                line.to_string()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_non_empty_lines_only() {
        assert_eq!(indent("a\n\nb"), "    a\n\n    b");
    }

    #[test]
    fn extracts_failing_yaml_path() {
        let stderr = "WARNING  Listing 1 violation(s)\nFailed to load YAML file\n\
                      /srv/ansible/fleet/project/broken.yml:12\n";
        assert_eq!(
            yaml_load_failure(stderr).as_deref(),
            Some("/srv/ansible/fleet/project/broken.yml")
        );
        assert!(yaml_load_failure("some other failure").is_none());
    }
}
