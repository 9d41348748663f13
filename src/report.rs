//! Run artifact reporting.
//!
//! Scans a project's `artifacts/` tree for run directories, extracts the
//! `PLAY RECAP` blocks from their captured output, and parses the per-host
//! counters into report rows.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::project;

/// Per-host counters from a play recap line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostStats {
    pub ok: u64,
    pub changed: u64,
    pub unreachable: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// A parsed report for one artifact directory.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactReport {
    /// Artifact directory the report was built from.
    pub artifact_dir: PathBuf,
    /// Playbook name recovered from the `command` file, when possible.
    pub playbook: Option<String>,
    /// Formatted mtime of the `stdout` file.
    pub finished_at: String,
    /// Host rows in order of appearance.
    pub host_stats: Vec<(String, HostStats)>,
}

/// Finds artifact directories of a project (those containing a `stdout`
/// file).
pub fn find_artifacts(projects_dir: &Path, project_name: &str) -> Vec<PathBuf> {
    let artifacts_root = project::project_dir(projects_dir, project_name).join("artifacts");
    debug!("Scanning for artifacts under '{}'", artifacts_root.display());

    let dirs: Vec<PathBuf> = WalkDir::new(&artifacts_root)
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .filter(|path| path.join("stdout").is_file())
        .collect();
    debug!(
        "Found {} artifact dir(s) for project '{project_name}'",
        dirs.len()
    );
    dirs
}

/// Sorts artifact directories newest first and truncates to the last `n`.
pub fn sort_and_limit(mut artifact_dirs: Vec<PathBuf>, last: Option<usize>) -> Vec<PathBuf> {
    artifact_dirs.sort_by_key(|dir| {
        std::cmp::Reverse(
            dir.join("stdout")
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(std::time::UNIX_EPOCH),
        )
    });
    if let Some(last) = last {
        if last > 0 && last < artifact_dirs.len() {
            artifact_dirs.truncate(last);
        }
    }
    artifact_dirs
}

/// Extracts every `PLAY RECAP` block from captured playbook output.
pub fn extract_play_recaps(content: &str) -> Vec<String> {
    // The recap header is a row of asterisks; the block runs to the next
    // blank line or the end of output.
    let re = Regex::new(r"(?s)PLAY RECAP\s+\*+\s+(.*?)(\n\n|$)")
        .expect("recap regex is valid");
    let recaps: Vec<String> = re
        .captures_iter(content)
        .map(|captures| captures[1].to_string())
        .collect();
    if recaps.is_empty() {
        warn!("Could not find a play recap");
    }
    recaps
}

/// Parses the per-host counters out of a recap block.
///
/// Lines that do not look like recap rows are skipped; counters Ansible
/// did not print default to zero.
pub fn parse_host_stats(recap: &str) -> Vec<(String, HostStats)> {
    let mut rows = Vec::new();
    for line in recap.lines() {
        let Some((host, counters)) = line.split_once(':') else {
            continue;
        };
        let mut stats = HostStats::default();
        let mut parsed_any = false;
        for token in counters.split_whitespace() {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            let Ok(count) = value.parse::<u64>() else {
                continue;
            };
            parsed_any = true;
            match key {
                "ok" => stats.ok = count,
                "changed" => stats.changed = count,
                "unreachable" => stats.unreachable = count,
                "failed" => stats.failed = count,
                "skipped" => stats.skipped = count,
                _ => {}
            }
        }
        if parsed_any {
            rows.push((host.trim().to_string(), stats));
        }
    }
    rows
}

/// Recovers the playbook name from an artifact's `command` file.
pub fn playbook_name(artifact_dir: &Path) -> Option<String> {
    let command_path = artifact_dir.join("command");
    let content = std::fs::read_to_string(&command_path).ok()?;
    let data: serde_json::Value = serde_json::from_str(&content).ok()?;
    let argv: Vec<String> = data
        .get("command")?
        .as_array()?
        .iter()
        .filter_map(|arg| arg.as_str().map(str::to_string))
        .collect();
    let joined = argv.join(" ");

    let re = Regex::new(r"project/([\w-]+\.ya?ml)").expect("playbook regex is valid");
    let name = re.captures(&joined).map(|captures| captures[1].to_string());
    if name.is_none() {
        warn!(
            "Could not extract playbook name from '{}'",
            command_path.display()
        );
    }
    name
}

/// Formats the mtime of an artifact's `stdout` file.
pub fn artifact_timestamp(artifact_dir: &Path) -> Option<String> {
    let mtime = artifact_dir
        .join("stdout")
        .metadata()
        .and_then(|meta| meta.modified())
        .ok()?;
    let local: DateTime<Local> = mtime.into();
    Some(local.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Builds a report for one artifact directory.
pub fn build_report(artifact_dir: &Path) -> Result<ArtifactReport> {
    let content = std::fs::read_to_string(artifact_dir.join("stdout"))?;

    let mut host_stats = Vec::new();
    for recap in extract_play_recaps(&content) {
        host_stats.extend(parse_host_stats(&recap));
    }

    Ok(ArtifactReport {
        artifact_dir: artifact_dir.to_path_buf(),
        playbook: playbook_name(artifact_dir),
        finished_at: artifact_timestamp(artifact_dir).unwrap_or_else(|| "unknown".to_string()),
        host_stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STDOUT: &str = "\
PLAY [Configure web servers] **************************************************

TASK [Gathering Facts] ********************************************************
ok: [web01]

PLAY RECAP *********************************************************************
web01                      : ok=5    changed=2    unreachable=0    failed=0    skipped=1    rescued=0    ignored=0
web02                      : ok=4    changed=0    unreachable=1    failed=1    skipped=0    rescued=0    ignored=0

";

    #[test]
    fn extracts_recap_blocks() {
        let recaps = extract_play_recaps(STDOUT);
        assert_eq!(recaps.len(), 1);
        assert!(recaps[0].starts_with("web01"));
        assert!(recaps[0].contains("web02"));
    }

    #[test]
    fn recap_at_end_of_output_without_trailing_blank() {
        let content = "PLAY RECAP ****\nweb01 : ok=1 changed=0 failed=0";
        let recaps = extract_play_recaps(content);
        assert_eq!(recaps.len(), 1);
    }

    #[test]
    fn parses_host_counters() {
        let recaps = extract_play_recaps(STDOUT);
        let stats = parse_host_stats(&recaps[0]);
        assert_eq!(stats.len(), 2);

        let (host, web01) = &stats[0];
        assert_eq!(host, "web01");
        assert_eq!(
            *web01,
            HostStats {
                ok: 5,
                changed: 2,
                unreachable: 0,
                failed: 0,
                skipped: 1
            }
        );
        let (_, web02) = &stats[1];
        assert_eq!(web02.unreachable, 1);
        assert_eq!(web02.failed, 1);
    }

    #[test]
    fn skips_noise_lines_in_recaps() {
        let stats = parse_host_stats("not a recap line\nweb01 : ok=1\n");
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].1.ok, 1);
        // Missing counters default to zero.
        assert_eq!(stats[0].1.failed, 0);
    }

    #[test]
    fn sort_and_limit_truncates_only_in_range() {
        let dirs = vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")];
        assert_eq!(sort_and_limit(dirs.clone(), None).len(), 3);
        assert_eq!(sort_and_limit(dirs.clone(), Some(0)).len(), 3);
        assert_eq!(sort_and_limit(dirs.clone(), Some(2)).len(), 2);
        assert_eq!(sort_and_limit(dirs, Some(9)).len(), 3);
    }

    #[test]
    fn playbook_name_from_command_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("command"),
            r#"{"command": ["ansible-playbook", "/srv/fleet/project/site.yml", "-i", "inventory"]}"#,
        )
        .unwrap();
        assert_eq!(playbook_name(tmp.path()).as_deref(), Some("site.yml"));
    }

    #[test]
    fn playbook_name_absent_when_command_is_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(playbook_name(tmp.path()).is_none());
    }
}
