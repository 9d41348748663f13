//! Fact cache discovery and loading.
//!
//! Scans the projects directory for `artifacts/*/fact_cache` directories and
//! loads the per-host JSON files they contain.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{normalize_hostname, HostFacts};

/// Finds every fact cache directory under the projects directory.
///
/// The deckhand `logs` directory is not a project and is skipped.
pub fn find_cache_dirs(projects_dir: &Path) -> Vec<PathBuf> {
    info!("Looking for fact caches under: {}", projects_dir.display());
    let pattern = projects_dir
        .join("*/artifacts/*/fact_cache")
        .to_string_lossy()
        .into_owned();

    let mut dirs: Vec<PathBuf> = glob::glob(&pattern)
        .into_iter()
        .flatten()
        .flatten()
        .filter(|path| path.is_dir())
        .filter(|path| !path.components().any(|c| c.as_os_str() == "logs"))
        .collect();
    dirs.sort();
    debug!("Found {} fact cache directory(ies)", dirs.len());
    dirs
}

/// Loads host facts from fact cache directories.
///
/// Unreadable or non-JSON files are skipped with a warning. When the same
/// host appears in several caches, the most recently modified file wins.
pub fn load_cache_dirs(cache_dirs: &[PathBuf]) -> HashMap<String, HostFacts> {
    let mut hosts: HashMap<String, HostFacts> = HashMap::new();

    for cache_dir in cache_dirs {
        let entries = match std::fs::read_dir(cache_dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Could not read cache dir '{}': {err}", cache_dir.display());
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(host) = load_host_file(&path) else {
                continue;
            };
            match hosts.get(&host.hostname) {
                Some(existing) if existing.last_modified >= host.last_modified => {}
                _ => {
                    hosts.insert(host.hostname.clone(), host);
                }
            }
        }
    }

    debug!("Loaded facts for {} host(s)", hosts.len());
    hosts
}

fn load_host_file(path: &Path) -> Option<HostFacts> {
    let stem = path.file_stem()?.to_string_lossy();
    let hostname = normalize_hostname(&stem);

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!("Could not read fact file '{}': {err}", path.display());
            return None;
        }
    };
    let facts = match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) => {
            warn!("Fact file '{}' is not a JSON object, skipping", path.display());
            return None;
        }
        Err(err) => {
            warn!("Fact file '{}' is not valid JSON: {err}", path.display());
            return None;
        }
    };

    let last_modified = path
        .metadata()
        .and_then(|meta| meta.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    Some(HostFacts {
        hostname,
        facts,
        last_modified,
    })
}
