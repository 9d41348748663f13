//! Project directory layout helpers.
//!
//! Deckhand projects follow the ansible-runner private-data-dir convention:
//! playbooks under `project/`, inventory sources under `inventory/`, runner
//! environment files under `env/`, and run artifacts under `artifacts/`.
//! This module validates that layout and locates playbooks within it.

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::error::{Error, Result};

/// Directories every project must contain.
const REQUIRED_DIRS: [&str; 3] = ["project", "inventory", "env"];

/// Files every project must contain, relative to the project directory.
const REQUIRED_FILES: [&str; 3] = ["project/main.yml", "env/envvars", "env/ssh_key"];

/// Returns the directory of a project inside the projects directory.
pub fn project_dir(projects_dir: &Path, name: &str) -> PathBuf {
    projects_dir.join(name)
}

/// Validates a project name.
///
/// Names are used as directory names and crontab markers, so only
/// alphanumeric characters, dashes, and underscores are accepted.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        error!("Project name '{name}' is not valid");
        return Err(Error::ProjectName(name.to_string()));
    }
    Ok(())
}

/// Checks that a project directory is a valid ansible-runner input tree.
///
/// Returns [`Error::ProjectLayout`] naming every missing directory and file.
pub fn validate_layout(projects_dir: &Path, name: &str) -> Result<()> {
    validate_name(name)?;
    let root = project_dir(projects_dir, name);
    debug!("Checking required files and directories under '{}'", root.display());

    let missing_dirs: Vec<PathBuf> = REQUIRED_DIRS
        .iter()
        .map(|dir| root.join(dir))
        .filter(|path| !path.is_dir())
        .collect();
    let missing_files: Vec<PathBuf> = REQUIRED_FILES
        .iter()
        .map(|file| root.join(file))
        .filter(|path| !path.is_file())
        .collect();

    if missing_dirs.is_empty() && missing_files.is_empty() {
        debug!("Project '{name}' layout is valid");
        return Ok(());
    }
    error!(
        "Project '{name}' is missing {} directories and {} files",
        missing_dirs.len(),
        missing_files.len()
    );
    Err(Error::ProjectLayout {
        project: name.to_string(),
        missing_dirs,
        missing_files,
    })
}

/// Finds all playbook file names for a project: the `*.yml` files first,
/// then the `*.yaml` files, each batch sorted.
pub fn find_playbooks(projects_dir: &Path, name: &str) -> Vec<String> {
    let playbook_dir = project_dir(projects_dir, name).join("project");
    debug!("Finding playbooks under '{}'", playbook_dir.display());

    let mut playbooks = Vec::new();
    for wanted in ["yml", "yaml"] {
        let mut batch: Vec<String> = std::fs::read_dir(&playbook_dir)
            .into_iter()
            .flatten()
            .flatten()
            .filter(|entry| entry.path().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|ext| ext.to_str()) == Some(wanted)
            })
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        batch.sort();
        playbooks.extend(batch);
    }
    debug!("Found {} playbook(s) for '{name}'", playbooks.len());
    playbooks
}

/// Returns the path of a playbook file if it exists within the project.
pub fn playbook_path(projects_dir: &Path, name: &str, playbook_file: &str) -> Option<PathBuf> {
    let path = project_dir(projects_dir, name)
        .join("project")
        .join(playbook_file);
    if path.is_file() {
        debug!("Found playbook: '{}'", path.display());
        Some(path)
    } else {
        error!("Playbook '{playbook_file}' does not exist for project '{name}'");
        None
    }
}

/// Lists project directories, excluding the deckhand `logs` directory.
pub fn list_projects(projects_dir: &Path) -> Result<Vec<String>> {
    let mut projects: Vec<String> = std::fs::read_dir(projects_dir)?
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name != "logs")
        .collect();
    projects.sort();
    Ok(projects)
}
