//! Subcommands module for the Deckhand CLI.
//!
//! This module contains all the subcommand implementations.

pub mod cron;
pub mod facts;
pub mod inventory;
pub mod lint;
pub mod report;
pub mod run;

use crate::cli::output::OutputFormatter;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::project;

/// Common context shared between commands.
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
}

impl CommandContext {
    /// Create a new command context from CLI arguments.
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let output = OutputFormatter::new(!cli.no_color, cli.verbosity());
        Self { config, output }
    }

    /// Validate a project name and layout, printing the missing-paths
    /// report when the layout is incomplete.
    pub fn validate_project(&self, name: &str) -> Result<()> {
        match project::validate_layout(&self.config.projects_dir, name) {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Error::ProjectLayout {
                    missing_dirs,
                    missing_files,
                    ..
                } = &err
                {
                    self.output
                        .plain("Project is missing required files or directories:");
                    self.output.plain(&format!(
                        " Path: {}",
                        project::project_dir(&self.config.projects_dir, name).display()
                    ));
                    for dir in missing_dirs {
                        self.output.item(&format!("directory: {}", dir.display()));
                    }
                    for file in missing_files {
                        self.output.item(&format!("file: {}", file.display()));
                    }
                    self.output
                        .plain("Please resolve the issues above and try again.");
                }
                Err(err)
            }
        }
    }

    /// Print the playbooks available in a project.
    pub fn list_playbooks(&self, name: &str) {
        self.output
            .plain(&format!("Available playbooks for the '{name}' project:"));
        for playbook in project::find_playbooks(&self.config.projects_dir, name) {
            self.output.item(&playbook);
        }
    }
}
