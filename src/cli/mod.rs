//! CLI module for Deckhand.
//!
//! This module provides the command-line interface: argument parsing,
//! shared command context, and subcommand handling.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Deckhand - streamline your Ansible workflow.
///
/// A command-line management layer around Ansible: schedule playbook runs,
/// cache host facts, query inventories, lint playbooks, and turn run
/// artifacts into reports.
#[derive(Parser, Debug, Clone)]
#[command(name = "deckhand")]
#[command(author = "Deckhand Contributors")]
#[command(version)]
#[command(about = "A command-line management layer around Ansible", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "DECKHAND_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Effective verbosity level.
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a playbook and persist run artifacts
    Run(commands::run::RunArgs),

    /// Lint a playbook or project with ansible-lint
    Lint(commands::lint::LintArgs),

    /// Display recap reports for a project's run artifacts
    Report(commands::report::ReportArgs),

    /// Ansible fact cache operations
    #[command(subcommand)]
    Facts(commands::facts::FactsCommand),

    /// Ansible inventory operations
    #[command(subcommand)]
    Inventory(commands::inventory::InventoryCommand),

    /// Scheduled run (crontab) management
    #[command(subcommand)]
    Cron(commands::cron::CronCommand),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the completions command.
#[derive(clap::Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_options() {
        let cli = Cli::parse_from([
            "deckhand",
            "run",
            "fleet",
            "site.yml",
            "--limit",
            "webservers",
            "--extra-vars",
            "env=prod",
            "-vv",
        ]);
        assert_eq!(cli.verbosity(), 2);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.project_name, "fleet");
                assert_eq!(args.playbook_file.as_deref(), Some("site.yml"));
                assert_eq!(args.limit.as_deref(), Some("webservers"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_cron_add_with_cadence() {
        let cli = Cli::parse_from([
            "deckhand", "cron", "add", "fleet", "site.yml", "--cadence", "daily", "--hour", "2",
        ]);
        match cli.command {
            Commands::Cron(commands::cron::CronCommand::Add(args)) => {
                assert_eq!(args.hour, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_rotation() {
        assert!(Cli::try_parse_from([
            "deckhand",
            "run",
            "fleet",
            "site.yml",
            "--rotate-artifacts",
            "99"
        ])
        .is_err());
    }
}
