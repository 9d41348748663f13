//! Cron commands - manage scheduled playbook runs in the user crontab.

use clap::{Parser, Subcommand, ValueEnum};
use dialoguer::Confirm;

use super::CommandContext;
use crate::cron::{Cadence, Scheduler};
use crate::error::Result;
use crate::project;

/// Scheduled run operations.
#[derive(Subcommand, Debug, Clone)]
pub enum CronCommand {
    /// Schedule a recurring playbook run
    Add(AddArgs),

    /// List all managed crontab entries
    List,

    /// Remove managed entries matching a pattern
    Remove {
        /// Pattern matched against entry markers (case-insensitive)
        pattern: String,
        /// Skip the confirmation prompt
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Remove all managed entries, or those of a single project
    Wipe {
        /// Only wipe entries for this project
        project_name: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short = 'f', long)]
        force: bool,
    },
}

/// How often the scheduled run repeats.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceArg {
    /// Every hour at --minute
    Hourly,
    /// Every day at --hour
    Daily,
}

/// Arguments for the cron add command.
#[derive(Parser, Debug, Clone)]
pub struct AddArgs {
    /// Project name
    pub project_name: String,

    /// Playbook file name
    pub playbook_file: String,

    /// Run cadence
    #[arg(long, value_enum, default_value_t = CadenceArg::Hourly)]
    pub cadence: CadenceArg,

    /// Minute of the hour for hourly runs (0-59)
    #[arg(long, default_value_t = 30)]
    pub minute: u8,

    /// Hour of the day for daily runs (0-23)
    #[arg(long, default_value_t = 4)]
    pub hour: u8,
}

impl AddArgs {
    fn cadence(&self) -> Cadence {
        match self.cadence {
            CadenceArg::Hourly => Cadence::Hourly {
                minute: self.minute,
            },
            CadenceArg::Daily => Cadence::Daily { hour: self.hour },
        }
    }
}

impl CronCommand {
    /// Execute a cron subcommand.
    pub async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let scheduler = Scheduler::from_config(&ctx.config);
        match self {
            CronCommand::Add(args) => {
                ctx.validate_project(&args.project_name)?;
                if project::playbook_path(
                    &ctx.config.projects_dir,
                    &args.project_name,
                    &args.playbook_file,
                )
                .is_none()
                {
                    ctx.output.plain(&format!(
                        "Playbook '{}' not found in project '{}'",
                        args.playbook_file, args.project_name
                    ));
                    ctx.list_playbooks(&args.project_name);
                    return Ok(1);
                }

                match scheduler
                    .add(&args.project_name, &args.playbook_file, args.cadence())
                    .await?
                {
                    Some(entry) => ctx.output.plain(&format!("Added crontab entry: {entry}")),
                    None => ctx
                        .output
                        .plain("A similar crontab entry already exists, nothing to do."),
                }
            }
            CronCommand::List => {
                let entries = scheduler.list().await?;
                if entries.is_empty() {
                    ctx.output.plain("No managed crontab entries found.");
                    return Ok(0);
                }
                ctx.output.plain("Managed crontab entries:");
                for entry in entries {
                    ctx.output.item(&entry.to_string());
                }
            }
            CronCommand::Remove { pattern, force } => {
                let matches = scheduler.find(pattern).await?;
                if matches.is_empty() {
                    ctx.output
                        .plain(&format!("No crontab entries matching '{pattern}'."));
                    return Ok(0);
                }
                ctx.output.plain("The following entries will be removed:");
                for entry in &matches {
                    ctx.output.item(&entry.to_string());
                }
                if !force && !confirm("Remove these entries?")? {
                    ctx.output.plain("Aborted.");
                    return Ok(0);
                }
                let removed = scheduler.remove(pattern).await?;
                ctx.output
                    .plain(&format!("Removed {removed} crontab entry(ies)."));
            }
            CronCommand::Wipe {
                project_name,
                force,
            } => {
                let prompt = match project_name {
                    Some(name) => format!("Remove all managed entries for project '{name}'?"),
                    None => "Remove ALL managed crontab entries?".to_string(),
                };
                if !force && !confirm(&prompt)? {
                    ctx.output.plain("Aborted.");
                    return Ok(0);
                }
                let removed = scheduler.wipe(project_name.as_deref()).await?;
                ctx.output
                    .plain(&format!("Removed {removed} crontab entry(ies)."));
            }
        }
        Ok(0)
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|err| crate::error::Error::Config(format!("confirmation prompt failed: {err}")))
}
