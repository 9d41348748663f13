//! Run command - execute a playbook and persist run artifacts.

use clap::Parser;

use super::CommandContext;
use crate::error::Result;
use crate::runner::{self, RunOptions, RunStatus};

/// Arguments for the run command.
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Project name
    pub project_name: String,

    /// Playbook file name; omit to list available playbooks
    pub playbook_file: Option<String>,

    /// Number of artifact directories to keep
    #[arg(
        long,
        default_value_t = runner::DEFAULT_ROTATE_ARTIFACTS,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=31)
    )]
    pub rotate_artifacts: usize,

    /// Limit the playbook execution to a specific group or host
    #[arg(long)]
    pub limit: Option<String>,

    /// Pass additional variables as key=value pairs (comma-separated)
    #[arg(long)]
    pub extra_vars: Option<String>,
}

impl RunArgs {
    /// Execute the run command.
    pub async fn execute(&self, ctx: &CommandContext, verbosity: u8) -> Result<i32> {
        ctx.validate_project(&self.project_name)?;

        let Some(playbook_file) = self.playbook_file.as_deref() else {
            ctx.output.plain("Please specify a playbook to run.");
            ctx.list_playbooks(&self.project_name);
            return Ok(0);
        };

        let opts = RunOptions {
            rotate_artifacts: self.rotate_artifacts,
            limit: self.limit.clone().filter(|limit| !limit.is_empty()),
            extra_vars: runner::parse_extra_vars(self.extra_vars.as_deref().unwrap_or_default())?,
            verbosity,
        };

        ctx.output
            .plain(&format!("Running playbook: {playbook_file}"));
        let outcome = match runner::run_playbook(
            &ctx.config.projects_dir,
            &self.project_name,
            playbook_file,
            &opts,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(crate::error::Error::PlaybookNotFound { .. }) => {
                ctx.output.plain(&format!(
                    "Playbook '{playbook_file}' not found in project '{}'",
                    self.project_name
                ));
                ctx.list_playbooks(&self.project_name);
                return Ok(1);
            }
            Err(err) => return Err(err),
        };

        ctx.output.plain(&format!(
            "Playbook run completed with status: {} (artifacts: {})",
            outcome.status,
            outcome.artifact_dir.display()
        ));
        Ok(match outcome.status {
            RunStatus::Successful => 0,
            RunStatus::Failed => outcome.rc.max(1),
        })
    }
}
