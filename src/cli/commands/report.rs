//! Report command - display recap reports for run artifacts.

use clap::Parser;

use super::CommandContext;
use crate::error::Result;
use crate::report;

/// Arguments for the report command.
#[derive(Parser, Debug, Clone)]
pub struct ReportArgs {
    /// Project name
    pub project_name: String,

    /// Display only the last N reports
    #[arg(short = 'l', long)]
    pub last: Option<usize>,
}

impl ReportArgs {
    /// Execute the report command.
    pub async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        ctx.validate_project(&self.project_name)?;

        let artifact_dirs = report::find_artifacts(&ctx.config.projects_dir, &self.project_name);
        let artifact_dirs = report::sort_and_limit(artifact_dirs, self.last);

        if artifact_dirs.is_empty() {
            ctx.output.plain("No artifacts found.");
            return Ok(0);
        }

        for artifact_dir in &artifact_dirs {
            match report::build_report(artifact_dir) {
                Ok(artifact_report) => ctx.output.artifact_report(&artifact_report),
                Err(err) => ctx.output.warning(&format!(
                    "skipping artifact '{}': {err}",
                    artifact_dir.display()
                )),
            }
        }
        Ok(0)
    }
}
