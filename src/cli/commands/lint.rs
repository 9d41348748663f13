//! Lint command - run ansible-lint against a playbook or project.

use clap::Parser;

use super::CommandContext;
use crate::error::Result;
use crate::lint;

/// Arguments for the lint command.
#[derive(Parser, Debug, Clone)]
pub struct LintArgs {
    /// Project name
    pub project_name: String,

    /// Playbook file name; omit to lint the whole project
    pub playbook_file: Option<String>,
}

impl LintArgs {
    /// Execute the lint command.
    pub async fn execute(&self, ctx: &CommandContext, verbosity: u8) -> Result<i32> {
        ctx.validate_project(&self.project_name)?;

        if !lint::available().await {
            ctx.output.error("ansible-lint is not installed.");
            return Ok(2);
        }

        match self.playbook_file.as_deref() {
            Some(playbook) => ctx.output.plain(&format!("Linting '{playbook}'...")),
            None => ctx.output.plain(&format!(
                "Linting all playbooks in project '{}'...",
                self.project_name
            )),
        }

        let result = lint::lint(
            &ctx.config.projects_dir,
            &self.project_name,
            self.playbook_file.as_deref(),
            verbosity,
        )
        .await?;

        if let Some(output) = result {
            ctx.output.plain(&output);
            ctx.output.plain("Done linting.");
            return Ok(1);
        }
        ctx.output.plain("Done linting.");
        Ok(0)
    }
}
