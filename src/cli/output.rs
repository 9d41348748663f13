//! Output formatting for the Deckhand CLI.
//!
//! User-facing output goes through this formatter; diagnostics go through
//! `tracing`. Colors are disabled by `--no-color` or the `NO_COLOR`
//! environment variable.

use colored::Colorize;

use crate::report::{ArtifactReport, HostStats};

/// Output formatter for CLI messages and report tables.
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// Verbosity level
    verbosity: u8,
}

impl OutputFormatter {
    /// Create a new output formatter.
    pub fn new(use_color: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        Self {
            use_color,
            verbosity,
        }
    }

    /// Print a plain line.
    pub fn plain(&self, message: &str) {
        println!("{message}");
    }

    /// Print an informational message.
    pub fn info(&self, message: &str) {
        println!("{message}");
    }

    /// Print a debug message (only at verbosity >= 2).
    pub fn debug(&self, message: &str) {
        if self.verbosity >= 2 {
            if self.use_color {
                println!("{}", message.bright_black());
            } else {
                println!("{message}");
            }
        }
    }

    /// Print a warning message.
    pub fn warning(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {message}", "warning:".yellow().bold());
        } else {
            eprintln!("warning: {message}");
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {message}", "error:".red().bold());
        } else {
            eprintln!("error: {message}");
        }
    }

    /// Print a section header.
    pub fn section(&self, title: &str) {
        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{title}");
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print a single bullet item.
    pub fn item(&self, text: &str) {
        println!(" - {text}");
    }

    /// Print an artifact report: header line plus an aligned host table.
    pub fn artifact_report(&self, report: &ArtifactReport) {
        self.section(&format!("Report for {}", report.artifact_dir.display()));
        self.plain(&format!(
            "{} completed at: {}",
            report.playbook.as_deref().unwrap_or("Playbook"),
            report.finished_at
        ));
        if report.host_stats.is_empty() {
            self.warning("no play recap found in this artifact");
            return;
        }
        self.host_table(&report.host_stats);
        println!();
    }

    /// Print an aligned host/counter table.
    pub fn host_table(&self, rows: &[(String, HostStats)]) {
        let host_width = rows
            .iter()
            .map(|(host, _)| host.len())
            .chain(std::iter::once("Host".len()))
            .max()
            .unwrap_or(4);

        let header = format!(
            "{:<host_width$}  {:>6}  {:>7}  {:>11}  {:>6}  {:>7}",
            "Host", "ok", "changed", "unreachable", "failed", "skipped"
        );
        if self.use_color {
            println!("{}", header.bold());
        } else {
            println!("{header}");
        }

        for (host, stats) in rows {
            let line = format!(
                "{host:<host_width$}  {:>6}  {:>7}  {:>11}  {:>6}  {:>7}",
                stats.ok, stats.changed, stats.unreachable, stats.failed, stats.skipped
            );
            if self.use_color && (stats.failed > 0 || stats.unreachable > 0) {
                println!("{}", line.red());
            } else if self.use_color && stats.changed > 0 {
                println!("{}", line.yellow());
            } else {
                println!("{line}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatter_builds_without_color() {
        let output = OutputFormatter::new(false, 0);
        assert!(!output.use_color);
    }
}
