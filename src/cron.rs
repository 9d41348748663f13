//! Cron scheduling for periodic playbook runs.
//!
//! Deckhand schedules runs through the user crontab, shelling out to the
//! `crontab` binary (`crontab -l` to read, `crontab -` to write). Managed
//! entries carry a trailing marker comment so they can be listed and removed
//! without disturbing anything else in the crontab:
//!
//! ```text
//! 30 * * * * /srv/ansible/deckhand_run.sh fleet site.yml # #Deckhand-fleet
//! ```
//!
//! Foreign lines are preserved byte-for-byte on every rewrite.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};

/// How often a scheduled run repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Every hour at the given minute (0-59).
    Hourly {
        /// Minute of the hour
        minute: u8,
    },
    /// Every day at the given hour (0-23), on the hour.
    Daily {
        /// Hour of the day
        hour: u8,
    },
}

impl Cadence {
    /// Validates the minute/hour range.
    pub fn validate(self) -> Result<()> {
        match self {
            Cadence::Hourly { minute } if minute > 59 => Err(Error::InvalidSchedule(format!(
                "minute {minute} is out of range, choose between 0 and 59"
            ))),
            Cadence::Daily { hour } if hour > 23 => Err(Error::InvalidSchedule(format!(
                "hour {hour} is out of range, choose between 0 and 23"
            ))),
            _ => Ok(()),
        }
    }

    /// Renders the five-field cron schedule.
    pub fn schedule(self) -> String {
        match self {
            Cadence::Hourly { minute } => format!("{minute} * * * *"),
            Cadence::Daily { hour } => format!("0 {hour} * * *"),
        }
    }
}

/// A deckhand-managed crontab entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronEntry {
    /// Five-field cron schedule.
    pub schedule: String,
    /// Command the entry runs.
    pub command: String,
    /// Marker comment, starting with the configured tag.
    pub marker: String,
}

impl fmt::Display for CronEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} # {}", self.schedule, self.command, self.marker)
    }
}

/// Splits a crontab line into its five schedule fields and the remainder.
fn split_schedule(line: &str) -> Option<(String, &str)> {
    let mut rest = line.trim_start();
    let mut fields = Vec::with_capacity(5);
    for _ in 0..5 {
        let end = rest.find(char::is_whitespace)?;
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    if rest.is_empty() {
        return None;
    }
    Some((fields.join(" "), rest))
}

/// Parses a crontab line into a managed entry.
///
/// Returns `None` for blank lines, comments, malformed lines, and entries
/// not carrying the deckhand marker.
pub fn parse_line(line: &str, tag: &str) -> Option<CronEntry> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let (schedule, rest) = split_schedule(trimmed)?;
    let (command, marker) = rest.rsplit_once(" # ")?;
    if !marker.starts_with(tag) {
        return None;
    }
    Some(CronEntry {
        schedule,
        command: command.trim().to_string(),
        marker: marker.trim().to_string(),
    })
}

/// Manages deckhand entries in the user crontab.
pub struct Scheduler {
    tag: String,
    run_script: PathBuf,
}

impl Scheduler {
    /// Creates a scheduler with an explicit tag and run script.
    pub fn new(tag: impl Into<String>, run_script: impl Into<PathBuf>) -> Self {
        Self {
            tag: tag.into(),
            run_script: run_script.into(),
        }
    }

    /// Creates a scheduler from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cron_tag.clone(), config.run_script())
    }

    /// Adds a new scheduled run.
    ///
    /// Returns `Ok(None)` when an entry with the same command and schedule
    /// already exists.
    pub async fn add(
        &self,
        project: &str,
        playbook: &str,
        cadence: Cadence,
    ) -> Result<Option<CronEntry>> {
        cadence.validate()?;

        let entry = CronEntry {
            schedule: cadence.schedule(),
            command: format!("{} {project} {playbook}", self.run_script.display()),
            marker: format!("{}{project}", self.tag),
        };

        let text = read_crontab().await?;
        let duplicate = self
            .entries(&text)
            .iter()
            .any(|existing| existing.command == entry.command && existing.schedule == entry.schedule);
        if duplicate {
            info!("A similar cron entry already exists, skipping creation");
            return Ok(None);
        }

        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        lines.push(entry.to_string());
        write_crontab(&(lines.join("\n") + "\n")).await?;
        info!("Added cron entry for project '{project}' with playbook '{playbook}'");
        Ok(Some(entry))
    }

    /// Lists all deckhand-managed entries.
    pub async fn list(&self) -> Result<Vec<CronEntry>> {
        let text = read_crontab().await?;
        let entries = self.entries(&text);
        debug!("Found {} managed cron entry(ies)", entries.len());
        Ok(entries)
    }

    /// Finds managed entries whose marker contains `pattern`
    /// (case-insensitive).
    pub async fn find(&self, pattern: &str) -> Result<Vec<CronEntry>> {
        let needle = pattern.to_lowercase();
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|entry| entry.marker.to_lowercase().contains(&needle))
            .collect())
    }

    /// Removes every managed entry whose marker contains `pattern`
    /// (case-insensitive). Returns the number of entries removed.
    pub async fn remove(&self, pattern: &str) -> Result<usize> {
        let needle = pattern.to_lowercase();
        self.rewrite(|entry| entry.marker.to_lowercase().contains(&needle))
            .await
    }

    /// Removes all managed entries, or only those belonging to `project`.
    pub async fn wipe(&self, project: Option<&str>) -> Result<usize> {
        match project {
            Some(name) => {
                let marker = format!("{}{name}", self.tag);
                self.rewrite(|entry| entry.marker == marker).await
            }
            None => self.rewrite(|_| true).await,
        }
    }

    fn entries(&self, text: &str) -> Vec<CronEntry> {
        text.lines()
            .filter_map(|line| parse_line(line, &self.tag))
            .collect()
    }

    /// Rewrites the crontab, dropping managed lines matching the predicate.
    async fn rewrite<F>(&self, should_remove: F) -> Result<usize>
    where
        F: Fn(&CronEntry) -> bool,
    {
        let text = read_crontab().await?;
        let mut removed = 0;
        let kept: Vec<&str> = text
            .lines()
            .filter(|line| {
                match parse_line(line, &self.tag) {
                    Some(entry) if should_remove(&entry) => {
                        debug!("Removing cron entry: '{entry}'");
                        removed += 1;
                        false
                    }
                    _ => true,
                }
            })
            .collect();

        if removed > 0 {
            let mut output = kept.join("\n");
            if !output.is_empty() {
                output.push('\n');
            }
            write_crontab(&output).await?;
            info!("Removed {removed} cron entry(ies)");
        }
        Ok(removed)
    }
}

/// Reads the current user crontab. An absent crontab reads as empty.
async fn read_crontab() -> Result<String> {
    let output = Command::new("crontab")
        .arg("-l")
        .output()
        .await
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::tool_missing("crontab"),
            _ => Error::Io(err),
        })?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.to_lowercase().contains("no crontab") {
        debug!("No crontab for the current user");
        return Ok(String::new());
    }
    Err(Error::CrontabRead(stderr.trim().to_string()))
}

/// Replaces the user crontab with `text` via `crontab -`.
async fn write_crontab(text: &str) -> Result<()> {
    let mut child = Command::new("crontab")
        .arg("-")
        .stdin(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::tool_missing("crontab"),
            _ => Error::Io(err),
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes()).await?;
    }
    let output = child.wait_with_output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::CrontabWrite(stderr.trim().to_string()));
    }
    Ok(())
}
