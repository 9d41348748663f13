//! Facts commands - collect, query, and prune the host fact cache.

use std::path::PathBuf;

use clap::Subcommand;

use super::CommandContext;
use crate::error::Result;
use crate::facts::{self, FactStore};

/// Fact cache operations.
#[derive(Subcommand, Debug, Clone)]
pub enum FactsCommand {
    /// Collect facts from fact cache directories into the database
    Collect {
        /// Directory to search for fact caches (defaults to the projects
        /// directory)
        #[arg(short = 'd', long)]
        directory: Option<PathBuf>,
    },

    /// Query facts for a specific host
    Query {
        /// Hostname to query
        hostname: String,
        /// Only show facts whose key contains this string
        fact_key: Option<String>,
    },

    /// Find all hosts with a matching fact key/value pair
    Find {
        /// Fact key substring to match
        fact_key: String,
        /// Fact value substring to match
        fact_value: String,
    },

    /// Remove a host entry from the database
    Remove {
        /// Hostname to remove
        hostname: String,
    },

    /// List all hosts in the database
    Hosts,
}

impl FactsCommand {
    /// Execute a facts subcommand.
    pub async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let store = FactStore::open(ctx.config.db_path()).await?;
        match self {
            FactsCommand::Collect { directory } => {
                let directory = directory
                    .clone()
                    .unwrap_or_else(|| ctx.config.projects_dir.clone());
                let cache_dirs = facts::find_cache_dirs(&directory);
                let hosts = facts::load_cache_dirs(&cache_dirs);
                let changed = store.store(hosts.into_values().collect()).await?;

                if changed.is_empty() {
                    ctx.output.plain(&format!(
                        "No new or modified facts found in {}.",
                        directory.display()
                    ));
                } else {
                    ctx.output
                        .plain(&format!("Collected facts from {}:", directory.display()));
                    for hostname in changed {
                        ctx.output.plain(&format!("  {hostname}"));
                    }
                }
            }
            FactsCommand::Query { hostname, fact_key } => {
                match store.host_facts(hostname, fact_key.as_deref()).await? {
                    None => {
                        ctx.output
                            .plain(&format!("Host '{hostname}' not found in the database."));
                        return Ok(1);
                    }
                    Some(host_facts) => {
                        if host_facts.is_empty() {
                            if let Some(key) = fact_key {
                                ctx.output.plain(&format!(
                                    "No facts matching '{key}' for host '{hostname}'."
                                ));
                            }
                        }
                        for (key, value) in host_facts {
                            ctx.output
                                .plain(&format!("{key}: {}", facts::render(&value)));
                        }
                    }
                }
            }
            FactsCommand::Find {
                fact_key,
                fact_value,
            } => {
                let matches = store.find_hosts(fact_key, fact_value).await?;
                if matches.is_empty() {
                    ctx.output.plain(&format!(
                        "No hosts found with '{fact_key}' containing '{fact_value}'."
                    ));
                    return Ok(0);
                }
                ctx.output.plain(&format!(
                    "Hosts with '{fact_key}' containing '{fact_value}':"
                ));
                for (hostname, matching) in matches {
                    ctx.output.plain(&format!("  Hostname: {hostname}"));
                    ctx.output.plain("  Matching fact(s):");
                    ctx.output
                        .plain(&serde_json::to_string_pretty(&matching)?);
                }
            }
            FactsCommand::Remove { hostname } => {
                if store.remove(hostname).await? {
                    ctx.output
                        .plain(&format!("Removed host '{hostname}' from the database."));
                } else {
                    ctx.output
                        .plain(&format!("Host '{hostname}' not found in the database."));
                    return Ok(1);
                }
            }
            FactsCommand::Hosts => {
                let hostnames = store.hostnames().await?;
                if hostnames.is_empty() {
                    ctx.output.plain(&format!(
                        "No hosts found in database: {}",
                        ctx.config.db_path().display()
                    ));
                    return Ok(0);
                }
                for hostname in hostnames {
                    ctx.output.plain(&format!("  {hostname}"));
                }
            }
        }
        Ok(0)
    }
}
