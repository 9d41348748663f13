//! Inventory commands - host/group membership and DNS resolution checks.

use std::path::PathBuf;
use std::time::Duration;

use clap::Subcommand;

use super::CommandContext;
use crate::error::Result;
use crate::inventory::{self, Inventory};

/// Inventory operations.
#[derive(Subcommand, Debug, Clone)]
pub enum InventoryCommand {
    /// Display all groups a host belongs to
    HostGroups {
        /// Project name
        project_name: String,
        /// Host name
        hostname: String,
    },

    /// Display hosts in a group, or the whole inventory grouped
    ListHosts {
        /// Project name
        project_name: String,
        /// Group name; omit to list every group
        group_name: Option<String>,
    },

    /// Check DNS resolution for all hosts in the inventory
    CheckDns {
        /// Project name
        project_name: String,
        /// DNS server to check against (repeatable; defaults from config)
        #[arg(long = "dns-server")]
        dns_servers: Vec<String>,
        /// Per-lookup timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Write results to a CSV file instead of the terminal
        #[arg(long)]
        outfile: Option<PathBuf>,
    },
}

impl InventoryCommand {
    /// Execute an inventory subcommand.
    pub async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let project_name = match self {
            InventoryCommand::HostGroups { project_name, .. }
            | InventoryCommand::ListHosts { project_name, .. }
            | InventoryCommand::CheckDns { project_name, .. } => project_name,
        };
        ctx.validate_project(project_name)?;

        match self {
            InventoryCommand::HostGroups {
                project_name,
                hostname,
            } => {
                let inv = Inventory::load_project(&ctx.config.projects_dir, project_name)?;
                if inv.host(hostname).is_none() {
                    ctx.output
                        .plain(&format!("Host '{hostname}' not found in the inventory."));
                    return Ok(1);
                }
                ctx.output.plain(&format!(
                    "Host '{hostname}' is a member of the following groups:"
                ));
                for group in inv.groups_for_host(hostname) {
                    ctx.output.item(&group);
                }
            }
            InventoryCommand::ListHosts {
                project_name,
                group_name,
            } => {
                let inv = Inventory::load_project(&ctx.config.projects_dir, project_name)?;
                match group_name {
                    None => {
                        for group in inv.group_names() {
                            ctx.output.plain(&format!("[{group}]"));
                            for host in inv.hosts_for_group(&group).unwrap_or_default() {
                                ctx.output.plain(&host);
                            }
                            ctx.output.plain("");
                        }
                    }
                    Some(group) => {
                        let Some(hosts) = inv.hosts_for_group(group) else {
                            ctx.output
                                .plain(&format!("Group '{group}' not found in the inventory."));
                            return Ok(1);
                        };
                        ctx.output.plain(&format!("[{group}]"));
                        for host in hosts {
                            ctx.output.plain(&host);
                        }
                    }
                }
            }
            InventoryCommand::CheckDns {
                project_name,
                dns_servers,
                timeout,
                outfile,
            } => {
                let inv = Inventory::load_project(&ctx.config.projects_dir, project_name)?;
                let servers = if dns_servers.is_empty() {
                    ctx.config.dns_servers.clone()
                } else {
                    dns_servers.clone()
                };
                let timeout =
                    Duration::from_secs(timeout.unwrap_or(ctx.config.dns_timeout_secs));

                let results = inventory::check_resolution(&inv, &servers, timeout).await?;
                if results.is_empty() {
                    ctx.output
                        .plain("All inventory hosts resolved on every DNS server.");
                    return Ok(0);
                }

                if let Some(path) = outfile {
                    inventory::write_csv(&results, path)?;
                    ctx.output
                        .plain(&format!("Wrote DNS report to {}", path.display()));
                } else {
                    ctx.output.plain(
                        "The following hosts are not resolvable with the following DNS targets:",
                    );
                    for result in &results {
                        ctx.output.plain(&format!(
                            "  {}: {}",
                            result.hostname,
                            result.failed_servers.join(", ")
                        ));
                    }
                }
                return Ok(1);
            }
        }
        Ok(0)
    }
}
