//! Ansible inventory resolution.
//!
//! Loads a project's `inventory/` directory into hosts and groups. Both
//! YAML inventories (`all:` / `children:` / `hosts:` nesting) and INI
//! inventories (`[group]`, `[group:children]`, `[group:vars]`) are
//! understood; every readable file in the directory contributes. All hosts
//! implicitly belong to the `all` group.
//!
//! Also provides the DNS resolution check behind `inventory check-dns`,
//! which shells out to `nslookup` per host and server - the point of the
//! check is to see what the operator's own resolver toolchain sees.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::project;

/// Host information.
#[derive(Debug, Clone, Serialize)]
pub struct HostInfo {
    pub name: String,
    pub groups: Vec<String>,
    pub vars: HashMap<String, serde_yaml::Value>,
}

/// Group information.
#[derive(Debug, Clone, Serialize)]
pub struct GroupInfo {
    pub name: String,
    pub hosts: Vec<String>,
    pub children: Vec<String>,
    pub vars: HashMap<String, serde_yaml::Value>,
}

/// A resolved inventory: hosts and groups with their memberships.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Inventory {
    hosts: HashMap<String, HostInfo>,
    groups: HashMap<String, GroupInfo>,
}

impl Inventory {
    /// Loads the inventory of a project.
    pub fn load_project(projects_dir: &Path, project_name: &str) -> Result<Self> {
        let dir = project::project_dir(projects_dir, project_name).join("inventory");
        if !dir.is_dir() {
            return Err(Error::InventoryMissing(dir));
        }
        Self::load_dir(&dir)
    }

    /// Loads every readable inventory file in a directory.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        info!("Loading inventory from '{}'", dir.display());
        let mut inventory = Inventory::default();

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        for path in paths {
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    warn!("Skipping unreadable inventory file '{}': {err}", path.display());
                    continue;
                }
            };
            let is_yaml = matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yml" | "yaml")
            );
            if is_yaml {
                inventory.parse_yaml(&content)?;
            } else {
                // Extensionless files are commonly INI; only a document that
                // parses to a YAML mapping is treated as YAML.
                match serde_yaml::from_str::<serde_yaml::Value>(&content) {
                    Ok(yaml) if yaml.is_mapping() => inventory.parse_yaml(&content)?,
                    _ => inventory.parse_ini(&content),
                }
            }
        }

        debug!(
            "Inventory loaded: {} host(s), {} group(s)",
            inventory.hosts.len(),
            inventory.groups.len()
        );
        Ok(inventory)
    }

    /// Parses a YAML inventory document into this inventory.
    fn parse_yaml(&mut self, content: &str) -> Result<()> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;

        if let Some(mapping) = yaml.as_mapping() {
            for (key, value) in mapping {
                if let Some(group_name) = key.as_str() {
                    self.parse_group(group_name, value);
                }
            }
        }
        Ok(())
    }

    /// Parses a group node: `hosts`, `children`, and `vars` sections.
    fn parse_group(&mut self, name: &str, value: &serde_yaml::Value) {
        self.ensure_group(name);

        if let Some(hosts) = value.get("hosts").and_then(|h| h.as_mapping()) {
            for (host_key, host_value) in hosts {
                let Some(host_name) = host_key.as_str() else {
                    continue;
                };
                let mut vars = HashMap::new();
                if let Some(mapping) = host_value.as_mapping() {
                    for (var_key, var_value) in mapping {
                        if let Some(var_name) = var_key.as_str() {
                            vars.insert(var_name.to_string(), var_value.clone());
                        }
                    }
                }
                self.add_host(host_name, name, vars);
            }
        }

        if let Some(children) = value.get("children").and_then(|c| c.as_mapping()) {
            for (child_key, child_value) in children {
                let Some(child_name) = child_key.as_str() else {
                    continue;
                };
                self.parse_group(child_name, child_value);
                let group = self.ensure_group(name);
                if !group.children.contains(&child_name.to_string()) {
                    group.children.push(child_name.to_string());
                }
            }
        }

        if let Some(vars) = value.get("vars").and_then(|v| v.as_mapping()) {
            let group = self.ensure_group(name);
            for (var_key, var_value) in vars {
                if let Some(var_name) = var_key.as_str() {
                    group.vars.insert(var_name.to_string(), var_value.clone());
                }
            }
        }
    }

    /// Parses an INI inventory document into this inventory.
    fn parse_ini(&mut self, content: &str) {
        let mut section = "all".to_string();
        let mut section_kind = IniSection::Hosts;

        for raw_line in content.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                if let Some(group) = header.strip_suffix(":children") {
                    section = group.to_string();
                    section_kind = IniSection::Children;
                } else if let Some(group) = header.strip_suffix(":vars") {
                    section = group.to_string();
                    section_kind = IniSection::Vars;
                } else {
                    section = header.to_string();
                    section_kind = IniSection::Hosts;
                }
                self.ensure_group(&section);
                continue;
            }

            match section_kind {
                IniSection::Hosts => {
                    let mut tokens = line.split_whitespace();
                    let Some(host_name) = tokens.next() else {
                        continue;
                    };
                    let vars = tokens
                        .filter_map(|token| token.split_once('='))
                        .map(|(key, value)| {
                            (
                                key.to_string(),
                                serde_yaml::Value::String(value.to_string()),
                            )
                        })
                        .collect();
                    let group = section.clone();
                    self.add_host(host_name, &group, vars);
                }
                IniSection::Children => {
                    let child = line.to_string();
                    self.ensure_group(&child);
                    let group = self.ensure_group(&section.clone());
                    if !group.children.contains(&child) {
                        group.children.push(child);
                    }
                }
                IniSection::Vars => {
                    if let Some((key, value)) = line.split_once('=') {
                        let group = self.ensure_group(&section.clone());
                        group.vars.insert(
                            key.trim().to_string(),
                            serde_yaml::Value::String(value.trim().to_string()),
                        );
                    }
                }
            }
        }
    }

    fn ensure_group(&mut self, name: &str) -> &mut GroupInfo {
        self.groups
            .entry(name.to_string())
            .or_insert_with(|| GroupInfo {
                name: name.to_string(),
                hosts: Vec::new(),
                children: Vec::new(),
                vars: HashMap::new(),
            })
    }

    fn add_host(
        &mut self,
        host_name: &str,
        group_name: &str,
        vars: HashMap<String, serde_yaml::Value>,
    ) {
        let group = self.ensure_group(group_name);
        if !group.hosts.contains(&host_name.to_string()) {
            group.hosts.push(host_name.to_string());
        }

        self.hosts
            .entry(host_name.to_string())
            .and_modify(|host| {
                if !host.groups.contains(&group_name.to_string()) {
                    host.groups.push(group_name.to_string());
                }
                host.vars.extend(vars.clone());
            })
            .or_insert_with(|| HostInfo {
                name: host_name.to_string(),
                groups: vec![group_name.to_string()],
                vars,
            });
    }

    /// Looks up a host by name.
    pub fn host(&self, name: &str) -> Option<&HostInfo> {
        self.hosts.get(name)
    }

    /// Looks up a group by name.
    pub fn group(&self, name: &str) -> Option<&GroupInfo> {
        self.groups.get(name)
    }

    /// All groups a host is a member of, sorted. Membership propagates up
    /// through `children` relations, and membership of `all` is implicit.
    pub fn groups_for_host(&self, name: &str) -> Vec<String> {
        let Some(host) = self.hosts.get(name) else {
            return Vec::new();
        };
        let mut groups = host.groups.clone();
        loop {
            let mut added = false;
            for (parent, info) in &self.groups {
                if groups.contains(parent) {
                    continue;
                }
                if info.children.iter().any(|child| groups.contains(child)) {
                    groups.push(parent.clone());
                    added = true;
                }
            }
            if !added {
                break;
            }
        }
        if !groups.contains(&"all".to_string()) {
            groups.push("all".to_string());
        }
        groups.sort();
        groups
    }

    /// All hosts in a group, including children transitively, sorted.
    /// `None` when the group does not exist.
    pub fn hosts_for_group(&self, name: &str) -> Option<Vec<String>> {
        if name == "all" {
            return Some(self.host_names());
        }
        self.groups.get(name)?;

        let mut hosts = Vec::new();
        let mut pending = vec![name.to_string()];
        let mut visited = Vec::new();
        while let Some(group_name) = pending.pop() {
            if visited.contains(&group_name) {
                continue;
            }
            visited.push(group_name.clone());
            if let Some(group) = self.groups.get(&group_name) {
                hosts.extend(group.hosts.iter().cloned());
                pending.extend(group.children.iter().cloned());
            }
        }
        hosts.sort();
        hosts.dedup();
        Some(hosts)
    }

    /// All group names, sorted.
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.keys().cloned().collect();
        names.sort();
        names
    }

    /// All host names, sorted.
    pub fn host_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.hosts.keys().cloned().collect();
        names.sort();
        names
    }
}

enum IniSection {
    Hosts,
    Children,
    Vars,
}

// ============================================================================
// DNS resolution checks
// ============================================================================

/// One host that at least one DNS server could not resolve.
#[derive(Debug, Clone, Serialize)]
pub struct DnsCheckResult {
    /// Hostname from the inventory.
    pub hostname: String,
    /// DNS servers that failed to resolve it.
    pub failed_servers: Vec<String>,
}

/// Checks which of `servers` cannot resolve `host`, via `nslookup`.
pub async fn check_host_resolution(
    host: &str,
    servers: &[String],
    timeout: Duration,
) -> Result<Vec<String>> {
    let mut failed = Vec::new();
    for server in servers {
        // kill_on_drop so a timed-out lookup does not leak the child
        let lookup = tokio::process::Command::new("nslookup")
            .arg(host)
            .arg(server)
            .kill_on_drop(true)
            .output();
        match tokio::time::timeout(timeout, lookup).await {
            Ok(Ok(output)) if output.status.success() => {}
            Ok(Ok(_)) => {
                debug!("'{server}' could not resolve '{host}'");
                failed.push(server.clone());
            }
            Ok(Err(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::tool_missing("nslookup"));
            }
            Ok(Err(err)) => return Err(Error::Io(err)),
            Err(_) => {
                debug!("'{server}' timed out resolving '{host}'");
                failed.push(server.clone());
            }
        }
    }
    Ok(failed)
}

/// Checks every inventory host against the given DNS servers.
///
/// Returns only hosts with at least one failing server.
pub async fn check_resolution(
    inventory: &Inventory,
    servers: &[String],
    timeout: Duration,
) -> Result<Vec<DnsCheckResult>> {
    which::which("nslookup").map_err(|_| Error::tool_missing("nslookup"))?;

    let mut results = Vec::new();
    for hostname in inventory.host_names() {
        let failed = check_host_resolution(&hostname, servers, timeout).await?;
        if !failed.is_empty() {
            results.push(DnsCheckResult {
                hostname,
                failed_servers: failed,
            });
        }
    }
    info!("DNS check flagged {} host(s)", results.len());
    Ok(results)
}

/// Writes DNS check results as CSV.
pub fn write_csv(results: &[DnsCheckResult], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Hostname", "No resolution with"])?;
    for result in results {
        writer.write_record([
            result.hostname.as_str(),
            result.failed_servers.join(", ").as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const YAML_INVENTORY: &str = r#"
all:
  children:
    webservers:
      hosts:
        web01:
          ansible_host: 192.168.1.10
        web02: {}
      vars:
        http_port: 80
    dbservers:
      hosts:
        db01: {}
"#;

    const INI_INVENTORY: &str = "
web03 ansible_host=192.168.1.30

[appservers]
app01
app02 ansible_port=2222

[frontend:children]
appservers

[appservers:vars]
env=staging
";

    #[test]
    fn parses_yaml_groups_and_hosts() {
        let mut inventory = Inventory::default();
        inventory.parse_yaml(YAML_INVENTORY).unwrap();

        assert_eq!(
            inventory.host_names(),
            vec!["db01", "web01", "web02"]
        );
        assert_eq!(
            inventory.hosts_for_group("webservers").unwrap(),
            vec!["web01", "web02"]
        );
        let web01 = inventory.host("web01").unwrap();
        assert_eq!(
            web01.vars["ansible_host"],
            serde_yaml::Value::String("192.168.1.10".into())
        );
        let group = inventory.group("webservers").unwrap();
        assert_eq!(group.vars["http_port"], serde_yaml::Value::from(80));
    }

    #[test]
    fn parses_ini_sections() {
        let mut inventory = Inventory::default();
        inventory.parse_ini(INI_INVENTORY);

        // Leading ungrouped host lands in `all`.
        assert!(inventory.group("all").unwrap().hosts.contains(&"web03".to_string()));
        assert_eq!(
            inventory.hosts_for_group("appservers").unwrap(),
            vec!["app01", "app02"]
        );
        // Children resolve transitively.
        assert_eq!(
            inventory.hosts_for_group("frontend").unwrap(),
            vec!["app01", "app02"]
        );
        let app02 = inventory.host("app02").unwrap();
        assert_eq!(
            app02.vars["ansible_port"],
            serde_yaml::Value::String("2222".into())
        );
        assert_eq!(
            inventory.group("appservers").unwrap().vars["env"],
            serde_yaml::Value::String("staging".into())
        );
    }

    #[test]
    fn groups_for_host_includes_all_and_sorts() {
        let mut inventory = Inventory::default();
        inventory.parse_yaml(YAML_INVENTORY).unwrap();

        assert_eq!(
            inventory.groups_for_host("web01"),
            vec!["all", "webservers"]
        );
        assert!(inventory.groups_for_host("nope").is_empty());
    }

    #[test]
    fn host_membership_propagates_to_parent_groups() {
        let mut inventory = Inventory::default();
        inventory.parse_ini(INI_INVENTORY);

        assert_eq!(
            inventory.groups_for_host("app01"),
            vec!["all", "appservers", "frontend"]
        );
    }

    #[test]
    fn missing_group_is_none() {
        let inventory = Inventory::default();
        assert!(inventory.hosts_for_group("ghosts").is_none());
        assert!(inventory.group("ghosts").is_none());
    }

    #[test]
    fn all_group_covers_every_host() {
        let mut inventory = Inventory::default();
        inventory.parse_yaml(YAML_INVENTORY).unwrap();
        inventory.parse_ini(INI_INVENTORY);

        assert_eq!(
            inventory.hosts_for_group("all").unwrap(),
            inventory.host_names()
        );
    }
}
