//! SQLite-backed fact store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs off the async
//! runtime's worker threads. One row per host; facts are stored as a JSON
//! object and compared structurally on update, so reordered-but-equal fact
//! files do not count as changes.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::OptionalExtension as _;
use serde_json::Value;
use tracing::{debug, info};

use super::{match_fact, HostFacts};
use crate::error::Result;

/// Schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS hosts (
    id            INTEGER PRIMARY KEY,
    hostname      TEXT NOT NULL UNIQUE,
    facts         TEXT NOT NULL,      -- JSON object
    last_modified TEXT NOT NULL       -- RFC 3339 UTC
);

CREATE INDEX IF NOT EXISTS hosts_hostname_idx ON hosts(hostname);

PRAGMA user_version = 1;
";

/// A fact store backed by a single SQLite file.
///
/// Cloning is cheap - the inner connection is reference-counted.
#[derive(Clone)]
pub struct FactStore {
    conn: tokio_rusqlite::Connection,
}

impl FactStore {
    /// Opens (or creates) a store at `path` and runs schema initialisation.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!("Opening fact store at '{}'", path.display());
        let conn = tokio_rusqlite::Connection::open(path).await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    /// Opens an in-memory store - useful for testing.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.pragma_update(None, "journal_mode", "WAL")?;
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        info!("Fact database ready");
        Ok(())
    }

    /// Stores host facts: insert-on-first-seen, update-on-change.
    ///
    /// Returns the hostnames that were inserted or updated, sorted.
    pub async fn store(&self, hosts: Vec<HostFacts>) -> Result<Vec<String>> {
        // Serialize outside the connection thread; the closure only sees
        // strings.
        let rows: Vec<(String, String, String)> = hosts
            .iter()
            .map(|host| {
                (
                    host.hostname.clone(),
                    Value::Object(host.facts.clone()).to_string(),
                    host.last_modified.to_rfc3339(),
                )
            })
            .collect();

        let mut changed = self
            .conn
            .call(move |conn| {
                let mut changed = Vec::new();
                let tx = conn.transaction()?;
                for (hostname, facts_json, last_modified) in rows {
                    let existing: Option<String> = tx
                        .query_row(
                            "SELECT facts FROM hosts WHERE hostname = ?1",
                            rusqlite::params![hostname],
                            |row| row.get(0),
                        )
                        .optional()?;

                    match existing {
                        Some(stored) => {
                            if !facts_equal(&stored, &facts_json) {
                                tx.execute(
                                    "UPDATE hosts SET facts = ?2, last_modified = ?3
                                     WHERE hostname = ?1",
                                    rusqlite::params![hostname, facts_json, last_modified],
                                )?;
                                changed.push(hostname);
                            }
                        }
                        None => {
                            tx.execute(
                                "INSERT INTO hosts (hostname, facts, last_modified)
                                 VALUES (?1, ?2, ?3)",
                                rusqlite::params![hostname, facts_json, last_modified],
                            )?;
                            changed.push(hostname);
                        }
                    }
                }
                tx.commit()?;
                Ok(changed)
            })
            .await?;

        changed.sort();
        debug!("Stored facts, {} host(s) inserted or updated", changed.len());
        Ok(changed)
    }

    /// Returns the facts of a host, optionally filtered to keys containing
    /// `key` case-insensitively. Unknown host yields `None`.
    pub async fn host_facts(
        &self,
        hostname: &str,
        key: Option<&str>,
    ) -> Result<Option<Vec<(String, Value)>>> {
        let hostname = hostname.to_string();
        let facts_json: Option<String> = self
            .conn
            .call(move |conn| {
                let facts = conn
                    .query_row(
                        "SELECT facts FROM hosts WHERE hostname = ?1",
                        rusqlite::params![hostname],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(facts)
            })
            .await?;

        let Some(facts_json) = facts_json else {
            return Ok(None);
        };
        let facts: serde_json::Map<String, Value> = serde_json::from_str(&facts_json)?;
        let needle = key.map(str::to_lowercase);

        Ok(Some(
            facts
                .into_iter()
                .filter(|(fact_key, _)| match &needle {
                    Some(needle) => fact_key.to_lowercase().contains(needle),
                    None => true,
                })
                .collect(),
        ))
    }

    /// Finds hosts with a fact matching the `key`/`value` search pair.
    ///
    /// Returns hostname / matching-facts pairs, sorted by hostname. See
    /// [`match_fact`] for the matching rules.
    pub async fn find_hosts(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Vec<(String, HashMap<String, Value>)>> {
        let rows: Vec<(String, String)> = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT hostname, facts FROM hosts ORDER BY hostname")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
                Ok(rows)
            })
            .await?;

        let mut matches = Vec::new();
        for (hostname, facts_json) in rows {
            let facts: serde_json::Map<String, Value> = serde_json::from_str(&facts_json)?;
            let matching: HashMap<String, Value> = facts
                .iter()
                .filter_map(|(fact_key, fact_value)| {
                    match_fact(key, value, fact_key, fact_value)
                        .map(|matched| (fact_key.clone(), matched))
                })
                .collect();
            if !matching.is_empty() {
                matches.push((hostname, matching));
            }
        }
        debug!("Fact search matched {} host(s)", matches.len());
        Ok(matches)
    }

    /// Removes a host. Returns false when the host is unknown.
    pub async fn remove(&self, hostname: &str) -> Result<bool> {
        let hostname = hostname.to_string();
        let removed = self
            .conn
            .call(move |conn| {
                let rows = conn.execute(
                    "DELETE FROM hosts WHERE hostname = ?1",
                    rusqlite::params![hostname],
                )?;
                Ok(rows > 0)
            })
            .await?;
        Ok(removed)
    }

    /// Lists all stored hostnames, sorted.
    pub async fn hostnames(&self) -> Result<Vec<String>> {
        let hosts = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT hostname FROM hosts ORDER BY hostname")?;
                let hosts = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, rusqlite::Error>>()?;
                Ok(hosts)
            })
            .await?;
        Ok(hosts)
    }
}

/// Structural comparison of two JSON fact documents.
///
/// Unparseable stored facts compare as different so they get overwritten.
fn facts_equal(stored: &str, new: &str) -> bool {
    match (
        serde_json::from_str::<Value>(stored),
        serde_json::from_str::<Value>(new),
    ) {
        (Ok(stored), Ok(new)) => stored == new,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_key_order_and_whitespace() {
        assert!(facts_equal(
            r#"{"a": 1, "b": 2}"#,
            r#"{"b":2,"a":1}"#
        ));
        assert!(!facts_equal(r#"{"a": 1}"#, r#"{"a": 2}"#));
        assert!(!facts_equal("not json", r#"{"a": 1}"#));
    }
}
