//! Ansible host fact handling.
//!
//! Ansible drops per-host JSON fact files into `fact_cache` directories
//! under each run's artifacts. Deckhand collects those into a local SQLite
//! database ([`store::FactStore`]) and answers fuzzy queries against it.

pub mod cache;
pub mod store;

pub use cache::{find_cache_dirs, load_cache_dirs};
pub use store::FactStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Facts gathered for a single host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostFacts {
    /// Normalized hostname (see [`normalize_hostname`]).
    pub hostname: String,
    /// Fact key/value pairs as gathered by Ansible.
    pub facts: serde_json::Map<String, Value>,
    /// Modification time of the cache file the facts came from.
    pub last_modified: DateTime<Utc>,
}

/// Normalizes a hostname for storage: lowercased, spaces as underscores.
pub fn normalize_hostname(raw: &str) -> String {
    raw.replace(' ', "_").to_lowercase()
}

/// Renders a fact value for matching and display.
///
/// Strings render as their content rather than their quoted JSON form.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Matches one stored fact (`fact_key`/`fact_value`) against a
/// `search_key`/`search_value` pair.
///
/// The key matches when `search_key` is a case-insensitive substring of
/// `fact_key`. Scalar values match by substring on their rendering; array
/// values match per element, and the matching element is returned.
pub fn match_fact(
    search_key: &str,
    search_value: &str,
    fact_key: &str,
    fact_value: &Value,
) -> Option<Value> {
    if !fact_key.to_lowercase().contains(&search_key.to_lowercase()) {
        return None;
    }
    match fact_value {
        Value::Array(items) => items
            .iter()
            .find(|item| render(item).contains(search_value))
            .cloned(),
        other if render(other).contains(search_value) => Some(other.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hostnames_are_normalized() {
        assert_eq!(normalize_hostname("Web Server 01"), "web_server_01");
        assert_eq!(normalize_hostname("db01.example.com"), "db01.example.com");
    }

    #[test]
    fn matches_scalar_values_by_substring() {
        let value = json!("Debian GNU/Linux");
        assert_eq!(
            match_fact("distribution", "Debian", "ansible_distribution", &value),
            Some(value.clone())
        );
        assert!(match_fact("distribution", "Fedora", "ansible_distribution", &value).is_none());
    }

    #[test]
    fn key_match_is_case_insensitive_substring() {
        let value = json!(8);
        assert!(match_fact("CORES", "8", "ansible_processor_cores", &value).is_some());
        assert!(match_fact("memory", "8", "ansible_processor_cores", &value).is_none());
    }

    #[test]
    fn array_values_report_the_matching_element() {
        let value = json!(["eth0", "eth1", "lo"]);
        assert_eq!(
            match_fact("interfaces", "eth1", "ansible_interfaces", &value),
            Some(json!("eth1"))
        );
    }

    #[test]
    fn numeric_values_match_on_their_rendering() {
        let value = json!(16384);
        assert!(match_fact("memtotal", "16384", "ansible_memtotal_mb", &value).is_some());
    }
}
