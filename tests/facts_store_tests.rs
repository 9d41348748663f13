//! Integration tests for the SQLite fact store.
//!
//! These run against an in-memory database and exercise the full
//! collect/query/find/remove lifecycle.

use chrono::Utc;
use deckhand::facts::{FactStore, HostFacts};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn host(hostname: &str, facts: Value) -> HostFacts {
    let Value::Object(facts) = facts else {
        panic!("fact fixture must be a JSON object");
    };
    HostFacts {
        hostname: hostname.to_string(),
        facts,
        last_modified: Utc::now(),
    }
}

#[tokio::test]
async fn stores_and_queries_host_facts() {
    let store = FactStore::open_in_memory().await.unwrap();

    let changed = store
        .store(vec![host(
            "web01",
            json!({"ansible_distribution": "Debian", "ansible_processor_cores": 4}),
        )])
        .await
        .unwrap();
    assert_eq!(changed, vec!["web01"]);

    let facts = store.host_facts("web01", None).await.unwrap().unwrap();
    assert_eq!(facts.len(), 2);
}

#[tokio::test]
async fn unchanged_facts_are_not_reported() {
    let store = FactStore::open_in_memory().await.unwrap();
    let facts = json!({"ansible_distribution": "Debian"});

    let first = store.store(vec![host("web01", facts.clone())]).await.unwrap();
    assert_eq!(first, vec!["web01"]);

    // Same facts again: no change.
    let second = store.store(vec![host("web01", facts)]).await.unwrap();
    assert!(second.is_empty());

    // Modified facts: reported again.
    let third = store
        .store(vec![host("web01", json!({"ansible_distribution": "Fedora"}))])
        .await
        .unwrap();
    assert_eq!(third, vec!["web01"]);
}

#[tokio::test]
async fn changed_hostnames_come_back_sorted() {
    let store = FactStore::open_in_memory().await.unwrap();
    let changed = store
        .store(vec![
            host("web02", json!({"a": 1})),
            host("db01", json!({"a": 1})),
            host("web01", json!({"a": 1})),
        ])
        .await
        .unwrap();
    assert_eq!(changed, vec!["db01", "web01", "web02"]);
}

#[tokio::test]
async fn query_filters_keys_by_substring() {
    let store = FactStore::open_in_memory().await.unwrap();
    store
        .store(vec![host(
            "web01",
            json!({
                "ansible_distribution": "Debian",
                "ansible_distribution_version": "12",
                "ansible_processor_cores": 4
            }),
        )])
        .await
        .unwrap();

    let facts = store
        .host_facts("web01", Some("DISTRIBUTION"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(facts.len(), 2);
    assert!(facts.iter().all(|(key, _)| key.contains("distribution")));

    let none = store
        .host_facts("web01", Some("memory"))
        .await
        .unwrap()
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn querying_an_unknown_host_yields_none() {
    let store = FactStore::open_in_memory().await.unwrap();
    assert!(store.host_facts("ghost", None).await.unwrap().is_none());
}

#[tokio::test]
async fn find_reports_matching_array_elements() {
    let store = FactStore::open_in_memory().await.unwrap();
    store
        .store(vec![
            host(
                "web01",
                json!({"ansible_interfaces": ["eth0", "eth1", "lo"]}),
            ),
            host("db01", json!({"ansible_interfaces": ["ens3", "lo"]})),
        ])
        .await
        .unwrap();

    let matches = store.find_hosts("interfaces", "eth1").await.unwrap();
    assert_eq!(matches.len(), 1);
    let (hostname, matching) = &matches[0];
    assert_eq!(hostname, "web01");
    assert_eq!(matching["ansible_interfaces"], json!("eth1"));
}

#[tokio::test]
async fn find_matches_scalars_across_hosts() {
    let store = FactStore::open_in_memory().await.unwrap();
    store
        .store(vec![
            host("web01", json!({"ansible_distribution": "Debian"})),
            host("web02", json!({"ansible_distribution": "Debian"})),
            host("db01", json!({"ansible_distribution": "Fedora"})),
        ])
        .await
        .unwrap();

    let matches = store.find_hosts("distribution", "Debian").await.unwrap();
    let hostnames: Vec<&str> = matches.iter().map(|(host, _)| host.as_str()).collect();
    assert_eq!(hostnames, vec!["web01", "web02"]);
}

#[tokio::test]
async fn remove_deletes_exactly_one_host() {
    let store = FactStore::open_in_memory().await.unwrap();
    store
        .store(vec![
            host("web01", json!({"a": 1})),
            host("db01", json!({"a": 1})),
        ])
        .await
        .unwrap();

    assert!(store.remove("web01").await.unwrap());
    assert!(!store.remove("web01").await.unwrap());
    assert_eq!(store.hostnames().await.unwrap(), vec!["db01"]);
}

#[tokio::test]
async fn hostnames_lists_sorted() {
    let store = FactStore::open_in_memory().await.unwrap();
    assert!(store.hostnames().await.unwrap().is_empty());

    store
        .store(vec![
            host("zeta", json!({"a": 1})),
            host("alpha", json!({"a": 1})),
        ])
        .await
        .unwrap();
    assert_eq!(store.hostnames().await.unwrap(), vec!["alpha", "zeta"]);
}
