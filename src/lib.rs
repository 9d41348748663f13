//! # Deckhand - An Ansible Management Layer
//!
//! Deckhand wraps an existing Ansible installation with the day-two
//! plumbing that grows around every long-lived deployment:
//!
//! - **Runs**: execute playbooks through `ansible-playbook`, capturing
//!   stdout, the exact command line, and the return code as run artifacts
//! - **Schedules**: manage tagged crontab entries for recurring runs
//! - **Facts**: collect Ansible fact caches into a SQLite database and
//!   query it by host or by fact key/value
//! - **Inventory**: answer host and group membership questions and check
//!   DNS resolution for every inventory host
//! - **Lint**: run `ansible-lint` with project-aware defaults
//! - **Reports**: turn run artifacts into per-host recap tables
//!
//! Projects live under a single projects directory (`~/deckhand_projects`
//! by default), each laid out with `project/` for playbooks, `inventory/`
//! for hosts, and `env/` for environment files.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use deckhand::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load(None)?;
//!     let store = FactStore::open(config.db_path()).await?;
//!     for hostname in store.hostnames().await? {
//!         println!("{hostname}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod cron;
pub mod error;
pub mod facts;
pub mod inventory;
pub mod lint;
pub mod project;
pub mod report;
pub mod runner;

pub use error::{Error, Result};

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::cron::{Cadence, CronEntry, Scheduler};
    pub use crate::error::{Error, Result};
    pub use crate::facts::{FactStore, HostFacts};
    pub use crate::inventory::Inventory;
    pub use crate::report::ArtifactReport;
    pub use crate::runner::{RunOptions, RunOutcome, RunStatus};
}
