//! External system integrations for mdsync.
//!
//! - [`database`] - Store traits and the factory wiring them to PostgreSQL
//! - [`postgresql`] - PostgreSQL implementation of the stores
//! - [`upstream`] - HR system snapshots and downstream delivery over HTTP
//! - [`directory`] - Mailbox lookups in the corporate LDAP directory
//! - [`mail`] - Outgoing SMTP mail
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits so the core can be
//! exercised with the in-memory fakes from the `testing` module.
//!
//! ```rust,no_run
//! use mdsync::adapters::upstream::UpstreamClient;
//! use mdsync::config::load_config;
//!
//! # async fn example() -> mdsync::domain::Result<()> {
//! let config = load_config("mdsync.toml")?;
//! let upstream = UpstreamClient::new(config.upstream.clone())?;
//! let users = upstream.fetch_users().await?;
//! println!("{} users, {} rejected", users.entities.len(), users.rejected.len());
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod directory;
pub mod mail;
pub mod postgresql;
pub mod upstream;
