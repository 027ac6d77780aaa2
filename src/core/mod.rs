//! Core business logic for mdsync.
//!
//! # Modules
//!
//! - [`reconcile`] - Compare-then-insert/update of users, employees and departments
//! - [`directory`] - Contact address resolution through the corporate directory
//! - [`exchange`] - Delivery queue and the runner draining it
//! - [`birthday`] - Observer registration and daily birthday digests
//! - [`debounce`] - Per-caller suppression of repeated requests
//! - [`summary`] - Sync pass reporting
//!
//! # Sync Workflow
//!
//! 1. **Fetch**: Pull the user snapshot from the HR system
//! 2. **Reconcile**: Insert, update or skip each user and its employees
//! 3. **Register**: Queue users whose contact address changed
//! 4. **Deliver**: Push queued users to the downstream targets (separate run)
//! 5. **Report**: Log the sync summary
//!
//! # Example
//!
//! ```rust,no_run
//! use mdsync::adapters::database::create_store;
//! use mdsync::adapters::directory::LdapDirectory;
//! use mdsync::adapters::upstream::UpstreamClient;
//! use mdsync::config::load_config;
//! use mdsync::core::directory::DirectoryResolver;
//! use mdsync::core::exchange::ExchangeQueue;
//! use mdsync::core::reconcile::{EntityReconciler, SyncCoordinator};
//! use mdsync::logging::AccountingLog;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("mdsync.toml")?;
//! let stores = create_store(&config.postgresql).await?;
//!
//! let reconciler = EntityReconciler::new(
//!     stores.master_data.clone(),
//!     ExchangeQueue::new(stores.exchange.clone(), stores.queries.clone()),
//!     DirectoryResolver::new(Arc::new(LdapDirectory::new(config.directory.clone()))),
//!     Arc::new(AccountingLog::new(&config.logging.accounting_log_path)),
//! );
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let coordinator = SyncCoordinator::new(reconciler, shutdown_rx);
//!
//! let users = UpstreamClient::new(config.upstream.clone())?.fetch_users().await?;
//! let summary = coordinator.sync_user_snapshot(&users).await;
//! println!("Inserted: {}", summary.inserted);
//! # Ok(())
//! # }
//! ```

pub mod birthday;
pub mod debounce;
pub mod directory;
pub mod exchange;
pub mod reconcile;
pub mod summary;
