// MDSync - HR master data synchronization
// Copyright (c) 2025 MDSync Contributors
// Licensed under the MIT License

//! # MDSync - HR master data synchronization
//!
//! MDSync keeps a PostgreSQL copy of the people, employments and departments
//! held by the HR system of record, and pushes the resulting contact address
//! changes to the systems that depend on them.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Reconciling** full HR snapshots against the stored master data
//! - **Resolving** missing contact addresses through the corporate LDAP directory
//! - **Queueing** subjects whose address changed and **delivering** them in batches
//! - **Reminding** observers of upcoming birthdays with a daily digest
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (reconcile, exchange, birthday, directory resolution)
//! - [`adapters`] - External integrations (PostgreSQL, HR HTTP service, LDAP, SMTP)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and the accounting log
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mdsync::adapters::database::create_store;
//! use mdsync::adapters::mail::SmtpMailSender;
//! use mdsync::adapters::upstream::HttpDeliveryTransport;
//! use mdsync::config::load_config;
//! use mdsync::core::exchange::{DeliveryService, ExchangeQueue};
//! use mdsync::domain::DeliveryReason;
//! use mdsync::logging::AccountingLog;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("mdsync.toml")?;
//!     let stores = create_store(&config.postgresql).await?;
//!
//!     let service = DeliveryService::new(
//!         ExchangeQueue::new(stores.exchange.clone(), stores.queries.clone()),
//!         stores.queries.clone(),
//!         Arc::new(HttpDeliveryTransport::new(&config.downstream)?),
//!         Arc::new(SmtpMailSender::new(&config.mail)?),
//!         Arc::new(AccountingLog::new(&config.logging.accounting_log_path)),
//!     );
//!
//!     let today = chrono::Local::now().date_naive();
//!     let report = service.deliver(DeliveryReason::NotifyHr, today).await?;
//!     println!("Delivered {} of {}", report.delivered, report.pending);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Library code returns [`domain::MdError`]; lookups report a missing row as
//! `MdError::NotFound`, which the reconciler treats as "insert":
//!
//! ```rust,no_run
//! use mdsync::domain::MdError;
//!
//! fn example() -> Result<(), MdError> {
//!     let config = mdsync::config::load_config("mdsync.toml")?;
//!     println!("{}", config.upstream.base_url);
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! MDSync uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! tracing::info!(reason = "notify-hr", pending = 3, "Delivery started");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
