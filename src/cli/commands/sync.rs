//! Sync command implementations
//!
//! `sync-users` and `sync-departments` pull a full snapshot from the HR
//! system and reconcile it entity by entity.

use super::common::{accounting_log, connect, load_checked};
use crate::adapters::directory::LdapDirectory;
use crate::adapters::upstream::UpstreamClient;
use crate::cli::{EXIT_CONNECTION, EXIT_INTERRUPTED, EXIT_OK, EXIT_PARTIAL};
use crate::config::MdSyncConfig;
use crate::core::directory::DirectoryResolver;
use crate::core::exchange::ExchangeQueue;
use crate::core::reconcile::{EntityReconciler, SyncCoordinator};
use crate::core::summary::SyncSummary;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the sync-users command
#[derive(Args, Debug)]
pub struct SyncUsersArgs {}

/// Arguments for the sync-departments command
#[derive(Args, Debug)]
pub struct SyncDepartmentsArgs {}

struct Prepared {
    upstream: UpstreamClient,
    coordinator: SyncCoordinator,
}

async fn prepare(
    config_path: &str,
    shutdown_signal: watch::Receiver<bool>,
) -> Result<Prepared, i32> {
    let config = load_checked(config_path)?;
    let stores = connect(&config).await?;
    if let Err(e) = stores.master_data.ensure_schema().await {
        tracing::error!(error = %e, "Failed to prepare the database schema");
        eprintln!("❌ Failed to prepare the database schema: {e}");
        return Err(EXIT_CONNECTION);
    }

    let upstream = upstream_client(&config)?;
    let reconciler = EntityReconciler::new(
        stores.master_data.clone(),
        ExchangeQueue::new(stores.exchange.clone(), stores.queries.clone()),
        DirectoryResolver::new(Arc::new(LdapDirectory::new(config.directory.clone()))),
        accounting_log(&config),
    );

    Ok(Prepared {
        upstream,
        coordinator: SyncCoordinator::new(reconciler, shutdown_signal),
    })
}

fn upstream_client(config: &MdSyncConfig) -> Result<UpstreamClient, i32> {
    UpstreamClient::new(config.upstream.clone()).map_err(|e| {
        tracing::error!(error = %e, "Failed to build the HR system client");
        eprintln!("❌ Failed to build the HR system client: {e}");
        EXIT_CONNECTION
    })
}

fn exit_code(summary: &SyncSummary) -> i32 {
    if summary.interrupted {
        EXIT_INTERRUPTED
    } else if summary.is_successful() {
        EXIT_OK
    } else {
        EXIT_PARTIAL
    }
}

fn print_summary(what: &str, summary: &SyncSummary) {
    println!();
    println!("📊 {what} sync summary");
    println!("  Total:         {}", summary.total);
    println!("  Inserted:      {}", summary.inserted);
    println!("  Updated:       {}", summary.updated);
    println!("  Unchanged:     {}", summary.unchanged);
    println!("  Failed:        {}", summary.failed);
    if summary.registrations > 0 {
        println!("  Queued:        {}", summary.registrations);
    }
    println!("  Duration:      {}s", summary.duration.as_secs());
    if summary.interrupted {
        println!("⚠️  Interrupted before the snapshot was fully processed");
    }
}

impl SyncUsersArgs {
    /// Execute the sync-users command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting user sync command");

        let prepared = match prepare(config_path, shutdown_signal).await {
            Ok(p) => p,
            Err(code) => return Ok(code),
        };

        let users = match prepared.upstream.fetch_users().await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch users from the HR system");
                eprintln!("❌ Failed to fetch users: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };

        let summary = prepared.coordinator.sync_user_snapshot(&users).await;
        print_summary("User", &summary);
        Ok(exit_code(&summary))
    }
}

impl SyncDepartmentsArgs {
    /// Execute the sync-departments command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting department sync command");

        let prepared = match prepare(config_path, shutdown_signal).await {
            Ok(p) => p,
            Err(code) => return Ok(code),
        };

        let departments = match prepared.upstream.fetch_departments().await {
            Ok(departments) => departments,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch departments from the HR system");
                eprintln!("❌ Failed to fetch departments: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };

        let summary = prepared.coordinator.sync_department_snapshot(&departments).await;
        print_summary("Department", &summary);
        Ok(exit_code(&summary))
    }
}
