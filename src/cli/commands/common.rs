//! Setup shared by the commands
//!
//! Each helper prints what went wrong and hands back the exit code to return.

use crate::adapters::database::{create_store, Stores};
use crate::adapters::mail::{MailSender, SmtpMailSender};
use crate::cli::{EXIT_CONFIG, EXIT_CONNECTION};
use crate::config::{load_config, MdSyncConfig};
use crate::logging::AccountingLog;
use serde::Serialize;
use std::sync::Arc;

/// Loads and validates the configuration file
pub(crate) fn load_checked(config_path: &str) -> Result<MdSyncConfig, i32> {
    let config = load_config(config_path).map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        eprintln!("❌ Failed to load configuration file: {e}");
        EXIT_CONFIG
    })?;
    config.validate().map_err(|e| {
        tracing::error!(error = %e, "Configuration validation failed");
        eprintln!("❌ Configuration validation failed: {e}");
        EXIT_CONFIG
    })?;
    Ok(config)
}

/// Builds the stores and checks the database answers
pub(crate) async fn connect(config: &MdSyncConfig) -> Result<Stores, i32> {
    let stores = create_store(&config.postgresql).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to create database pool");
        eprintln!("❌ Failed to connect to database: {e}");
        EXIT_CONNECTION
    })?;
    stores.queries.ping().await.map_err(|e| {
        tracing::error!(error = %e, "Database is not reachable");
        eprintln!("❌ Failed to connect to database: {e}");
        EXIT_CONNECTION
    })?;
    Ok(stores)
}

pub(crate) fn mail_sender(config: &MdSyncConfig) -> Result<Arc<dyn MailSender>, i32> {
    let sender = SmtpMailSender::new(&config.mail).map_err(|e| {
        tracing::error!(error = %e, "Invalid mail configuration");
        eprintln!("❌ Invalid mail configuration: {e}");
        EXIT_CONFIG
    })?;
    Ok(Arc::new(sender))
}

pub(crate) fn accounting_log(config: &MdSyncConfig) -> Arc<AccountingLog> {
    Arc::new(AccountingLog::new(&config.logging.accounting_log_path))
}

/// Pretty JSON on stdout
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
