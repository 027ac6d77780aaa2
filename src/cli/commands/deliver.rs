//! Deliver command implementation

use super::common::{accounting_log, connect, load_checked, mail_sender};
use crate::adapters::upstream::{DeliveryTransport, HttpDeliveryTransport};
use crate::cli::{EXIT_CONFIG, EXIT_CONNECTION, EXIT_OK, EXIT_PARTIAL};
use crate::core::exchange::{DeliveryReport, DeliveryService, ExchangeQueue};
use crate::domain::DeliveryReason;
use chrono::{Local, NaiveDate};
use clap::Args;
use std::sync::Arc;

/// Arguments for the deliver command
#[derive(Args, Debug)]
pub struct DeliverArgs {
    /// Delivery reason: 1 notifies HR, 2 creates accounts
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub reason: u8,

    /// Log the batch without calling the target or writing statuses
    #[arg(long)]
    pub dry_run: bool,

    /// Run as if today were this date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

impl DeliverArgs {
    /// Execute the deliver command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let Some(reason) = DeliveryReason::from_id(i32::from(self.reason)) else {
            eprintln!("❌ Unknown delivery reason: {}", self.reason);
            return Ok(EXIT_CONFIG);
        };
        tracing::info!(%reason, "Starting delivery command");

        let config = match load_checked(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let dry_run = self.dry_run || config.application.dry_run;
        if dry_run {
            println!("🔍 Dry run: nothing will be sent or written");
        }

        let stores = match connect(&config).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };
        let mail = match mail_sender(&config) {
            Ok(m) => m,
            Err(code) => return Ok(code),
        };
        let transport: Arc<dyn DeliveryTransport> =
            match HttpDeliveryTransport::new(&config.downstream) {
                Ok(t) => Arc::new(t),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build delivery transport");
                    eprintln!("❌ Failed to build delivery transport: {e}");
                    return Ok(EXIT_CONFIG);
                }
            };

        let service = DeliveryService::new(
            ExchangeQueue::new(stores.exchange.clone(), stores.queries.clone()),
            stores.queries.clone(),
            transport,
            mail,
            accounting_log(&config),
        )
        .with_dry_run(dry_run);

        let today = self.date.unwrap_or_else(|| Local::now().date_naive());
        match service.deliver(reason, today).await {
            Ok(report) => {
                print_report(reason, &report);
                Ok(exit_code(&report))
            }
            Err(e) => {
                tracing::error!(%reason, error = %e, "Delivery run failed");
                eprintln!("❌ Delivery failed: {e}");
                Ok(EXIT_CONNECTION)
            }
        }
    }
}

fn exit_code(report: &DeliveryReport) -> i32 {
    if report.is_successful() {
        EXIT_OK
    } else {
        EXIT_PARTIAL
    }
}

fn print_report(reason: DeliveryReason, report: &DeliveryReport) {
    if report.is_empty() {
        println!("✅ Nothing pending for {reason}");
    } else {
        println!("📊 Delivery summary ({reason})");
        println!("  Pending:        {}", report.pending);
        println!("  Delivered:      {}", report.delivered);
        println!("  Failed:         {}", report.failed);
        println!("  No data:        {}", report.no_data);
        if report.write_failures > 0 {
            println!("  Not recorded:   {}", report.write_failures);
        }
    }
    if report.admins_notified {
        println!("📝 Administrators were notified");
    }
    if report.accounting_sent {
        println!("📝 Accounting log sent");
    }
}
