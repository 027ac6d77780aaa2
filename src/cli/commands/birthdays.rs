//! Birthdays command implementation

use super::common::{connect, load_checked, mail_sender};
use crate::cli::{EXIT_OK, EXIT_PARTIAL};
use crate::core::birthday::BirthdayAggregator;
use chrono::{Local, NaiveDate};
use clap::Args;

/// Arguments for the birthdays command
#[derive(Args, Debug)]
pub struct BirthdaysArgs {
    /// Run as if today were this date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

impl BirthdaysArgs {
    /// Execute the birthdays command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let today = self.date.unwrap_or_else(|| Local::now().date_naive());
        tracing::info!(%today, "Starting birthday notifications");

        let config = match load_checked(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        if !config.birthday.enabled {
            tracing::info!("Birthday notifications are disabled");
            println!("✅ Birthday notifications are disabled, nothing to do");
            return Ok(EXIT_OK);
        }

        let stores = match connect(&config).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };
        let mail = match mail_sender(&config) {
            Ok(m) => m,
            Err(code) => return Ok(code),
        };

        let aggregator = BirthdayAggregator::new(stores.birthday.clone(), stores.queries.clone(), mail);
        let report = aggregator.compute_and_send(today).await;

        if report.windows.is_empty() {
            println!("✅ No birthday window is due on {today}");
            return Ok(EXIT_OK);
        }

        let windows: Vec<&str> = report.windows.iter().map(|w| w.label()).collect();
        println!("📊 Birthday digests for {today}");
        println!("  Windows:        {}", windows.join(", "));
        println!("  Sent:           {}", report.sent);
        println!("  Failed:         {}", report.failed);
        if report.failed_windows > 0 {
            println!("  Failed windows: {}", report.failed_windows);
        }

        Ok(if report.is_successful() {
            EXIT_OK
        } else {
            EXIT_PARTIAL
        })
    }
}
