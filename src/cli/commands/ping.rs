//! Ping command implementation

use super::common::{connect, load_checked};
use crate::adapters::upstream::UpstreamClient;
use crate::cli::{EXIT_CONNECTION, EXIT_OK};
use clap::{Args, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PingTarget {
    /// The HR system
    Upstream,
    /// The master data database
    Db,
}

/// Arguments for the ping command
#[derive(Args, Debug)]
pub struct PingArgs {
    /// What to check
    #[arg(value_enum)]
    pub target: PingTarget,
}

impl PingArgs {
    /// Execute the ping command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(target_system = ?self.target, "Pinging");

        let config = match load_checked(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        match self.target {
            PingTarget::Db => match connect(&config).await {
                Ok(_) => {
                    println!("✅ Database is reachable");
                    Ok(EXIT_OK)
                }
                Err(code) => Ok(code),
            },
            PingTarget::Upstream => {
                let reply = match UpstreamClient::new(config.upstream.clone()) {
                    Ok(client) => client.ping().await,
                    Err(e) => Err(e),
                };
                match reply {
                    Ok(body) => {
                        println!("✅ HR system is reachable");
                        if !body.trim().is_empty() {
                            println!("   {}", body.trim());
                        }
                        Ok(EXIT_OK)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "HR system ping failed");
                        eprintln!("❌ HR system is not reachable: {e}");
                        Ok(EXIT_CONNECTION)
                    }
                }
            }
        }
    }
}
