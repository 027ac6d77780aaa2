//! Birthday observer registration commands

use super::common::{connect, load_checked};
use crate::cli::{EXIT_CONFIG, EXIT_OK, EXIT_PARTIAL};
use crate::core::birthday::{ObserverRegistry, ObserverRequest};
use crate::domain::MdError;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the add-observer command
#[derive(Args, Debug)]
pub struct AddObserverArgs {
    /// Personnel code of the person receiving the reminders
    #[arg(long)]
    pub observer: String,

    /// Personnel code of the person whose birthday is watched
    #[arg(long)]
    pub owner: String,
}

/// Arguments for the add-observers command
#[derive(Args, Debug)]
pub struct AddObserversArgs {
    /// JSON file with the pairs to register
    #[arg(long)]
    pub file: PathBuf,
}

impl AddObserverArgs {
    /// Execute the add-observer command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(observer = %self.observer, owner = %self.owner, "Adding birthday observer");

        let config = match load_checked(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let stores = match connect(&config).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        let registry = ObserverRegistry::new(stores.birthday.clone());
        match registry.add_observer(&self.observer, &self.owner).await {
            Ok(()) => {
                println!("✅ Observer {} added for {}", self.observer, self.owner);
                Ok(EXIT_OK)
            }
            Err(MdError::Uniqueness(message)) => {
                println!("{message}");
                Ok(EXIT_PARTIAL)
            }
            Err(e) => {
                eprintln!("❌ Failed to add observer: {e}");
                Ok(EXIT_PARTIAL)
            }
        }
    }
}

impl AddObserversArgs {
    /// Execute the add-observers command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(file = %self.file.display(), "Adding birthday observers from file");

        let raw = match std::fs::read_to_string(&self.file) {
            Ok(raw) => raw,
            Err(e) => {
                eprintln!("❌ Failed to read {}: {e}", self.file.display());
                return Ok(EXIT_CONFIG);
            }
        };
        let pairs = match ObserverRequest::parse(&raw) {
            Ok(pairs) => pairs,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let config = match load_checked(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let stores = match connect(&config).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        let report = ObserverRegistry::new(stores.birthday.clone())
            .add_observers(pairs)
            .await;
        println!("{}", report.message());
        for error in &report.errors {
            println!("  ❌ {error}");
        }

        Ok(if report.errors.is_empty() {
            EXIT_OK
        } else {
            EXIT_PARTIAL
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_malformed_file_is_rejected_before_connecting() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{\"not\": \"pairs\"}}").unwrap();

        let args = AddObserversArgs {
            file: file.path().to_path_buf(),
        };
        let code = args.execute("/nonexistent/mdsync.toml").await.unwrap();
        assert_eq!(code, EXIT_CONFIG);
    }

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let args = AddObserversArgs {
            file: PathBuf::from("/nonexistent/pairs.json"),
        };
        assert_eq!(args.execute("mdsync.toml").await.unwrap(), EXIT_CONFIG);
    }
}
