//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for mdsync using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Everything went through
pub const EXIT_OK: i32 = 0;
/// The run finished but some entities or rows failed
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_CONNECTION: i32 = 4;
pub const EXIT_FATAL: i32 = 5;
pub const EXIT_INTERRUPTED: i32 = 130;

/// mdsync - HR master data synchronization
#[derive(Parser, Debug)]
#[command(name = "mdsync")]
#[command(version, about, long_about = None)]
#[command(author = "MDSync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "mdsync.toml", env = "MDSYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "MDSYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pull all users from the HR system and reconcile them
    SyncUsers(commands::sync::SyncUsersArgs),

    /// Pull all departments from the HR system and reconcile them
    SyncDepartments(commands::sync::SyncDepartmentsArgs),

    /// Deliver pending exchange rows of one reason
    Deliver(commands::deliver::DeliverArgs),

    /// Send today's birthday digests
    Birthdays(commands::birthdays::BirthdaysArgs),

    /// Register one birthday observer/owner pair
    AddObserver(commands::observers::AddObserverArgs),

    /// Register observer/owner pairs from a JSON file
    AddObservers(commands::observers::AddObserversArgs),

    /// Read-side queries over the stored master data
    Query(commands::query::QueryArgs),

    /// Check that the HR system or the database answers
    Ping(commands::ping::PingArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::query::QueryCommand;

    #[test]
    fn test_cli_parse_sync_users() {
        let cli = Cli::parse_from(["mdsync", "sync-users"]);
        assert_eq!(cli.config, "mdsync.toml");
        assert!(matches!(cli.command, Commands::SyncUsers(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["mdsync", "--config", "custom.toml", "sync-departments"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::SyncDepartments(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["mdsync", "--log-level", "debug", "validate-config"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_deliver_reason() {
        let cli = Cli::parse_from(["mdsync", "deliver", "--reason", "2", "--dry-run"]);
        match cli.command {
            Commands::Deliver(args) => {
                assert_eq!(args.reason, 2);
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_reason() {
        assert!(Cli::try_parse_from(["mdsync", "deliver", "--reason", "3"]).is_err());
    }

    #[test]
    fn test_cli_parse_birthdays_date() {
        let cli = Cli::parse_from(["mdsync", "birthdays", "--date", "2024-03-08"]);
        match cli.command {
            Commands::Birthdays(args) => {
                assert_eq!(args.date, chrono::NaiveDate::from_ymd_opt(2024, 3, 8));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_add_observer() {
        let cli = Cli::parse_from(["mdsync", "add-observer", "--observer", "100", "--owner", "200"]);
        assert!(matches!(cli.command, Commands::AddObserver(_)));
    }

    #[test]
    fn test_cli_parse_query_employee() {
        let cli = Cli::parse_from([
            "mdsync", "query", "employee", "--name", "Berg", "--caller", "10.0.0.5",
        ]);
        match cli.command {
            Commands::Query(args) => match args.what {
                QueryCommand::Employee { name, caller, .. } => {
                    assert_eq!(name.as_deref(), Some("Berg"));
                    assert_eq!(caller.as_deref(), Some("10.0.0.5"));
                }
                other => panic!("unexpected query: {other:?}"),
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_ping_and_init() {
        assert!(matches!(
            Cli::parse_from(["mdsync", "ping", "db"]).command,
            Commands::Ping(_)
        ));
        assert!(matches!(
            Cli::parse_from(["mdsync", "init"]).command,
            Commands::Init(_)
        ));
    }
}
