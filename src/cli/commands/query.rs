//! Query command implementation
//!
//! Read-only views over the stored master data, printed as JSON.

use super::common::{connect, load_checked, print_json};
use crate::cli::{EXIT_CONNECTION, EXIT_OK};
use crate::config::MdSyncConfig;
use crate::core::debounce::{DebounceCache, DEBOUNCE_WINDOW_SECS};
use crate::domain::User;
use chrono::{Duration, NaiveDate, Utc};
use clap::{Args, Subcommand};
use std::path::Path;

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    #[command(subcommand)]
    pub what: QueryCommand,
}

#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// All currently employed people
    Employees,

    /// Currently employed people that have a contact address
    EmailEmployees,

    /// Currently employed people by tab number or name
    Employee {
        /// Exact tab number
        #[arg(long, conflicts_with = "name", required_unless_present = "name")]
        tab_number: Option<String>,

        /// Part of the full name
        #[arg(long)]
        name: Option<String>,

        /// Identity of the caller; repeated name searches from it are debounced
        #[arg(long, requires = "name", conflicts_with = "tab_number")]
        caller: Option<String>,
    },

    /// People dismissed on or after a date
    Fired {
        /// First effective date (YYYY-MM-DD)
        #[arg(long)]
        since: NaiveDate,
    },
}

impl QueryCommand {
    /// Caller whose request is subject to debouncing; only name searches are
    pub fn debounced_caller(&self) -> Option<&str> {
        match self {
            QueryCommand::Employee {
                name: Some(_),
                caller: Some(caller),
                ..
            } => Some(caller.as_str()),
            _ => None,
        }
    }
}

impl QueryArgs {
    /// Execute the query command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::debug!(query = ?self.what, "Running query");

        let config = match load_checked(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        if let Some(caller) = self.what.debounced_caller() {
            if !caller_may_proceed(&config, caller)? {
                tracing::debug!(%caller, "Name search debounced");
                print_json::<[User]>(&[])?;
                return Ok(EXIT_OK);
            }
        }

        let stores = match connect(&config).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };
        let queries = &stores.queries;
        let active = config.application.active_state_label.as_str();

        let result = match &self.what {
            QueryCommand::Employees => queries.active_users(active).await,
            QueryCommand::EmailEmployees => queries.active_users_with_email(active).await,
            QueryCommand::Employee {
                tab_number: Some(tab_number),
                ..
            } => queries.active_users_by_tab_number(active, tab_number).await,
            QueryCommand::Employee {
                name: Some(name), ..
            } => queries.active_users_by_name(active, name).await,
            QueryCommand::Employee { .. } => Ok(Vec::new()),
            QueryCommand::Fired { since } => {
                queries
                    .users_fired_since(&config.application.fired_state_label, *since)
                    .await
            }
        };

        match result {
            Ok(users) => {
                print_json(&users)?;
                Ok(EXIT_OK)
            }
            Err(e) => {
                tracing::error!(error = %e, "Query failed");
                eprintln!("❌ Query failed: {e}");
                Ok(EXIT_CONNECTION)
            }
        }
    }
}

fn caller_may_proceed(config: &MdSyncConfig, caller: &str) -> anyhow::Result<bool> {
    let path = Path::new(&config.application.debounce_state_path);
    Ok(DebounceCache::check_persisted(
        path,
        Duration::seconds(DEBOUNCE_WINDOW_SECS),
        caller,
        Utc::now(),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(subcommand)]
        what: QueryCommand,
    }

    #[test]
    fn test_employee_needs_tab_number_or_name() {
        assert!(Harness::try_parse_from(["q", "employee"]).is_err());
        assert!(Harness::try_parse_from(["q", "employee", "--tab-number", "0042"]).is_ok());
        assert!(Harness::try_parse_from(["q", "employee", "--name", "Berg"]).is_ok());
    }

    #[test]
    fn test_caller_requires_name() {
        assert!(
            Harness::try_parse_from(["q", "employee", "--tab-number", "1", "--caller", "x"])
                .is_err()
        );
    }

    #[test]
    fn test_only_name_searches_are_debounced() {
        let by_name = Harness::try_parse_from([
            "q", "employee", "--name", "Berg", "--caller", "portal",
        ])
        .unwrap();
        assert_eq!(by_name.what.debounced_caller(), Some("portal"));

        let by_tab_number = QueryCommand::Employee {
            tab_number: Some("1".to_string()),
            name: None,
            caller: Some("portal".to_string()),
        };
        assert_eq!(by_tab_number.debounced_caller(), None);

        let anonymous = Harness::try_parse_from(["q", "employee", "--name", "Berg"]).unwrap();
        assert_eq!(anonymous.what.debounced_caller(), None);
    }

    #[test]
    fn test_fired_parses_date() {
        let parsed = Harness::try_parse_from(["q", "fired", "--since", "2024-01-31"]).unwrap();
        match parsed.what {
            QueryCommand::Fired { since } => {
                assert_eq!(since, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
            }
            other => panic!("unexpected query: {other:?}"),
        }
    }
}
