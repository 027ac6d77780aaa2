//! Logging and observability
//!
//! - Structured console and JSON file logs through `tracing`
//! - The accounting log of contact address changes
//! - Macros for the events every run reports
//!
//! # Example
//!
//! ```no_run
//! use mdsync::logging::init_logging;
//! use mdsync::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Sync started");
//! ```

pub mod accounting;
pub mod structured;

pub use accounting::{AccountingLog, AddressEvent};
pub use structured::{init_logging, LoggingGuard};

/// Log the outcome of reconciling one entity
///
/// # Example
///
/// ```no_run
/// use mdsync::log_reconcile_outcome;
///
/// log_reconcile_outcome!("employee", "b1c2-...", "updated");
/// ```
#[macro_export]
macro_rules! log_reconcile_outcome {
    ($kind:expr, $guid:expr, $outcome:expr) => {
        tracing::debug!(
            kind = $kind,
            guid = %$guid,
            outcome = %$outcome,
            "Entity reconciled"
        );
    };
}

/// Log the status written back for one exchange row
#[macro_export]
macro_rules! log_delivery_row {
    ($record_id:expr, $subject:expr, $status:expr) => {
        tracing::info!(
            record_id = $record_id,
            subject = %$subject,
            status = %$status,
            "Exchange row updated"
        );
    };
}

/// Log progress through a long snapshot every `$every` items
///
/// # Example
///
/// ```no_run
/// use mdsync::log_progress;
///
/// let total = 2100;
/// for done in 1..=total {
///     log_progress!("users", done, total, 700);
/// }
/// ```
#[macro_export]
macro_rules! log_progress {
    ($what:expr, $done:expr, $total:expr, $every:expr) => {
        if $done > 0 && $done % $every == 0 {
            tracing::info!(
                what = $what,
                done = $done,
                total = $total,
                "Sync progress"
            );
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_expand() {
        let total = 10usize;
        for done in 0..=total {
            log_progress!("departments", done, total, 3);
        }
        log_reconcile_outcome!("user", "U1", "inserted");
        log_delivery_row!(7, "U1", "200(ok)");
    }
}
