//! Integration tests for logging functionality

use mdsync::config::LoggingConfig;
use mdsync::logging::{AccountingLog, AddressEvent};
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
    assert_eq!(config.accounting_log_path, "/var/log/mdsync/emails.log");
}

#[test]
fn test_console_only_disables_files() {
    let config = LoggingConfig::console_only();
    assert!(!config.local_enabled);
    assert!(config.local_path.is_empty());
}

#[test]
fn test_accounting_log_appends_lines() {
    let temp_dir = TempDir::new().unwrap();
    let log = AccountingLog::new(temp_dir.path().join("nested").join("emails.log"));
    assert!(!log.has_entries());

    log.record(AddressEvent::Set, " Anna Berg ", "0042", "a.b@example.org")
        .unwrap();
    log.record(AddressEvent::Removed, "Boris Lind", "0043", "b.l@example.org")
        .unwrap();

    let content = std::fs::read_to_string(log.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("email set: Anna Berg 0042 a.b@example.org"));
    assert!(lines[1].ends_with("email removed: Boris Lind 0043 b.l@example.org"));
    assert!(log.has_entries());
}

#[test]
fn test_accounting_log_truncate() {
    let temp_dir = TempDir::new().unwrap();
    let log = AccountingLog::new(temp_dir.path().join("emails.log"));

    // Truncating a file that was never written is fine
    log.truncate().unwrap();

    log.record(AddressEvent::Set, "Anna", "1", "a@example.org").unwrap();
    log.truncate().unwrap();

    assert!(!log.has_entries());
    assert!(log.path().exists());
}
