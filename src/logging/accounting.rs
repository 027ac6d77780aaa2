//! Append-only text log of contact address changes
//!
//! The accounting team receives this file weekly (see
//! [`crate::core::exchange::DeliveryService`]) and the file is truncated after
//! a successful send.

use crate::domain::{MdError, Result};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// What happened to a user's contact address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressEvent {
    Set,
    Removed,
}

impl AddressEvent {
    fn as_str(self) -> &'static str {
        match self {
            AddressEvent::Set => "set",
            AddressEvent::Removed => "removed",
        }
    }
}

/// Writer for the accounting log file
#[derive(Debug)]
pub struct AccountingLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AccountingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one `<timestamp> email set|removed: <name> <code> <address>` line
    ///
    /// # Errors
    ///
    /// Returns `MdError::Io` when the file cannot be opened or written
    pub fn record(&self, event: AddressEvent, name: &str, code: &str, address: &str) -> Result<()> {
        self.record_at(Local::now(), event, name, code, address)
    }

    pub(crate) fn record_at(
        &self,
        at: DateTime<Local>,
        event: AddressEvent,
        name: &str,
        code: &str,
        address: &str,
    ) -> Result<()> {
        let line = format!(
            "{} email {}: {} {} {}\n",
            at.format("%Y-%m-%d %H:%M:%S"),
            event.as_str(),
            name.trim(),
            code.trim(),
            address.trim()
        );

        let _guard = self
            .lock
            .lock()
            .map_err(|_| MdError::Other("accounting log lock poisoned".to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Whether the file exists and has content
    pub fn has_entries(&self) -> bool {
        std::fs::metadata(&self.path)
            .map(|m| m.len() > 0)
            .unwrap_or(false)
    }

    /// Empties the file after it has been mailed
    ///
    /// # Errors
    ///
    /// Returns `MdError::Io` when the file cannot be truncated
    pub fn truncate(&self) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| MdError::Other("accounting log lock poisoned".to_string()))?;
        if self.path.exists() {
            OpenOptions::new().write(true).truncate(true).open(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_record_appends_lines() {
        let dir = TempDir::new().unwrap();
        let log = AccountingLog::new(dir.path().join("nested").join("emails.log"));
        let at = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();

        log.record_at(at, AddressEvent::Set, " Anna Berg ", "100", "a.b@example.org")
            .unwrap();
        log.record_at(at, AddressEvent::Removed, "Anna Berg", "100", "")
            .unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "2024-03-01 09:30:00 email set: Anna Berg 100 a.b@example.org"
        );
        assert!(lines[1].starts_with("2024-03-01 09:30:00 email removed: Anna Berg 100"));
        assert!(log.has_entries());
    }

    #[test]
    fn test_truncate_empties_file() {
        let dir = TempDir::new().unwrap();
        let log = AccountingLog::new(dir.path().join("emails.log"));
        log.record(AddressEvent::Set, "A", "1", "a@example.org").unwrap();

        log.truncate().unwrap();
        assert!(!log.has_entries());
        assert_eq!(std::fs::read_to_string(log.path()).unwrap(), "");
    }

    #[test]
    fn test_truncate_missing_file_is_ok() {
        let dir = TempDir::new().unwrap();
        let log = AccountingLog::new(dir.path().join("absent.log"));
        assert!(log.truncate().is_ok());
        assert!(!log.has_entries());
    }
}
