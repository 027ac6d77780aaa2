//! Sync summary and reporting
//!
//! Tracks what one pass over an upstream snapshot did, entity by entity.

use crate::core::reconcile::ReconcileOutcome;
use crate::domain::RejectedRow;
use std::time::Duration;

/// Summary of one sync pass
#[derive(Debug, Clone)]
pub struct SyncSummary {
    /// Entities in the upstream snapshot
    pub total: usize,

    pub inserted: usize,

    pub updated: usize,

    pub unchanged: usize,

    /// Entities whose reconciliation failed
    pub failed: usize,

    /// Exchange rows registered while reconciling
    pub registrations: usize,

    /// The pass stopped early on a shutdown signal
    pub interrupted: bool,

    pub duration: Duration,

    pub errors: Vec<SyncError>,
}

impl SyncSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            failed: 0,
            registrations: 0,
            interrupted: false,
            duration: Duration::from_secs(0),
            errors: Vec::new(),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Count one reconciled entity
    pub fn record(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Inserted => self.inserted += 1,
            ReconcileOutcome::Updated => self.updated += 1,
            ReconcileOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Count one failed entity
    pub fn add_error(&mut self, error: SyncError) {
        self.failed += 1;
        self.errors.push(error);
    }

    /// Count upstream rows that never reached reconciliation
    pub fn add_rejected(&mut self, rows: &[RejectedRow]) {
        for row in rows {
            self.add_error(SyncError::new(row.guid.as_str(), row.message.as_str()));
        }
    }

    /// Entities handled so far, failed ones included
    pub fn processed(&self) -> usize {
        self.inserted + self.updated + self.unchanged + self.failed
    }

    /// No failures and not interrupted
    pub fn is_successful(&self) -> bool {
        self.failed == 0 && !self.interrupted
    }

    /// Log the summary
    pub fn log_summary(&self, what: &str) {
        tracing::info!(
            what,
            total = self.total,
            inserted = self.inserted,
            updated = self.updated,
            unchanged = self.unchanged,
            failed = self.failed,
            registrations = self.registrations,
            interrupted = self.interrupted,
            duration_secs = self.duration.as_secs(),
            "Sync completed"
        );

        for error in &self.errors {
            tracing::warn!(
                what,
                guid = %error.guid,
                message = %error.message,
                "Sync error"
            );
        }
    }
}

/// Entity that failed to reconcile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncError {
    /// GUID as received, possibly empty
    pub guid: String,

    pub message: String,
}

impl SyncError {
    pub fn new(guid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            message: message.into(),
        }
    }
}
