//! Sequential passes over an upstream snapshot

use super::entities::EntityReconciler;
use crate::core::summary::{SyncError, SyncSummary};
use crate::domain::{Department, RejectedRow, Snapshot, User};
use std::time::Instant;
use tokio::sync::watch;

/// Users between two progress lines
pub const USER_PROGRESS_EVERY: usize = 700;

/// Departments between two progress lines
pub const DEPARTMENT_PROGRESS_EVERY: usize = 300;

/// Runs the reconciler over whole snapshots in snapshot order
///
/// A shutdown signal stops the pass between two entities; the summary is
/// marked interrupted.
pub struct SyncCoordinator {
    reconciler: EntityReconciler,
    shutdown_signal: watch::Receiver<bool>,
}

impl SyncCoordinator {
    pub fn new(reconciler: EntityReconciler, shutdown_signal: watch::Receiver<bool>) -> Self {
        Self {
            reconciler,
            shutdown_signal,
        }
    }

    fn should_stop(&self) -> bool {
        *self.shutdown_signal.borrow()
    }

    /// Reconciles a fetched snapshot; rows that failed to decode count as failed
    pub async fn sync_user_snapshot(&self, snapshot: &Snapshot<User>) -> SyncSummary {
        self.run_users(&snapshot.entities, &snapshot.rejected).await
    }

    pub async fn sync_users(&self, users: &[User]) -> SyncSummary {
        self.run_users(users, &[]).await
    }

    async fn run_users(&self, users: &[User], rejected: &[RejectedRow]) -> SyncSummary {
        let start = Instant::now();
        let mut summary = SyncSummary::new(users.len() + rejected.len());
        summary.add_rejected(rejected);
        tracing::info!(total = users.len(), rejected = rejected.len(), "Starting user sync");

        for (index, user) in users.iter().enumerate() {
            if self.should_stop() {
                tracing::warn!(processed = index, "Shutdown requested, stopping user sync");
                summary.interrupted = true;
                break;
            }

            match self.reconciler.reconcile_user(user).await {
                Ok(result) => {
                    summary.record(result.outcome);
                    summary.registrations += result.registrations;
                    if result.sub_failures > 0 {
                        summary.errors.push(SyncError::new(
                            user.guid.trim(),
                            format!("{} employee record(s) failed", result.sub_failures),
                        ));
                    }
                }
                Err(e) => {
                    tracing::error!(user = %user.guid.trim(), error = %e, "Failed to reconcile user");
                    summary.add_error(SyncError::new(user.guid.trim(), e.to_string()));
                }
            }
            crate::log_progress!("users", index + 1, users.len(), USER_PROGRESS_EVERY);
        }

        let summary = summary.with_duration(start.elapsed());
        summary.log_summary("users");
        summary
    }

    pub async fn sync_department_snapshot(&self, snapshot: &Snapshot<Department>) -> SyncSummary {
        self.run_departments(&snapshot.entities, &snapshot.rejected).await
    }

    pub async fn sync_departments(&self, departments: &[Department]) -> SyncSummary {
        self.run_departments(departments, &[]).await
    }

    async fn run_departments(
        &self,
        departments: &[Department],
        rejected: &[RejectedRow],
    ) -> SyncSummary {
        let start = Instant::now();
        let mut summary = SyncSummary::new(departments.len() + rejected.len());
        summary.add_rejected(rejected);
        tracing::info!(
            total = departments.len(),
            rejected = rejected.len(),
            "Starting department sync"
        );

        for (index, department) in departments.iter().enumerate() {
            if self.should_stop() {
                tracing::warn!(processed = index, "Shutdown requested, stopping department sync");
                summary.interrupted = true;
                break;
            }

            match self.reconciler.reconcile_department(department).await {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    tracing::error!(
                        department = %department.guid.trim(),
                        error = %e,
                        "Failed to reconcile department"
                    );
                    summary.add_error(SyncError::new(department.guid.trim(), e.to_string()));
                }
            }
            crate::log_progress!(
                "departments",
                index + 1,
                departments.len(),
                DEPARTMENT_PROGRESS_EVERY
            );
        }

        let summary = summary.with_duration(start.elapsed());
        summary.log_summary("departments");
        summary
    }
}
