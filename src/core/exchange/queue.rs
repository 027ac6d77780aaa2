//! Exchange queue: registration, pending selection and outcome write-back

use crate::adapters::database::traits::{DirectoryQueryStore, ExchangeStore};
use crate::domain::{
    DeliveryOutcome, DeliveryReason, Guid, PendingBatch, PendingRow, RecordId, Result,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Counts of one write-back pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteBack {
    pub written: usize,
    pub failed: usize,
}

/// Tracks which subjects still have to reach which downstream target
#[derive(Clone)]
pub struct ExchangeQueue {
    store: Arc<dyn ExchangeStore + Send + Sync>,
    queries: Arc<dyn DirectoryQueryStore + Send + Sync>,
}

impl ExchangeQueue {
    pub fn new(
        store: Arc<dyn ExchangeStore + Send + Sync>,
        queries: Arc<dyn DirectoryQueryStore + Send + Sync>,
    ) -> Self {
        Self { store, queries }
    }

    /// Appends a row for `subject` under `reason`
    pub async fn register(&self, reason: DeliveryReason, subject: &Guid) -> Result<RecordId> {
        let record_id = self
            .store
            .register(reason.base_id(), reason.id(), subject)
            .await?;
        tracing::info!(%reason, %subject, record_id, "Subject queued for delivery");
        Ok(record_id)
    }

    /// Pending rows of `reason` with the current snapshot of their subjects
    pub async fn pending(&self, reason: DeliveryReason) -> Result<PendingBatch> {
        let rows = self.store.pending(reason.id()).await?;
        if rows.is_empty() {
            return Ok(PendingBatch::default());
        }

        let subjects: Vec<Guid> = rows
            .iter()
            .map(|r| r.subject.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let users = self.queries.users_by_guids(&subjects).await?;

        tracing::debug!(
            %reason,
            rows = rows.len(),
            subjects = subjects.len(),
            found = users.len(),
            "Loaded pending exchange rows"
        );
        Ok(PendingBatch { rows, users })
    }

    /// Stores `attempt_count + 1`, now and the (truncated) status
    pub async fn record_outcome(
        &self,
        record_id: RecordId,
        attempt_count: i32,
        status: &str,
    ) -> Result<()> {
        self.store
            .record_outcome(record_id, attempt_count, status)
            .await
    }

    /// Writes the status `outcome` assigns to each row, one task per row
    ///
    /// Every task is awaited; a failed row is logged and does not affect the
    /// others.
    pub async fn apply_delivery_result(
        &self,
        rows: &[PendingRow],
        outcome: &DeliveryOutcome,
    ) -> WriteBack {
        let mut tasks = JoinSet::new();
        for row in rows {
            let store = Arc::clone(&self.store);
            let row = row.clone();
            let status = outcome.status_for(&row.subject);
            tasks.spawn(async move {
                let result = store
                    .record_outcome(row.record_id, row.attempt_count, &status)
                    .await;
                (row, status, result)
            });
        }

        let mut summary = WriteBack::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((row, status, Ok(()))) => {
                    summary.written += 1;
                    crate::log_delivery_row!(row.record_id, row.subject, status);
                }
                Ok((row, _, Err(e))) => {
                    summary.failed += 1;
                    tracing::error!(
                        record_id = row.record_id,
                        subject = %row.subject,
                        error = %e,
                        "Failed to write exchange row status"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(error = %e, "Exchange write-back task failed");
                }
            }
        }
        summary
    }
}
