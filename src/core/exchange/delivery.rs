//! Delivery runner: pushes pending subjects of one reason to its target

use super::queue::{ExchangeQueue, WriteBack};
use super::response::interpret_response;
use crate::adapters::database::traits::DirectoryQueryStore;
use crate::adapters::mail::{MailSender, OutgoingMail};
use crate::adapters::upstream::DeliveryTransport;
use crate::domain::{
    DeliveryOutcome, DeliveryReason, NotificationType, PendingRow, Result, User, NO_DATA_STATUS,
    SUCCESS_SENTINEL,
};
use crate::logging::AccountingLog;
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashSet;
use std::sync::Arc;

/// Subject of the mail telling administrators a delivery failed
pub const ADMIN_SUBJECT: &str = "From MD";

/// Subject of the weekly accounting mail
pub const ACCOUNTING_SUBJECT: &str = "Emails file";

/// What one delivery run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Pending rows found
    pub pending: usize,
    /// Rows stored with the success sentinel
    pub delivered: usize,
    /// Rows stored with any other status
    pub failed: usize,
    /// Rows whose subject has no current snapshot
    pub no_data: usize,
    /// Rows whose status could not be written
    pub write_failures: usize,
    pub dry_run: bool,
    pub admins_notified: bool,
    pub accounting_sent: bool,
}

impl DeliveryReport {
    /// Nothing was pending
    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    pub fn is_successful(&self) -> bool {
        self.failed == 0 && self.no_data == 0 && self.write_failures == 0
    }

    fn add(&mut self, rows: &[PendingRow], outcome: &DeliveryOutcome, write_back: WriteBack) {
        let delivered = rows
            .iter()
            .filter(|r| outcome.status_for(&r.subject) == SUCCESS_SENTINEL)
            .count();
        self.delivered += delivered;
        self.failed += rows.len() - delivered;
        self.write_failures += write_back.failed;
    }
}

/// Runs one delivery pass per reason
pub struct DeliveryService {
    queue: ExchangeQueue,
    queries: Arc<dyn DirectoryQueryStore + Send + Sync>,
    transport: Arc<dyn DeliveryTransport>,
    mail: Arc<dyn MailSender>,
    accounting: Arc<AccountingLog>,
    dry_run: bool,
}

impl DeliveryService {
    pub fn new(
        queue: ExchangeQueue,
        queries: Arc<dyn DirectoryQueryStore + Send + Sync>,
        transport: Arc<dyn DeliveryTransport>,
        mail: Arc<dyn MailSender>,
        accounting: Arc<AccountingLog>,
    ) -> Self {
        Self {
            queue,
            queries,
            transport,
            mail,
            accounting,
            dry_run: false,
        }
    }

    /// Logs the batch instead of sending it and writes nothing back
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Delivers every pending subject of `reason` in one call
    ///
    /// Rows whose subject no longer has a snapshot are marked "no data 204"
    /// without a call. On Fridays a notify-HR run also mails the accounting
    /// log, whatever happened to the pending rows.
    ///
    /// # Errors
    ///
    /// Returns the store error when the pending rows cannot be loaded; call
    /// and write-back failures are recorded per row instead.
    pub async fn deliver(&self, reason: DeliveryReason, today: NaiveDate) -> Result<DeliveryReport> {
        let mut report = DeliveryReport {
            dry_run: self.dry_run,
            ..Default::default()
        };

        let batch = self.queue.pending(reason).await?;
        report.pending = batch.rows.len();

        if batch.is_empty() {
            tracing::info!(%reason, "No pending rows, nothing to deliver");
        } else {
            self.deliver_batch(reason, &batch.rows, &batch.users, &mut report)
                .await;
        }

        if reason == DeliveryReason::NotifyHr && today.weekday() == Weekday::Fri {
            report.accounting_sent = self.send_accounting_log(today).await;
        }

        tracing::info!(
            %reason,
            pending = report.pending,
            delivered = report.delivered,
            failed = report.failed,
            no_data = report.no_data,
            write_failures = report.write_failures,
            dry_run = report.dry_run,
            "Delivery completed"
        );
        Ok(report)
    }

    async fn deliver_batch(
        &self,
        reason: DeliveryReason,
        rows: &[PendingRow],
        users: &[User],
        report: &mut DeliveryReport,
    ) {
        let known: HashSet<&str> = users.iter().map(|u| u.guid.trim()).collect();
        let (present, missing): (Vec<PendingRow>, Vec<PendingRow>) = rows
            .iter()
            .cloned()
            .partition(|r| known.contains(r.subject.as_str()));
        report.no_data = missing.len();

        if self.dry_run {
            tracing::info!(
                %reason,
                users = users.len(),
                rows = present.len(),
                without_snapshot = missing.len(),
                "Dry run, skipping delivery and write-back"
            );
            return;
        }

        if !missing.is_empty() {
            tracing::warn!(%reason, rows = missing.len(), "Pending subjects without a snapshot");
            let no_data = DeliveryOutcome::BatchError(NO_DATA_STATUS.to_string());
            let write_back = self.queue.apply_delivery_result(&missing, &no_data).await;
            report.write_failures += write_back.failed;
        }

        if present.is_empty() {
            return;
        }

        let (outcome, malformed) = match self.transport.put_users(reason, users).await {
            Ok(response) => {
                let interpreted = interpret_response(&response);
                (interpreted.outcome, interpreted.malformed)
            }
            Err(e) => {
                tracing::error!(%reason, error = %e, "Delivery call failed");
                (DeliveryOutcome::BatchError(e.to_string()), false)
            }
        };

        let write_back = self.queue.apply_delivery_result(&present, &outcome).await;
        report.add(&present, &outcome, write_back);

        let batch_failed = matches!(outcome, DeliveryOutcome::BatchError(_));
        if malformed || (reason == DeliveryReason::CreateAccount && batch_failed) {
            report.admins_notified = self.notify_admins(reason, users, &outcome).await;
        }
    }

    async fn notify_admins(
        &self,
        reason: DeliveryReason,
        users: &[User],
        outcome: &DeliveryOutcome,
    ) -> bool {
        let admins = match self.queries.notification_emails(NotificationType::Admins).await {
            Ok(admins) if !admins.is_empty() => admins,
            Ok(_) => {
                tracing::warn!(%reason, "No administrators to notify about a failed delivery");
                return false;
            }
            Err(e) => {
                tracing::error!(%reason, error = %e, "Failed to load administrator addresses");
                return false;
            }
        };

        let error = match outcome {
            DeliveryOutcome::BatchError(text) => text.as_str(),
            _ => "",
        };
        let mut body = format!(
            "Delivery of {} user(s) for {} failed: {}\n\n",
            users.len(),
            reason,
            error
        );
        for user in users {
            body.push_str(&format!("{} {} {}\n", user.name.trim(), user.guid.trim(), user.email.trim()));
        }

        match self.mail.send(&OutgoingMail::new(admins, ADMIN_SUBJECT, body)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(%reason, error = %e, "Failed to notify administrators");
                false
            }
        }
    }

    /// Mails the accounting log and truncates it after a successful send
    async fn send_accounting_log(&self, today: NaiveDate) -> bool {
        if !self.accounting.has_entries() {
            tracing::info!(
                path = %self.accounting.path().display(),
                "Accounting log is empty, nothing to send"
            );
            return false;
        }
        if self.dry_run {
            tracing::info!("Dry run, skipping accounting mail");
            return false;
        }

        let recipients = match self.queries.notification_emails(NotificationType::Accounting).await {
            Ok(recipients) if !recipients.is_empty() => recipients,
            Ok(_) => {
                tracing::warn!("No accounting recipients configured");
                return false;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load accounting addresses");
                return false;
            }
        };
        let bcc = match self.queries.notification_emails(NotificationType::Admins).await {
            Ok(admins) => admins.into_iter().take(1).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load administrator addresses");
                Vec::new()
            }
        };

        let body = format!(
            "Contact address changes, week {}, {}\n",
            today.iso_week().week(),
            today.format("%d.%m.%Y")
        );
        let mail = OutgoingMail::new(recipients, ACCOUNTING_SUBJECT, body)
            .with_bcc(bcc)
            .with_attachment(self.accounting.path());

        if let Err(e) = self.mail.send(&mail).await {
            tracing::error!(error = %e, "Failed to send accounting log");
            return false;
        }
        if let Err(e) = self.accounting.truncate() {
            tracing::error!(error = %e, "Failed to truncate accounting log");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Guid, UNRECOGNIZED_STATUS};
    use crate::logging::AddressEvent;
    use crate::testing::{InMemoryStore, RecordingMailSender, ScriptedTransport};
    use tempfile::TempDir;

    struct Fixture {
        store: Arc<InMemoryStore>,
        mail: Arc<RecordingMailSender>,
        accounting: Arc<AccountingLog>,
        _dir: TempDir,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(InMemoryStore::new());
        for (guid, name, email) in [
            ("U1", "Anna", "anna@example.org"),
            ("U2", "Boris", "boris@example.org"),
            ("A1", "Admin", "admin@example.org"),
            ("B1", "Buch", "buch@example.org"),
        ] {
            store.seed_user(&User {
                guid: guid.to_string(),
                name: name.to_string(),
                email: email.to_string(),
                ..Default::default()
            });
        }
        store.add_recipient("A1", NotificationType::Admins);
        store.add_recipient("B1", NotificationType::Accounting);
        Fixture {
            store,
            mail: Arc::new(RecordingMailSender::new()),
            accounting: Arc::new(AccountingLog::new(dir.path().join("emails.log"))),
            _dir: dir,
        }
    }

    fn service(f: &Fixture, transport: ScriptedTransport) -> (DeliveryService, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let service = DeliveryService::new(
            ExchangeQueue::new(f.store.clone(), f.store.clone()),
            f.store.clone(),
            transport.clone(),
            f.mail.clone(),
            f.accounting.clone(),
        );
        (service, transport)
    }

    fn guid(s: &str) -> Guid {
        Guid::new(s).unwrap()
    }

    // 2024-03-06 is a Wednesday, 2024-03-08 a Friday
    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 6).unwrap()
    }

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()
    }

    #[tokio::test]
    async fn test_nothing_pending_makes_no_call() {
        let f = fixture();
        let (service, transport) = service(&f, ScriptedTransport::responding(200, ""));

        let report = service.deliver(DeliveryReason::NotifyHr, wednesday()).await.unwrap();

        assert!(report.is_empty());
        assert!(transport.calls().is_empty());
        assert!(f.mail.sent().is_empty());
    }

    #[tokio::test]
    async fn test_per_subject_response_is_written_back() {
        let f = fixture();
        f.store.seed_exchange(DeliveryReason::NotifyHr, &guid("U1"), 0, "");
        f.store.seed_exchange(DeliveryReason::NotifyHr, &guid("U2"), 2, "status 500: boom");
        let body = r#"{"UsersStatus":[{"userGuid":"U1","status":"Success"}]}"#;
        let (service, transport) = service(&f, ScriptedTransport::responding(200, body));

        let report = service.deliver(DeliveryReason::NotifyHr, wednesday()).await.unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(transport.calls().len(), 1);
        let rows = f.store.exchanges();
        assert_eq!(rows[0].response_status, SUCCESS_SENTINEL);
        assert_eq!(rows[1].response_status, UNRECOGNIZED_STATUS);
        assert_eq!(rows[1].attempt_count, 3);
        assert!(f.mail.sent().is_empty());
    }

    #[tokio::test]
    async fn test_subject_without_snapshot_gets_no_data() {
        let f = fixture();
        f.store.seed_exchange(DeliveryReason::NotifyHr, &guid("GONE"), 0, "");
        let (service, transport) = service(&f, ScriptedTransport::responding(200, ""));

        let report = service.deliver(DeliveryReason::NotifyHr, wednesday()).await.unwrap();

        assert_eq!(report.no_data, 1);
        assert!(transport.calls().is_empty());
        assert_eq!(f.store.exchanges()[0].response_status, NO_DATA_STATUS);
    }

    #[tokio::test]
    async fn test_account_creation_failure_notifies_admins() {
        let f = fixture();
        f.store.seed_exchange(DeliveryReason::CreateAccount, &guid("U1"), 0, "");
        let (service, _) = service(&f, ScriptedTransport::responding(500, "internal error"));

        let report = service
            .deliver(DeliveryReason::CreateAccount, wednesday())
            .await
            .unwrap();

        assert!(report.admins_notified);
        let sent = f.mail.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, ADMIN_SUBJECT);
        assert_eq!(sent[0].to, vec!["admin@example.org".to_string()]);
        assert!(sent[0].body.contains("status 500: internal error"));
        assert!(sent[0].body.contains("Anna U1"));
        assert_eq!(f.store.exchanges()[0].response_status, "status 500: internal error");
    }

    #[tokio::test]
    async fn test_hr_notification_failure_does_not_mail() {
        let f = fixture();
        f.store.seed_exchange(DeliveryReason::NotifyHr, &guid("U1"), 0, "");
        let (service, _) = service(&f, ScriptedTransport::failing("connection refused"));

        let report = service.deliver(DeliveryReason::NotifyHr, wednesday()).await.unwrap();

        assert_eq!(report.failed, 1);
        assert!(!report.admins_notified);
        assert!(f.mail.sent().is_empty());
        assert!(f.store.exchanges()[0].response_status.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_malformed_response_notifies_admins() {
        let f = fixture();
        f.store.seed_exchange(DeliveryReason::NotifyHr, &guid("U1"), 0, "");
        let (service, _) = service(&f, ScriptedTransport::responding(200, "not json"));

        let report = service.deliver(DeliveryReason::NotifyHr, wednesday()).await.unwrap();

        assert!(report.admins_notified);
        assert_eq!(f.mail.sent()[0].subject, ADMIN_SUBJECT);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let f = fixture();
        f.store.seed_exchange(DeliveryReason::NotifyHr, &guid("U1"), 0, "");
        let (service, transport) = service(&f, ScriptedTransport::responding(200, ""));
        let service = service.with_dry_run(true);

        let report = service.deliver(DeliveryReason::NotifyHr, wednesday()).await.unwrap();

        assert!(report.dry_run);
        assert!(transport.calls().is_empty());
        assert_eq!(f.store.exchanges()[0].attempt_count, 0);
    }

    #[tokio::test]
    async fn test_friday_sends_and_truncates_accounting_log() {
        let f = fixture();
        f.accounting
            .record(AddressEvent::Set, "Anna", "0042", "anna@example.org")
            .unwrap();
        let (service, _) = service(&f, ScriptedTransport::responding(200, ""));

        let report = service.deliver(DeliveryReason::NotifyHr, friday()).await.unwrap();

        assert!(report.accounting_sent);
        let sent = f.mail.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, ACCOUNTING_SUBJECT);
        assert_eq!(sent[0].to, vec!["buch@example.org".to_string()]);
        assert_eq!(sent[0].bcc, vec!["admin@example.org".to_string()]);
        assert!(sent[0].body.contains("week 10, 08.03.2024"));
        assert_eq!(sent[0].attachment.as_deref(), Some(f.accounting.path()));
        assert!(!f.accounting.has_entries());
    }

    #[tokio::test]
    async fn test_accounting_log_only_on_friday_hr_runs() {
        let f = fixture();
        f.accounting
            .record(AddressEvent::Set, "Anna", "0042", "anna@example.org")
            .unwrap();
        let (service, _) = service(&f, ScriptedTransport::responding(200, ""));

        service.deliver(DeliveryReason::NotifyHr, wednesday()).await.unwrap();
        service.deliver(DeliveryReason::CreateAccount, friday()).await.unwrap();

        assert!(f.mail.sent().is_empty());
        assert!(f.accounting.has_entries());
    }
}
