//! Birthday reminders: query the due windows, merge, mail one digest per observer

use super::digest::RecipientDigest;
use super::windows::patterns;
use crate::adapters::database::traits::{BirthdayStore, DirectoryQueryStore};
use crate::adapters::mail::{MailSender, OutgoingMail};
use crate::domain::{BirthdayWindow, NotificationType};
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Subject of every birthday digest
pub const DIGEST_SUBJECT: &str = "Birthdays notification";

/// What one reminder run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BirthdayReport {
    /// Windows due today, in query order
    pub windows: Vec<BirthdayWindow>,
    /// Windows whose query failed
    pub failed_windows: usize,
    pub sent: usize,
    pub failed: usize,
}

impl BirthdayReport {
    pub fn is_successful(&self) -> bool {
        self.failed_windows == 0 && self.failed == 0
    }
}

pub struct BirthdayAggregator {
    store: Arc<dyn BirthdayStore + Send + Sync>,
    queries: Arc<dyn DirectoryQueryStore + Send + Sync>,
    mail: Arc<dyn MailSender>,
}

impl BirthdayAggregator {
    pub fn new(
        store: Arc<dyn BirthdayStore + Send + Sync>,
        queries: Arc<dyn DirectoryQueryStore + Send + Sync>,
        mail: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            store,
            queries,
            mail,
        }
    }

    /// Computes every window due on `today` concurrently, then mails one
    /// digest per observer with the first administrator in bcc
    ///
    /// A failed window query is logged and leaves its section out.
    pub async fn compute_and_send(&self, today: NaiveDate) -> BirthdayReport {
        let digest = Arc::new(RecipientDigest::new());
        let mut report = BirthdayReport::default();

        let mut tasks = JoinSet::new();
        for window in BirthdayWindow::ALL {
            let Some(patterns) = patterns(window, today) else {
                tracing::debug!(?window, %today, "Birthday window not due");
                continue;
            };
            report.windows.push(window);
            let store = Arc::clone(&self.store);
            let digest = Arc::clone(&digest);
            tasks.spawn(async move {
                let result = store.birthday_matches(&patterns).await;
                let outcome = result.map(|matches| {
                    let found = matches.len();
                    digest.merge(window, matches);
                    found
                });
                (window, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((window, Ok(found))) => {
                    tracing::debug!(?window, found, "Birthday window queried");
                }
                Ok((window, Err(e))) => {
                    report.failed_windows += 1;
                    tracing::error!(?window, error = %e, "Birthday window query failed");
                }
                Err(e) => {
                    report.failed_windows += 1;
                    tracing::error!(error = %e, "Birthday window task failed");
                }
            }
        }

        let bcc = self.admin_bcc().await;
        for (email, body) in digest.render_all() {
            let mail = OutgoingMail::new(vec![email.clone()], DIGEST_SUBJECT, body)
                .with_bcc(bcc.clone());
            match self.mail.send(&mail).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(recipient = %email, error = %e, "Failed to send birthday digest");
                }
            }
        }

        tracing::info!(
            %today,
            windows = report.windows.len(),
            sent = report.sent,
            failed = report.failed,
            "Birthday reminders completed"
        );
        report
    }

    async fn admin_bcc(&self) -> Vec<String> {
        match self.queries.notification_emails(NotificationType::Admins).await {
            Ok(admins) => {
                if admins.is_empty() {
                    tracing::warn!("No administrator address for the birthday digest bcc");
                }
                admins.into_iter().take(1).collect()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load administrator addresses");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::User;
    use crate::testing::{InMemoryStore, RecordingMailSender};

    fn seed(store: &InMemoryStore, guid: &str, email: &str, birthday: Option<NaiveDate>) {
        store.seed_user(&User {
            guid: guid.to_string(),
            name: format!("Name {guid}"),
            email: email.to_string(),
            birthday,
            ..Default::default()
        });
    }

    fn aggregator(store: &Arc<InMemoryStore>, mail: &Arc<RecordingMailSender>) -> BirthdayAggregator {
        BirthdayAggregator::new(store.clone(), store.clone(), mail.clone())
    }

    #[tokio::test]
    async fn test_weekday_queries_daily_windows_only() {
        let store = Arc::new(InMemoryStore::new());
        let mail = Arc::new(RecordingMailSender::new());
        // 2024-03-06 is a Wednesday
        let today = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();

        let report = aggregator(&store, &mail).compute_and_send(today).await;

        assert_eq!(
            report.windows,
            vec![BirthdayWindow::Tomorrow, BirthdayWindow::InThreeDays]
        );
        assert_eq!(store.birthday_queries().len(), 2);
        assert!(mail.sent().is_empty());
    }

    #[tokio::test]
    async fn test_digest_goes_to_observer_with_admin_bcc() {
        let store = Arc::new(InMemoryStore::new());
        let mail = Arc::new(RecordingMailSender::new());
        seed(&store, "OBS", "obs@example.org", None);
        seed(&store, "OWN", "", NaiveDate::from_ymd_opt(1990, 3, 7));
        seed(&store, "ADM", "admin@example.org", None);
        seed(&store, "SILENT", "", None);
        store.seed_pair("OBS", "OWN");
        store.seed_pair("SILENT", "OWN");
        store.add_recipient("ADM", NotificationType::Admins);

        let today = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        let report = aggregator(&store, &mail).compute_and_send(today).await;

        assert_eq!(report.sent, 1);
        let sent = mail.sent();
        assert_eq!(sent[0].to, vec!["obs@example.org".to_string()]);
        assert_eq!(sent[0].bcc, vec!["admin@example.org".to_string()]);
        assert_eq!(sent[0].subject, DIGEST_SUBJECT);
        assert!(sent[0].body.contains("Tomorrow birthdays: \n        Name OWN (07-03-1990) \r\n"));
    }
}
