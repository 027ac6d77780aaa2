//! Per-observer birthday digest assembled from the window queries

use crate::domain::{BirthdayOwner, BirthdayWindow, ObserverMatch};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

const SECTION_RULE: &str = "--------------------------";

type Sections = BTreeMap<BirthdayWindow, Vec<BirthdayOwner>>;

/// Observer address → window → owners, filled concurrently by the windows
#[derive(Debug, Default)]
pub struct RecipientDigest {
    recipients: Mutex<BTreeMap<String, Sections>>,
}

impl RecipientDigest {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Sections>> {
        self.recipients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds the matches of one window; observers without an address are skipped
    pub fn merge(&self, window: BirthdayWindow, matches: Vec<ObserverMatch>) {
        let mut recipients = self.lock();
        for found in matches {
            let email = found.observer_email.trim();
            if email.is_empty() {
                tracing::debug!(
                    observer = %found.observer_name,
                    "Observer has no contact address, skipping"
                );
                continue;
            }
            recipients
                .entry(email.to_string())
                .or_default()
                .entry(window)
                .or_default()
                .push(found.owner);
        }
    }

    pub fn recipient_count(&self) -> usize {
        self.lock().len()
    }

    /// One `(address, body)` per observer with at least one owner
    pub fn render_all(&self) -> Vec<(String, String)> {
        self.lock()
            .iter()
            .filter(|(_, sections)| sections.values().any(|owners| !owners.is_empty()))
            .map(|(email, sections)| (email.clone(), render(sections)))
            .collect()
    }
}

/// Digest body: windows in fixed order, empty windows left out
pub fn render(sections: &BTreeMap<BirthdayWindow, Vec<BirthdayOwner>>) -> String {
    let mut body = String::new();
    for window in BirthdayWindow::ALL {
        let Some(owners) = sections.get(&window) else {
            continue;
        };
        if owners.is_empty() {
            continue;
        }
        body.push_str(SECTION_RULE);
        body.push('\n');
        body.push_str(window.label());
        body.push('\n');
        for owner in owners {
            body.push_str(&format!(
                "        {} ({}) \r\n",
                owner.name.trim(),
                owner.birthday.format("%d-%m-%Y")
            ));
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn found(observer_email: &str, owner: &str, y: i32, m: u32, d: u32) -> ObserverMatch {
        ObserverMatch {
            observer_name: "Observer".to_string(),
            observer_email: observer_email.to_string(),
            owner: BirthdayOwner {
                name: owner.to_string(),
                birthday: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            },
        }
    }

    #[test]
    fn test_only_filled_windows_render_in_order() {
        let digest = RecipientDigest::new();
        digest.merge(
            BirthdayWindow::NextMonth,
            vec![found("o@example.org", "Boris", 1985, 4, 2)],
        );
        digest.merge(
            BirthdayWindow::Tomorrow,
            vec![found("o@example.org", "Anna", 1990, 3, 29)],
        );

        let rendered = digest.render_all();

        assert_eq!(rendered.len(), 1);
        assert_eq!(
            rendered[0].1,
            "--------------------------\nTomorrow birthdays: \n        Anna (29-03-1990) \r\n\
             --------------------------\nNext month birthdays: \n        Boris (02-04-1985) \r\n"
        );
    }

    #[test]
    fn test_observer_without_address_is_skipped() {
        let digest = RecipientDigest::new();
        digest.merge(
            BirthdayWindow::Tomorrow,
            vec![found("  ", "Anna", 1990, 3, 29), found("o@example.org", "Anna", 1990, 3, 29)],
        );

        assert_eq!(digest.recipient_count(), 1);
        assert_eq!(digest.render_all()[0].0, "o@example.org");
    }

    #[test]
    fn test_empty_digest_renders_nothing() {
        let digest = RecipientDigest::new();
        digest.merge(BirthdayWindow::Tomorrow, Vec::new());
        assert!(digest.render_all().is_empty());
    }

    #[test]
    fn test_concurrent_merges_keep_every_owner() {
        let digest = std::sync::Arc::new(RecipientDigest::new());
        let handles: Vec<_> = BirthdayWindow::ALL
            .into_iter()
            .map(|window| {
                let digest = digest.clone();
                std::thread::spawn(move || {
                    digest.merge(window, vec![found("o@example.org", "Anna", 1990, 3, 29)]);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let body = &digest.render_all()[0].1;
        assert_eq!(body.matches("Anna (29-03-1990)").count(), 4);
    }
}
