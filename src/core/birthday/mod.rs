//! Birthday reminders
//!
//! Observers register the colleagues whose birthdays they want to hear about.
//! Every morning [`BirthdayAggregator::compute_and_send`] queries the windows
//! due that day and mails each observer a single digest.

pub mod aggregator;
pub mod digest;
pub mod observers;
pub mod windows;

pub use aggregator::{BirthdayAggregator, BirthdayReport, DIGEST_SUBJECT};
pub use digest::RecipientDigest;
pub use observers::{ObserverBatchReport, ObserverRegistry, ObserverRequest};
