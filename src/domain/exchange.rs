//! Exchange queue records and delivery vocabulary

use crate::domain::entities::User;
use crate::domain::ids::{Guid, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the array in a downstream response carrying per-subject statuses
pub const ARRAY_NAME: &str = "UsersStatus";

/// Per-subject status value a downstream target uses for a delivered row
pub const ROW_STATUS_SUCCESS: &str = "Success";

/// Stored response status marking a row as delivered
pub const SUCCESS_SENTINEL: &str = "200(ok)";

/// Status stored for a pending subject missing from a per-subject response
pub const UNRECOGNIZED_STATUS: &str = "unrecognized status";

/// Status stored for a pending row whose subject has no current snapshot
pub const NO_DATA_STATUS: &str = "no data 204";

/// Maximum stored length of a response status, in characters
pub const MAX_STATUS_CHARS: usize = 300;

/// Business reason a subject is queued for delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryReason {
    /// Tell the upstream HR system about a new or changed contact address
    NotifyHr,
    /// Ask the accounts system to create an account for the subject
    CreateAccount,
}

impl DeliveryReason {
    /// Reason id as stored in the exchange table
    pub fn id(self) -> i32 {
        match self {
            DeliveryReason::NotifyHr => 1,
            DeliveryReason::CreateAccount => 2,
        }
    }

    /// Delivery target (base) id as stored in the exchange table
    pub fn base_id(self) -> i32 {
        match self {
            DeliveryReason::NotifyHr => 2,
            DeliveryReason::CreateAccount => 6,
        }
    }

    /// Looks a reason up by its stored id
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(DeliveryReason::NotifyHr),
            2 => Some(DeliveryReason::CreateAccount),
            _ => None,
        }
    }
}

impl fmt::Display for DeliveryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryReason::NotifyHr => write!(f, "notify-hr"),
            DeliveryReason::CreateAccount => write!(f, "create-account"),
        }
    }
}

/// Mailing list a notification recipient is subscribed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationType {
    /// Administrators: delivery failures, birthday digest bcc
    Admins,
    /// Accounting: weekly file of contact address changes
    Accounting,
}

impl NotificationType {
    /// Type id as stored in `users_for_notifications.notitype`
    pub fn id(self) -> i32 {
        match self {
            NotificationType::Admins => 1,
            NotificationType::Accounting => 2,
        }
    }
}

/// One row of the exchange table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRecord {
    pub id: RecordId,
    pub base_id: i32,
    pub reason_id: i32,
    pub subject: Guid,
    pub attempt_count: i32,
    pub last_attempt: Option<DateTime<Utc>>,
    pub response_status: String,
}

impl ExchangeRecord {
    /// Whether the row still needs to be delivered
    pub fn is_pending(&self) -> bool {
        self.response_status != SUCCESS_SENTINEL
    }
}

/// A pending exchange row as seen by a delivery run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRow {
    pub record_id: RecordId,
    pub subject: Guid,
    pub attempt_count: i32,
}

/// Pending rows for one reason plus the current snapshot of their subjects
#[derive(Debug, Clone, Default)]
pub struct PendingBatch {
    pub rows: Vec<PendingRow>,
    /// Current full-attribute snapshot for the subjects that still exist
    pub users: Vec<User>,
}

impl PendingBatch {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of one delivery attempt, as decoded from the downstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The target accepted the batch without per-subject statuses
    Delivered,
    /// The whole call failed; the text is written to every pending row
    BatchError(String),
    /// Per-subject statuses keyed by subject GUID
    PerSubject(std::collections::HashMap<String, String>),
}

impl DeliveryOutcome {
    /// Status to store for a pending row of `subject`
    pub fn status_for(&self, subject: &Guid) -> String {
        match self {
            DeliveryOutcome::Delivered => SUCCESS_SENTINEL.to_string(),
            DeliveryOutcome::BatchError(text) => text.clone(),
            DeliveryOutcome::PerSubject(statuses) => statuses
                .get(subject.as_str())
                .cloned()
                .unwrap_or_else(|| UNRECOGNIZED_STATUS.to_string()),
        }
    }
}

/// Truncates a status text to at most [`MAX_STATUS_CHARS`] characters
pub fn truncate_status(status: &str) -> String {
    status.chars().take(MAX_STATUS_CHARS).collect()
}
