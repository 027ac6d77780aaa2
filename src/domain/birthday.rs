//! Birthday notification vocabulary

use serde::{Deserialize, Serialize};

/// Time window a birthday reminder is computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BirthdayWindow {
    Tomorrow,
    InThreeDays,
    NextWeek,
    NextMonth,
}

impl BirthdayWindow {
    /// All windows in digest order
    pub const ALL: [BirthdayWindow; 4] = [
        BirthdayWindow::Tomorrow,
        BirthdayWindow::InThreeDays,
        BirthdayWindow::NextWeek,
        BirthdayWindow::NextMonth,
    ];

    /// Section heading used in the digest body
    pub fn label(self) -> &'static str {
        match self {
            BirthdayWindow::Tomorrow => "Tomorrow birthdays: ",
            BirthdayWindow::InThreeDays => "In three days birthdays: ",
            BirthdayWindow::NextWeek => "Next week birthdays: ",
            BirthdayWindow::NextMonth => "Next month birthdays: ",
        }
    }
}

/// Observer/owner registration request, identified by personnel codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverOwnerPair {
    /// Personnel code of the person who receives reminders
    pub observer: String,
    /// Personnel code of the person whose birthday is watched
    pub owner: String,
}

/// Owner of a birthday as listed in a digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BirthdayOwner {
    pub name: String,
    pub birthday: chrono::NaiveDate,
}

/// One observer/owner match returned by a window query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverMatch {
    pub observer_name: String,
    /// May be empty when the observer has no known address
    pub observer_email: String,
    pub owner: BirthdayOwner,
}
