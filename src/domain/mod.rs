//! Domain models and types for mdsync.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Identifiers** ([`Guid`], [`RecordId`])
//! - **Master data entities** ([`User`], [`Employee`], [`Department`], [`Position`],
//!   [`Pshr`], [`EmployeeState`])
//! - **Exchange vocabulary** ([`DeliveryReason`], [`ExchangeRecord`], [`DeliveryOutcome`])
//! - **Birthday vocabulary** ([`BirthdayWindow`], [`ObserverOwnerPair`])
//! - **Error types** ([`MdError`]) and the [`Result`] alias
//!
//! # Error Handling
//!
//! ```rust
//! use mdsync::domain::{MdError, Result};
//!
//! fn example() -> Result<()> {
//!     let config = mdsync::config::load_config("mdsync.toml")?;
//!     Ok(())
//! }
//! ```

pub mod birthday;
pub mod entities;
pub mod errors;
pub mod exchange;
pub mod ids;
pub mod result;

// Re-export commonly used types for convenience
pub use birthday::{BirthdayOwner, BirthdayWindow, ObserverMatch, ObserverOwnerPair};
pub use entities::{
    Department, DepartmentsEnvelope, Employee, EmployeeState, Position, Pshr, RejectedRow, Snapshot,
    User, UsersEnvelope,
};
pub use errors::MdError;
pub use exchange::{
    DeliveryOutcome, DeliveryReason, ExchangeRecord, NotificationType, PendingBatch, PendingRow,
    MAX_STATUS_CHARS, NO_DATA_STATUS, SUCCESS_SENTINEL, UNRECOGNIZED_STATUS,
};
pub use ids::{Guid, RecordId};
pub use result::Result;
