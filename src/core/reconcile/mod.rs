//! Entity reconciliation
//!
//! Each incoming entity is looked up by GUID, classified with
//! [`ReconcileStatus`] and inserted, updated or left alone. Users whose
//! contact address changed are queued for delivery.

pub mod entities;
pub mod status;
pub mod sync;

pub use entities::{EntityReconciler, UserReconciliation};
pub use status::{Reconcilable, ReconcileOutcome, ReconcileStatus};
pub use sync::SyncCoordinator;
