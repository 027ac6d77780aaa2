//! Outbound exchange: the delivery queue and the runner draining it
//!
//! Reconciliation registers subjects with [`ExchangeQueue::register`]; a
//! [`DeliveryService`] run later sends every pending subject of one reason to
//! its downstream target and writes the per-row status back. Rows are never
//! deleted and are retried on every run until they carry the success sentinel.

pub mod delivery;
pub mod queue;
pub mod response;

pub use delivery::{DeliveryReport, DeliveryService};
pub use queue::{ExchangeQueue, WriteBack};
pub use response::{interpret_response, InterpretedResponse};
