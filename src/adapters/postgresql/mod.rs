//! PostgreSQL storage for master data, the exchange queue and birthday
//! observer pairs

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
