//! Store factory
//!
//! Builds one PostgreSQL adapter and hands it out behind each store trait, so
//! all components share a single connection pool.

use crate::adapters::database::traits::{
    BirthdayStore, DirectoryQueryStore, ExchangeStore, MasterDataStore,
};
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::PostgreSQLConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Handles to every store concern, backed by the same adapter
#[derive(Clone)]
pub struct Stores {
    pub master_data: Arc<dyn MasterDataStore + Send + Sync>,
    pub exchange: Arc<dyn ExchangeStore + Send + Sync>,
    pub birthday: Arc<dyn BirthdayStore + Send + Sync>,
    pub queries: Arc<dyn DirectoryQueryStore + Send + Sync>,
}

impl Stores {
    /// Shares one implementation of all four traits
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: MasterDataStore + ExchangeStore + BirthdayStore + DirectoryQueryStore + 'static,
    {
        Self {
            master_data: store.clone() as Arc<dyn MasterDataStore + Send + Sync>,
            exchange: store.clone() as Arc<dyn ExchangeStore + Send + Sync>,
            birthday: store.clone() as Arc<dyn BirthdayStore + Send + Sync>,
            queries: store as Arc<dyn DirectoryQueryStore + Send + Sync>,
        }
    }
}

/// Create the stores from configuration
///
/// The pool connects lazily, so this succeeds without a reachable server;
/// callers that need a live connection should `queries.ping()` first.
///
/// # Errors
///
/// Returns an error if the connection string does not parse or the pool or
/// TLS connector cannot be built.
pub async fn create_store(config: &PostgreSQLConfig) -> Result<Stores> {
    tracing::info!("Creating PostgreSQL store");
    let client = Arc::new(PostgreSQLClient::new(config.clone()).await?);
    tracing::debug!(target_db = %client.connection_string_safe(), "PostgreSQL pool ready");
    let adapter = Arc::new(PostgreSQLAdapter::new_with_arc(client));
    Ok(Stores::from_shared(adapter))
}
