//! Observer/owner registration by personnel code

use crate::adapters::database::traits::BirthdayStore;
use crate::domain::{MdError, ObserverOwnerPair, Result};
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Registration request body
///
/// Either a flat list of pairs or one observer with the owners it watches.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ObserverRequest {
    Pairs(Vec<ObserverOwnerPair>),
    Grouped {
        #[serde(rename = "BdObserverId")]
        observer: String,
        #[serde(rename = "BdOwners")]
        owners: Vec<OwnerRef>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerRef {
    #[serde(rename = "BdOwnerId")]
    pub owner: String,
}

impl ObserverRequest {
    /// Parses a request body
    ///
    /// # Errors
    ///
    /// Returns `MdError::Validation` when the body matches neither shape
    pub fn parse(raw: &str) -> Result<Vec<ObserverOwnerPair>> {
        let request: ObserverRequest = serde_json::from_str(raw)
            .map_err(|e| MdError::Validation(format!("invalid observer request: {e}")))?;
        Ok(request.into_pairs())
    }

    pub fn into_pairs(self) -> Vec<ObserverOwnerPair> {
        match self {
            ObserverRequest::Pairs(pairs) => pairs,
            ObserverRequest::Grouped { observer, owners } => owners
                .into_iter()
                .map(|o| ObserverOwnerPair {
                    observer: observer.clone(),
                    owner: o.owner,
                })
                .collect(),
        }
    }
}

/// Result of a batch registration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserverBatchReport {
    pub written: usize,
    /// One message per rejected pair
    pub errors: Vec<String>,
}

impl ObserverBatchReport {
    pub fn message(&self) -> String {
        format!("{} pairs written", self.written)
    }
}

/// Inserts observer/owner pairs identified by personnel code
#[derive(Clone)]
pub struct ObserverRegistry {
    store: Arc<dyn BirthdayStore + Send + Sync>,
}

impl ObserverRegistry {
    pub fn new(store: Arc<dyn BirthdayStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `MdError::Uniqueness` ("pair <observer> and <owner> already
    /// exists") for a duplicate and `MdError::NotFound` for an unknown code
    pub async fn add_observer(&self, observer_code: &str, owner_code: &str) -> Result<()> {
        let (observer, owner) = (observer_code.trim(), owner_code.trim());
        if observer.is_empty() || owner.is_empty() {
            return Err(MdError::Validation(
                "observer and owner codes must not be empty".to_string(),
            ));
        }
        self.store.add_observer(observer, owner).await?;
        tracing::info!(observer, owner, "Birthday observer added");
        Ok(())
    }

    /// Inserts every pair concurrently; failures are collected, not fatal
    pub async fn add_observers(&self, pairs: Vec<ObserverOwnerPair>) -> ObserverBatchReport {
        let mut tasks = JoinSet::new();
        for pair in pairs {
            let registry = self.clone();
            tasks.spawn(async move {
                let result = registry.add_observer(&pair.observer, &pair.owner).await;
                (pair, result)
            });
        }

        let mut report = ObserverBatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => report.written += 1,
                Ok((pair, Err(e))) => {
                    tracing::error!(
                        observer = %pair.observer,
                        owner = %pair.owner,
                        error = %e,
                        "Failed to add birthday observer"
                    );
                    report.errors.push(e.to_string());
                }
                Err(e) => {
                    tracing::error!(error = %e, "Observer registration task failed");
                    report.errors.push(e.to_string());
                }
            }
        }
        report
    }
}
