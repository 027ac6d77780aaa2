//! Upstream HR system client

use crate::adapters::upstream::basic_auth_header;
use crate::config::UpstreamConfig;
use crate::domain::{
    Department, DepartmentsEnvelope, MdError, Result, Snapshot, User, UsersEnvelope,
};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Reads the user and department snapshots from the HR system
pub struct UpstreamClient {
    client: Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    /// # Errors
    ///
    /// Returns `MdError::Configuration` when the HTTP client cannot be built
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| MdError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        let mut request = self.client.get(&url);
        if let Some(auth) = basic_auth_header(&self.config.username, &self.config.password) {
            request = request.header("Authorization", auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MdError::Lookup(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MdError::Lookup(format!("GET {url}: failed to read body: {e}")))?;

        if status != StatusCode::OK {
            return Err(MdError::Lookup(format!("GET {url} returned status {status}: {body}")));
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get(path).await?;
        serde_json::from_str(&body)
            .map_err(|e| MdError::Validation(format!("malformed payload from {path}: {e}")))
    }

    /// All users with their employees
    ///
    /// Rows that fail to decode are returned in `rejected`; the rest of the
    /// snapshot is kept.
    ///
    /// # Errors
    ///
    /// `MdError::Lookup` on transport failures and non-200 responses,
    /// `MdError::Validation` when the envelope itself does not decode
    pub async fn fetch_users(&self) -> Result<Snapshot<User>> {
        let envelope: UsersEnvelope = self.get_json(&self.config.users_path).await?;
        let snapshot = Snapshot::from(envelope);
        tracing::info!(
            count = snapshot.entities.len(),
            rejected = snapshot.rejected.len(),
            "Fetched users snapshot"
        );
        Ok(snapshot)
    }

    /// All departments
    pub async fn fetch_departments(&self) -> Result<Snapshot<Department>> {
        let envelope: DepartmentsEnvelope = self.get_json(&self.config.departments_path).await?;
        let snapshot = Snapshot::from(envelope);
        tracing::info!(
            count = snapshot.entities.len(),
            rejected = snapshot.rejected.len(),
            "Fetched departments snapshot"
        );
        Ok(snapshot)
    }

    /// Availability probe; the response body is returned as-is
    pub async fn ping(&self) -> Result<String> {
        let body = self.get(&self.config.ping_path).await?;
        tracing::debug!(base_url = %self.config.base_url, "Upstream ping succeeded");
        Ok(body)
    }
}
